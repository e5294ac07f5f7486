//! Route handlers module.

pub mod health;
pub mod users;

pub const HEALTH_PATH: &str = "/health";
pub const USERS_PATH: &str = "/api/users";

/// Paths owned by the HTTP API; the WebSocket endpoint may not use them.
pub const RESERVED_PATHS: [&str; 2] = [HEALTH_PATH, USERS_PATH];
