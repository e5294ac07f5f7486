//! Roster endpoint.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::server::state::AppState;

/// GET /api/users - Who is online, in the same shape as the `users` frame.
pub async fn get_users(State(state): State<Arc<AppState>>) -> Json<ServerMessage> {
    Json(ServerMessage::Users(state.relay.presence()))
}
