use axum::{routing::get, Router};

use crate::handlers::ws_upgrade;
use crate::state::AppState;

/// GET /ws: push channel.
pub fn ws_routes(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}
