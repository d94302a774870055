mod common;
mod model;
mod ws;

pub use common::common_routes;
pub use model::model_routes;
pub use ws::ws_routes;

use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Full application: common routes at the root, models under `/api/v1`, push channel at `/ws`.
pub fn app(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes())
        .nest(API_PREFIX, model_routes(state.clone()))
        .merge(ws_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}
