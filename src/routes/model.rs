//! Model routes: one list/meta/item route set bound to each registered descriptor, plus the index.
//!
//! For a model with path segment `users`:
//! - `GET /users` list (query pipeline), `POST /users` create
//! - `GET /users/meta` metadata
//! - `GET /users/:id` read, `PATCH /users/:id` update, `DELETE /users/:id` delete

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    routing::get,
    Router,
};

use crate::handlers::model::{
    create_record, delete_record, get_record, list_models, list_records, metadata, update_record,
};
use crate::model::ModelDescriptor;
use crate::state::AppState;

fn descriptor_routes(model: &Arc<ModelDescriptor>, state: &AppState) -> Router<AppState> {
    let timeout = state.fetch_timeout;
    let base = format!("/{}", model.path_segment);

    let list = {
        let m = Arc::clone(model);
        move |Query(pairs): Query<Vec<(String, String)>>| async move { list_records(&m, pairs, timeout).await }
    };
    let create = {
        let m = Arc::clone(model);
        move |body: Bytes| async move { create_record(&m, body, timeout).await }
    };
    let meta = {
        let m = Arc::clone(model);
        move || async move { metadata(&m) }
    };
    let read = {
        let m = Arc::clone(model);
        move |Path(id): Path<String>| async move { get_record(&m, &id, timeout).await }
    };
    let update = {
        let m = Arc::clone(model);
        move |Path(id): Path<String>, body: Bytes| async move { update_record(&m, &id, body, timeout).await }
    };
    let delete = {
        let m = Arc::clone(model);
        move |Path(id): Path<String>| async move { delete_record(&m, &id, timeout).await }
    };

    Router::new()
        .route(&base, get(list).post(create))
        .route(&format!("{}/meta", base), get(meta))
        .route(&format!("{}/:id", base), get(read).patch(update).delete(delete))
}

/// Every registered model plus `GET /models`.
pub fn model_routes(state: AppState) -> Router {
    let mut router = Router::new().route("/models", get(list_models));
    for model in state.registry.iter() {
        router = router.merge(descriptor_routes(model, &state));
    }
    router.with_state(state)
}
