//! Generic model handlers: list, metadata, get-by-id, create, update, delete, model index.
//! Each takes the descriptor it serves; routes bind one set per registered model.

use std::future::Future;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::model::{AccessorError, ModelDescriptor, Operation, RecordId};
use crate::query::{execute, QueryOutput, QueryParams};
use crate::response::{csv_attachment, success_created, success_one, success_page, PageMeta};
use crate::service::RequestValidator;
use crate::state::AppState;

/// Run one accessor call under the fetch timeout.
async fn fetch<T, F>(fetch_timeout: Duration, call: F) -> Result<T, AccessorError>
where
    F: Future<Output = Result<T, AccessorError>>,
{
    tokio::time::timeout(fetch_timeout, call)
        .await
        .map_err(|_| AccessorError::Timeout)?
}

fn failed(model: &ModelDescriptor, op: Operation) -> impl Fn(AccessorError) -> AppError + '_ {
    move |e| {
        if !matches!(e, AccessorError::NotImplemented(_)) {
            tracing::warn!(model = %model.table_name, operation = op.label(), error = %e, "accessor failed");
        }
        AppError::from(e)
    }
}

/// Parse query pairs, fetch every record, run the pipeline, answer with a page or CSV.
pub async fn list_records(
    model: &ModelDescriptor,
    pairs: Vec<(String, String)>,
    fetch_timeout: Duration,
) -> Result<Response, AppError> {
    let params = QueryParams::parse(pairs);
    let records = fetch(fetch_timeout, model.accessor.list())
        .await
        .map_err(failed(model, Operation::List))?;
    tracing::debug!(model = %model.table_name, fetched = records.len(), filters = params.filters.len(), "list");
    Ok(match execute(records, &params, &model.fields) {
        QueryOutput::Csv(body) => csv_attachment(&model.table_name, body),
        QueryOutput::Page { records, total } => success_page(
            records,
            PageMeta {
                page: params.page,
                page_size: params.page_size,
                total,
            },
        )
        .into_response(),
    })
}

pub fn metadata(model: &ModelDescriptor) -> Response {
    success_one(model.metadata()).into_response()
}

pub async fn get_record(model: &ModelDescriptor, raw_id: &str, fetch_timeout: Duration) -> Result<Response, AppError> {
    let id = RecordId::coerce(raw_id);
    match fetch(fetch_timeout, model.accessor.get_by_id(&id))
        .await
        .map_err(failed(model, Operation::GetById))?
    {
        Some(record) => Ok(success_one(record).into_response()),
        None => Err(not_found(model, &id)),
    }
}

pub async fn create_record(model: &ModelDescriptor, body: Bytes, fetch_timeout: Duration) -> Result<Response, AppError> {
    let body = parse_object(&body)?;
    RequestValidator::check_writable(&body, &model.fields)?;
    RequestValidator::validate(&body, &model.schema)?;
    let record = RequestValidator::to_record(&body, &model.fields);
    let created = fetch(fetch_timeout, model.accessor.create(record))
        .await
        .map_err(failed(model, Operation::Create))?;
    tracing::info!(model = %model.table_name, "record created");
    Ok(success_created(created).into_response())
}

pub async fn update_record(
    model: &ModelDescriptor,
    raw_id: &str,
    body: Bytes,
    fetch_timeout: Duration,
) -> Result<Response, AppError> {
    let id = RecordId::coerce(raw_id);
    let body = parse_object(&body)?;
    RequestValidator::check_writable(&body, &model.fields)?;
    RequestValidator::validate_partial(&body, &model.schema)?;
    let patch = RequestValidator::to_record(&body, &model.fields);
    match fetch(fetch_timeout, model.accessor.update(&id, patch))
        .await
        .map_err(failed(model, Operation::Update))?
    {
        Some(record) => {
            tracing::info!(model = %model.table_name, id = %id, "record updated");
            Ok(success_one(record).into_response())
        }
        None => Err(not_found(model, &id)),
    }
}

pub async fn delete_record(model: &ModelDescriptor, raw_id: &str, fetch_timeout: Duration) -> Result<Response, AppError> {
    let id = RecordId::coerce(raw_id);
    let deleted = fetch(fetch_timeout, model.accessor.delete(&id))
        .await
        .map_err(failed(model, Operation::Delete))?;
    if !deleted {
        return Err(not_found(model, &id));
    }
    tracing::info!(model = %model.table_name, id = %id, "record deleted");
    Ok(success_one(json!({ "deleted": true })).into_response())
}

fn not_found(model: &ModelDescriptor, id: &RecordId) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", model.name, id))
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(format!("invalid JSON body: {}", e))),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelSummary<'a> {
    name: &'a str,
    table_name: &'a str,
    endpoint: String,
    operations: &'static [Operation],
}

/// GET /models: every registered model, sorted by its configured name.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let mut models: Vec<ModelSummary<'_>> = state
        .registry
        .iter()
        .map(|m| ModelSummary {
            name: &m.name,
            table_name: &m.table_name,
            endpoint: format!("/api/v1/{}", m.path_segment),
            operations: m.accessor.operations(),
        })
        .collect();
    models.sort_by(|a, b| a.name.cmp(b.name));
    let body = json!({ "status": "success", "data": models });
    Json(body)
}
