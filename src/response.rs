//! Standard response envelope helpers.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub status: &'static str,
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessPage<T> {
    pub status: &'static str,
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { status: "success", data }))
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { status: "success", data }))
}

pub fn success_page<T: Serialize>(data: Vec<T>, meta: PageMeta) -> (StatusCode, Json<SuccessPage<T>>) {
    (
        StatusCode::OK,
        Json(SuccessPage {
            status: "success",
            data,
            meta,
        }),
    )
}

/// CSV download named after the table.
pub fn csv_attachment(table_name: &str, body: String) -> Response {
    let disposition = format!("attachment; filename=\"{}.csv\"", table_name.replace('"', ""));
    let mut res = (StatusCode::OK, body).into_response();
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    if let Ok(v) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    res
}
