use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

fn json_body<T: Serialize>(body: &T) -> Result<String, Response> {
    serde_json::to_string(body).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let json = match json_body(&self) {
            Ok(json) => json,
            Err(response) => return response,
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        (StatusCode::OK, headers, json).into_response()
    }
}

/// JSON response carrying when the cached data was fetched and whether it
/// is being revalidated
pub fn with_freshness<T: Serialize>(body: T, updated_at: i64, stale: bool) -> Response {
    let json = match json_body(&body) {
        Ok(json) => json,
        Err(response) => return response,
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("X-Updated-At", HeaderValue::from(updated_at));
    headers.insert(
        "X-Cache-Stale",
        HeaderValue::from_static(if stale { "true" } else { "false" }),
    );

    (StatusCode::OK, headers, json).into_response()
}
