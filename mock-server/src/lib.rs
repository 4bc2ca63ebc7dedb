use std::{collections::HashMap, sync::Arc};

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// A request as received by the server, body included.
#[derive(Clone, Debug, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Shared log of every request the server has handled.
#[derive(Clone, Debug, Default)]
pub struct MockState {
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// For callers outside the runtime, e.g. a blocking test thread.
    pub fn blocking_requests(&self) -> Vec<RecordedRequest> {
        self.requests.blocking_read().clone()
    }

    /// Number of requests whose path is exactly `path`.
    pub fn blocking_count(&self, path: &str) -> usize {
        self.blocking_requests().iter().filter(|r| r.uri == path).count()
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/public/", get(public_index))
        .route("/test/", get(list_tests))
        .route("/test/{id}", get(get_test).post(post_test))
        .route("/public/test/{id}", get(get_public_test))
        .route("/files/{name}", get(get_file))
        .route("/search", get(search))
        .route("/error", get(bad_request).post(bad_request))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn record(State(state): State<MockState>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();
    state.requests.write().await.push(RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers,
        body: bytes.to_vec(),
    });
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn hal(status: StatusCode, value: Value) -> Response {
    (status, [(header::CONTENT_TYPE, "application/hal+json")], value.to_string()).into_response()
}

fn id_value(id: &str) -> Value {
    id.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

async fn index(headers: HeaderMap) -> Response {
    let base = base_url(&headers);
    hal(
        StatusCode::OK,
        json!({
            "_links": {
                "self": {"href": format!("{base}/")},
                "test": {"href": format!("{base}/test/{{id}}"), "templated": true},
                "files": {"href": format!("{base}/files/{{name}}"), "templated": true},
                "search": {"href": format!("{base}/search{{?q,page}}"), "templated": true},
                "error": {"href": format!("{base}/error")}
            }
        }),
    )
}

async fn public_index(headers: HeaderMap) -> Response {
    let base = base_url(&headers);
    hal(
        StatusCode::OK,
        json!({
            "_links": {
                "self": {"href": format!("{base}/public/")},
                "test": {"href": format!("{base}/public/test/{{id}}"), "templated": true}
            }
        }),
    )
}

async fn list_tests() -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        json!({"name": "john"}).to_string(),
    )
        .into_response()
}

async fn get_test(Path(id): Path<String>) -> Response {
    hal(
        StatusCode::OK,
        json!({
            "id": id_value(&id),
            "_links": {"self": {"href": format!("/test/{id}")}}
        }),
    )
}

async fn get_public_test(Path(id): Path<String>) -> Response {
    hal(StatusCode::OK, json!({"id": id_value(&id), "public": true}))
}

/// Multipart uploads are acknowledged with an empty 204; JSON commands are
/// echoed back merged with the id from the path.
async fn post_test(Path(id): Path<String>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("multipart/form-data") {
        return (StatusCode::NO_CONTENT, [(header::CONTENT_TYPE, "application/json")]).into_response();
    }

    let mut fields: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(Value::Object(fields)) => fields,
        _ => return hal(StatusCode::BAD_REQUEST, json!({"message": "expected a JSON object"})),
    };
    fields.insert("id".to_string(), id_value(&id));
    hal(StatusCode::OK, Value::Object(fields))
}

async fn get_file(Path(name): Path<String>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        format!("contents of {name}"),
    )
        .into_response()
}

async fn search(Query(query): Query<HashMap<String, String>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        json!(query).to_string(),
    )
        .into_response()
}

async fn bad_request() -> Response {
    hal(StatusCode::BAD_REQUEST, json!({"message": "bad request"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_uses_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(base_url(&headers), "http://127.0.0.1:4000");
        assert_eq!(base_url(&HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn numeric_ids_become_numbers() {
        assert_eq!(id_value("12"), json!(12));
        assert_eq!(id_value("abc"), json!("abc"));
    }

    #[test]
    fn recorded_header_lookup_ignores_case() {
        let request = RecordedRequest {
            method: "POST".to_string(),
            uri: "/test/3".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Vec::new(),
        };
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
    }
}
