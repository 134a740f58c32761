// src/middleware/http.rs

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::config::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type, X-Request-ID, Accept-Language";

/// Id da requisição: o do cliente (se razoável) ou um UUID novo.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
}

/// Propaga o request id e registra cada requisição ao final.
pub async fn request_context(mut request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let request_id = incoming_request_id(request.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), latency_ms, request_id = %request_id, "request");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, status = status.as_u16(), latency_ms, request_id = %request_id, "request");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), latency_ms, request_id = %request_id, "request");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

fn allowed_origin(state: &AppState, origin: &str) -> bool {
    state.config.allows_any_origin() || state.config.allowed_origins.iter().any(|o| o == origin)
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &str, wildcard: bool) {
    if wildcard {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    } else if let Ok(v) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, v);
        headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// CORS: a origem precisa estar na lista (ou a lista conter `*`).
pub async fn cors(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let wildcard = state.config.allows_any_origin();

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Some(origin) = origin.as_deref().filter(|o| allowed_origin(&state, o)) {
            let headers = response.headers_mut();
            apply_cors_headers(headers, origin, wildcard);
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("3600"));
        }
        return response;
    }

    let mut response = next.run(request).await;
    if let Some(origin) = origin.as_deref().filter(|o| allowed_origin(&state, o)) {
        apply_cors_headers(response.headers_mut(), origin, wildcard);
        response.headers_mut().insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("X-Request-ID, Content-Disposition"),
        );
    }
    response
}

pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_taken_from_client_when_sane() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(incoming_request_id(&headers).as_deref(), Some("abc-123"));

        let long = "x".repeat(200);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_eq!(incoming_request_id(&headers), None);
    }

    #[test]
    fn listed_origin_gets_credentials() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, "http://localhost:3000", false);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let mut any = HeaderMap::new();
        apply_cors_headers(&mut any, "http://evil.test", true);
        assert_eq!(any[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(any.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
