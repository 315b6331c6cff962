//! Request and response field capture.
//!
//! Every value that cannot be read (missing header, non-UTF-8 header value,
//! no connect info) is left at its field default.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::header::{self, AsHeaderName};
use axum::http::{request, response, HeaderMap};
use serde_json::{Map, Value};

use crate::fields::{RequestResponseFields, StatusField};

/// Fill the request half of `fields` from the request head and its body.
pub fn capture_request(parts: &request::Parts, body: &str, fields: &mut RequestResponseFields) {
    let host = request_host(parts);
    fields.request_uri = request_uri(parts, &host);
    fields.request_referrer = header_text(&parts.headers, header::REFERER);
    fields.request_protocol = format!("{:?}", parts.version);
    fields.request_method = parts.method.to_string();
    fields.request_path = parts.uri.path().to_string();
    fields.request_host = host;
    fields.request_size = Some(content_length(&parts.headers).unwrap_or(0));
    fields.request_content_type = header_text(&parts.headers, header::CONTENT_TYPE);
    fields.request_headers = headers_json(&parts.headers);
    fields.request_body = body.to_string();

    if let Some(ConnectInfo(remote)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        fields.remote_ip = remote.ip().to_string();
        fields.remote_port = remote.port().to_string();
    }
}

/// Fill the response half of `fields` from the response head and the
/// buffered body.
pub fn capture_response(parts: &response::Parts, body: &[u8], fields: &mut RequestResponseFields) {
    fields.response_status_code = StatusField::Code(parts.status.as_u16());
    fields.response_size = Some(content_length(&parts.headers).unwrap_or(body.len() as u64));
    fields.response_headers = headers_json(&parts.headers);
    fields.response_body = String::from_utf8_lossy(body).into_owned();
}

/// Authority from the URI (HTTP/2, absolute-form) or the `Host` header.
fn request_host(parts: &request::Parts) -> String {
    match parts.uri.authority() {
        Some(authority) => authority.to_string(),
        None => header_text(&parts.headers, header::HOST),
    }
}

/// `{scheme}://{host}{path?query}`; just the path when the host is unknown.
fn request_uri(parts: &request::Parts, host: &str) -> String {
    let path = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    if host.is_empty() {
        return path.to_string();
    }
    let scheme = parts.uri.scheme_str().unwrap_or("http");
    format!("{scheme}://{host}{path}")
}

fn header_text(headers: &HeaderMap, name: impl AsHeaderName) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(header::CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

/// Headers as a JSON object; repeated names are joined with `", "`.
pub fn headers_json(headers: &HeaderMap) -> String {
    let mut object = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
            .collect::<Vec<_>>()
            .join(", ");
        object.insert(name.as_str().to_string(), Value::from(joined));
    }
    Value::Object(object).to_string()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};

    use super::*;

    #[test]
    fn test_request_fields() {
        let (mut parts, _) = Request::builder()
            .method("POST")
            .uri("/items?limit=2")
            .header("host", "example.test:8000")
            .header("referer", "http://example.test/")
            .header("content-type", "application/json")
            .header("content-length", "7")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 51000))));

        let mut fields = RequestResponseFields::default();
        capture_request(&parts, "{\"a\":1}", &mut fields);

        assert_eq!(fields.request_uri, "http://example.test:8000/items?limit=2");
        assert_eq!(fields.request_path, "/items");
        assert_eq!(fields.request_method, "POST");
        assert_eq!(fields.request_protocol, "HTTP/1.1");
        assert_eq!(fields.request_host, "example.test:8000");
        assert_eq!(fields.request_referrer, "http://example.test/");
        assert_eq!(fields.request_content_type, "application/json");
        assert_eq!(fields.request_size, Some(7));
        assert_eq!(fields.request_body, "{\"a\":1}");
        assert_eq!(fields.remote_ip, "10.0.0.7");
        assert_eq!(fields.remote_port, "51000");

        let headers: Value = serde_json::from_str(&fields.request_headers).unwrap();
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn test_missing_values_keep_defaults() {
        let (parts, _) = Request::builder().uri("/").body(Body::empty()).unwrap().into_parts();
        let mut fields = RequestResponseFields::default();
        capture_request(&parts, "", &mut fields);

        assert_eq!(fields.request_uri, "/");
        assert_eq!(fields.request_size, Some(0));
        assert_eq!(fields.request_referrer, "");
        assert_eq!(fields.remote_ip, "");
    }

    #[test]
    fn test_response_size_falls_back_to_body_length() {
        let (parts, _) = Response::builder()
            .status(StatusCode::CREATED)
            .header("x-a", "1")
            .header("x-a", "2")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let mut fields = RequestResponseFields::default();
        capture_response(&parts, b"hello", &mut fields);

        assert_eq!(fields.response_status_code, StatusField::Code(201));
        assert_eq!(fields.response_size, Some(5));
        assert_eq!(fields.response_body, "hello");
        assert_eq!(fields.response_headers, "{\"x-a\":\"1, 2\"}");
    }
}
