//! The per-request exchange: request accessors, matched path captures,
//! decorator attributes and the response-shaping surface.
//!
//! One exchange exists per dispatch and is owned by that dispatch alone; it
//! is threaded mutably through the decorator chain and the handler, so writes
//! made by an earlier link are visible to every later one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::{Method, StatusCode, Uri, header};
use mime::Mime;
use serde_json::Value;
use tracing::warn;

use crate::body::BodyHandle;
use crate::error::BindingError;
use crate::parse::BodyParser;
use crate::query::Query;

pub struct Exchange {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Query,
    cookies: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    attributes: HashMap<String, Value>,
    body: BodyHandle,
    parsed_body: Option<Value>,
    parsers: Vec<Arc<dyn BodyParser>>,
    status: Option<StatusCode>,
    response_headers: HeaderMap,
}

impl Exchange {
    /// Builds the exchange from the transport's request head, its body stream
    /// and the parser registry snapshot taken at dispatch time.
    ///
    /// Query decoding is lenient: broken percent escapes come through
    /// verbatim instead of failing the request.
    pub fn new(parts: Parts, body: BodyHandle, parsers: Vec<Arc<dyn BodyParser>>) -> Self {
        let query = match Query::parse(parts.uri.query().unwrap_or("")) {
            Ok(query) => query,
            Err(e) => {
                warn!(cause = %e, "malformed query string, treating as empty");
                Query::default()
            }
        };
        let cookies = parse_cookies(&parts.headers);
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            cookies,
            path_params: HashMap::new(),
            attributes: HashMap::new(),
            body,
            parsed_body: None,
            parsers,
            status: None,
            response_headers: HeaderMap::new(),
        }
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// A cookie value, taken verbatim from the `Cookie` header. A repeated
    /// cookie name answers with the last occurrence.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// The capture of a named placeholder from the matched route pattern.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// A free-form attribute stored earlier in this request's chain.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The request content type, when present and well formed.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    /// The raw body handle; collecting it consumes the body for everyone.
    pub fn body(&self) -> &BodyHandle {
        &self.body
    }

    /// The request body parsed by the first registered parser accepting the
    /// request's content type. Parsed once and cached, so body-field reads
    /// and whole-body reads share the same parse.
    pub async fn body_value(&mut self) -> Result<&Value, BindingError> {
        if self.parsed_body.is_none() {
            let value = self.parse_body().await?;
            self.parsed_body = Some(value);
        }
        Ok(self.parsed_body.get_or_insert(Value::Null))
    }

    async fn parse_body(&mut self) -> Result<Value, BindingError> {
        let content_type =
            self.content_type().ok_or_else(|| BindingError::unsupported_media_type("(none)"))?;
        let parser = self
            .parsers
            .iter()
            .find(|parser| parser.accepts(&content_type))
            .cloned()
            .ok_or_else(|| BindingError::unsupported_media_type(content_type.essence_str()))?;
        let bytes = self.body.bytes().await?;
        parser.parse(&bytes).map_err(BindingError::invalid_body)
    }

    /// Overrides the status of the terminal response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn status_override(&self) -> Option<StatusCode> {
        self.status
    }

    /// Appends a header to the terminal response. An explicit
    /// `Content-Type` set here wins over the renderer's.
    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.append(name, value);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((name.to_owned(), value.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Request;
    use http_body_util::Full;
    use serde_json::json;

    use super::*;
    use crate::parse::{JsonParser, TextParser};

    fn exchange(request: Request<&'static [u8]>) -> Exchange {
        let (parts, body) = request.into_parts();
        let parsers: Vec<Arc<dyn BodyParser>> = vec![Arc::new(JsonParser), Arc::new(TextParser)];
        Exchange::new(parts, BodyHandle::new(Full::new(Bytes::from_static(body))), parsers)
    }

    #[test]
    fn exposes_request_sections() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/save/news?draft=true&tag=a&tag=b")
            .header("x-request-id", "r-1")
            .header(header::COOKIE, "session=abc; theme=dark")
            .body(b"" as &[u8])
            .unwrap();
        let exchange = exchange(request);

        assert_eq!(exchange.method(), Method::GET);
        assert_eq!(exchange.path(), "/save/news");
        assert_eq!(exchange.query().get("draft"), Some("true"));
        assert_eq!(exchange.query().get("tag"), Some("b"));
        assert_eq!(exchange.header("x-request-id"), Some("r-1"));
        assert_eq!(exchange.cookie("session"), Some("abc"));
        assert_eq!(exchange.cookie("theme"), Some("dark"));
        assert_eq!(exchange.cookie("missing"), None);
    }

    #[test]
    fn invalid_percent_escapes_decode_leniently() {
        // form decoding passes broken escapes through as literals
        let request = Request::builder().uri("/x?%zz=1").body(b"" as &[u8]).unwrap();
        assert_eq!(exchange(request).query().get("%zz"), Some("1"));
    }

    #[test]
    fn attributes_are_visible_after_being_set() {
        let request = Request::builder().uri("/").body(b"" as &[u8]).unwrap();
        let mut exchange = exchange(request);

        assert_eq!(exchange.attr("user"), None);
        exchange.set_attr("user", "admin");
        assert_eq!(exchange.attr("user"), Some(&Value::from("admin")));
    }

    #[tokio::test]
    async fn body_is_parsed_once_and_cached() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/save")
            .header(header::CONTENT_TYPE, "application/json")
            .body(br#"{"name":"hello"}"# as &[u8])
            .unwrap();
        let mut exchange = exchange(request);

        let value = exchange.body_value().await.unwrap().clone();
        assert_eq!(value, json!({"name": "hello"}));

        // the underlying body is gone, yet the cached parse still answers
        assert!(exchange.body().is_consumed().await);
        assert_eq!(exchange.body_value().await.unwrap(), &value);
    }

    #[tokio::test]
    async fn body_without_content_type_is_unsupported() {
        let request = Request::builder().method(Method::POST).uri("/save").body(b"{}" as &[u8]).unwrap();
        let err = exchange(request).body_value().await.unwrap_err();
        assert!(matches!(err, BindingError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn body_with_unhandled_content_type_is_unsupported() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/save")
            .header(header::CONTENT_TYPE, "application/xml")
            .body(b"<x/>" as &[u8])
            .unwrap();
        let err = exchange(request).body_value().await.unwrap_err();
        assert!(matches!(err, BindingError::UnsupportedMediaType { content_type } if content_type == "application/xml"));
    }

    #[test]
    fn response_shaping_is_recorded() {
        let request = Request::builder().uri("/").body(b"" as &[u8]).unwrap();
        let mut exchange = exchange(request);

        assert_eq!(exchange.status_override(), None);
        exchange.set_status(StatusCode::ACCEPTED);
        exchange.set_response_header(HeaderName::from_static("x-extra"), HeaderValue::from_static("1"));

        assert_eq!(exchange.status_override(), Some(StatusCode::ACCEPTED));
        assert_eq!(exchange.response_headers().get("x-extra").unwrap(), "1");
    }
}
