//! Outbound requests produced by steps and the responses handed between them.
//!
//! Request factories build a [`StepRequest`] with the chained setters below,
//! optionally reading the previous step's [`StepResponse`]:
//!
//! ```
//! use surge_core::{StepRequest, StepResponse};
//!
//! let previous = StepResponse::new(200, r#"{"id":7}"#);
//! let request = StepRequest::post("http://localhost:8080/orders")
//!     .with_bearer("secret")
//!     .with_json_body_from(&previous);
//!
//! assert_eq!(request.header("authorization"), Some("Bearer secret"));
//! assert_eq!(request.body.as_deref(), Some(&br#"{"id":7}"#[..]));
//! ```

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;

use crate::error::StepError;

const CONTENT_TYPE: &str = "Content-Type";
const JSON: &str = "application/json";

/// A fully specified outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub method: Method,
    pub url: String,
    /// Headers in insertion order; repeated names are sent repeatedly
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl StepRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set the target URL.
    pub fn to(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add an `Authorization: Bearer <token>` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, StepError> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_content_type(JSON).with_body(body))
    }

    /// Use the previous response body verbatim as this request's body.
    pub fn with_body_from(self, response: &StepResponse) -> Self {
        self.with_body(response.body.clone())
    }

    /// Use the previous response body as a JSON body.
    pub fn with_json_body_from(self, response: &StepResponse) -> Self {
        self.with_content_type(JSON).with_body_from(response)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    fn with_content_type(mut self, value: &str) -> Self {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE));
        self.headers
            .push((CONTENT_TYPE.to_string(), value.to_string()));
        self
    }
}

/// A received response, fully buffered so the next step can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StepResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, StepError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setters_populate_fields() {
        let request = StepRequest::get("http://a")
            .to("http://b/path")
            .with_method(Method::PUT)
            .with_header("X-Trace", "1")
            .with_header("X-Trace", "2")
            .with_body("payload");

        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.url, "http://b/path");
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.body, Some(Bytes::from("payload")));
    }

    #[test]
    fn test_with_json_sets_content_type_once() {
        let request = StepRequest::post("http://a")
            .with_header("content-type", "text/plain")
            .with_json(&json!({"name": "x"}))
            .unwrap();

        let content_types: Vec<_> = request
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body.unwrap(), Bytes::from(r#"{"name":"x"}"#));
    }

    #[test]
    fn test_body_from_previous_response() {
        let previous = StepResponse::new(200, "hello");
        let raw = StepRequest::post("http://a").with_body_from(&previous);
        assert_eq!(raw.body, Some(Bytes::from("hello")));
        assert_eq!(raw.header("content-type"), None);

        let json = StepRequest::post("http://a").with_json_body_from(&previous);
        assert_eq!(json.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_response_accessors() {
        let response = StepResponse::new(201, r#"{"token":"abc"}"#).with_header("X-Cache", "HIT");
        assert!(response.is_success());
        assert_eq!(response.header("x-cache"), Some("HIT"));
        assert_eq!(response.text(), r#"{"token":"abc"}"#);

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["token"], "abc");

        assert!(!StepResponse::new(503, "").is_success());
        assert!(StepResponse::new(200, "nope").json::<serde_json::Value>().is_err());
    }
}
