// Protocol response type and the factory seam for response-class overrides

use crate::{ByteStream, Error, MediaType};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A response header contributed by some ownership layer.
///
/// The description is carried for the schema layer; only `value` reaches the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub value: String,
    pub description: Option<String>,
}

impl ResponseHeader {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Task scheduled to run after the response has been sent. The transport
/// drives it; this core only carries it on the response.
#[derive(Clone)]
pub struct BackgroundTask {
    task: Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>,
}

impl BackgroundTask {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self { task: Arc::new(f) }
    }

    pub async fn run(&self) {
        (self.task)().await
    }
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BackgroundTask")
    }
}

/// Response body: empty, buffered bytes, or a lazy chunked stream.
pub enum Body {
    Empty,
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Buffered bytes, if this body is not a stream.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Empty => Some(&[]),
            Body::Bytes(b) => Some(b),
            Body::Stream(_) => None,
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

/// Protocol-level response handed back to the transport for serialization.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Body,
    pub background: Option<BackgroundTask>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Body::Empty,
            background: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_background(mut self, task: BackgroundTask) -> Self {
        self.background = Some(task);
        self
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }
}

/// Builds a response from serialized handler data. Ownership layers can
/// override the factory used for a subtree; the nearest override wins.
pub trait ResponseFactory: Send + Sync {
    fn build(
        &self,
        content: Option<Value>,
        media_type: &MediaType,
        status_code: u16,
        headers: HashMap<String, String>,
        background: Option<BackgroundTask>,
    ) -> Result<Response, Error>;
}

/// The built-in response factory: JSON encoding for `MediaType::Json`,
/// plain text rendering otherwise.
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn build(
        &self,
        content: Option<Value>,
        media_type: &MediaType,
        status_code: u16,
        headers: HashMap<String, String>,
        background: Option<BackgroundTask>,
    ) -> Result<Response, Error> {
        let mut response = Response::new(status_code).with_headers(headers);
        response.background = background;

        // 204 carries no body regardless of content
        if status_code == 204 {
            return Ok(response);
        }

        let Some(content) = content else {
            return Ok(response);
        };

        let bytes = match media_type {
            MediaType::Json => serde_json::to_vec(&content)
                .map_err(|e| Error::Serialization(e.to_string()))?,
            _ => match content {
                Value::String(s) => s.into_bytes(),
                other => other.to_string().into_bytes(),
            },
        };
        response.body = Body::Bytes(Bytes::from(bytes));
        response
            .headers
            .insert("content-type".to_string(), media_type.as_str().to_string());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_factory_json_body() {
        let response = DefaultResponseFactory
            .build(
                Some(json!({"id": 1})),
                &MediaType::Json,
                200,
                HashMap::new(),
                None,
            )
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_bytes().unwrap(), br#"{"id":1}"#);
        assert_eq!(
            response.header("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_default_factory_text_body() {
        let response = DefaultResponseFactory
            .build(
                Some(json!("hello")),
                &MediaType::Text,
                200,
                HashMap::new(),
                None,
            )
            .unwrap();

        assert_eq!(response.body.as_bytes().unwrap(), b"hello");
        assert_eq!(response.header("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_no_content_drops_body() {
        let response = DefaultResponseFactory
            .build(
                Some(json!({"ignored": true})),
                &MediaType::Json,
                204,
                HashMap::new(),
                None,
            )
            .unwrap();

        assert!(response.body.is_empty());
    }

    #[test]
    fn test_factory_applies_resolved_headers() {
        let mut headers = HashMap::new();
        headers.insert("x-version".to_string(), "1".to_string());
        let response = DefaultResponseFactory
            .build(None, &MediaType::Json, 200, headers, None)
            .unwrap();

        assert_eq!(response.header("x-version").unwrap(), "1");
        assert!(response.body.is_empty());
    }
}
