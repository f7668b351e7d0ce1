// Semantic wrapper kinds a handler may return, and the closed union the
// coercion engine dispatches on

use crate::{Error, Response};
use bytes::Bytes;
use serde_json::Value;
use std::any::Any;
use std::path::PathBuf;
use std::pin::Pin;

/// Lazy byte stream backing a chunked response body.
pub type ByteStream = Pin<Box<dyn futures_util::Stream<Item = Result<Bytes, Error>> + Send>>;

/// Redirect the client to another path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
}

impl Redirect {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Serve a file from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub filename: Option<String>,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filename: None,
        }
    }

    /// Override the filename advertised in the content-disposition header.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// The filename used for content-disposition: the explicit override, or
    /// the final path component.
    pub fn disposition_filename(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

/// Drive a chunked response from a lazy byte stream.
pub struct Streaming {
    pub iterator: ByteStream,
}

impl Streaming {
    pub fn new<S>(stream: S) -> Self
    where
        S: futures_util::Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Self {
            iterator: Box::pin(stream),
        }
    }
}

/// Render a named template with a context value.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub context: Value,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Plain data returned by a handler: either an already-serializable value,
/// or opaque domain object(s) a registered plugin may convert.
pub enum ResponseContent {
    Value(Value),
    Object(Box<dyn Any + Send + Sync>),
    Objects(Vec<Box<dyn Any + Send + Sync>>),
}

impl ResponseContent {
    pub fn object(value: impl Any + Send + Sync) -> Self {
        ResponseContent::Object(Box::new(value))
    }
}

/// Everything a handler body can produce. The coercion engine matches on
/// this exhaustively instead of inspecting runtime types.
pub enum HandlerOutput {
    /// Handler declared no return value.
    None,
    /// An already-built protocol response, passed through unchanged.
    Native(Response),
    Redirect(Redirect),
    File(FileRef),
    Stream(Streaming),
    Template(Template),
    Data(ResponseContent),
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        HandlerOutput::Data(ResponseContent::Value(value))
    }
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        HandlerOutput::Native(response)
    }
}

impl From<Redirect> for HandlerOutput {
    fn from(redirect: Redirect) -> Self {
        HandlerOutput::Redirect(redirect)
    }
}

impl From<FileRef> for HandlerOutput {
    fn from(file: FileRef) -> Self {
        HandlerOutput::File(file)
    }
}

impl From<Streaming> for HandlerOutput {
    fn from(stream: Streaming) -> Self {
        HandlerOutput::Stream(stream)
    }
}

impl From<Template> for HandlerOutput {
    fn from(template: Template) -> Self {
        HandlerOutput::Template(template)
    }
}
