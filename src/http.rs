// HTTP method, media type, and connection types

use serde::Deserialize;
use std::collections::HashMap;

/// HTTP methods a route handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }
}

/// The method set declared on an HTTP route handler.
///
/// A one-element list collapses to the scalar form, so `Many(vec![POST])`
/// and `Single(POST)` behave identically for default status codes and
/// method-set checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSpec {
    Single(HttpMethod),
    Many(Vec<HttpMethod>),
}

impl MethodSpec {
    /// Normalize a declared method list, collapsing a list of one.
    pub fn from_methods(methods: Vec<HttpMethod>) -> Option<Self> {
        match methods.len() {
            0 => None,
            1 => Some(MethodSpec::Single(methods[0])),
            _ => Some(MethodSpec::Many(methods)),
        }
    }

    /// All methods this spec covers.
    pub fn methods(&self) -> Vec<HttpMethod> {
        match self {
            MethodSpec::Single(m) => vec![*m],
            MethodSpec::Many(ms) => ms.clone(),
        }
    }

    pub fn contains(&self, method: HttpMethod) -> bool {
        match self {
            MethodSpec::Single(m) => *m == method,
            MethodSpec::Many(ms) => ms.contains(&method),
        }
    }

    /// The default response status when the handler does not set one:
    /// multi-method handlers get 200, POST gets 201, DELETE gets 204,
    /// everything else 200.
    pub fn default_status_code(&self) -> u16 {
        match self {
            MethodSpec::Many(_) => 200,
            MethodSpec::Single(HttpMethod::POST) => 201,
            MethodSpec::Single(HttpMethod::DELETE) => 204,
            MethodSpec::Single(_) => 200,
        }
    }
}

impl From<HttpMethod> for MethodSpec {
    fn from(method: HttpMethod) -> Self {
        MethodSpec::Single(method)
    }
}

/// Media type for response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Json,
    Html,
    Text,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Json => "application/json",
            MediaType::Html => "text/html",
            MediaType::Text => "text/plain",
            MediaType::Other(s) => s,
        }
    }
}

/// Normalize a route path: leading slash, no trailing slash.
///
/// Empty and `"/"` both normalize to `"/"`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// The connection handed to guards and handlers by the transport.
///
/// Covers both HTTP requests and WebSocket upgrade requests; the transport
/// fills in whatever the protocol provides.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Connection {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Get a header by name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_method_defaults() {
        assert_eq!(MethodSpec::Single(HttpMethod::GET).default_status_code(), 200);
        assert_eq!(MethodSpec::Single(HttpMethod::POST).default_status_code(), 201);
        assert_eq!(MethodSpec::Single(HttpMethod::DELETE).default_status_code(), 204);
        assert_eq!(MethodSpec::Single(HttpMethod::PUT).default_status_code(), 200);
    }

    #[test]
    fn test_list_of_one_collapses_to_scalar() {
        let spec = MethodSpec::from_methods(vec![HttpMethod::POST]).unwrap();
        assert_eq!(spec, MethodSpec::Single(HttpMethod::POST));
        // collapsed form takes the scalar default, not the multi-method 200
        assert_eq!(spec.default_status_code(), 201);
    }

    #[test]
    fn test_multi_method_defaults_to_200() {
        let spec = MethodSpec::from_methods(vec![HttpMethod::POST, HttpMethod::PUT]).unwrap();
        assert_eq!(spec.default_status_code(), 200);
        assert!(spec.contains(HttpMethod::POST));
        assert!(!spec.contains(HttpMethod::GET));
    }

    #[test]
    fn test_empty_method_list_rejected() {
        assert!(MethodSpec::from_methods(vec![]).is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("users"), "/users");
        assert_eq!(normalize_path("/users/"), "/users");
        assert_eq!(normalize_path("/users/:id/"), "/users/:id");
    }

    #[test]
    fn test_connection_json_body() {
        let mut conn = Connection::new("POST", "/users");
        conn.body = br#"{"name":"ada"}"#.to_vec();
        let value: serde_json::Value = conn.json().unwrap();
        assert_eq!(value["name"], "ada");
    }
}
