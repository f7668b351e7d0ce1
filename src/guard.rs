// Guards for authorizing connections before handler execution

use crate::{Connection, Error, HttpMethod};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Shallow snapshot of a route handler node, handed to guards so they can
/// inspect the endpoint being authorized without touching the live node.
#[derive(Debug, Clone)]
pub struct HandlerSnapshot {
    pub paths: Vec<String>,
    pub methods: Option<Vec<HttpMethod>>,
    pub opt: HashMap<String, Value>,
}

/// Execution context for guards
pub struct GuardContext<'a> {
    pub connection: &'a Connection,
    pub handler: &'a HandlerSnapshot,
}

impl<'a> GuardContext<'a> {
    pub fn new(connection: &'a Connection, handler: &'a HandlerSnapshot) -> Self {
        Self {
            connection,
            handler,
        }
    }

    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.connection.headers.get(name)
    }

    pub fn get_param(&self, name: &str) -> Option<&String> {
        self.connection.path_params.get(name)
    }

    /// Free-form option set on the handler node.
    pub fn get_opt(&self, key: &str) -> Option<&Value> {
        self.handler.opt.get(key)
    }
}

/// Guard trait for protecting routes.
///
/// Guards run sequentially in root-to-handler order. A guard denies the
/// connection by returning an authorization error, which aborts the chain
/// immediately and propagates unmodified; the handler body never runs.
#[async_trait]
pub trait Guard: Send + Sync {
    async fn can_activate(&self, context: &GuardContext<'_>) -> Result<(), Error>;
}

/// Guard built from a synchronous predicate
pub struct PredicateGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<(), Error> + Send + Sync,
{
    predicate: F,
}

impl<F> PredicateGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<(), Error> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F> Guard for PredicateGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<(), Error> + Send + Sync,
{
    async fn can_activate(&self, context: &GuardContext<'_>) -> Result<(), Error> {
        (self.predicate)(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HandlerSnapshot {
        HandlerSnapshot {
            paths: vec!["/secret".to_string()],
            methods: Some(vec![HttpMethod::GET]),
            opt: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_predicate_guard_allows() {
        let guard = PredicateGuard::new(|ctx| match ctx.get_header("authorization") {
            Some(h) if h.starts_with("Bearer ") => Ok(()),
            _ => Err(Error::Unauthorized("missing bearer token".to_string())),
        });

        let mut conn = Connection::new("GET", "/secret");
        conn.headers
            .insert("authorization".to_string(), "Bearer token123".to_string());
        let snap = snapshot();
        let ctx = GuardContext::new(&conn, &snap);

        assert!(guard.can_activate(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_predicate_guard_denies() {
        let guard = PredicateGuard::new(|_| Err(Error::Forbidden("nope".to_string())));

        let conn = Connection::new("GET", "/secret");
        let snap = snapshot();
        let ctx = GuardContext::new(&conn, &snap);

        let err = guard.can_activate(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_guard_sees_handler_snapshot() {
        let guard = PredicateGuard::new(|ctx| {
            if ctx.handler.paths.contains(&"/secret".to_string()) {
                Ok(())
            } else {
                Err(Error::Forbidden("wrong endpoint".to_string()))
            }
        });

        let conn = Connection::new("GET", "/secret");
        let snap = snapshot();
        let ctx = GuardContext::new(&conn, &snap);
        assert!(guard.can_activate(&ctx).await.is_ok());
    }
}
