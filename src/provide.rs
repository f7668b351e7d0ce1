// Dependency providers referenced by name across ownership layers

use crate::{Connection, Error};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Source of a dependency value, invoked per request by the injection
/// collaborator. This core only resolves which providers apply.
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    async fn provide(&self, connection: &Connection) -> Result<Value, Error>;
}

/// Shared handle to a dependency provider.
///
/// Equality is callable identity: two handles are equal only when they point
/// at the same provider instance. Cloning a handle preserves identity;
/// wrapping an identical closure in a new `Provide` does not. The dependency
/// resolver relies on this to reject aliasing one provider under two keys.
#[derive(Clone)]
pub struct Provide {
    inner: Arc<dyn DependencyProvider>,
}

impl Provide {
    pub fn new(provider: impl DependencyProvider + 'static) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Build a provider from a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Connection) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self::new(FnProvider { f })
    }

    pub async fn provide(&self, connection: &Connection) -> Result<Value, Error> {
        self.inner.provide(connection).await
    }
}

impl PartialEq for Provide {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Provide {}

impl std::fmt::Debug for Provide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provide")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

struct FnProvider<F> {
    f: F,
}

#[async_trait]
impl<F> DependencyProvider for FnProvider<F>
where
    F: Fn(&Connection) -> Result<Value, Error> + Send + Sync + 'static,
{
    async fn provide(&self, connection: &Connection) -> Result<Value, Error> {
        (self.f)(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_provider_produces_value() {
        let provide = Provide::from_fn(|conn| Ok(json!({ "path": conn.path })));
        let conn = Connection::new("GET", "/it");
        assert_eq!(provide.provide(&conn).await.unwrap()["path"], "/it");
    }

    #[test]
    fn test_identity_equality() {
        let a = Provide::from_fn(|_| Ok(Value::Null));
        let b = a.clone();
        let c = Provide::from_fn(|_| Ok(Value::Null));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
