// Value-transformation plugins for domain objects returned by handlers

use crate::Error;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Converts domain objects of some type into plain serializable values.
///
/// Consulted by the coercion engine only when a handler returns data that is
/// not already a native response or recognized wrapper kind.
pub trait SerializationPlugin: Send + Sync {
    /// Whether this plugin can convert values of `value`'s runtime type.
    fn supports(&self, value: &dyn Any) -> bool;

    /// Convert the value to a plain structure.
    fn to_value(&self, value: &dyn Any) -> Result<Value, Error>;
}

/// Ordered plugin registry. Lookup returns the first plugin claiming the
/// value's type; registration order is precedence order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn SerializationPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, plugin: impl SerializationPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Find the first plugin that supports the value's runtime type.
    pub fn plugin_for_value(&self, value: &dyn Any) -> Option<&dyn SerializationPlugin> {
        self.plugins
            .iter()
            .find(|p| p.supports(value))
            .map(|p| p.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Plugin for a single concrete type, built from a conversion closure.
pub struct TypedPlugin<T, F>
where
    T: 'static,
    F: Fn(&T) -> Result<Value, Error> + Send + Sync,
{
    convert: F,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> TypedPlugin<T, F>
where
    T: 'static,
    F: Fn(&T) -> Result<Value, Error> + Send + Sync,
{
    pub fn new(convert: F) -> Self {
        Self {
            convert,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, F> SerializationPlugin for TypedPlugin<T, F>
where
    T: 'static,
    F: Fn(&T) -> Result<Value, Error> + Send + Sync,
{
    fn supports(&self, value: &dyn Any) -> bool {
        value.is::<T>()
    }

    fn to_value(&self, value: &dyn Any) -> Result<Value, Error> {
        let concrete = value.downcast_ref::<T>().ok_or_else(|| {
            Error::Serialization("plugin invoked with a value of an unsupported type".to_string())
        })?;
        (self.convert)(concrete)
    }
}
