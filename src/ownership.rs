// Ownership hierarchy: layer configuration, containers, and the chain walker
//
// Containers (controllers and routers) live in an arena owned by application
// assembly. The parent pointer is an index into the arena, not an owning
// edge, so the tree stays acyclic and cycle-free by construction. The graph
// is append-only and must not be mutated after the first request-time
// resolution.

use crate::{Connection, Error, Guard, HandlerOutput, Provide, Response, ResponseFactory, ResponseHeader};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Hook invoked before the handler body runs. Returning a value
/// short-circuits the handler. The hook captures what it needs from the
/// connection (cloning if the async body requires it) before returning its
/// future.
pub type BeforeRequest = Arc<
    dyn Fn(&Connection) -> BoxFuture<'static, Result<Option<HandlerOutput>, Error>> + Send + Sync,
>;

/// Hook invoked on the built response before it is returned to the
/// transport.
pub type AfterRequest =
    Arc<dyn Fn(Response) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync>;

/// The overridable attribute set every layer (handler, controller, router)
/// can contribute to resolution.
#[derive(Clone, Default)]
pub struct LayerConfig {
    pub guards: Vec<Arc<dyn Guard>>,
    pub dependencies: HashMap<String, Provide>,
    pub response_headers: HashMap<String, ResponseHeader>,
    pub response_class: Option<Arc<dyn ResponseFactory>>,
    pub before_request: Option<BeforeRequest>,
    pub after_request: Option<AfterRequest>,
    /// Free-form options, exposed to guards through the node snapshot.
    pub opt: HashMap<String, Value>,
}

impl LayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, provider: Provide) -> Self {
        self.dependencies.insert(name.into(), provider);
        self
    }

    pub fn with_response_header(
        mut self,
        name: impl Into<String>,
        header: ResponseHeader,
    ) -> Self {
        self.response_headers.insert(name.into(), header);
        self
    }

    pub fn with_response_class(mut self, factory: Arc<dyn ResponseFactory>) -> Self {
        self.response_class = Some(factory);
        self
    }

    pub fn with_before_request(mut self, hook: BeforeRequest) -> Self {
        self.before_request = Some(hook);
        self
    }

    pub fn with_after_request(mut self, hook: AfterRequest) -> Self {
        self.after_request = Some(hook);
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.opt.insert(key.into(), value);
        self
    }
}

/// What kind of container a graph node is. Controllers and routers carry the
/// same attribute set; the kind only matters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Controller,
    Router,
}

/// Index of a container in the ownership graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

/// A controller or router node in the ownership hierarchy.
pub struct Container {
    pub kind: ContainerKind,
    pub config: LayerConfig,
    owner: Option<ContainerId>,
}

impl Container {
    pub fn owner(&self) -> Option<ContainerId> {
        self.owner
    }
}

/// Arena holding every container of the application, owned top-down by the
/// assembly phase. Handlers reference their owning container by id.
#[derive(Default)]
pub struct OwnershipGraph {
    containers: Vec<Container>,
}

impl OwnershipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_router(&mut self, config: LayerConfig) -> ContainerId {
        self.add(ContainerKind::Router, config)
    }

    pub fn add_controller(&mut self, config: LayerConfig) -> ContainerId {
        self.add(ContainerKind::Controller, config)
    }

    fn add(&mut self, kind: ContainerKind, config: LayerConfig) -> ContainerId {
        let id = ContainerId(self.containers.len());
        self.containers.push(Container {
            kind,
            config,
            owner: None,
        });
        tracing::debug!(?kind, id = id.0, "registered container");
        id
    }

    pub fn container(&self, id: ContainerId) -> &Container {
        &self.containers[id.0]
    }

    /// Attach a container to its parent. The owner is set exactly once;
    /// re-parenting, self-parenting, and attachments that would close a
    /// cycle are configuration errors.
    pub fn attach(&mut self, child: ContainerId, parent: ContainerId) -> Result<(), Error> {
        if child == parent {
            return Err(Error::Configuration(
                "a container cannot own itself".to_string(),
            ));
        }
        if self.containers[child.0].owner.is_some() {
            return Err(Error::Configuration(
                "container is already attached to an owner".to_string(),
            ));
        }
        // walking up from the parent must not reach the child
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(Error::Configuration(
                    "attachment would create an ownership cycle".to_string(),
                ));
            }
            cursor = self.containers[id.0].owner;
        }
        self.containers[child.0].owner = Some(parent);
        tracing::debug!(child = child.0, parent = parent.0, "attached container");
        Ok(())
    }

    /// Walk the ownership chain starting at the given container, yielding
    /// each layer's configuration up to the root.
    pub fn layers_from(&self, start: Option<ContainerId>) -> Layers<'_> {
        Layers {
            graph: self,
            cursor: start,
        }
    }
}

/// Iterator over a container chain from a starting node to the root.
pub struct Layers<'a> {
    graph: &'a OwnershipGraph,
    cursor: Option<ContainerId>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a LayerConfig;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let container = self.graph.container(id);
        self.cursor = container.owner;
        Some(&container.config)
    }
}
