// Route handler nodes: declaration builders, layered resolution, signature
// validation, and response coercion
//
// A handler node owns its own layer configuration and a weak reference (an
// arena id) to its owning container. Resolution walks handler -> owners ->
// root and merges each layer's contribution; results are memoized per node
// since the ownership graph is immutable after startup. Memo cells are
// OnceLock, so concurrent request tasks racing on first resolution are
// benign: both compute the same value from the immutable tree and the first
// write wins.

use crate::status::is_redirect_status;
use crate::{
    AfterRequest, BackgroundTask, BeforeRequest, Connection, ContainerId, DefaultResponseFactory,
    Error, Guard, GuardContext, HandlerOutput, HandlerSignature, HandlerSnapshot, HttpMethod,
    LayerConfig, MediaType, MethodSpec, OwnershipGraph, PluginRegistry, Provide, Response,
    ResponseContent, ResponseFactory, ResponseHeader, ReturnAnnotation, TemplateEngine,
    normalize_path,
};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};

/// The body of an HTTP route handler.
pub type HttpHandlerFn =
    Arc<dyn Fn(Connection) -> BoxFuture<'static, Result<HandlerOutput, Error>> + Send + Sync>;

/// The body of a WebSocket or raw-protocol route handler. These produce no
/// response value; the transport owns the socket.
pub type RawHandlerFn =
    Arc<dyn Fn(Connection) -> BoxFuture<'static, Result<(), Error>> + Send + Sync>;

/// Wrap an async function as an [`HttpHandlerFn`].
pub fn http_handler_fn<F, Fut>(f: F) -> HttpHandlerFn
where
    F: Fn(Connection) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput, Error>> + Send + 'static,
{
    Arc::new(move |conn| Box::pin(f(conn)))
}

/// Wrap an async function as a [`RawHandlerFn`].
pub fn raw_handler_fn<F, Fut>(f: F) -> RawHandlerFn
where
    F: Fn(Connection) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Arc::new(move |conn| Box::pin(f(conn)))
}

/// Collaborators the coercion engine consults when building a response.
#[derive(Clone, Default)]
pub struct ResponseContext {
    pub plugins: PluginRegistry,
    pub template_engine: Option<Arc<dyn TemplateEngine>>,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.template_engine = Some(engine);
        self
    }
}

/// OpenAPI metadata declared on an HTTP route handler. Carried as plain data
/// for the schema layer; nothing here affects resolution.
#[derive(Debug, Clone)]
pub struct OperationMetadata {
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub response_description: Option<String>,
    pub deprecated: bool,
    pub include_in_schema: bool,
    pub operation_id: Option<String>,
    /// Status codes the handler declares it may raise.
    pub raises: Vec<u16>,
    pub content_encoding: Option<String>,
    pub content_media_type: Option<String>,
}

impl Default for OperationMetadata {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            summary: None,
            description: None,
            response_description: None,
            deprecated: false,
            include_in_schema: true,
            operation_id: None,
            raises: Vec::new(),
            content_encoding: None,
            content_media_type: None,
        }
    }
}

/// Fields and resolution logic shared by every handler protocol kind.
pub struct BaseRouteHandler {
    paths: Vec<String>,
    config: LayerConfig,
    signature: HandlerSignature,
    owner: Option<ContainerId>,
    resolved_guards: OnceLock<Vec<Arc<dyn Guard>>>,
    resolved_dependencies: OnceLock<HashMap<String, Provide>>,
}

impl BaseRouteHandler {
    fn new(paths: Vec<String>, config: LayerConfig, signature: HandlerSignature) -> Self {
        Self {
            paths,
            config,
            signature,
            owner: None,
            resolved_guards: OnceLock::new(),
            resolved_dependencies: OnceLock::new(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn signature(&self) -> &HandlerSignature {
        &self.signature
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn owner(&self) -> Option<ContainerId> {
        self.owner
    }

    /// Attach this handler to its owning container. The owner is set exactly
    /// once during application assembly.
    pub fn attach_to(&mut self, owner: ContainerId) -> Result<(), Error> {
        if self.owner.is_some() {
            return Err(Error::Configuration(
                "route handler is already attached to an owner".to_string(),
            ));
        }
        self.owner = Some(owner);
        Ok(())
    }

    /// All layers in scope for this handler, nearest first: the handler's
    /// own configuration, then each owner up to the root.
    pub fn ownership_layers<'a>(
        &'a self,
        graph: &'a OwnershipGraph,
    ) -> impl Iterator<Item = &'a LayerConfig> {
        std::iter::once(&self.config).chain(graph.layers_from(self.owner))
    }

    /// All guards in scope, ordered root layer first so application-level
    /// guards run before handler-level ones. Memoized.
    pub fn resolve_guards(&self, graph: &OwnershipGraph) -> &[Arc<dyn Guard>] {
        self.resolved_guards.get_or_init(|| {
            let layers: Vec<&LayerConfig> = self.ownership_layers(graph).collect();
            let mut guards: Vec<Arc<dyn Guard>> = Vec::new();
            for layer in layers.into_iter().rev() {
                guards.extend(layer.guards.iter().cloned());
            }
            tracing::debug!(count = guards.len(), "resolved guards");
            guards
        })
    }

    /// The name -> provider mapping in scope for this handler. The walk
    /// starts at the handler, so the nearest layer wins for a repeated name;
    /// a provider already registered under a different name is a
    /// configuration error. Memoized on success.
    pub fn resolve_dependencies(
        &self,
        graph: &OwnershipGraph,
    ) -> Result<&HashMap<String, Provide>, Error> {
        if let Some(resolved) = self.resolved_dependencies.get() {
            return Ok(resolved);
        }
        let mut dependencies: HashMap<String, Provide> = HashMap::new();
        for layer in self.ownership_layers(graph) {
            for (key, provider) in &layer.dependencies {
                if !dependencies.contains_key(key) {
                    validate_dependency_is_unique(&dependencies, key, provider)?;
                    dependencies.insert(key.clone(), provider.clone());
                }
            }
        }
        tracing::debug!(count = dependencies.len(), "resolved dependencies");
        Ok(self.resolved_dependencies.get_or_init(|| dependencies))
    }

    /// Run every guard in scope against the connection, root layer first.
    /// Guards run sequentially; the first error aborts the chain and
    /// propagates unmodified.
    pub async fn authorize_connection(
        &self,
        graph: &OwnershipGraph,
        connection: &Connection,
        snapshot: &HandlerSnapshot,
    ) -> Result<(), Error> {
        for guard in self.resolve_guards(graph) {
            let context = GuardContext::new(connection, snapshot);
            guard.can_activate(&context).await?;
        }
        Ok(())
    }
}

/// A provider may only be registered under one key across the whole chain.
fn validate_dependency_is_unique(
    dependencies: &HashMap<String, Provide>,
    key: &str,
    provider: &Provide,
) -> Result<(), Error> {
    for (existing_key, existing) in dependencies {
        if existing == provider {
            return Err(Error::Configuration(format!(
                "provider for key '{key}' is already defined under the different key \
                 '{existing_key}'; to override a provider it must use the same key"
            )));
        }
    }
    Ok(())
}

/// An HTTP endpoint binding: method set, status code, media type, response
/// attributes, and the handler body.
pub struct HttpRouteHandler {
    base: BaseRouteHandler,
    method: MethodSpec,
    status_code: u16,
    media_type: MediaType,
    background: Option<BackgroundTask>,
    metadata: OperationMetadata,
    handler_fn: HttpHandlerFn,
    resolved_headers: OnceLock<HashMap<String, ResponseHeader>>,
    resolved_response_class: OnceLock<Arc<dyn ResponseFactory>>,
    resolved_before_request: OnceLock<Option<BeforeRequest>>,
    resolved_after_request: OnceLock<Option<AfterRequest>>,
}

impl std::fmt::Debug for HttpRouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRouteHandler")
            .field("paths", &self.base.paths)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl HttpRouteHandler {
    pub fn paths(&self) -> &[String] {
        self.base.paths()
    }

    pub fn signature(&self) -> &HandlerSignature {
        self.base.signature()
    }

    pub fn method_spec(&self) -> &MethodSpec {
        &self.method
    }

    /// The handler's method set as a list, regardless of scalar or list
    /// declaration form.
    pub fn http_methods(&self) -> Vec<HttpMethod> {
        self.method.methods()
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    pub fn handler_fn(&self) -> &HttpHandlerFn {
        &self.handler_fn
    }

    pub fn attach_to(&mut self, owner: ContainerId) -> Result<(), Error> {
        self.base.attach_to(owner)
    }

    /// Shallow snapshot of this node, handed to guards.
    pub fn snapshot(&self) -> HandlerSnapshot {
        HandlerSnapshot {
            paths: self.base.paths.clone(),
            methods: Some(self.http_methods()),
            opt: self.base.config.opt.clone(),
        }
    }

    pub fn resolve_guards(&self, graph: &OwnershipGraph) -> &[Arc<dyn Guard>] {
        self.base.resolve_guards(graph)
    }

    pub fn resolve_dependencies(
        &self,
        graph: &OwnershipGraph,
    ) -> Result<&HashMap<String, Provide>, Error> {
        self.base.resolve_dependencies(graph)
    }

    pub async fn authorize_connection(
        &self,
        graph: &OwnershipGraph,
        connection: &Connection,
    ) -> Result<(), Error> {
        let snapshot = self.snapshot();
        self.base
            .authorize_connection(graph, connection, &snapshot)
            .await
    }

    /// All response headers in scope. The union walks handler -> root with
    /// first-seen name winning, so nearer layers override and farther layers
    /// fill gaps. Memoized.
    pub fn resolve_response_headers(&self, graph: &OwnershipGraph) -> &HashMap<String, ResponseHeader> {
        self.resolved_headers.get_or_init(|| {
            let mut headers: HashMap<String, ResponseHeader> = HashMap::new();
            for layer in self.base.ownership_layers(graph) {
                for (key, value) in &layer.response_headers {
                    headers
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
            headers
        })
    }

    /// The nearest response factory override, or the built-in default.
    /// Memoized.
    pub fn resolve_response_class(&self, graph: &OwnershipGraph) -> Arc<dyn ResponseFactory> {
        self.resolved_response_class
            .get_or_init(|| {
                for layer in self.base.ownership_layers(graph) {
                    if let Some(factory) = &layer.response_class {
                        return factory.clone();
                    }
                }
                Arc::new(DefaultResponseFactory)
            })
            .clone()
    }

    /// The nearest before-request hook, if any layer sets one. Memoized,
    /// including the resolved-to-none outcome.
    pub fn resolve_before_request(&self, graph: &OwnershipGraph) -> Option<BeforeRequest> {
        self.resolved_before_request
            .get_or_init(|| {
                self.base
                    .ownership_layers(graph)
                    .find_map(|layer| layer.before_request.clone())
            })
            .clone()
    }

    /// The nearest after-request hook, if any layer sets one. Memoized,
    /// including the resolved-to-none outcome.
    pub fn resolve_after_request(&self, graph: &OwnershipGraph) -> Option<AfterRequest> {
        self.resolved_after_request
            .get_or_init(|| {
                self.base
                    .ownership_layers(graph)
                    .find_map(|layer| layer.after_request.clone())
            })
            .clone()
    }

    /// Coerce a handler return value into a protocol response, applying
    /// resolved headers, status, media type, and the after-request hook.
    pub async fn to_response(
        &self,
        data: HandlerOutput,
        graph: &OwnershipGraph,
        ctx: &ResponseContext,
    ) -> Result<Response, Error> {
        let headers: HashMap<String, String> = self
            .resolve_response_headers(graph)
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect();

        let mut response = match data {
            // an already-built response passes through unchanged
            HandlerOutput::Native(response) => response,
            HandlerOutput::Redirect(redirect) => Response::new(self.status_code)
                .with_headers(headers)
                .with_header("location", redirect.path),
            HandlerOutput::File(file) => {
                let bytes = tokio::fs::read(&file.path).await?;
                Response::new(self.status_code)
                    .with_headers(headers)
                    .with_header("content-type", self.media_type.as_str())
                    .with_header(
                        "content-disposition",
                        format!("attachment; filename=\"{}\"", file.disposition_filename()),
                    )
                    .with_body(bytes)
            }
            HandlerOutput::Stream(streaming) => {
                let mut response = Response::new(self.status_code)
                    .with_headers(headers)
                    .with_header("content-type", self.media_type.as_str());
                response.body = crate::Body::Stream(streaming.iterator);
                response
            }
            HandlerOutput::Template(template) => {
                let engine = ctx.template_engine.as_deref().ok_or_else(|| {
                    Error::Internal("template engine was not initialized in the app".to_string())
                })?;
                let rendered = engine.render(&template.name, &template.context)?;
                Response::new(self.status_code)
                    .with_headers(headers)
                    .with_header("content-type", MediaType::Html.as_str())
                    .with_body(rendered.into_bytes())
            }
            HandlerOutput::Data(content) => {
                let value = convert_content(content, &ctx.plugins)?;
                self.resolve_response_class(graph).build(
                    Some(value),
                    &self.media_type,
                    self.status_code,
                    headers,
                    self.background.clone(),
                )?
            }
            HandlerOutput::None => self.resolve_response_class(graph).build(
                None,
                &self.media_type,
                self.status_code,
                headers,
                self.background.clone(),
            )?,
        };

        if let Some(after_request) = self.resolve_after_request(graph) {
            response = after_request(response).await?;
        }
        Ok(response)
    }
}

/// Convert plain handler data through the plugin registry. The registry is
/// queried once per response; for sequences the first element picks the
/// plugin and conversion is element-wise.
fn convert_content(content: ResponseContent, plugins: &PluginRegistry) -> Result<Value, Error> {
    match content {
        ResponseContent::Value(value) => Ok(value),
        ResponseContent::Object(object) => {
            let plugin = plugins.plugin_for_value(&*object).ok_or_else(|| {
                Error::Serialization(
                    "no serialization plugin registered for the returned value type".to_string(),
                )
            })?;
            plugin.to_value(&*object)
        }
        ResponseContent::Objects(objects) => {
            let Some(first) = objects.first() else {
                return Ok(Value::Array(Vec::new()));
            };
            let plugin = plugins.plugin_for_value(&**first).ok_or_else(|| {
                Error::Serialization(
                    "no serialization plugin registered for the returned value type".to_string(),
                )
            })?;
            objects
                .iter()
                .map(|object| plugin.to_value(&**object))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
    }
}

/// Builder for HTTP route handlers. Binding the handler body with
/// [`HttpRouteHandlerBuilder::handler`] validates the declared signature and
/// fails registration on any rule violation.
pub struct HttpRouteHandlerBuilder {
    paths: Vec<String>,
    method: Option<MethodSpec>,
    status_code: Option<u16>,
    media_type: MediaType,
    config: LayerConfig,
    background: Option<BackgroundTask>,
    metadata: OperationMetadata,
}

impl HttpRouteHandlerBuilder {
    fn new(path: impl Into<String>, method: Option<MethodSpec>) -> Self {
        Self {
            paths: vec![normalize_path(&path.into())],
            method,
            status_code: None,
            media_type: MediaType::Json,
            config: LayerConfig::new(),
            background: None,
            metadata: OperationMetadata::default(),
        }
    }

    /// Register an additional path pattern for this handler.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(normalize_path(&path.into()));
        self
    }

    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.config.guards.push(Arc::new(guard));
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, provider: Provide) -> Self {
        self.config.dependencies.insert(name.into(), provider);
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.opt.insert(key.into(), value);
        self
    }

    pub fn with_response_header(
        mut self,
        name: impl Into<String>,
        header: ResponseHeader,
    ) -> Self {
        self.config.response_headers.insert(name.into(), header);
        self
    }

    pub fn with_response_class(mut self, factory: Arc<dyn ResponseFactory>) -> Self {
        self.config.response_class = Some(factory);
        self
    }

    pub fn with_before_request(mut self, hook: BeforeRequest) -> Self {
        self.config.before_request = Some(hook);
        self
    }

    pub fn with_after_request(mut self, hook: AfterRequest) -> Self {
        self.config.after_request = Some(hook);
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_background(mut self, task: BackgroundTask) -> Self {
        self.background = Some(task);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.metadata.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_response_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.response_description = Some(description.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.metadata.deprecated = true;
        self
    }

    pub fn exclude_from_schema(mut self) -> Self {
        self.metadata.include_in_schema = false;
        self
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.metadata.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_raises(mut self, status_codes: Vec<u16>) -> Self {
        self.metadata.raises = status_codes;
        self
    }

    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.metadata.content_encoding = Some(encoding.into());
        self
    }

    pub fn with_content_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.metadata.content_media_type = Some(media_type.into());
        self
    }

    /// Bind the handler body and its declared signature, validating both
    /// against the HTTP rules. Fails registration on violation.
    pub fn handler(
        self,
        handler_fn: HttpHandlerFn,
        signature: HandlerSignature,
    ) -> Result<HttpRouteHandler, Error> {
        let method = self.method.ok_or_else(|| {
            Error::Configuration("an http method is required for HTTP route handlers".to_string())
        })?;
        let status_code = self
            .status_code
            .unwrap_or_else(|| method.default_status_code());
        let media_type =
            validate_http_signature(&signature, &method, status_code, self.media_type)?;
        tracing::trace!(paths = ?self.paths, status_code, "validated http route handler");
        Ok(HttpRouteHandler {
            base: BaseRouteHandler::new(self.paths, self.config, signature),
            method,
            status_code,
            media_type,
            background: self.background,
            metadata: self.metadata,
            handler_fn,
            resolved_headers: OnceLock::new(),
            resolved_response_class: OnceLock::new(),
            resolved_before_request: OnceLock::new(),
            resolved_after_request: OnceLock::new(),
        })
    }
}

/// HTTP validation rules. Returns the (possibly downgraded) media type:
/// a file-returning handler declared with JSON or HTML media is coerced to
/// plain text rather than rejected.
fn validate_http_signature(
    signature: &HandlerSignature,
    method: &MethodSpec,
    status_code: u16,
    media_type: MediaType,
) -> Result<MediaType, Error> {
    let Some(annotation) = signature.return_annotation() else {
        return Err(Error::Validation(
            "a route handler return value must be type annotated; a handler returning no \
             value must declare the unit annotation"
                .to_string(),
        ));
    };
    let media_type = match annotation {
        ReturnAnnotation::Redirect if !is_redirect_status(status_code) => {
            return Err(Error::Validation(format!(
                "redirect responses require one of the following status codes: \
                 301, 302, 303, 307, 308; got {status_code}"
            )));
        }
        ReturnAnnotation::File if matches!(media_type, MediaType::Json | MediaType::Html) => {
            MediaType::Text
        }
        _ => media_type,
    };
    if signature.has_param("socket") {
        return Err(Error::Configuration(
            "the 'socket' parameter is not supported by HTTP route handlers".to_string(),
        ));
    }
    if signature.has_param("data") && method.contains(HttpMethod::GET) {
        return Err(Error::Configuration(
            "the 'data' parameter is unsupported for GET request handlers".to_string(),
        ));
    }
    Ok(media_type)
}

/// Declare a handler for an explicit method list.
pub fn route(path: impl Into<String>, methods: Vec<HttpMethod>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, MethodSpec::from_methods(methods))
}

/// Declare a GET handler.
pub fn get(path: impl Into<String>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, Some(MethodSpec::Single(HttpMethod::GET)))
}

/// Declare a POST handler.
pub fn post(path: impl Into<String>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, Some(MethodSpec::Single(HttpMethod::POST)))
}

/// Declare a PUT handler.
pub fn put(path: impl Into<String>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, Some(MethodSpec::Single(HttpMethod::PUT)))
}

/// Declare a PATCH handler.
pub fn patch(path: impl Into<String>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, Some(MethodSpec::Single(HttpMethod::PATCH)))
}

/// Declare a DELETE handler.
pub fn delete(path: impl Into<String>) -> HttpRouteHandlerBuilder {
    HttpRouteHandlerBuilder::new(path, Some(MethodSpec::Single(HttpMethod::DELETE)))
}

/// A WebSocket endpoint binding.
pub struct WebSocketRouteHandler {
    base: BaseRouteHandler,
    handler_fn: RawHandlerFn,
}

impl std::fmt::Debug for WebSocketRouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketRouteHandler")
            .field("paths", &self.base.paths)
            .finish_non_exhaustive()
    }
}

impl WebSocketRouteHandler {
    pub fn paths(&self) -> &[String] {
        self.base.paths()
    }

    pub fn signature(&self) -> &HandlerSignature {
        self.base.signature()
    }

    pub fn handler_fn(&self) -> &RawHandlerFn {
        &self.handler_fn
    }

    pub fn attach_to(&mut self, owner: ContainerId) -> Result<(), Error> {
        self.base.attach_to(owner)
    }

    pub fn snapshot(&self) -> HandlerSnapshot {
        HandlerSnapshot {
            paths: self.base.paths.clone(),
            methods: None,
            opt: self.base.config.opt.clone(),
        }
    }

    pub fn resolve_guards(&self, graph: &OwnershipGraph) -> &[Arc<dyn Guard>] {
        self.base.resolve_guards(graph)
    }

    pub fn resolve_dependencies(
        &self,
        graph: &OwnershipGraph,
    ) -> Result<&HashMap<String, Provide>, Error> {
        self.base.resolve_dependencies(graph)
    }

    pub async fn authorize_connection(
        &self,
        graph: &OwnershipGraph,
        connection: &Connection,
    ) -> Result<(), Error> {
        let snapshot = self.snapshot();
        self.base
            .authorize_connection(graph, connection, &snapshot)
            .await
    }
}

/// Builder for WebSocket route handlers.
pub struct WebSocketRouteHandlerBuilder {
    paths: Vec<String>,
    config: LayerConfig,
}

impl WebSocketRouteHandlerBuilder {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(normalize_path(&path.into()));
        self
    }

    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.config.guards.push(Arc::new(guard));
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, provider: Provide) -> Self {
        self.config.dependencies.insert(name.into(), provider);
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.opt.insert(key.into(), value);
        self
    }

    pub fn handler(
        self,
        handler_fn: RawHandlerFn,
        signature: HandlerSignature,
    ) -> Result<WebSocketRouteHandler, Error> {
        if signature.return_annotation() != Some(ReturnAnnotation::Unit) {
            return Err(Error::Configuration(
                "websocket handler functions must declare the unit return annotation".to_string(),
            ));
        }
        if !signature.has_param("socket") {
            return Err(Error::Configuration(
                "websocket handlers must declare a 'socket' parameter".to_string(),
            ));
        }
        if signature.has_param("request") {
            return Err(Error::Configuration(
                "the 'request' parameter is not supported by websocket handlers".to_string(),
            ));
        }
        if signature.has_param("data") {
            return Err(Error::Configuration(
                "the 'data' parameter is not supported by websocket handlers".to_string(),
            ));
        }
        Ok(WebSocketRouteHandler {
            base: BaseRouteHandler::new(self.paths, self.config, signature),
            handler_fn,
        })
    }
}

/// Declare a WebSocket handler.
pub fn websocket(path: impl Into<String>) -> WebSocketRouteHandlerBuilder {
    WebSocketRouteHandlerBuilder {
        paths: vec![normalize_path(&path.into())],
        config: LayerConfig::new(),
    }
}

/// A raw-protocol endpoint binding: the handler speaks to the transport
/// directly through scope/receive/send.
pub struct AsgiRouteHandler {
    base: BaseRouteHandler,
    handler_fn: RawHandlerFn,
}

impl std::fmt::Debug for AsgiRouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsgiRouteHandler")
            .field("paths", &self.base.paths)
            .finish_non_exhaustive()
    }
}

impl AsgiRouteHandler {
    pub fn paths(&self) -> &[String] {
        self.base.paths()
    }

    pub fn signature(&self) -> &HandlerSignature {
        self.base.signature()
    }

    pub fn handler_fn(&self) -> &RawHandlerFn {
        &self.handler_fn
    }

    pub fn attach_to(&mut self, owner: ContainerId) -> Result<(), Error> {
        self.base.attach_to(owner)
    }

    pub fn snapshot(&self) -> HandlerSnapshot {
        HandlerSnapshot {
            paths: self.base.paths.clone(),
            methods: None,
            opt: self.base.config.opt.clone(),
        }
    }

    pub fn resolve_guards(&self, graph: &OwnershipGraph) -> &[Arc<dyn Guard>] {
        self.base.resolve_guards(graph)
    }

    pub fn resolve_dependencies(
        &self,
        graph: &OwnershipGraph,
    ) -> Result<&HashMap<String, Provide>, Error> {
        self.base.resolve_dependencies(graph)
    }

    pub async fn authorize_connection(
        &self,
        graph: &OwnershipGraph,
        connection: &Connection,
    ) -> Result<(), Error> {
        let snapshot = self.snapshot();
        self.base
            .authorize_connection(graph, connection, &snapshot)
            .await
    }
}

/// Builder for raw-protocol route handlers.
pub struct AsgiRouteHandlerBuilder {
    paths: Vec<String>,
    config: LayerConfig,
}

impl AsgiRouteHandlerBuilder {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(normalize_path(&path.into()));
        self
    }

    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.config.guards.push(Arc::new(guard));
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, provider: Provide) -> Self {
        self.config.dependencies.insert(name.into(), provider);
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.opt.insert(key.into(), value);
        self
    }

    pub fn handler(
        self,
        handler_fn: RawHandlerFn,
        signature: HandlerSignature,
    ) -> Result<AsgiRouteHandler, Error> {
        if signature.return_annotation() != Some(ReturnAnnotation::Unit) {
            return Err(Error::Configuration(
                "raw-protocol handler functions must declare the unit return annotation"
                    .to_string(),
            ));
        }
        for required in ["scope", "send", "receive"] {
            if !signature.has_param(required) {
                return Err(Error::Configuration(format!(
                    "raw-protocol handlers must declare 'scope', 'send' and 'receive' \
                     parameters; missing '{required}'"
                )));
            }
        }
        Ok(AsgiRouteHandler {
            base: BaseRouteHandler::new(self.paths, self.config, signature),
            handler_fn,
        })
    }
}

/// Declare a raw-protocol handler.
pub fn asgi(path: impl Into<String>) -> AsgiRouteHandlerBuilder {
    AsgiRouteHandlerBuilder {
        paths: vec![normalize_path(&path.into())],
        config: LayerConfig::new(),
    }
}
