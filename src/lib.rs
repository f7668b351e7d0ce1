// Strata core: route handler declaration, ownership-chain resolution, and
// response coercion for an async web framework.
//
// Handlers, controllers, and routers form an ownership tree. Each layer can
// contribute guards, dependency providers, response attributes, and hooks;
// this crate resolves what applies to a given handler by walking the chain,
// validates handler signatures at registration, and coerces handler return
// values into protocol responses. Transports and dependency injection sit
// above this crate.

pub mod datastructures;
pub mod error;
pub mod guard;
pub mod handler;
pub mod http;
pub mod ownership;
pub mod plugin;
pub mod provide;
pub mod response;
pub mod signature;
pub mod status;
pub mod template;

pub use datastructures::{
    ByteStream, FileRef, HandlerOutput, Redirect, ResponseContent, Streaming, Template,
};
pub use error::Error;
pub use guard::{Guard, GuardContext, HandlerSnapshot, PredicateGuard};
pub use handler::{
    AsgiRouteHandler, AsgiRouteHandlerBuilder, BaseRouteHandler, HttpHandlerFn, HttpRouteHandler,
    HttpRouteHandlerBuilder, OperationMetadata, RawHandlerFn, ResponseContext,
    WebSocketRouteHandler, WebSocketRouteHandlerBuilder, asgi, delete, get, http_handler_fn,
    patch, post, put, raw_handler_fn, route, websocket,
};
pub use http::{Connection, HttpMethod, MediaType, MethodSpec, normalize_path};
pub use ownership::{
    AfterRequest, BeforeRequest, Container, ContainerId, ContainerKind, LayerConfig,
    OwnershipGraph,
};
pub use plugin::{PluginRegistry, SerializationPlugin, TypedPlugin};
pub use provide::{DependencyProvider, Provide};
pub use response::{
    BackgroundTask, Body, DefaultResponseFactory, Response, ResponseFactory, ResponseHeader,
};
pub use signature::{HandlerSignature, ReturnAnnotation};
pub use status::{HttpStatus, REDIRECT_STATUS_CODES, is_redirect_status};
pub use template::TemplateEngine;
