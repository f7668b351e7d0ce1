// Resolution over a realistic ownership tree: application router, nested
// router, controller, and handlers of each protocol kind.

use serde_json::json;
use std::sync::{Arc, Mutex};
use strata_core::{
    Connection, Error, GuardContext, HandlerSignature, LayerConfig, OwnershipGraph,
    PredicateGuard, Provide, ResponseHeader, ReturnAnnotation, asgi, get, http_handler_fn,
    raw_handler_fn, websocket,
};

fn value_sig() -> HandlerSignature {
    HandlerSignature::new().returns(ReturnAnnotation::Value)
}

fn unit_sig() -> HandlerSignature {
    HandlerSignature::new().returns(ReturnAnnotation::Unit)
}

fn logging_guard(
    log: Arc<Mutex<Vec<&'static str>>>,
    name: &'static str,
) -> PredicateGuard<impl Fn(&GuardContext<'_>) -> Result<(), Error> + Send + Sync> {
    PredicateGuard::new(move |_| {
        log.lock().unwrap().push(name);
        Ok(())
    })
}

#[tokio::test]
async fn test_guards_run_from_application_down_to_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(LayerConfig::new().with_guard(logging_guard(log.clone(), "app")));
    let api =
        graph.add_router(LayerConfig::new().with_guard(logging_guard(log.clone(), "router")));
    let users = graph
        .add_controller(LayerConfig::new().with_guard(logging_guard(log.clone(), "controller")));
    graph.attach(api, app).unwrap();
    graph.attach(users, api).unwrap();

    let mut handler = get("/users/:id")
        .with_guard(logging_guard(log.clone(), "handler"))
        .handler(
            http_handler_fn(|_conn| async { Ok(json!({"id": 1}).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(users).unwrap();

    let conn = Connection::new("GET", "/users/1");
    handler.authorize_connection(&graph, &conn).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        ["app", "router", "controller", "handler"]
    );
}

#[tokio::test]
async fn test_guard_denial_aborts_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(LayerConfig::new().with_guard(logging_guard(log.clone(), "app")));
    let api = graph.add_router(
        LayerConfig::new()
            .with_guard(PredicateGuard::new(|_| Err(Error::Unauthorized("no token".into())))),
    );
    graph.attach(api, app).unwrap();

    let mut handler = get("/users")
        .with_guard(logging_guard(log.clone(), "handler"))
        .handler(
            http_handler_fn(|_conn| async { Ok(json!([]).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(api).unwrap();

    let conn = Connection::new("GET", "/users");
    let err = handler
        .authorize_connection(&graph, &conn)
        .await
        .unwrap_err();

    // the router guard denied, so the handler guard never ran and the
    // authorization error surfaced unmodified
    assert!(matches!(err, Error::Unauthorized(reason) if reason == "no token"));
    assert_eq!(*log.lock().unwrap(), ["app"]);
}

#[tokio::test]
async fn test_dependencies_merge_with_nearest_layer_winning() {
    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(
        LayerConfig::new()
            .with_dependency("db", Provide::from_fn(|_| Ok(json!("postgres"))))
            .with_dependency("settings", Provide::from_fn(|_| Ok(json!("app-settings")))),
    );
    let users = graph.add_controller(
        LayerConfig::new()
            .with_dependency("settings", Provide::from_fn(|_| Ok(json!("users-settings")))),
    );
    graph.attach(users, app).unwrap();

    let mut handler = get("/users/me")
        .with_dependency("current_user", Provide::from_fn(|_| Ok(json!("ada"))))
        .handler(
            http_handler_fn(|_conn| async { Ok(json!(null).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(users).unwrap();

    let conn = Connection::new("GET", "/users/me");
    let deps = handler.resolve_dependencies(&graph).unwrap();
    assert_eq!(deps.len(), 3);
    assert_eq!(deps["db"].provide(&conn).await.unwrap(), json!("postgres"));
    assert_eq!(
        deps["settings"].provide(&conn).await.unwrap(),
        json!("users-settings")
    );
    assert_eq!(
        deps["current_user"].provide(&conn).await.unwrap(),
        json!("ada")
    );
}

#[tokio::test]
async fn test_provider_aliased_across_distant_layers_is_rejected() {
    let shared = Provide::from_fn(|_| Ok(json!("shared")));

    let mut graph = OwnershipGraph::new();
    let app =
        graph.add_router(LayerConfig::new().with_dependency("service", shared.clone()));
    let users = graph.add_controller(LayerConfig::new());
    graph.attach(users, app).unwrap();

    let mut handler = get("/users")
        .with_dependency("svc", shared)
        .handler(
            http_handler_fn(|_conn| async { Ok(json!(null).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(users).unwrap();

    let err = handler.resolve_dependencies(&graph).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_response_headers_merge_across_three_layers() {
    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(
        LayerConfig::new()
            .with_response_header("x-app", ResponseHeader::new("strata"))
            .with_response_header("cache-control", ResponseHeader::new("no-store")),
    );
    let users = graph.add_controller(
        LayerConfig::new().with_response_header("cache-control", ResponseHeader::new("private")),
    );
    graph.attach(users, app).unwrap();

    let mut handler = get("/users")
        .with_response_header("x-endpoint", ResponseHeader::new("list-users"))
        .handler(
            http_handler_fn(|_conn| async { Ok(json!([]).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(users).unwrap();

    let headers = handler.resolve_response_headers(&graph);
    assert_eq!(headers.len(), 3);
    assert_eq!(headers["x-app"].value, "strata");
    assert_eq!(headers["x-endpoint"].value, "list-users");
    // the controller sits nearer to the handler than the app layer
    assert_eq!(headers["cache-control"].value, "private");
}

#[tokio::test]
async fn test_websocket_handler_inherits_owner_guards() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(LayerConfig::new().with_guard(logging_guard(log.clone(), "app")));

    let mut handler = websocket("/ws/feed")
        .with_guard(logging_guard(log.clone(), "handler"))
        .handler(
            raw_handler_fn(|_conn| async { Ok(()) }),
            unit_sig().param("socket"),
        )
        .unwrap();
    handler.attach_to(app).unwrap();

    let conn = Connection::new("GET", "/ws/feed");
    handler.authorize_connection(&graph, &conn).await.unwrap();
    assert_eq!(*log.lock().unwrap(), ["app", "handler"]);

    // websocket snapshots carry no method set
    assert!(handler.snapshot().methods.is_none());
}

#[tokio::test]
async fn test_asgi_handler_resolves_owner_dependencies() {
    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(
        LayerConfig::new().with_dependency("state", Provide::from_fn(|_| Ok(json!({"up": true})))),
    );

    let mut handler = asgi("/metrics")
        .handler(
            raw_handler_fn(|_conn| async { Ok(()) }),
            unit_sig().param("scope").param("send").param("receive"),
        )
        .unwrap();
    handler.attach_to(app).unwrap();

    let deps = handler.resolve_dependencies(&graph).unwrap();
    assert!(deps.contains_key("state"));
}

#[tokio::test]
async fn test_guard_reads_handler_opt_through_snapshot() {
    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(
        LayerConfig::new().with_guard(PredicateGuard::new(|ctx| {
            match ctx.get_opt("required_role").and_then(|v| v.as_str()) {
                Some("admin") => Ok(()),
                _ => Err(Error::Forbidden("admin only".into())),
            }
        })),
    );

    let mut admin_handler = get("/admin")
        .with_opt("required_role", json!("admin"))
        .handler(
            http_handler_fn(|_conn| async { Ok(json!(null).into()) }),
            value_sig(),
        )
        .unwrap();
    admin_handler.attach_to(app).unwrap();

    let mut public_handler = get("/public")
        .handler(
            http_handler_fn(|_conn| async { Ok(json!(null).into()) }),
            value_sig(),
        )
        .unwrap();
    public_handler.attach_to(app).unwrap();

    let conn = Connection::new("GET", "/admin");
    admin_handler
        .authorize_connection(&graph, &conn)
        .await
        .unwrap();
    assert!(
        public_handler
            .authorize_connection(&graph, &conn)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_resolution_is_stable_across_repeated_requests() {
    let mut graph = OwnershipGraph::new();
    let app = graph.add_router(
        LayerConfig::new().with_dependency("db", Provide::from_fn(|_| Ok(json!("postgres")))),
    );

    let mut handler = get("/users")
        .handler(
            http_handler_fn(|_conn| async { Ok(json!([]).into()) }),
            value_sig(),
        )
        .unwrap();
    handler.attach_to(app).unwrap();

    let first_deps = handler.resolve_dependencies(&graph).unwrap() as *const _;
    let first_guards = handler.resolve_guards(&graph).as_ptr();
    for _ in 0..3 {
        assert_eq!(handler.resolve_dependencies(&graph).unwrap() as *const _, first_deps);
        assert_eq!(handler.resolve_guards(&graph).as_ptr(), first_guards);
    }
}
