//! End-to-end request handling through the HTTP router.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use definition_gateway::collaborators::{
    CacheStore, GatewayContext, InMemoryCache, StaticConnections, StaticTokenAuthenticator,
    TracingLogger,
};
use definition_gateway::config::{ListenerConfig, TimeoutConfig};
use definition_gateway::handlers::snapshot;
use definition_gateway::handlers::DefinitionHandlerFactory;
use definition_gateway::http::GatewayServer;
use definition_gateway::registry::RouteRegistry;

mod common;
use common::{fast_options, row, FakeOutbound, FakeSql, MemoryContent};

const ORDERS: &str = "create api/customers/{customerId}/orders
method GET
logs audit|exception
data-source mssql
  connection main
  command select * from orders where customer = @customer
  param @customer=customerId
  output
    group
      begin
      1 customerId
      end
    map
      begin
      total Amount
      end
    exclude
      begin
      internalNote
      end
  end
end
";

const PROTECTED: &str = "create api/protected
method GET
authentication partners
logs audit|warning
wrapped true|camelcase
data-source mssql
  connection main
  command select 1
end
";

const AUDITED: &str = "create api/audited
method GET
authentication partners
logs audit|exception
use restrict-json-in-query-string
data-source mssql
  connection main
  command select 1
end
";

const STRICT: &str = "create api/strict
method GET
use restrict-json-in-query-string
data-source mssql
  connection main
  command select 1
end
";

const TOTALS: &str = "create api/totals
method GET
use quest filter
data-source redis
  connection cache
  key totals
end
";

const ITEMS: &str = "create api/items/{id}
method GET
data-source route
  url http://inventory/items/@id
  method GET
  headers
    begin
    X-Api-Key secret
    end
  output
    exclude
      begin
      cost
      end
  end
end
";

struct Harness {
    router: Router,
    sql: Arc<FakeSql>,
    outbound: Arc<FakeOutbound>,
    cache: Arc<InMemoryCache>,
}

async fn harness(outbound: FakeOutbound) -> Harness {
    let sql = Arc::new(FakeSql::default());
    let outbound = Arc::new(outbound);
    let cache = Arc::new(InMemoryCache::new());

    let mut connections = HashMap::new();
    connections.insert("main".to_string(), "Server=db;Password=hunter2".to_string());
    connections.insert("cache".to_string(), "redis://cache".to_string());

    let context = GatewayContext::new(outbound.clone())
        .with_connections(Arc::new(StaticConnections::new(connections)))
        .with_authenticator(
            "partners",
            Arc::new(StaticTokenAuthenticator::new("authorization", vec!["secret".to_string()])),
        )
        .with_logger("audit", Arc::new(TracingLogger::new("audit")))
        .with_sql(sql.clone())
        .with_cache(cache.clone());

    let content = Arc::new(MemoryContent::default());
    for (name, text) in [
        ("orders.api", ORDERS),
        ("protected.api", PROTECTED),
        ("audited.api", AUDITED),
        ("strict.api", STRICT),
        ("totals.api", TOTALS),
        ("items.api", ITEMS),
    ] {
        content.put(Path::new("/defs").join(name), text);
    }

    let registry = Arc::new(RouteRegistry::new(
        Arc::new(DefinitionHandlerFactory::new(context)),
        content,
        fast_options(),
    ));
    assert_eq!(registry.load_all(Path::new("/defs")).await.unwrap(), 6);

    let server = GatewayServer::new(registry, &ListenerConfig::default(), &TimeoutConfig::default());
    Harness {
        router: server.router(),
        sql,
        outbound,
        cache,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Option<Value>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, request_id, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_sql_rows_are_grouped_and_renamed() {
    let h = harness(FakeOutbound::failing()).await;
    *h.sql.rows.lock().unwrap() = vec![
        row(json!({ "customerId": 7, "orderId": 1, "total": 10, "internalNote": "vip" })),
        row(json!({ "customerId": 7, "orderId": 2, "total": 5, "internalNote": "" })),
    ];

    let (status, _, body) = send(&h.router, get("/api/customers/7/orders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap(),
        json!([{
            "customerId": 7,
            "GroupByLevel_1": [
                { "orderId": 1, "Amount": 10 },
                { "orderId": 2, "Amount": 5 }
            ]
        }])
    );

    let request = h.sql.last_request().unwrap();
    assert_eq!(request.connection_string, "Server=db;Password=hunter2");
    assert_eq!(request.parameters, vec![("@customer".to_string(), json!("7"))]);
}

#[tokio::test]
async fn test_empty_sql_result_is_untracked_not_found() {
    let h = harness(FakeOutbound::failing()).await;

    let (status, _, body) = send(&h.router, get("/api/customers/7/orders")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.unwrap(), json!({ "Error": "Not Found" }));
}

#[tokio::test]
async fn test_backend_failure_hides_details_and_carries_tracking_code() {
    let h = harness(FakeOutbound::failing()).await;
    h.sql.fail.store(true, Ordering::SeqCst);

    let request = Request::get("/api/customers/7/orders")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let (status, request_id, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(request_id.as_deref(), Some("req-42"));
    let body = body.unwrap();
    assert_eq!(
        body,
        json!({ "Error": "Internal Server Error", "TrackingCode": "req-42" })
    );
    assert!(!body.to_string().contains("hunter2"));
    assert!(!body.to_string().contains("login failed"));
}

#[tokio::test]
async fn test_authentication_gates_protected_route() {
    let h = harness(FakeOutbound::failing()).await;
    *h.sql.rows.lock().unwrap() = vec![row(json!({ "one": 1 }))];

    let request = Request::get("/api/protected")
        .header("x-request-id", "req-7")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let body = body.unwrap();
    assert_eq!(body["status"], 403);
    assert_eq!(
        body["response"],
        json!({ "error": "Forbidden", "trackingCode": "req-7" })
    );

    let request = Request::get("/api/protected")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], 200);
    assert!(body["timestamp"].is_string());
    assert_eq!(body["response"], json!([{ "one": 1 }]));
}

#[tokio::test]
async fn test_error_level_threshold_tracks_rejections() {
    let h = harness(FakeOutbound::failing()).await;

    let request = Request::get("/api/audited")
        .header("x-request-id", "req-9")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body.unwrap(),
        json!({ "Error": "Forbidden", "TrackingCode": "req-9" })
    );

    let request = Request::get("/api/audited?q=%7B%22a%22%3A1%7D")
        .header("authorization", "Bearer secret")
        .header("x-request-id", "req-10")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.unwrap(),
        json!({ "Error": "Bad Request", "TrackingCode": "req-10" })
    );
}

#[tokio::test]
async fn test_json_in_query_rejected_when_restricted() {
    let h = harness(FakeOutbound::failing()).await;

    let (status, _, _) = send(&h.router, get("/api/strict?q=%7B%22a%22%3A1%7D")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.sql.last_request().is_none());
}

#[tokio::test]
async fn test_cache_rows_filtered_by_parameters_and_quest() {
    let h = harness(FakeOutbound::failing()).await;
    let rows = vec![
        row(json!({ "region": "eu", "product": "a" })),
        row(json!({ "region": "us", "product": "b" })),
        row(json!({ "region": "eu", "product": "c" })),
    ];
    h.cache
        .set("redis://cache", 0, "totals", snapshot::encode(&rows))
        .await
        .unwrap();

    let (status, _, body) = send(&h.router, get("/api/totals?region=eu")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap(),
        json!([
            { "region": "eu", "product": "a" },
            { "region": "eu", "product": "c" }
        ])
    );

    // filter={"product":["a","b"]}
    let uri = "/api/totals?filter=%7B%22product%22%3A%5B%22a%22%2C%22b%22%5D%7D";
    let (status, _, body) = send(&h.router, get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().map(Vec::len), Some(2));

    let (status, _, body) = send(&h.router, get("/api/totals?region=asia")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());
}

#[tokio::test]
async fn test_missing_cache_key_is_no_content() {
    let h = harness(FakeOutbound::failing()).await;
    let (status, _, body) = send(&h.router, get("/api/totals")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());
}

#[tokio::test]
async fn test_outbound_forwards_and_post_processes_json() {
    let h = harness(FakeOutbound::new(
        200,
        "application/json",
        r#"{"id":"5","cost":3,"name":"bolt"}"#,
    ))
    .await;

    let request = Request::get("/api/items/5")
        .header("host", "gateway.local")
        .header("accept", "application/json")
        .header("x-api-key", "from-client")
        .header("x-trace", "abc")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "id": "5", "name": "bolt" }));

    let upstream = h.outbound.last_request().unwrap();
    assert_eq!(upstream.url, "http://inventory/items/5");
    assert!(upstream.headers.iter().all(|(name, _)| name != "host"));
    assert!(upstream
        .headers
        .contains(&("x-trace".to_string(), "abc".to_string())));
    let api_keys: Vec<_> = upstream
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("x-api-key"))
        .collect();
    assert_eq!(api_keys, vec![&("X-Api-Key".to_string(), "secret".to_string())]);
}

#[tokio::test]
async fn test_outbound_error_statuses() {
    let h = harness(FakeOutbound::failing()).await;
    let (status, _, _) = send(&h.router, get("/api/items/5")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let h = harness(FakeOutbound::new(404, "text/plain", "gone")).await;
    let (status, _, body) = send(&h.router, get("/api/items/5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.unwrap(), json!({ "Error": "Not Found" }));
}

#[tokio::test]
async fn test_unknown_route_and_introspection() {
    let h = harness(FakeOutbound::failing()).await;

    let (status, request_id, body) = send(&h.router, get("/api/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(request_id.is_some());
    assert_eq!(body.unwrap(), json!({ "Error": "Not Found" }));

    let (status, _, body) = send(&h.router, get("/help")).await;
    assert_eq!(status, StatusCode::OK);
    let routes = body.unwrap()["response"].clone();
    assert_eq!(routes.as_array().map(Vec::len), Some(6));
    assert!(routes
        .as_array()
        .unwrap()
        .contains(&json!({ "template": "api/items/{id}", "method": "GET" })));
}
