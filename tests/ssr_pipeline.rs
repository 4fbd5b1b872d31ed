//! End-to-end tests for the SSR pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tapped::data::LoaderFuture;
use tapped::render::{RenderContext, RenderStream, RenderTarget, TargetRegistry};
use tapped::{
    LoaderArgs, LoaderFn, QueryDescriptor, Route, ServerConfig, SsrOptions, SsrServer,
};

mod common;
use common::{
    assert_order, serve, start_mock_upstream, ChunksTarget, ParamsTarget, StalledTarget, TEMPLATE,
};

fn config_for(upstream: std::net::SocketAddr) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.upstream.url = format!("http://{upstream}/graphql");
    config
}

fn options(config: ServerConfig, routes: Vec<Route>, targets: TargetRegistry) -> SsrOptions {
    SsrOptions {
        config,
        routes,
        targets,
        root_loader: None,
        fallback_target: None,
        template_html: Some(TEMPLATE.to_string()),
    }
}

fn load_show(args: LoaderArgs) -> LoaderFuture {
    Box::pin(async move {
        let query = QueryDescriptor::new("ShowQuery", "query ShowQuery { show { id title } }");
        Ok(args.client.preload(query, json!({})).await?)
    })
}

fn load_root(args: LoaderArgs) -> LoaderFuture {
    Box::pin(async move {
        let query = QueryDescriptor::new("RootQuery", "query RootQuery { viewer { id name } }");
        Ok(args.client.preload(query, json!({})).await?)
    })
}

#[tokio::test]
async fn test_stream_order_and_hydration_scripts() {
    let upstream = start_mock_upstream(|_, _| {
        json!({ "data": { "show": { "id": "7", "title": "Orbit" } } })
    })
    .await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["A", "B", "C"])));
    let routes = vec![Route::new("/", "page").with_loader(load_show as LoaderFn)];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/html"
    );

    let body = response.text().await.unwrap();
    assert_order(
        &body,
        &[
            "<html><head>",
            "</head><body><div id=\"root\">",
            "A",
            "B",
            "C",
            "window.__RECORD_SOURCE = ",
            "window.__LOADER_DATA = ",
            "</div></body></html>",
        ],
    );

    // The record cache carries the upstream entity keyed by its id.
    assert!(body.contains(r#""7":"#), "body: {body}");
    assert!(body.contains(r#""title":"Orbit""#));

    // The loader script carries descriptor and variables, never raw data.
    assert!(body.contains(r#""name":"ShowQuery""#));
    assert!(body.contains(r#""variables":{}"#));
    let loader_script = body.split("window.__LOADER_DATA = ").nth(1).unwrap();
    assert!(!loader_script.contains("Orbit"));
}

#[tokio::test]
async fn test_params_route_without_loader() {
    // No loader is configured, so the upstream must never be called; an
    // unexpected call surfaces as a failed request and failing assertions.
    let upstream =
        start_mock_upstream(|_, _| json!({ "errors": [{ "message": "unexpected upstream call" }] }))
            .await;

    let mut targets = TargetRegistry::new();
    targets.register("item", Arc::new(ParamsTarget));
    let routes = vec![Route::new("/item/:id", "item")];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let body = reqwest::get(format!("http://{addr}/item/42"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("id=42;"));
    assert!(body.contains("window.__LOADER_DATA = null"));
    assert!(body.contains("window.__RECORD_SOURCE = {}"));
}

#[tokio::test]
async fn test_unmatched_path_is_404_without_fallback() {
    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["home"])));
    let routes = vec![Route::new("/", "page")];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unmatched_path_renders_fallback_target() {
    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["home"])));
    targets.register("not-found", Arc::new(ChunksTarget(vec!["nothing here"])));
    let routes = vec![Route::new("/", "page")];

    let mut opts = options(config_for(upstream), routes, targets);
    opts.fallback_target = Some("not-found".to_string());
    let server = SsrServer::new(opts).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("nothing here"));
}

#[tokio::test]
async fn test_root_and_route_loaders_both_preload() {
    let upstream = start_mock_upstream(|_, payload| {
        let query = payload["query"].as_str().unwrap_or_default();
        if query.contains("RootQuery") {
            json!({ "data": { "viewer": { "id": "viewer:1", "name": "Ada" } } })
        } else {
            json!({ "data": { "show": { "id": "7", "title": "Orbit" } } })
        }
    })
    .await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["body"])));
    let routes = vec![Route::new("/", "page").with_loader(load_show as LoaderFn)];

    let mut opts = options(config_for(upstream), routes, targets);
    opts.root_loader = Some(load_root as LoaderFn);
    let server = SsrServer::new(opts).unwrap();
    let addr = serve(server).await;

    let body = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Records from both loaders are in the snapshot.
    assert!(body.contains(r#""viewer:1":"#));
    assert!(body.contains(r#""7":"#));

    // The loader script describes the route query, not the root one.
    let loader_script = body.split("window.__LOADER_DATA = ").nth(1).unwrap();
    assert!(loader_script.contains("ShowQuery"));
    assert!(!loader_script.contains("RootQuery"));
}

#[tokio::test]
async fn test_loader_failure_fails_request_before_streaming() {
    let upstream =
        start_mock_upstream(|_, _| json!({ "errors": [{ "message": "boom" }] })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["never"])));
    let routes = vec![Route::new("/", "page").with_loader(load_show as LoaderFn)];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 500);

    let body = response.text().await.unwrap();
    assert!(body.contains("Something went wrong"));
    // Dev setups surface the diagnostic; the stream body never started.
    assert!(body.contains("boom"));
    assert!(!body.contains("never"));
}

#[tokio::test]
async fn test_cookie_forwarded_to_upstream() {
    let upstream = start_mock_upstream(|headers, _| {
        let cookie = headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        json!({ "data": { "session": { "id": "s", "cookie": cookie } } })
    })
    .await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["ok"])));
    let routes = vec![Route::new("/", "page").with_loader(load_show as LoaderFn)];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let client = reqwest::Client::new();
    let body = client
        .get(format!("http://{addr}/"))
        .header("cookie", "session=abc123")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("session=abc123"));
}

#[tokio::test]
async fn test_mid_stream_error_does_not_stop_document() {
    struct FlakyTarget;

    impl RenderTarget for FlakyTarget {
        fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
            RenderStream::spawn(&ctx, move |producer| async move {
                producer.all_ready().await;
                producer.chunk("first").await;
                producer.render_error("subtree failed").await;
                producer.chunk("second").await;
            })
        }
    }

    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(FlakyTarget));
    let routes = vec![Route::new("/", "page")];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    // The error arrived after readiness: status was already finalized.
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert_order(&body, &["first", "second", "window.__RECORD_SOURCE", "</html>"]);
}

#[tokio::test]
async fn test_error_before_readiness_finalizes_500_status() {
    struct ErrorThenReadyTarget;

    impl RenderTarget for ErrorThenReadyTarget {
        fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
            RenderStream::spawn(&ctx, move |producer| async move {
                producer.render_error("boot failed").await;
                producer.all_ready().await;
                producer.chunk("degraded content").await;
            })
        }
    }

    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ErrorThenReadyTarget));
    let routes = vec![Route::new("/", "page")];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().contains("degraded content"));
}

#[tokio::test]
async fn test_shell_error_produces_clean_error_page() {
    struct ShellFailTarget;

    impl RenderTarget for ShellFailTarget {
        fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
            RenderStream::spawn(&ctx, move |producer| async move {
                producer.shell_error("no shell").await;
            })
        }
    }

    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ShellFailTarget));
    let routes = vec![Route::new("/", "page")];

    let server = SsrServer::new(options(config_for(upstream), routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 500);

    let body = response.text().await.unwrap();
    assert!(body.contains("Something went wrong"));
    assert!(body.contains("no shell"));
}

#[tokio::test]
async fn test_stalled_render_is_aborted() {
    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(StalledTarget));
    let routes = vec![Route::new("/", "page")];

    let mut config = config_for(upstream);
    config.ssr.abort_delay_ms = 200;

    let server = SsrServer::new(options(config, routes, targets)).unwrap();
    let addr = serve(server).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().contains("render timed out"));
}

#[tokio::test]
async fn test_abort_after_completion_is_a_noop() {
    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec!["fast"])));
    let routes = vec![Route::new("/", "page")];

    let mut config = config_for(upstream);
    config.ssr.abort_delay_ms = 100;

    let server = SsrServer::new(options(config, routes, targets)).unwrap();
    let addr = serve(server).await;

    let body = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.ends_with("</div></body></html>"));

    // Let the timer fire against the finished stream, then verify the
    // server still answers.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let again = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(again.status(), 200);
}

#[tokio::test]
async fn test_base_path_stripped_before_matching() {
    let upstream = start_mock_upstream(|_, _| json!({ "data": {} })).await;

    let mut targets = TargetRegistry::new();
    targets.register("item", Arc::new(ParamsTarget));
    let routes = vec![Route::new("/item/:id", "item")];

    let mut config = config_for(upstream);
    config.base = "/app/".to_string();

    let server = SsrServer::new(options(config, routes, targets)).unwrap();
    let addr = serve(server).await;

    let body = reqwest::get(format!("http://{addr}/app/item/9"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("id=9;"));
}

#[test]
fn test_template_missing_marker_fails_setup() {
    let mut targets = TargetRegistry::new();
    targets.register("page", Arc::new(ChunksTarget(vec![])));

    let result = SsrServer::new(SsrOptions {
        config: ServerConfig::default(),
        routes: vec![Route::new("/", "page")],
        targets,
        root_loader: None,
        fallback_target: None,
        template_html: Some("<html><head><!--app-head--></head><body></body></html>".to_string()),
    });

    assert!(result.is_err());
}
