//! Demo SSR application.
//!
//! Two pages backed by an upstream GraphQL endpoint: a show list at `/` and
//! a show detail view at `/show/:id`, plus a not-found fallback. Start an
//! upstream serving `{query, variables}` POSTs and point `upstream.url` at
//! it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapped::render::{RenderStream, TargetRegistry};
use tapped::{
    LoaderArgs, LoaderFn, QueryDescriptor, RenderContext, RenderTarget, Route, ServerConfig,
    SsrOptions, SsrServer,
};

const TEMPLATE: &str = include_str!("../../demos/index.html");

#[derive(Parser, Debug)]
#[command(name = "tapped-demo", about = "Demo SSR server")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => tapped::config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tapped={level},tower_http={level}", level = config.observability.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        port = config.port,
        upstream = %config.upstream.url,
        "tapped-demo starting"
    );

    let routes = vec![
        Route::new("/", "show-list").with_loader(load_show_list as LoaderFn),
        Route::new("/show/:id", "show-detail").with_loader(load_show_detail as LoaderFn),
    ];

    let mut targets = TargetRegistry::new();
    targets.register("show-list", Arc::new(ShowListPage));
    targets.register("show-detail", Arc::new(ShowDetailPage));
    targets.register("not-found", Arc::new(NotFoundPage));

    let port = config.port;
    let server = SsrServer::new(SsrOptions {
        config,
        routes,
        targets,
        root_loader: None,
        fallback_target: Some("not-found".to_string()),
        template_html: Some(TEMPLATE.to_string()),
    })?;

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    server.run(listener).await?;

    Ok(())
}

fn load_show_list(args: LoaderArgs) -> tapped::data::LoaderFuture {
    Box::pin(async move {
        let query = QueryDescriptor::new(
            "ShowListQuery",
            "query ShowListQuery { shows { id title score } }",
        );
        Ok(args.client.preload(query, json!({})).await?)
    })
}

fn load_show_detail(args: LoaderArgs) -> tapped::data::LoaderFuture {
    Box::pin(async move {
        let id = args.params.get("id").cloned().unwrap_or_default();
        let query = QueryDescriptor::new(
            "ShowDetailQuery",
            "query ShowDetailQuery($id: ID!) { show(id: $id) { id title description score } }",
        );
        Ok(args.client.preload(query, json!({ "id": id })).await?)
    })
}

struct ShowListPage;

impl RenderTarget for ShowListPage {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        let page_ctx = ctx.clone();
        RenderStream::spawn(&ctx, move |producer| async move {
            page_ctx.head.set_title("Popular shows");
            page_ctx
                .head
                .add_meta("description", "Popular shows, rendered on the server");
            page_ctx.styles.push_rule(".show{margin:4px 0}");

            producer.all_ready().await;
            producer.chunk("<main><h1>Popular shows</h1>").await;

            let shows = page_ctx
                .loaders
                .route
                .as_ref()
                .and_then(|preloaded| preloaded.data.get("shows"))
                .and_then(Value::as_array);
            match shows {
                Some(shows) => {
                    for show in shows {
                        let id = text_field(show, "id");
                        let title = text_field(show, "title");
                        producer
                            .chunk(format!(
                                r#"<div class="show"><a href="/show/{}">{}</a></div>"#,
                                escape(&id),
                                escape(&title)
                            ))
                            .await;
                    }
                }
                None => producer.chunk("<p>No shows available.</p>").await,
            }

            producer.chunk("</main>").await;
        })
    }
}

struct ShowDetailPage;

impl RenderTarget for ShowDetailPage {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        let page_ctx = ctx.clone();
        RenderStream::spawn(&ctx, move |producer| async move {
            let show = page_ctx
                .loaders
                .route
                .as_ref()
                .and_then(|preloaded| preloaded.data.get("show"))
                .cloned();

            let Some(show) = show else {
                producer.shell_error("show not found in loader data").await;
                return;
            };

            let title = text_field(&show, "title");
            page_ctx.head.set_title(&title);

            producer.all_ready().await;
            producer
                .chunk(format!("<main><h1>{}</h1>", escape(&title)))
                .await;
            producer
                .chunk(format!(
                    "<p>{}</p><p>Score: {}</p></main>",
                    escape(&text_field(&show, "description")),
                    escape(&text_field(&show, "score"))
                ))
                .await;
        })
    }
}

struct NotFoundPage;

impl RenderTarget for NotFoundPage {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        let page_ctx = ctx.clone();
        RenderStream::spawn(&ctx, move |producer| async move {
            page_ctx.head.set_title("Not found");
            producer.all_ready().await;
            producer
                .chunk(format!(
                    "<main><h1>Not found</h1><p>No page at {}</p></main>",
                    escape(&page_ctx.pathname)
                ))
                .await;
        })
    }
}

fn text_field(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
