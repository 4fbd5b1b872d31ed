//! Server setup and lifecycle.
//!
//! # Responsibilities
//! - Validate configuration and split the template, failing fast before
//!   any request is served
//! - Verify every route references a registered render target
//! - Load the build manifest in production (non-fatal)
//! - Assemble the axum router: SSR catch-all, request-id + trace layers,
//!   static assets and compression in production
//! - Serve with graceful shutdown

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::ServerConfig;
use crate::data::LoaderFn;
use crate::document::{AssetManifest, TemplateError, TemplateSplit};
use crate::render::TargetRegistry;
use crate::routing::Route;
use crate::server::handler::ssr_handler;
use crate::server::request::UuidRequestId;

/// Error type for server setup. Everything here is fatal: a server that
/// cannot split its template or resolve its targets must not start.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("configuration invalid: {0:?}")]
    Config(Vec<ValidationError>),

    #[error("could not read template {path}: {source}")]
    TemplateRead {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("route {path:?} references unregistered render target {target:?}")]
    UnknownTarget { path: String, target: String },

    #[error("could not build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Everything needed to assemble an SSR server.
pub struct SsrOptions {
    pub config: ServerConfig,

    /// Routes, matched in declaration order.
    pub routes: Vec<Route>,

    /// Render targets routes refer to by id.
    pub targets: TargetRegistry,

    /// Optional root bootstrapping loader, run for every request.
    pub root_loader: Option<LoaderFn>,

    /// Target rendered when no route matches (the application's own
    /// not-found view). Without one, unmatched paths get a plain 404.
    pub fallback_target: Option<String>,

    /// Template HTML. When `None`, read from `config.assets.template_path`.
    pub template_html: Option<String>,
}

/// Shared state injected into handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub config: Arc<ServerConfig>,
    pub template: Arc<TemplateSplit>,
    pub manifest: Arc<AssetManifest>,
    pub routes: Arc<Vec<Route>>,
    pub targets: Arc<TargetRegistry>,
    pub root_loader: Option<LoaderFn>,
    pub fallback_target: Option<String>,
    pub http: reqwest::Client,
}

/// The assembled SSR server.
#[derive(Debug)]
pub struct SsrServer {
    router: Router,
    config: ServerConfig,
}

impl SsrServer {
    pub fn new(options: SsrOptions) -> Result<Self, SetupError> {
        let SsrOptions {
            config,
            routes,
            targets,
            root_loader,
            fallback_target,
            template_html,
        } = options;

        validate_config(&config).map_err(SetupError::Config)?;

        let template_html = match template_html {
            Some(html) => html,
            None => {
                let path = &config.assets.template_path;
                std::fs::read_to_string(path).map_err(|source| SetupError::TemplateRead {
                    path: path.clone(),
                    source,
                })?
            }
        };
        let template = TemplateSplit::parse(&template_html)?;

        verify_targets(&routes, &targets)?;
        if let Some(target) = &fallback_target {
            if !targets.contains(target) {
                return Err(SetupError::UnknownTarget {
                    path: "(fallback)".to_string(),
                    target: target.clone(),
                });
            }
        }

        let manifest = if config.is_production {
            match &config.assets.manifest_path {
                Some(path) => AssetManifest::load(Path::new(path)),
                None => AssetManifest::empty(),
            }
        } else {
            AssetManifest::empty()
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        let state = AppState {
            config: Arc::new(config.clone()),
            template: Arc::new(template),
            manifest: Arc::new(manifest),
            routes: Arc::new(routes),
            targets: Arc::new(targets),
            root_loader,
            fallback_target,
            http,
        };

        let router = build_router(&config, state);

        Ok(Self { router, config })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            production = self.config.is_production,
            "SSR server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("SSR server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn verify_targets(routes: &[Route], targets: &TargetRegistry) -> Result<(), SetupError> {
    for route in routes {
        if !targets.contains(&route.target) {
            return Err(SetupError::UnknownTarget {
                path: route.path.clone(),
                target: route.target.clone(),
            });
        }
        verify_targets(&route.children, targets)?;
    }
    Ok(())
}

/// Build the axum router with all middleware layers.
fn build_router(config: &ServerConfig, state: AppState) -> Router {
    let mut router = Router::new();

    // Hashed client assets are static files in production; everything else
    // falls through to SSR.
    if config.is_production {
        if let Some(dir) = &config.assets.static_dir {
            router = router.nest_service(
                "/assets",
                ServeDir::new(PathBuf::from(dir).join("assets")),
            );
        }
    }

    let mut router = router
        .route("/", any(ssr_handler))
        .route("/{*path}", any(ssr_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    if config.is_production {
        router = router.layer(CompressionLayer::new());
    }

    router
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
