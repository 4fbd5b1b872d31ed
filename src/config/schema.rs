//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the SSR
//! server. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration for the SSR server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,

    /// Base path the application is mounted under (e.g., "/app/").
    pub base: String,

    /// Production mode: hashed assets, static file serving, no inline styles.
    pub is_production: bool,

    /// Development mode: direct stylesheet links, inline style injection,
    /// diagnostic error bodies.
    pub is_dev: bool,

    /// Rendering settings.
    pub ssr: SsrConfig,

    /// Upstream data source settings.
    pub upstream: UpstreamConfig,

    /// Template and static asset settings.
    pub assets: AssetConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Rendering settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SsrConfig {
    /// Upper bound on total render duration in milliseconds. The abort
    /// timer always fires; firing after completion is a no-op.
    pub abort_delay_ms: u64,

    /// Maximum inbound request body size buffered for loaders, in bytes.
    pub max_body_bytes: usize,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            abort_delay_ms: 10_000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Upstream GraphQL data source settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Endpoint accepting `{query, variables}` POSTs.
    pub url: String,

    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4000/graphql".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Template and static asset settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Path to the HTML template containing the head and body markers.
    pub template_path: String,

    /// Directory of built client assets, served under `/assets` in
    /// production.
    pub static_dir: Option<String>,

    /// Path to the build manifest used to resolve hashed asset filenames
    /// in production.
    pub manifest_path: Option<String>,

    /// Optional global stylesheet injected during SSR
    /// (e.g., "/src/app/global.css").
    pub global_stylesheet: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            template_path: "index.html".to_string(),
            static_dir: None,
            manifest_path: None,
            global_stylesheet: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Strip the configured base path from a request path, yielding the
    /// pathname routes are matched against.
    pub fn resolve_pathname(&self, path: &str) -> String {
        if self.base != "/" {
            if let Some(rest) = path.strip_prefix(self.base.trim_end_matches('/')) {
                if rest.is_empty() {
                    return "/".to_string();
                }
                if rest.starts_with('/') {
                    return rest.to_string();
                }
            }
        }
        path.to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            base: "/".to_string(),
            is_production: false,
            is_dev: true,
            ssr: SsrConfig::default(),
            upstream: UpstreamConfig::default(),
            assets: AssetConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
