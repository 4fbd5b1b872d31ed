//! Semantic configuration checks, separate from serde-level parsing.

use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic violation found in a parsed config.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("base must start with '/': {0:?}")]
    BadBase(String),

    #[error("upstream.url is not a valid URL: {0}")]
    BadUpstreamUrl(String),

    #[error("ssr.abort_delay_ms must be greater than zero")]
    ZeroAbortDelay,

    #[error("assets.template_path must not be empty")]
    EmptyTemplatePath,
}

/// Validate a parsed configuration. Returns every violation found, not just
/// the first.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.base.starts_with('/') {
        errors.push(ValidationError::BadBase(config.base.clone()));
    }

    if Url::parse(&config.upstream.url).is_err() {
        errors.push(ValidationError::BadUpstreamUrl(config.upstream.url.clone()));
    }

    if config.ssr.abort_delay_ms == 0 {
        errors.push(ValidationError::ZeroAbortDelay);
    }

    if config.assets.template_path.is_empty() {
        errors.push(ValidationError::EmptyTemplatePath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
