//! Build manifest lookup.
//!
//! In production the global stylesheet is referenced by its content-hashed
//! filename, resolved through the build manifest (source asset path →
//! emitted files). The manifest is optional: load failures log a warning
//! and the feature degrades to emitting nothing.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    css: Vec<String>,
}

/// Read-only mapping from source asset paths to their built outputs.
#[derive(Debug, Default)]
pub struct AssetManifest {
    entries: HashMap<String, ManifestEntry>,
}

impl AssetManifest {
    /// Empty manifest; used in development and when loading fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from disk. Never fails: an unreadable or malformed manifest
    /// logs a warning and yields an empty map.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read build manifest");
                return Self::empty();
            }
        };

        match Self::parse(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not parse build manifest");
                Self::empty()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        let entries = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Hashed CSS filenames for a source asset. Leading slashes on the key
    /// are ignored; an unknown asset yields an empty slice.
    pub fn css_for(&self, asset: &str) -> &[String] {
        let key = asset.trim_start_matches('/');
        self.entries
            .get(key)
            .map(|entry| entry.css.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"{
        "src/app/global.css": { "css": ["assets/global-B2x9.css"] },
        "src/client-entry.tsx": { "file": "assets/client-Dk41.js" }
    }"#;

    #[test]
    fn test_css_lookup_strips_leading_slash() {
        let manifest = AssetManifest::parse(MANIFEST).unwrap();
        assert_eq!(
            manifest.css_for("/src/app/global.css"),
            ["assets/global-B2x9.css".to_string()]
        );
    }

    #[test]
    fn test_unknown_asset_is_empty_not_fatal() {
        let manifest = AssetManifest::parse(MANIFEST).unwrap();
        assert!(manifest.css_for("src/missing.css").is_empty());
    }

    #[test]
    fn test_entry_without_css_field() {
        let manifest = AssetManifest::parse(MANIFEST).unwrap();
        assert!(manifest.css_for("src/client-entry.tsx").is_empty());
    }

    #[test]
    fn test_load_failure_degrades_to_empty() {
        let manifest = AssetManifest::load(Path::new("/nonexistent/manifest.json"));
        assert!(manifest.is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let manifest = AssetManifest::load(file.path());
        assert!(manifest.is_empty());
    }
}
