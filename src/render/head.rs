//! Head metadata container.
//!
//! Populated as a side effect during rendering (titles, meta tags, links,
//! scripts set by whichever target is drawing the page) and serialized into
//! the document head once streaming begins. This is the one intentionally
//! shared mutable slot within a single request's lifecycle; it is never
//! shared across requests.

use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct HeadMeta {
    title: Option<String>,
    metas: Vec<(String, String)>,
    links: Vec<(String, String)>,
    scripts: Vec<String>,
}

/// Cloneable handle to a per-request head metadata container.
#[derive(Debug, Clone, Default)]
pub struct HeadHandle {
    inner: Arc<Mutex<HeadMeta>>,
}

impl HeadHandle {
    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().title = Some(title.into());
    }

    pub fn add_meta(&self, name: impl Into<String>, content: impl Into<String>) {
        self.lock().metas.push((name.into(), content.into()));
    }

    pub fn add_link(&self, rel: impl Into<String>, href: impl Into<String>) {
        self.lock().links.push((rel.into(), href.into()));
    }

    pub fn add_script(&self, src: impl Into<String>) {
        self.lock().scripts.push(src.into());
    }

    /// Serialize the accumulated metadata as head markup.
    pub fn to_markup(&self) -> String {
        let meta = self.lock();
        let mut out = String::new();

        if let Some(title) = &meta.title {
            out.push_str("<title>");
            out.push_str(&escape_text(title));
            out.push_str("</title>");
        }
        for (name, content) in &meta.metas {
            out.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                escape_attr(name),
                escape_attr(content)
            ));
        }
        for (rel, href) in &meta.links {
            out.push_str(&format!(
                r#"<link rel="{}" href="{}">"#,
                escape_attr(rel),
                escape_attr(href)
            ));
        }
        for src in &meta.scripts {
            out.push_str(&format!(r#"<script src="{}"></script>"#, escape_attr(src)));
        }

        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeadMeta> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(input: &str) -> String {
    escape_text(input).replace('"', "&quot;")
}
