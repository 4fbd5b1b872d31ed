//! Route definitions.

use std::collections::HashMap;

use crate::data::LoaderFn;

/// Named path parameters extracted by the matcher.
pub type Params = HashMap<String, String>;

/// A registered route: a path pattern, the id of the render target that
/// draws it, an optional data loader, and optional nested child routes.
#[derive(Debug, Clone)]
pub struct Route {
    /// Path pattern with named segments, e.g. `/show/:id`.
    pub path: String,

    /// Render target id, resolved against the server's target registry.
    pub target: String,

    /// Loader invoked before rendering to preload this route's data.
    pub loader: Option<LoaderFn>,

    /// Child routes, matched against the same pathname before the parent
    /// yields itself.
    pub children: Vec<Route>,
}

impl Route {
    pub fn new(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            loader: None,
            children: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: LoaderFn) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }
}

/// Result of matching a pathname: the matched route's own fields (children
/// play no further part once matching is done) plus the extracted params.
///
/// Created once per request, immutable afterwards.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Pattern of the route that matched.
    pub path: String,

    /// Render target id of the matched route.
    pub target: String,

    /// Loader of the matched route, if any.
    pub loader: Option<LoaderFn>,

    /// Extracted named parameters.
    pub params: Params,

    /// The pathname that was matched.
    pub pathname: String,
}
