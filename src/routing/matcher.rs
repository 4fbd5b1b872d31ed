//! Segment-wise route matching.
//!
//! # Responsibilities
//! - Compile path patterns into segment lists (`:name`, `:name?`, `*`)
//! - Match pathnames and extract named parameters by position
//! - Prefer child matches over the parent's own match
//!
//! # Design Decisions
//! - Trailing slashes are ignored ("/show/7/" matches "/show/7")
//! - A `*` segment swallows the rest of the path into the `wild` param
//! - Optional segments (`:name?`) may be absent entirely

use crate::routing::route::{Params, Route, RouteMatch};

/// One compiled pattern segment.
#[derive(Debug, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
    OptionalParam(String),
    Wildcard,
}

fn compile_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s == "*" {
                Segment::Wildcard
            } else if let Some(name) = s.strip_prefix(':') {
                if let Some(name) = name.strip_suffix('?') {
                    Segment::OptionalParam(name.to_string())
                } else {
                    Segment::Param(name.to_string())
                }
            } else {
                Segment::Literal(s.to_string())
            }
        })
        .collect()
}

/// Match a single pattern against a pathname, extracting named params.
fn match_pattern(pattern: &str, pathname: &str) -> Option<Params> {
    let segments = compile_pattern(pattern);
    let parts: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();

    let mut params = Params::new();
    let mut i = 0;

    for segment in &segments {
        match segment {
            Segment::Literal(lit) => {
                if parts.get(i) != Some(&lit.as_str()) {
                    return None;
                }
                i += 1;
            }
            Segment::Param(name) => {
                let part = parts.get(i)?;
                params.insert(name.clone(), (*part).to_string());
                i += 1;
            }
            Segment::OptionalParam(name) => {
                if let Some(part) = parts.get(i) {
                    params.insert(name.clone(), (*part).to_string());
                    i += 1;
                }
            }
            Segment::Wildcard => {
                params.insert("wild".to_string(), parts[i..].join("/"));
                i = parts.len();
            }
        }
    }

    if i == parts.len() {
        Some(params)
    } else {
        None
    }
}

/// Match a pathname against routes in declaration order; first match wins.
///
/// When a matching route declares children, they are tried against the same
/// pathname first, and a child match is preferred over the parent's own.
/// Deterministic and side-effect-free: repeated calls with identical input
/// yield identical output.
pub fn match_route(pathname: &str, routes: &[Route]) -> Option<RouteMatch> {
    for route in routes {
        if let Some(params) = match_pattern(&route.path, pathname) {
            if !route.children.is_empty() {
                if let Some(child) = match_route(pathname, &route.children) {
                    return Some(child);
                }
            }

            return Some(RouteMatch {
                path: route.path.clone(),
                target: route.target.clone(),
                loader: route.loader,
                params,
                pathname: pathname.to_string(),
            });
        }
    }

    None
}
