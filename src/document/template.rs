//! Template splitting.
//!
//! The static HTML template is partitioned at two sentinel markers into the
//! three spans the assembler writes around the stream: everything before
//! the head marker, everything between the markers, and everything after
//! the body marker. Both markers must appear exactly once and in order;
//! anything else is a fatal configuration error caught at setup, before any
//! request is served.

/// Marker replaced by head metadata and style injections.
pub const HEAD_MARKER: &str = "<!--app-head-->";

/// Marker replaced by the streamed application markup.
pub const BODY_MARKER: &str = "<!--app-html-->";

/// Error type for template validation.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template is missing marker {0}")]
    MissingMarker(&'static str),

    #[error("template contains marker {0} more than once")]
    DuplicateMarker(&'static str),

    #[error("head marker must appear before body marker")]
    MarkerOrder,
}

/// The three spans of a split template.
#[derive(Debug, Clone)]
pub struct TemplateSplit {
    /// Everything before the head marker.
    pub html_start: String,

    /// Everything between the two markers.
    pub body_start: String,

    /// Everything after the body marker.
    pub html_end: String,
}

impl TemplateSplit {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let head = marker_position(template, HEAD_MARKER)?;
        let body = marker_position(template, BODY_MARKER)?;

        if body < head {
            return Err(TemplateError::MarkerOrder);
        }

        Ok(Self {
            html_start: template[..head].to_string(),
            body_start: template[head + HEAD_MARKER.len()..body].to_string(),
            html_end: template[body + BODY_MARKER.len()..].to_string(),
        })
    }
}

fn marker_position(template: &str, marker: &'static str) -> Result<usize, TemplateError> {
    let mut positions = template.match_indices(marker);
    let first = positions
        .next()
        .ok_or(TemplateError::MissingMarker(marker))?;
    if positions.next().is_some() {
        return Err(TemplateError::DuplicateMarker(marker));
    }
    Ok(first.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<html><head><!--app-head--></head><body><div id=\"root\"><!--app-html--></div></body></html>";

    #[test]
    fn test_split_spans() {
        let split = TemplateSplit::parse(TEMPLATE).unwrap();

        assert_eq!(split.html_start, "<html><head>");
        assert_eq!(split.body_start, "</head><body><div id=\"root\">");
        assert_eq!(split.html_end, "</div></body></html>");
    }

    #[test]
    fn test_reassembly_preserves_offsets() {
        let split = TemplateSplit::parse(TEMPLATE).unwrap();
        let document = format!(
            "{}{}{}{}{}",
            split.html_start, "<title>t</title>", split.body_start, "<p>app</p>", split.html_end
        );

        assert_eq!(
            document,
            "<html><head><title>t</title></head><body><div id=\"root\"><p>app</p></div></body></html>"
        );
    }

    #[test]
    fn test_missing_head_marker() {
        let err = TemplateSplit::parse("<html><!--app-html--></html>").unwrap_err();
        assert!(matches!(err, TemplateError::MissingMarker(HEAD_MARKER)));
    }

    #[test]
    fn test_missing_body_marker() {
        let err = TemplateSplit::parse("<html><!--app-head--></html>").unwrap_err();
        assert!(matches!(err, TemplateError::MissingMarker(BODY_MARKER)));
    }

    #[test]
    fn test_duplicate_marker() {
        let err = TemplateSplit::parse("<!--app-head--><!--app-head--><!--app-html-->").unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateMarker(HEAD_MARKER)));
    }

    #[test]
    fn test_marker_order_enforced() {
        let err = TemplateSplit::parse("<!--app-html--><!--app-head-->").unwrap_err();
        assert!(matches!(err, TemplateError::MarkerOrder));
    }
}
