use kb_markup::{escape_html, render_html};
use tracing::warn;

use crate::document::DocumentId;

/// Converts raw markup to HTML. Must be pure: the rendered cache is written
/// from it without coordination.
pub trait Renderer: Send + Sync {
    fn render(&self, markup: &str, locale: &str, doc_id: DocumentId) -> String;
}

/// Default renderer backed by `kb-markup`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupRenderer;

impl Renderer for MarkupRenderer {
    fn render(&self, markup: &str, locale: &str, doc_id: DocumentId) -> String {
        let body = match render_html(markup) {
            Ok(html) => html,
            Err(err) => {
                warn!(document_id = %doc_id, error = %err, "markup did not lex; rendering as text");
                format!("<pre>{}</pre>\n", escape_html(markup))
            }
        };
        format!(
            "<div class=\"document\" lang=\"{}\">\n{body}</div>",
            escape_html(locale)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_rendered_body_with_locale() {
        let html = MarkupRenderer.render("Hello", "de", DocumentId(1));
        assert_eq!(html, "<div class=\"document\" lang=\"de\">\n<p>Hello</p>\n</div>");
    }

    #[test]
    fn falls_back_to_escaped_text() {
        let html = MarkupRenderer.render("broken [[link", "en-US", DocumentId(1));
        assert!(html.contains("<pre>broken [[link</pre>"));
    }
}
