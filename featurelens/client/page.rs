//! Standalone page hosting the analysis form and its three panels.

use std::fmt::Write as _;

use crate::{
    config::ElementIds,
    render::escape_html,
    surface::{Panel, PanelContent, PanelState, SurfaceSnapshot},
};

const PAGE_CSS: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
.hidden{display:none}\
#error-message{color:#b00020}\
.note{color:#555}\
code{background:#f3f3f3;padding:0 .25rem}";

/// Renders a complete HTML document reflecting the given surface state.
///
/// Panels keep their visibility through the configured hidden class; text
/// content is escaped, rendered result markup is embedded as is.
#[must_use]
pub fn render_page(snapshot: &SurfaceSnapshot, ids: &ElementIds) -> String {
    let mut html = String::with_capacity(2048);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>Feature selection analysis</title>\n<style>{css}</style>\n</head>\n<body>\n\
         <h1>Feature selection analysis</h1>\n\
         <form id=\"{form}\">\n\
         <label for=\"{input}\">Training set percentage</label>\n\
         <input type=\"number\" id=\"{input}\" name=\"{input}\" \
         min=\"1\" max=\"100\" step=\"any\" value=\"{value}\" required>\n\
         <button type=\"submit\">Analyze</button>\n\
         </form>\n",
        css = PAGE_CSS,
        form = escape_html(&ids.form),
        input = escape_html(&ids.percentage),
        value = escape_html(&snapshot.percentage),
    );
    for panel in [Panel::Loading, Panel::Error, Panel::Results] {
        render_panel(&mut html, panel, snapshot.panel(panel), ids);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_panel(html: &mut String, panel: Panel, state: &PanelState, ids: &ElementIds) {
    let class = if state.hidden {
        format!(" class=\"{}\"", escape_html(&ids.hidden_class))
    } else {
        String::new()
    };
    let body = match (&state.content, panel) {
        (PanelContent::Empty, Panel::Loading) => "Running analysis...".to_string(),
        (PanelContent::Empty, _) => String::new(),
        (PanelContent::Text(text), _) => escape_html(text),
        (PanelContent::Html(markup), _) => markup.clone(),
    };
    let _ = writeln!(
        html,
        "<div id=\"{}\"{class}>{body}</div>",
        escape_html(panel.element_id(ids))
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DocumentSurface, MemorySurface};

    #[test]
    fn idle_page_hides_every_panel() {
        let surface = MemorySurface::with_percentage("70");
        let page = render_page(&surface.snapshot(), &ElementIds::default());
        assert!(page.contains("<form id=\"analysis-form\">"));
        assert!(page.contains("id=\"percentage\""));
        assert!(page.contains("value=\"70\""));
        assert!(page.contains("<div id=\"loading\" class=\"hidden\">"));
        assert!(page.contains("<div id=\"results\" class=\"hidden\"></div>"));
        assert!(page.contains("<div id=\"error-message\" class=\"hidden\"></div>"));
    }

    #[test]
    fn error_text_is_escaped_and_visible() {
        let surface = MemorySurface::default();
        surface.set_text(Panel::Error, "Error 400: <bad> input.");
        surface.show(Panel::Error);
        let page = render_page(&surface.snapshot(), &ElementIds::default());
        assert!(page.contains("<div id=\"error-message\">Error 400: &lt;bad&gt; input.</div>"));
    }

    #[test]
    fn custom_ids_and_class_are_used() {
        let ids = ElementIds {
            results: "output".into(),
            hidden_class: "is-hidden".into(),
            ..ElementIds::default()
        };
        let surface = MemorySurface::default();
        surface.set_html(Panel::Results, "<ol><li>x</li></ol>");
        let page = render_page(&surface.snapshot(), &ids);
        assert!(page.contains("<div id=\"output\" class=\"is-hidden\"><ol><li>x</li></ol></div>"));
    }
}
