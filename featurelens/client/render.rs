use std::fmt::Write as _;

use crate::model::AnalysisResult;

/// Fixed note shown under the reduced-model metrics.
pub const REDUCED_MODEL_NOTE: &str =
    "Performance stays close to the full model, which shows the feature selection is effective.";

/// Renders an analysis result as an HTML fragment.
///
/// The fragment has four sections in fixed order: metadata with the
/// full-feature metrics, the ranked top features (reverse numbered from the
/// list length down to 1), the reduced-model metrics, and the complete
/// feature list in ascending importance. Server-supplied text is escaped.
#[must_use]
pub fn render_results(results: &AnalysisResult) -> String {
    let mut html = String::with_capacity(1024);
    render_initial_model(&mut html, results);
    render_top_features(&mut html, &results.top_10_features_desc);
    render_reduced_model(&mut html, results);
    render_feature_list(&mut html, &results.features_asc);
    html
}

fn render_initial_model(html: &mut String, results: &AnalysisResult) {
    let _ = write!(
        html,
        "<h3>Metadata and initial model</h3>\n\
         <p>Set sizes: {train} (training) / {validation} (validation)</p>\n\
         <h4>Metrics (model with all features):</h4>\n\
         <p><strong>Validation F1 score:</strong> <code>{f1_val}</code></p>\n\
         <p><strong>Training F1 score:</strong> <code>{f1_train}</code></p>\n\
         <hr>\n",
        train = results.train_size,
        validation = results.validation_size,
        f1_val = results.f1_score_validation,
        f1_train = results.f1_score_training,
    );
}

fn render_top_features(html: &mut String, features: &[String]) {
    html.push_str("<h3>Top 10 most relevant features:</h3>\n<ol reversed>\n");
    let count = features.len();
    for (index, feature) in features.iter().enumerate() {
        let _ = writeln!(
            html,
            "<li value=\"{}\"><strong>{}</strong></li>",
            count - index,
            escape_html(feature)
        );
    }
    html.push_str("</ol>\n");
}

fn render_reduced_model(html: &mut String, results: &AnalysisResult) {
    let _ = write!(
        html,
        "<hr>\n\
         <h3>Reduced model results (top 10 only)</h3>\n\
         <p>Validation F1 score (reduced): <code>{f1_val}</code></p>\n\
         <p>Training F1 score (reduced): <code>{f1_train}</code></p>\n\
         <p class=\"note\"><em>{note}</em></p>\n\
         <hr>\n",
        f1_val = results.f1_score_validation_reduced,
        f1_train = results.f1_score_training_reduced,
        note = REDUCED_MODEL_NOTE,
    );
}

fn render_feature_list(html: &mut String, features: &[String]) {
    html.push_str("<h3>Full feature list (least to most important):</h3>\n<ol>\n");
    for feature in features {
        let _ = writeln!(html, "<li>{}</li>", escape_html(feature));
    }
    html.push_str("</ol>\n");
}

/// Escapes text for use in HTML content and quoted attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_result;

    fn section<'a>(html: &'a str, heading: &str) -> &'a str {
        let start = html.find(heading).expect("heading present");
        let rest = &html[start..];
        let end = rest.find("</ol>").expect("list closed");
        &rest[..end]
    }

    #[test]
    fn sections_appear_in_order() {
        let html = render_results(&sample_result());
        let positions: Vec<usize> = [
            "Metadata and initial model",
            "Top 10 most relevant features",
            "Reduced model results",
            "Full feature list",
        ]
        .iter()
        .map(|heading| html.find(heading).unwrap())
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(html.contains("Set sizes: 700 (training) / 150 (validation)"));
        assert!(html.contains("<code>0.912</code>"));
        assert!(html.contains("<code>0.991</code>"));
        assert!(html.contains(REDUCED_MODEL_NOTE));
    }

    #[test]
    fn top_features_count_down_from_list_length() {
        let html = render_results(&sample_result());
        let top = section(&html, "Top 10 most relevant features");
        assert!(top.contains("<ol reversed>"));
        let items: Vec<&str> = top.lines().filter(|l| l.starts_with("<li")).collect();
        assert_eq!(
            items,
            vec![
                "<li value=\"3\"><strong>A</strong></li>",
                "<li value=\"2\"><strong>B</strong></li>",
                "<li value=\"1\"><strong>C</strong></li>",
            ]
        );
    }

    #[test]
    fn full_list_keeps_ascending_order() {
        let html = render_results(&sample_result());
        let full = section(&html, "Full feature list");
        let items: Vec<&str> = full.lines().filter(|l| l.starts_with("<li")).collect();
        assert_eq!(items, vec!["<li>x</li>", "<li>y</li>"]);
    }

    #[test]
    fn empty_lists_render_empty_ordered_lists() {
        let mut result = sample_result();
        result.top_10_features_desc.clear();
        result.features_asc.clear();
        let html = render_results(&result);
        assert!(!html.contains("<li"));
        assert_eq!(html.matches("</ol>").count(), 2);
    }

    #[test]
    fn server_text_is_escaped() {
        let mut result = sample_result();
        result.top_10_features_desc = vec!["<script>alert('x')</script>".into()];
        result.features_asc = vec!["a & \"b\"".into()];
        let html = render_results(&result);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("<li>a &amp; &quot;b&quot;</li>"));
    }
}
