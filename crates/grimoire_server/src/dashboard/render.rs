//! Server-side HTML rendering of dashboard regions.
//!
//! Each region renders to one root element carrying `data-region` plus the
//! names that identify it, so the browser can swap it in place.

use grimoire_core::{Chapter, Grimoire, Plot};
use serde_json::{json, Map, Value};
use std::fmt::Write;

/// Renders the whole dashboard region: grimoire tabs plus one panel each.
pub fn render_dashboard(grimoires: &[Grimoire]) -> String {
    let mut html = String::from(r#"<div class="dashboard" data-region="dashboard">"#);
    if grimoires.is_empty() {
        html.push_str(
            r#"<div class="empty-state"><h2>No grimoires yet</h2><p>Push a plot to <code>/add_plot</code> to get started.</p></div>"#,
        );
        html.push_str("</div>");
        return html;
    }

    html.push_str(r#"<nav class="tabs grimoire-tabs">"#);
    for grimoire in grimoires {
        let name = escape_html(&grimoire.name);
        let _ = write!(
            html,
            r#"<button class="tab" type="button" data-tab-grimoire="{name}">{name}<span class="delete-badge" role="button" title="Delete grimoire" data-delete-grimoire="{name}">&times;</span></button>"#
        );
    }
    html.push_str("</nav>");

    for grimoire in grimoires {
        html.push_str(&render_grimoire(grimoire));
    }
    html.push_str("</div>");
    html
}

/// Renders one grimoire region: chapter tabs plus one panel each.
pub fn render_grimoire(grimoire: &Grimoire) -> String {
    let name = escape_html(&grimoire.name);
    let mut html = format!(
        r#"<section class="grimoire-panel" data-region="grimoire" data-grimoire="{name}">"#
    );

    if grimoire.chapters.is_empty() {
        html.push_str(r#"<div class="empty-state"><p>No chapters in this grimoire</p></div>"#);
        html.push_str("</section>");
        return html;
    }

    html.push_str(r#"<nav class="tabs chapter-tabs">"#);
    for chapter in &grimoire.chapters {
        let _ = write!(
            html,
            r#"<button class="tab" type="button" data-tab-chapter="{chapter_name}">{chapter_name}<span class="delete-badge" role="button" title="Delete chapter" data-delete-grimoire="{name}" data-delete-chapter="{chapter_name}">&times;</span></button>"#,
            chapter_name = escape_html(&chapter.name),
        );
    }
    html.push_str("</nav>");

    for chapter in &grimoire.chapters {
        html.push_str(&render_chapter(chapter));
    }
    html.push_str("</section>");
    html
}

/// Renders one chapter region: the grid of plot cards.
pub fn render_chapter(chapter: &Chapter) -> String {
    let mut html = format!(
        r#"<div class="chapter-panel" data-region="chapter" data-grimoire="{}" data-chapter="{}">"#,
        escape_html(&chapter.grimoire_name),
        escape_html(&chapter.name)
    );

    if chapter.plots.is_empty() {
        html.push_str(r#"<div class="empty-state"><p>No plots in this chapter</p></div>"#);
    } else {
        html.push_str(r#"<div class="plot-grid">"#);
        for plot in &chapter.plots {
            html.push_str(&render_plot(plot));
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

/// Renders one plot card. Unparseable payloads become a placeholder.
pub fn render_plot(plot: &Plot) -> String {
    let name = escape_html(&plot.name);
    match themed_figure(&plot.json_data) {
        Some(figure) => format!(
            r#"<figure class="plot-card"><figcaption>{name}</figcaption><div class="plot-target"></div><script type="application/json" class="plot-data">{}</script></figure>"#,
            embed_json(&figure)
        ),
        None => format!(
            r#"<figure class="plot-card plot-invalid"><figcaption>{name}</figcaption><div class="invalid-data">Invalid data</div></figure>"#
        ),
    }
}

/// Parses a stored payload and fills in dark-theme layout defaults.
///
/// Returns `None` when the payload is not a JSON object or its `layout` is
/// not an object. Keys the producer already set are left untouched.
pub fn themed_figure(json_data: &str) -> Option<Value> {
    let mut figure: Value = serde_json::from_str(json_data).ok()?;
    let root = figure.as_object_mut()?;
    let layout = root
        .entry("layout")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()?;
    apply_theme_defaults(layout);
    Some(figure)
}

fn apply_theme_defaults(layout: &mut Map<String, Value>) {
    set_default(layout, "paper_bgcolor", json!("rgba(0,0,0,0)"));
    set_default(layout, "plot_bgcolor", json!("rgba(26, 26, 46, 0.3)"));
    set_default(layout, "font", json!({ "color": "#94A3B8" }));
    set_default(layout, "height", json!(400));
    set_default(layout, "transition", json!({ "duration": 0 }));

    for axis in ["xaxis", "yaxis"] {
        let entry = layout
            .entry(axis)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(axis) = entry.as_object_mut() {
            set_default(axis, "gridcolor", json!("rgba(139, 92, 246, 0.1)"));
            set_default(axis, "linecolor", json!("rgba(139, 92, 246, 0.3)"));
            set_default(axis, "tickcolor", json!("#64748B"));
        }
    }

    set_default(
        layout,
        "legend",
        json!({
            "bgcolor": "rgba(26, 26, 46, 0.8)",
            "bordercolor": "rgba(139, 92, 246, 0.2)",
            "font": { "color": "#94A3B8" },
        }),
    );
}

fn set_default(map: &mut Map<String, Value>, key: &str, value: Value) {
    map.entry(key).or_insert(value);
}

/// Serializes `value` for a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where the `\uXXXX`
/// forms are equivalent, so `</script>` can never close the element early.
pub fn embed_json(value: &Value) -> String {
    let mut out = String::new();
    for ch in value.to_string().chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
