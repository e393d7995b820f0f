//! Sample figures pushed by `grimoireplot push-samples`.

use grimoire_client::Figure;
use serde_json::json;

/// One sample: `(chapter, plot name, figure)`.
pub type Sample = (&'static str, &'static str, Figure);

pub fn sample_plots() -> Vec<Sample> {
    vec![
        ("Basic Plots", "Line Plot", line_plot()),
        ("Basic Plots", "Bar Plot", bar_plot()),
        ("Basic Plots", "Area Plot", area_plot()),
        ("Distributions", "Scatter Plot", scatter_plot()),
        ("Distributions", "Histogram", histogram()),
        ("Distributions", "Box Plot", box_plot()),
        ("Categories", "Pie Chart", pie_chart()),
        ("Categories", "Heatmap", heatmap()),
    ]
}

fn axis_titles(figure: Figure, x: &str, y: &str) -> Figure {
    figure
        .layout_entry("xaxis", json!({ "title": { "text": x } }))
        .layout_entry("yaxis", json!({ "title": { "text": y } }))
}

fn line_plot() -> Figure {
    let figure = Figure::new()
        .trace(json!({"type": "scatter", "x": [1, 2, 3, 4], "y": [10, 11, 12, 13], "mode": "lines+markers", "name": "Line 1"}))
        .trace(json!({"type": "scatter", "x": [1, 2, 3, 4], "y": [16, 15, 14, 13], "mode": "lines+markers", "name": "Line 2"}))
        .title("Sample Line Plot");
    axis_titles(figure, "X Axis", "Y Axis")
}

fn bar_plot() -> Figure {
    let categories = json!(["Category A", "Category B", "Category C"]);
    let figure = Figure::new()
        .trace(json!({"type": "bar", "x": categories, "y": [20, 14, 23], "name": "Series 1"}))
        .trace(json!({"type": "bar", "x": categories, "y": [12, 18, 29], "name": "Series 2"}))
        .title("Sample Bar Plot");
    axis_titles(figure, "Categories", "Values")
}

fn area_plot() -> Figure {
    let figure = Figure::new()
        .trace(json!({"type": "scatter", "x": [1, 2, 3, 4], "y": [0, 2, 3, 5], "fill": "tozeroy", "name": "Area 1"}))
        .trace(json!({"type": "scatter", "x": [1, 2, 3, 4], "y": [3, 5, 1, 7], "fill": "tonexty", "name": "Area 2"}))
        .title("Sample Area Plot");
    axis_titles(figure, "X", "Y")
}

fn scatter_plot() -> Figure {
    let figure = Figure::new()
        .trace(json!({
            "type": "scatter",
            "x": [1, 2, 3, 4, 5],
            "y": [1, 4, 9, 16, 25],
            "mode": "markers",
            "marker": {"size": 10, "color": "blue"},
            "name": "Quadratic"
        }))
        .title("Sample Scatter Plot");
    axis_titles(figure, "X", "Y")
}

fn histogram() -> Figure {
    let figure = Figure::new()
        .trace(json!({"type": "histogram", "x": [1, 1, 2, 3, 3, 3, 4, 4, 5], "name": "Data"}))
        .title("Sample Histogram");
    axis_titles(figure, "Value", "Frequency")
}

fn box_plot() -> Figure {
    Figure::new()
        .trace(json!({"type": "box", "y": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10], "name": "Box 1"}))
        .trace(json!({"type": "box", "y": [2, 3, 4, 5, 6, 7, 8, 9, 10, 11], "name": "Box 2"}))
        .title("Sample Box Plot")
        .layout_entry("yaxis", json!({ "title": { "text": "Values" } }))
}

fn pie_chart() -> Figure {
    Figure::new()
        .trace(json!({"type": "pie", "labels": ["A", "B", "C", "D"], "values": [15, 30, 45, 10], "name": "Pie"}))
        .title("Sample Pie Chart")
}

fn heatmap() -> Figure {
    Figure::new()
        .trace(json!({
            "type": "heatmap",
            "z": [[1, 2, 3], [4, 5, 6], [7, 8, 9]],
            "x": ["A", "B", "C"],
            "y": ["X", "Y", "Z"]
        }))
        .title("Sample Heatmap")
}
