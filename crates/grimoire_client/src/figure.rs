use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimal Plotly figure: a list of traces plus a layout object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Map<String, Value>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one trace, e.g. `json!({"type": "bar", "x": [...], "y": [...]})`.
    pub fn trace(mut self, trace: Value) -> Self {
        self.data.push(trace);
        self
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.layout_entry("title", serde_json::json!({ "text": title.into() }))
    }

    /// Sets one top-level layout key, replacing any previous value.
    pub fn layout_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.layout.insert(key.into(), value);
        self
    }
}
