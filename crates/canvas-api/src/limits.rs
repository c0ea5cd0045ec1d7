use serde::{Deserialize, Serialize};

/// Bounds applied while admitting untrusted documents and styles.
///
/// Deserializable so deployments can tune them from configuration; missing
/// fields keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// Nodes admitted per document; later nodes are dropped
    pub max_nodes: usize,
    /// Deepest nesting level admitted (top level is depth 0)
    pub max_depth: usize,
    pub max_id_length: usize,
    /// Largest absolute coordinate or size
    pub max_coord: f64,
    /// Entries considered per style map
    pub max_style_items: usize,
    /// Longest style value accepted, after trimming
    pub max_style_value_len: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_nodes: 2000,
            max_depth: 32,
            max_id_length: 120,
            max_coord: 1_000_000.0,
            max_style_items: 64,
            max_style_value_len: 256,
        }
    }
}
