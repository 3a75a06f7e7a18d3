use serde::{Deserialize, Serialize};

/// Time-windowed summary of one monitored series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    /// Column names for each entry of `values`, e.g. `["timestamp", "average"]`.
    pub headers: Vec<String>,
    pub values: Vec<(String, f64)>,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}
