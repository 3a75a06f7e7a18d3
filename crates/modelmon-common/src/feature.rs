use serde::{Deserialize, Serialize};

/// Distribution summary recorded for a feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeatureStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Histogram as `[counts, bin_edges]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hist: Option<(Vec<f64>, Vec<f64>)>,
}

/// One model input feature as recorded by the monitoring stream.
///
/// Unknown fields are rejected so that a schema drift in the stored
/// attribute shows up as a decode error instead of silently losing data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<FeatureStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<FeatureStats>,
}
