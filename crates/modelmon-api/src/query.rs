//! Query-string parsing for the endpoint routes.
//!
//! Handlers receive the raw `(name, value)` pairs so repeated parameters such
//! as `label` survive; scalar parameters keep their last occurrence.

use crate::endpoint_metrics::{TimeMetric, TimeRange, DEFAULT_METRICS};
use crate::error::ApiError;
use crate::filters::split_label_values;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub model: Option<String>,
    pub function: Option<String>,
    pub tag: Option<String>,
    pub labels: Vec<String>,
    pub range: TimeRange,
    /// Metric names to attach to every endpoint; `None` attaches none.
    pub metrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetQuery {
    pub range: TimeRange,
    pub metrics: Option<Vec<String>>,
    pub features: bool,
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ApiError::InvalidArgument(format!(
            "query parameter '{name}' expects a boolean, got '{value}'"
        ))),
    }
}

/// `metrics` is either a boolean (default metric set) or a comma-separated
/// list of metric names. Names are validated here so that a bad or empty
/// list fails before any store access.
fn parse_metrics(value: &str) -> Result<Option<Vec<String>>, ApiError> {
    if let Ok(enabled) = parse_bool("metrics", value) {
        return Ok(enabled.then(|| DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()));
    }
    let names: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Metric names must be provided".to_string(),
        ));
    }
    for name in &names {
        TimeMetric::from_name(name)?;
    }
    Ok(Some(names))
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Empty values keep the default bound.
fn set_range(range: &mut TimeRange, key: &str, value: &str) -> bool {
    let slot = match key {
        "start" => &mut range.start,
        "end" => &mut range.end,
        _ => return false,
    };
    if let Some(v) = non_empty(value) {
        *slot = v;
    }
    true
}

impl ListQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut q = ListQuery::default();
        let mut labels = Vec::new();
        for (key, value) in pairs {
            match key.as_str() {
                "model" => q.model = non_empty(value),
                "function" => q.function = non_empty(value),
                "tag" => q.tag = non_empty(value),
                "label" => labels.push(value.as_str()),
                "metrics" => q.metrics = parse_metrics(value)?,
                k if set_range(&mut q.range, k, value) => {}
                other => tracing::debug!(param = other, "ignoring unknown query parameter"),
            }
        }
        q.labels = split_label_values(labels);
        Ok(q)
    }
}

impl GetQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut q = GetQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "metrics" => q.metrics = parse_metrics(value)?,
                "features" => q.features = parse_bool("features", value)?,
                k if set_range(&mut q.range, k, value) => {}
                other => tracing::debug!(param = other, "ignoring unknown query parameter"),
            }
        }
        Ok(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_list_defaults() {
        let q = ListQuery::from_pairs(&[]).unwrap();
        assert_eq!(q, ListQuery::default());
        assert_eq!(q.range.start, "now-1h");
        assert_eq!(q.range.end, "now");
        assert!(q.metrics.is_none());
    }

    #[test]
    fn test_list_labels_repeat_and_comma() {
        let q = ListQuery::from_pairs(&pairs(&[
            ("label", "a=1,b"),
            ("model", "xgb"),
            ("label", "c"),
            ("tag", ""),
        ]))
        .unwrap();
        assert_eq!(q.labels, vec!["a=1", "b", "c"]);
        assert_eq!(q.model.as_deref(), Some("xgb"));
        assert_eq!(q.tag, None);
    }

    #[test]
    fn test_metrics_forms() {
        let q = ListQuery::from_pairs(&pairs(&[("metrics", "true")])).unwrap();
        assert_eq!(q.metrics, Some(vec!["predictions".to_string(), "latency".to_string()]));

        let q = ListQuery::from_pairs(&pairs(&[("metrics", "false")])).unwrap();
        assert_eq!(q.metrics, None);

        let q = ListQuery::from_pairs(&pairs(&[("metrics", "latency, preds")])).unwrap();
        assert_eq!(q.metrics, Some(vec!["latency".to_string(), "preds".to_string()]));

        assert!(matches!(
            ListQuery::from_pairs(&pairs(&[("metrics", "latency,bogus")])),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_metrics_separators_only_is_rejected() {
        for raw in [",", " , ,", ",,"] {
            assert!(
                matches!(
                    GetQuery::from_pairs(&pairs(&[("metrics", raw)])),
                    Err(ApiError::InvalidArgument(ref m)) if m == "Metric names must be provided"
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_get_query() {
        let q = GetQuery::from_pairs(&pairs(&[
            ("start", "now-6h"),
            ("end", "2024-05-01T00:00:00Z"),
            ("features", "TRUE"),
            ("metrics", "1"),
        ]))
        .unwrap();
        assert!(q.features);
        assert_eq!(q.range.start, "now-6h");
        assert_eq!(q.range.end, "2024-05-01T00:00:00Z");
        assert_eq!(q.metrics.map(|m| m.len()), Some(2));

        assert!(matches!(
            GetQuery::from_pairs(&pairs(&[("features", "maybe")])),
            Err(ApiError::InvalidArgument(_))
        ));
    }
}
