use modelmon_common::Metric;
use modelmon_store::{FilterExpression, Frame, Predicate, TsdbQuery, TsdbStore};

use crate::error::ApiError;

pub const ENDPOINT_EVENTS_TABLE: &str = "endpoint-events";
pub const DEFAULT_METRICS: &[&str] = &["predictions", "latency"];
pub const DEFAULT_START: &str = "now-1h";
pub const DEFAULT_END: &str = "now";

/// Metrics the events table can answer, keyed by their public names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMetric {
    AverageLatency,
    PredictionsPerSecond,
}

impl TimeMetric {
    pub fn from_name(name: &str) -> Result<Self, ApiError> {
        match name {
            "microsec" | "latency" => Ok(TimeMetric::AverageLatency),
            "preds" | "predictions" => Ok(TimeMetric::PredictionsPerSecond),
            other => Err(ApiError::InvalidArgument(format!(
                "Unsupported metric '{other}'"
            ))),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            TimeMetric::AverageLatency => "latency_avg_1s",
            TimeMetric::PredictionsPerSecond => "predictions_per_second_count_1s",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeMetric::AverageLatency => "average_latency",
            TimeMetric::PredictionsPerSecond => "predictions_per_second",
        }
    }

    pub fn headers(self) -> [&'static str; 2] {
        match self {
            TimeMetric::AverageLatency => ["timestamp", "average"],
            TimeMetric::PredictionsPerSecond => ["timestamp", "count"],
        }
    }

    /// `None` when the frame holds no data for this metric. `NaN` cells
    /// (rows where the metric had no sample) are skipped.
    pub fn summarize(self, frame: &Frame) -> Option<Metric> {
        if frame.is_empty() {
            return None;
        }
        let column = frame.column(self.column())?;

        let values: Vec<(String, f64)> = frame
            .index
            .iter()
            .zip(column)
            .filter(|(_, v)| !v.is_nan())
            .map(|(ts, v)| (ts.clone(), *v))
            .collect();
        if values.is_empty() {
            return None;
        }

        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for (_, v) in &values {
            min = min.min(*v);
            max = max.max(*v);
            sum += v;
        }

        Some(Metric {
            name: self.label().to_string(),
            start_timestamp: frame.index[0].clone(),
            end_timestamp: frame.index[frame.index.len() - 1].clone(),
            headers: self.headers().iter().map(|h| h.to_string()).collect(),
            min,
            avg: sum / values.len() as f64,
            max,
            values,
        })
    }
}

/// Time window, passed to the store untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
        }
    }
}

/// Query the events table for one endpoint and summarize each requested
/// metric, in request order. Metrics without data are left out.
pub async fn extract_metrics(
    tsdb: &dyn TsdbStore,
    container: &str,
    project: &str,
    endpoint_id: &str,
    names: &[String],
    range: &TimeRange,
) -> Result<Vec<Metric>, ApiError> {
    if names.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Metric names must be provided".to_string(),
        ));
    }
    let metrics = names
        .iter()
        .map(|n| TimeMetric::from_name(n))
        .collect::<Result<Vec<_>, _>>()?;

    // endpoint_id must be selected for the filter to apply
    let mut columns = vec!["endpoint_id".to_string()];
    columns.extend(metrics.iter().map(|m| m.column().to_string()));

    let query = TsdbQuery {
        container: container.to_string(),
        backend: "tsdb".to_string(),
        table: format!("{project}/{ENDPOINT_EVENTS_TABLE}"),
        columns,
        filter: FilterExpression::new().and(Predicate::equals("endpoint_id", endpoint_id)),
        start: range.start.clone(),
        end: range.end.clone(),
    };
    let frame = tsdb.read(&query).await?;
    tracing::debug!(endpoint_id, rows = frame.index.len(), "read endpoint metrics");

    Ok(metrics.iter().filter_map(|m| m.summarize(&frame)).collect())
}
