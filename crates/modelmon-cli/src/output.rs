use std::collections::BTreeMap;

use modelmon_common::{Feature, FeatureStats, Metric, ModelEndpointState};

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return "-".to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn print_endpoints(project: &str, endpoints: &[ModelEndpointState]) {
    println!("\n=== Model Endpoints ({project}) ===");
    if endpoints.is_empty() {
        println!("  (No model endpoints found)");
        println!();
        return;
    }

    println!(
        "  {:<36} {:<24} {:<16} {:<8} {:<6} {:<14} {:<20}",
        "Endpoint ID", "Model", "Function", "Tag", "Errors", "Drift", "Labels"
    );
    println!("  {:-<130}", "");
    for ep in endpoints {
        println!(
            "  {:<36} {:<24} {:<16} {:<8} {:<6} {:<14} {:<20}",
            ep.id,
            or_na(ep.endpoint.spec.model.as_deref()),
            or_na(ep.endpoint.spec.function.as_deref()),
            or_na(ep.endpoint.metadata.tag.as_deref()),
            count(ep.error_count),
            or_na(ep.drift_status.as_deref()),
            format_labels(&ep.endpoint.metadata.labels),
        );
        if let Some(metrics) = &ep.metrics {
            for m in metrics {
                println!("      {}", metric_summary(m));
            }
        }
    }
    println!();
}

pub fn print_endpoint_detail(ep: &ModelEndpointState) {
    let spec = &ep.endpoint.spec;
    let meta = &ep.endpoint.metadata;

    println!("\n=== Model Endpoint {} ===", ep.id);
    println!("  {:<16} {}", "Project", meta.project);
    println!("  {:<16} {}", "Model", or_na(spec.model.as_deref()));
    println!("  {:<16} {}", "Function", or_na(spec.function.as_deref()));
    println!("  {:<16} {}", "Model class", or_na(spec.model_class.as_deref()));
    println!("  {:<16} {}", "Tag", or_na(meta.tag.as_deref()));
    println!("  {:<16} {}", "Labels", format_labels(&meta.labels));
    println!("  {:<16} {}", "State", ep.endpoint.status.state);
    println!("  {:<16} {}", "First request", or_na(ep.first_request.as_deref()));
    println!("  {:<16} {}", "Last request", or_na(ep.last_request.as_deref()));
    println!("  {:<16} {}", "Errors", count(ep.error_count));
    println!("  {:<16} {}", "Alerts", count(ep.alert_count));
    println!("  {:<16} {}", "Drift", or_na(ep.drift_status.as_deref()));

    if let Some(metrics) = &ep.metrics {
        println!("\n[Metrics]");
        if metrics.is_empty() {
            println!("  (No data in window)");
        }
        for m in metrics {
            println!("  {}", metric_summary(m));
        }
    }

    if let Some(features) = &ep.features {
        println!("\n[Features]");
        println!(
            "  {:<24} {:<10} {:<8} {:<24} {:<24}",
            "Name", "Type", "Weight", "Expected (mean/std)", "Actual (mean/std)"
        );
        for f in features {
            print_feature(f);
        }
    }
    println!();
}

fn print_feature(f: &Feature) {
    println!(
        "  {:<24} {:<10} {:<8} {:<24} {:<24}",
        f.name,
        or_na(f.value_type.as_deref()),
        f.weight.map(|w| format!("{w:.3}")).unwrap_or_else(|| "-".to_string()),
        stats_summary(f.expected.as_ref()),
        stats_summary(f.actual.as_ref()),
    );
}

fn stats_summary(stats: Option<&FeatureStats>) -> String {
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string());
    match stats {
        Some(s) => format!("{}/{}", fmt(s.mean), fmt(s.std)),
        None => "-".to_string(),
    }
}

pub fn metric_summary(m: &Metric) -> String {
    format!(
        "{:<24} points={:<6} min={:.3} avg={:.3} max={:.3} [{} .. {}]",
        m.name,
        m.values.len(),
        m.min,
        m.avg,
        m.max,
        m.start_timestamp,
        m.end_timestamp
    )
}
