use std::collections::HashMap;

use opentelemetry::trace::TracerProvider as TracerProviderTrait;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where to ship spans, if anywhere.
#[derive(Debug, Clone, Default)]
pub struct OtlpConfig {
    /// OTLP/HTTP base URL; the exporter appends `/v1/traces`.
    pub endpoint: Option<String>,
    /// Sent as `Authorization: Bearer <token>` when non-empty.
    pub token: Option<String>,
}

impl OtlpConfig {
    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    fn headers(&self) -> HashMap<String, String> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|token| ("Authorization".to_string(), format!("Bearer {token}")))
            .into_iter()
            .collect()
    }
}

/// Keeps the tracer provider alive; call [`TelemetryGuard::shutdown`] before
/// exit so buffered spans are flushed.
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    pub fn otlp_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to flush OTLP spans: {err}");
            }
        }
    }
}

/// Install the global subscriber: `RUST_LOG`-driven filter (default `info`),
/// fmt output, and an OTLP layer when `otlp.endpoint` is set.
///
/// An exporter that cannot be built degrades to fmt-only logging instead of
/// failing startup.
pub fn init_tracing(service_name: &str, otlp: &OtlpConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = otlp.endpoint().and_then(|endpoint| {
        match span_provider(service_name, endpoint, otlp.headers()) {
            Ok(provider) => Some(provider),
            Err(err) => {
                eprintln!("OTLP export disabled, exporter for {endpoint} failed: {err}");
                None
            }
        }
    });
    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(service_name.to_string()))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(otel_layer)
        .init();

    if let Some(endpoint) = otlp.endpoint().filter(|_| provider.is_some()) {
        tracing::info!(endpoint, service_name, "OTLP trace export enabled");
    }
    TelemetryGuard { provider }
}

fn span_provider(
    service_name: &str,
    endpoint: &str,
    headers: HashMap<String, String>,
) -> Result<TracerProvider, String> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()
        .map_err(|err| err.to_string())?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build())
}
