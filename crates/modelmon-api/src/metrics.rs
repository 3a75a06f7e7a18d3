use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ErrorCode;
use crate::state::AppState;

#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_inflight: AtomicU64,
    pub status_2xx: AtomicU64,
    pub status_4xx: AtomicU64,
    pub status_5xx: AtomicU64,
    pub store_errors: AtomicU64,
}

fn push_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    body.push_str(&format!(
        "# HELP modelmon_api_{name} {help}\n\
         # TYPE modelmon_api_{name} {kind}\n\
         modelmon_api_{name} {value}\n"
    ));
}

pub fn render_metrics(metrics: &Metrics) -> String {
    let mut body = String::new();
    push_metric(
        &mut body,
        "requests_total",
        "counter",
        "Total requests handled.",
        metrics.requests_total.load(Ordering::Relaxed),
    );
    push_metric(
        &mut body,
        "requests_inflight",
        "gauge",
        "Currently in-flight requests.",
        metrics.requests_inflight.load(Ordering::Relaxed),
    );
    push_metric(
        &mut body,
        "responses_2xx",
        "counter",
        "Total 2xx responses.",
        metrics.status_2xx.load(Ordering::Relaxed),
    );
    push_metric(
        &mut body,
        "responses_4xx",
        "counter",
        "Total 4xx responses.",
        metrics.status_4xx.load(Ordering::Relaxed),
    );
    push_metric(
        &mut body,
        "responses_5xx",
        "counter",
        "Total 5xx responses.",
        metrics.status_5xx.load(Ordering::Relaxed),
    );
    push_metric(
        &mut body,
        "store_errors_total",
        "counter",
        "Requests failed by the KV or time-series store.",
        metrics.store_errors.load(Ordering::Relaxed),
    );
    body
}

pub async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    let body = render_metrics(&st.metrics);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

pub async fn track_requests(
    State(st): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, std::convert::Infallible> {
    st.metrics.requests_inflight.fetch_add(1, Ordering::Relaxed);
    let resp = next.run(req).await;
    st.metrics.requests_inflight.fetch_sub(1, Ordering::Relaxed);
    st.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let status = resp.status().as_u16();
    if status >= 500 {
        st.metrics.status_5xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 400 {
        st.metrics.status_4xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 200 {
        st.metrics.status_2xx.fetch_add(1, Ordering::Relaxed);
    }
    if resp.extensions().get::<ErrorCode>() == Some(&ErrorCode("store_error")) {
        st.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    Ok(resp)
}
