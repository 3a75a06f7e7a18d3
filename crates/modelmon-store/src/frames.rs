//! [`TsdbStore`] over the frames service HTTP read endpoint.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::retry::RetryPolicy;
use crate::types::{Frame, StoreError, StoreResult, TsdbQuery, TsdbStore};

const SESSION_HEADER: &str = "X-v3io-session-key";

#[derive(Debug, Clone)]
pub struct FramesClient {
    http: Client,
    base_url: String,
    session_key: String,
    retry: RetryPolicy,
}

/// Columnar read result; non-numeric columns are dropped on decode.
#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    index: Vec<Value>,
    #[serde(default)]
    columns: BTreeMap<String, Vec<Value>>,
}

impl FramesClient {
    pub fn new(http: Client, base_url: &str, session_key: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_key: session_key.to_string(),
            retry,
        }
    }

    async fn read_once(&self, url: &str, body: &Value) -> StoreResult<ReadResponse> {
        let resp = self
            .http
            .post(url)
            .header(SESSION_HEADER, &self.session_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(format!("read: {e}")))
    }
}

fn index_label(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric_column(values: &[Value]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => Some(f64::NAN),
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
        .collect()
}

fn into_frame(resp: ReadResponse) -> StoreResult<Frame> {
    let rows = resp.index.len();
    let mut frame = Frame {
        index: resp.index.iter().map(index_label).collect(),
        columns: BTreeMap::new(),
    };
    for (name, values) in resp.columns {
        if values.len() != rows {
            return Err(StoreError::Decode(format!(
                "column '{name}' has {} rows, index has {rows}",
                values.len()
            )));
        }
        match numeric_column(&values) {
            Some(col) => {
                frame.columns.insert(name, col);
            }
            None => tracing::trace!(column = %name, "dropping non-numeric column"),
        }
    }
    Ok(frame)
}

#[async_trait]
impl TsdbStore for FramesClient {
    async fn read(&self, query: &TsdbQuery) -> StoreResult<Frame> {
        let url = format!("{}/read", self.base_url);
        let body = json!({
            "container": query.container,
            "backend": query.backend,
            "table": query.table,
            "columns": query.columns,
            "filter": query.filter.render(),
            "start": query.start,
            "end": query.end,
        });
        let resp = self.retry.run("read", || self.read_once(&url, &body)).await?;
        into_frame(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, routing::post, Json, Router};

    use crate::filter::{FilterExpression, Predicate};

    #[test]
    fn test_into_frame_drops_text_columns() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "index": ["2024-05-01T10:00:00Z", "2024-05-01T10:00:01Z"],
            "columns": {
                "endpoint_id": ["p.1", "p.1"],
                "latency_avg_1s": [1.5, null]
            }
        }))
        .unwrap();
        let frame = into_frame(resp).unwrap();
        assert_eq!(frame.index.len(), 2);
        assert!(frame.column("endpoint_id").is_none());
        let lat = frame.column("latency_avg_1s").unwrap();
        assert_eq!(lat[0], 1.5);
        assert!(lat[1].is_nan());
    }

    #[test]
    fn test_into_frame_rejects_ragged_columns() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "index": [1, 2],
            "columns": {"x": [1.0]}
        }))
        .unwrap();
        assert!(matches!(into_frame(resp), Err(StoreError::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_posts_query() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let app = Router::new()
            .route(
                "/read",
                post(
                    |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                        *seen.lock().unwrap() = Some(body);
                        Json(json!({"index": ["t0"], "columns": {"latency_avg_1s": [3.0]}}))
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = FramesClient::new(Client::new(), &format!("http://{addr}/"), "k", RetryPolicy::none());
        let query = TsdbQuery {
            container: "users".to_string(),
            backend: "tsdb".to_string(),
            table: "p/endpoint-events".to_string(),
            columns: vec!["endpoint_id".to_string(), "latency_avg_1s".to_string()],
            filter: FilterExpression::new().and(Predicate::equals("endpoint_id", "p.1")),
            start: "now-1h".to_string(),
            end: "now".to_string(),
        };
        let frame = client.read(&query).await.unwrap();
        assert_eq!(frame.column("latency_avg_1s"), Some(&[3.0][..]));

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["filter"], "endpoint_id=='p.1'");
        assert_eq!(body["start"], "now-1h");
        assert_eq!(body["backend"], "tsdb");
    }
}
