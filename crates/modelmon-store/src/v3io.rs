//! [`KvStore`] over the v3io web API item functions.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use crate::filter::FilterExpression;
use crate::retry::RetryPolicy;
use crate::types::{Attributes, KvItem, KvStore, StoreError, StoreResult};

const FUNCTION_HEADER: &str = "X-v3io-function";
const SESSION_HEADER: &str = "X-v3io-session-key";
const ITEM_NAME: &str = "__name";

#[derive(Debug, Clone)]
pub struct V3ioKvClient {
    http: Client,
    base_url: String,
    session_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GetItemResponse {
    #[serde(rename = "Item", default)]
    item: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GetItemsResponse {
    #[serde(rename = "Items", default)]
    items: Vec<Map<String, Value>>,
    #[serde(rename = "LastItemIncluded", default)]
    last_item_included: Option<String>,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

impl V3ioKvClient {
    pub fn new(http: Client, base_url: &str, session_key: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_key: session_key.to_string(),
            retry,
        }
    }

    /// Base URL plus `segments`, each percent-encoded as a single path
    /// segment so that `/` or `..` inside a key cannot leave the table.
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let invalid = || StoreError::InvalidAddress(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn item_url(&self, container: &str, table: &str, key: &str) -> StoreResult<Url> {
        let mut segments = vec![container];
        segments.extend(table_segments(table));
        segments.push(key);
        self.url(&segments)
    }

    /// Table requests address the directory, hence the trailing empty segment.
    fn table_url(&self, container: &str, table: &str) -> StoreResult<Url> {
        let mut segments = vec![container];
        segments.extend(table_segments(table));
        segments.push("");
        self.url(&segments)
    }

    async fn call(&self, url: &Url, function: &str, body: &Value) -> StoreResult<Option<Value>> {
        self.retry
            .run(function, || self.call_once(url, function, body))
            .await
    }

    /// One item-function request. A 404 means the item or table is missing.
    async fn call_once(&self, url: &Url, function: &str, body: &Value) -> StoreResult<Option<Value>> {
        let resp = self
            .http
            .put(url.clone())
            .header(FUNCTION_HEADER, function)
            .header(SESSION_HEADER, &self.session_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Decode(format!("{function}: {e}")))
    }

    async fn delete_once(&self, url: &Url) -> StoreResult<()> {
        let resp = self
            .http
            .delete(url.clone())
            .header(SESSION_HEADER, &self.session_key)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// `project/model-endpoints` style table paths, one entry per segment.
fn table_segments(table: &str) -> impl Iterator<Item = &str> {
    table.split('/').filter(|s| !s.is_empty())
}

fn attributes_to_get(attributes: &[&str], with_name: bool) -> String {
    if attributes.is_empty() {
        return "*".to_string();
    }
    let mut names: Vec<&str> = Vec::with_capacity(attributes.len() + 1);
    if with_name {
        names.push(ITEM_NAME);
    }
    names.extend_from_slice(attributes);
    names.join(",")
}

/// Decode a typed v3io attribute value (`{"S": ..}`, `{"N": ..}`,
/// `{"BOOL": ..}`). Blob and unknown encodings yield `None`.
pub fn decode_typed_value(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    if let Some(s) = obj.get("S").and_then(Value::as_str) {
        return Some(Value::String(s.to_string()));
    }
    if let Some(n) = obj.get("N") {
        let raw = match n {
            Value::String(s) => s.as_str(),
            Value::Number(num) => return Some(Value::Number(num.clone())),
            _ => return None,
        };
        if let Ok(i) = raw.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
        return raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number);
    }
    if let Some(b) = obj.get("BOOL") {
        return match b {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => Some(Value::Bool(s.eq_ignore_ascii_case("true"))),
            _ => None,
        };
    }
    None
}

fn decode_item(raw: Map<String, Value>) -> Attributes {
    let mut out = Attributes::new();
    for (name, typed) in raw {
        match decode_typed_value(&typed) {
            Some(v) => {
                out.insert(name, v);
            }
            None => tracing::debug!(attribute = %name, "skipping attribute with unsupported encoding"),
        }
    }
    out
}

#[async_trait]
impl KvStore for V3ioKvClient {
    async fn get(
        &self,
        container: &str,
        table: &str,
        key: &str,
        attributes: &[&str],
    ) -> StoreResult<Option<Attributes>> {
        let url = self.item_url(container, table, key)?;
        let body = json!({ "AttributesToGet": attributes_to_get(attributes, false) });
        let resp = match self.call(&url, "GetItem", &body).await? {
            Some(resp) if !resp.is_null() => resp,
            _ => return Ok(None),
        };
        let parsed: GetItemResponse = serde_json::from_value(resp)
            .map_err(|e| StoreError::Decode(format!("GetItem: {e}")))?;
        if parsed.item.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode_item(parsed.item)))
    }

    async fn list(
        &self,
        container: &str,
        table: &str,
        attributes: &[&str],
        filter: &FilterExpression,
    ) -> StoreResult<Vec<KvItem>> {
        let url = self.table_url(container, table)?;
        let mut out = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut body = json!({ "AttributesToGet": attributes_to_get(attributes, true) });
            if !filter.is_empty() {
                body["FilterExpression"] = json!(filter.render());
            }
            if let Some(m) = &marker {
                body["Marker"] = json!(m);
            }

            let Some(resp) = self.call(&url, "GetItems", &body).await? else {
                // table does not exist yet
                return Ok(out);
            };
            let page: GetItemsResponse = serde_json::from_value(resp)
                .map_err(|e| StoreError::Decode(format!("GetItems: {e}")))?;

            for raw in page.items {
                let mut attrs = decode_item(raw);
                let key = match attrs.remove(ITEM_NAME) {
                    Some(Value::String(k)) => k,
                    _ => {
                        return Err(StoreError::Decode(
                            "GetItems: item without __name".to_string(),
                        ))
                    }
                };
                out.push(KvItem {
                    key,
                    attributes: attrs,
                });
            }

            let done = page
                .last_item_included
                .as_deref()
                .map_or(true, |v| v.eq_ignore_ascii_case("TRUE"));
            match page.next_marker {
                Some(m) if !done && !m.is_empty() => marker = Some(m),
                _ => break,
            }
        }

        Ok(out)
    }

    async fn delete(&self, container: &str, table: &str, key: &str) -> StoreResult<()> {
        let url = self.item_url(container, table, key)?;
        self.retry
            .run("DeleteItem", || self.delete_once(&url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::put,
        Json, Router,
    };

    use crate::filter::Predicate;

    #[test]
    fn test_decode_typed_value() {
        assert_eq!(decode_typed_value(&json!({"S": "x"})), Some(json!("x")));
        assert_eq!(decode_typed_value(&json!({"N": "12"})), Some(json!(12)));
        assert_eq!(decode_typed_value(&json!({"N": "1.5"})), Some(json!(1.5)));
        assert_eq!(decode_typed_value(&json!({"BOOL": true})), Some(json!(true)));
        assert_eq!(decode_typed_value(&json!({"B": "AAEC"})), None);
        assert_eq!(decode_typed_value(&json!("bare")), None);
    }

    #[test]
    fn test_attributes_to_get() {
        assert_eq!(attributes_to_get(&[], true), "*");
        assert_eq!(attributes_to_get(&["a", "b"], false), "a,b");
        assert_eq!(attributes_to_get(&["a"], true), "__name,a");
    }

    #[test]
    fn test_item_url_encodes_each_segment() {
        let kv = V3ioKvClient::new(Client::new(), "http://kv:8081/", "k", RetryPolicy::none());
        let url = kv
            .item_url("projects", "p/model-endpoints", "p.x/../../other/model-endpoints/o.1")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://kv:8081/projects/p/model-endpoints/p.x%2F..%2F..%2Fother%2Fmodel-endpoints%2Fo.1"
        );

        let url = kv.table_url("projects", "/p/model-endpoints/").unwrap();
        assert_eq!(url.as_str(), "http://kv:8081/projects/p/model-endpoints/");

        let bad = V3ioKvClient::new(Client::new(), "not a url", "k", RetryPolicy::none());
        assert!(matches!(
            bad.item_url("projects", "p/model-endpoints", "p.1"),
            Err(StoreError::InvalidAddress(_))
        ));
    }

    #[derive(Clone, Default)]
    struct Seen {
        bodies: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn items_handler(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        let function = headers
            .get(FUNCTION_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(
            headers.get(SESSION_HEADER).and_then(|h| h.to_str().ok()),
            Some("secret")
        );
        let first_page = body.get("Marker").is_none();
        seen.bodies.lock().unwrap().push((function, body));
        if first_page {
            Json(json!({
                "LastItemIncluded": "FALSE",
                "NextMarker": "m1",
                "Items": [{"__name": {"S": "p.1"}, "model": {"S": "xgb"}, "error_count": {"N": "2"}}]
            }))
        } else {
            Json(json!({
                "LastItemIncluded": "TRUE",
                "Items": [{"__name": {"S": "p.2"}, "model": {"S": "lgbm"}}]
            }))
        }
    }

    async fn item_handler(Path((_c, _p, _t, key)): Path<(String, String, String, String)>) -> impl IntoResponse {
        if key == "p.1" {
            (
                AxumStatus::OK,
                Json(json!({"Item": {"model": {"S": "xgb"}, "labels": {"S": "{}"}}})),
            )
                .into_response()
        } else {
            AxumStatus::NOT_FOUND.into_response()
        }
    }

    async fn spawn(seen: Seen) -> String {
        let app = Router::new()
            .route("/:container/:project/:table/", put(items_handler))
            .route(
                "/:container/:project/:table/:key",
                put(item_handler).delete(|| async { AxumStatus::NO_CONTENT }),
            )
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_get_item_and_not_found() {
        let base = spawn(Seen::default()).await;
        let kv = V3ioKvClient::new(Client::new(), &base, "secret", RetryPolicy::none());

        let item = kv.get("users", "p/model-endpoints", "p.1", &["model"]).await.unwrap();
        assert_eq!(item.unwrap().get("model"), Some(&json!("xgb")));

        let missing = kv.get("users", "p/model-endpoints", "p.9", &[]).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_items_follows_marker() {
        let seen = Seen::default();
        let base = spawn(seen.clone()).await;
        let kv = V3ioKvClient::new(Client::new(), &base, "secret", RetryPolicy::none());

        let filter = FilterExpression::new().and(Predicate::equals("project", "p"));
        let items = kv
            .list("users", "p/model-endpoints", &["model", "error_count"], &filter)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "p.1");
        assert_eq!(items[0].attributes.get("error_count"), Some(&json!(2)));
        assert!(items[0].attributes.get(ITEM_NAME).is_none());
        assert_eq!(items[1].key, "p.2");

        let bodies = seen.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].0, "GetItems");
        assert_eq!(bodies[0].1["FilterExpression"], "project=='p'");
        assert_eq!(bodies[0].1["AttributesToGet"], "__name,model,error_count");
        assert_eq!(bodies[1].1["Marker"], "m1");
    }

    #[tokio::test]
    async fn test_delete_item() {
        let base = spawn(Seen::default()).await;
        let kv = V3ioKvClient::new(Client::new(), &base, "secret", RetryPolicy::none());
        kv.delete("users", "p/model-endpoints", "p.1").await.unwrap();
    }
}
