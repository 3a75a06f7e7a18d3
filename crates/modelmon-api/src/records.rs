use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use modelmon_common::{
    EndpointId, ModelEndpoint, ModelEndpointMetadata, ModelEndpointSpec, ModelEndpointState,
    ObjectStatus,
};
use modelmon_store::{Attributes, FilterExpression, KvStore};

use crate::error::ApiError;
use crate::filters::LABEL_PREFIX;

pub const ENDPOINTS_TABLE: &str = "model-endpoints";

/// Attributes fetched for listings. `features` is left out because it can be
/// large and is only served for single endpoints.
pub const ENDPOINT_ATTRIBUTES: &[&str] = &[
    "project",
    "model",
    "function",
    "tag",
    "model_class",
    "labels",
    "first_request",
    "last_request",
    "error_count",
    "alert_count",
    "drift_status",
];

pub const ENDPOINT_ATTRIBUTES_WITH_FEATURES: &[&str] = &[
    "project",
    "model",
    "function",
    "tag",
    "model_class",
    "labels",
    "first_request",
    "last_request",
    "error_count",
    "alert_count",
    "drift_status",
    "features",
];

pub fn endpoints_table(project: &str) -> String {
    format!("{project}/{ENDPOINTS_TABLE}")
}

/// One row of the endpoints table, decoded at the store boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointRecord {
    pub id: String,
    pub project: Option<String>,
    pub model: Option<String>,
    pub function: Option<String>,
    pub tag: Option<String>,
    pub model_class: Option<String>,
    /// JSON object with `_`-prefixed keys.
    pub labels: Option<String>,
    pub first_request: Option<String>,
    pub last_request: Option<String>,
    pub error_count: Option<i64>,
    pub alert_count: Option<i64>,
    pub drift_status: Option<String>,
    /// JSON array of feature descriptors.
    pub features: Option<String>,
}

fn as_text(id: &str, name: &str, value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        other => {
            tracing::warn!(endpoint_id = id, attribute = name, value = %other, "ignoring non-text attribute");
            None
        }
    }
}

fn as_count(id: &str, name: &str, value: Value) -> Option<i64> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => return None,
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(endpoint_id = id, attribute = name, value = %value, "ignoring non-integer counter");
    }
    parsed
}

impl EndpointRecord {
    pub fn from_attributes(id: &str, attributes: Attributes) -> Self {
        let mut rec = EndpointRecord {
            id: id.to_string(),
            ..Default::default()
        };
        for (name, value) in attributes {
            match name.as_str() {
                "project" => rec.project = as_text(id, &name, value),
                "model" => rec.model = as_text(id, &name, value),
                "function" => rec.function = as_text(id, &name, value),
                "tag" => rec.tag = as_text(id, &name, value),
                "model_class" => rec.model_class = as_text(id, &name, value),
                "labels" => rec.labels = as_text(id, &name, value),
                "first_request" => rec.first_request = as_text(id, &name, value),
                "last_request" => rec.last_request = as_text(id, &name, value),
                "error_count" => rec.error_count = as_count(id, &name, value),
                "alert_count" => rec.alert_count = as_count(id, &name, value),
                "drift_status" => rec.drift_status = as_text(id, &name, value),
                "features" => rec.features = as_text(id, &name, value),
                // flattened label attributes and store builtins
                n if n.starts_with(LABEL_PREFIX) => {}
                other => tracing::debug!(endpoint_id = id, attribute = other, "unexpected endpoint attribute"),
            }
        }
        rec
    }

    /// Labels with the storage prefix stripped. A missing or empty attribute
    /// yields no labels.
    pub fn decode_labels(&self) -> Result<BTreeMap<String, String>, ApiError> {
        let Some(raw) = self.labels.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(BTreeMap::new());
        };
        let parsed: BTreeMap<String, Value> = serde_json::from_str(raw)
            .map_err(|source| ApiError::Deserialization {
                what: "endpoint labels",
                source,
            })?;
        Ok(parsed
            .into_iter()
            .map(|(k, v)| {
                let key = k.strip_prefix(LABEL_PREFIX).unwrap_or(&k).to_string();
                let value = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect())
    }

    /// Response shape without metrics or features attached.
    pub fn into_state(self, fallback_project: &str) -> Result<ModelEndpointState, ApiError> {
        let labels = self.decode_labels()?;
        Ok(ModelEndpointState {
            id: self.id,
            endpoint: ModelEndpoint {
                metadata: ModelEndpointMetadata {
                    project: self.project.unwrap_or_else(|| fallback_project.to_string()),
                    tag: self.tag,
                    labels,
                },
                spec: ModelEndpointSpec {
                    model: self.model,
                    function: self.function,
                    model_class: self.model_class,
                },
                status: ObjectStatus::active(),
            },
            first_request: self.first_request,
            last_request: self.last_request,
            error_count: self.error_count,
            alert_count: self.alert_count,
            drift_status: self.drift_status,
            metrics: None,
            features: None,
        })
    }
}

/// Reads and deletes endpoint rows for one container.
#[derive(Clone)]
pub struct EndpointAccessor {
    kv: Arc<dyn KvStore>,
    container: String,
}

impl EndpointAccessor {
    pub fn new(kv: Arc<dyn KvStore>, container: &str) -> Self {
        Self {
            kv,
            container: container.to_string(),
        }
    }

    /// `None` when the row does not exist.
    pub async fn get(
        &self,
        project: &str,
        endpoint_id: &EndpointId,
        attributes: &[&str],
    ) -> Result<Option<EndpointRecord>, ApiError> {
        let table = endpoints_table(project);
        let item = self
            .kv
            .get(&self.container, &table, endpoint_id.as_str(), attributes)
            .await?;
        Ok(item.map(|a| EndpointRecord::from_attributes(endpoint_id.as_str(), a)))
    }

    pub async fn list(
        &self,
        project: &str,
        filter: &FilterExpression,
        attributes: &[&str],
    ) -> Result<Vec<EndpointRecord>, ApiError> {
        let table = endpoints_table(project);
        let items = self
            .kv
            .list(&self.container, &table, attributes, filter)
            .await?;
        tracing::debug!(project, count = items.len(), "listed endpoint records");
        Ok(items
            .into_iter()
            .map(|item| EndpointRecord::from_attributes(&item.key, item.attributes))
            .collect())
    }

    pub async fn delete(&self, project: &str, endpoint_id: &EndpointId) -> Result<(), ApiError> {
        let table = endpoints_table(project);
        self.kv
            .delete(&self.container, &table, endpoint_id.as_str())
            .await?;
        Ok(())
    }
}
