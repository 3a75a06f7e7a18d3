//! Fixture data for `--in-memory` mode.
//!
//! ```json
//! {
//!   "endpoints": [
//!     {"id": "fraud.1", "labels": {"team": "risk"},
//!      "attributes": {"model": "xgb", "features": "[]"}}
//!   ],
//!   "events": [
//!     {"endpoint_id": "fraud.1", "time": "now-10m",
//!      "fields": {"latency_avg_1s": 120.0}}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use modelmon_common::EndpointId;
use modelmon_store::timerange::parse_time;
use modelmon_store::{Attributes, MemoryKvStore, MemoryTsdbStore};

use crate::endpoint_metrics::ENDPOINT_EVENTS_TABLE;
use crate::error::ApiError;
use crate::filters::LABEL_PREFIX;
use crate::records::endpoints_table;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedData {
    #[serde(default)]
    pub endpoints: Vec<SeedEndpoint>,
    #[serde(default)]
    pub events: Vec<SeedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEndpoint {
    pub id: String,
    /// Unprefixed; stored both as the `labels` JSON and as flattened
    /// `_key` attributes so label filters match.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEvent {
    pub endpoint_id: String,
    /// Any time expression the store accepts, resolved at load time.
    pub time: String,
    pub fields: BTreeMap<String, f64>,
}

impl SeedData {
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|source| ApiError::Deserialization {
            what: "seed file",
            source,
        })
    }

    /// Returns the number of endpoint rows and events written.
    pub async fn load(
        self,
        container: &str,
        kv: &MemoryKvStore,
        tsdb: &MemoryTsdbStore,
    ) -> Result<(usize, usize), ApiError> {
        let now = Utc::now();
        let (endpoints, events) = (self.endpoints.len(), self.events.len());

        for ep in self.endpoints {
            let id = EndpointId::parse(&ep.id)?;
            let mut attributes = ep.attributes;
            attributes
                .entry("project")
                .or_insert_with(|| Value::String(id.project().to_string()));

            let mut stored = serde_json::Map::new();
            for (key, value) in ep.labels {
                let key = format!("{LABEL_PREFIX}{key}");
                attributes.insert(key.clone(), Value::String(value.clone()));
                stored.insert(key, Value::String(value));
            }
            attributes.insert("labels".to_string(), Value::String(Value::Object(stored).to_string()));

            kv.put(container, &endpoints_table(id.project()), id.as_str(), attributes)
                .await;
        }

        for ev in self.events {
            let id = EndpointId::parse(&ev.endpoint_id)?;
            let at = parse_time(&ev.time, now)?;
            let mut tags = Attributes::new();
            tags.insert("endpoint_id".to_string(), Value::String(id.as_str().to_string()));
            tsdb.insert(
                container,
                &format!("{}/{ENDPOINT_EVENTS_TABLE}", id.project()),
                at,
                tags,
                ev.fields,
            )
            .await;
        }

        tracing::info!(endpoints, events, "loaded seed data");
        Ok((endpoints, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::query::{GetQuery, ListQuery};
    use crate::service::EndpointService;

    const SEED: &str = r#"{
        "endpoints": [
            {"id": "fraud.1", "labels": {"team": "risk"},
             "attributes": {"model": "xgb", "features": "[{\"name\":\"age\"}]"}},
            {"id": "fraud.2", "attributes": {"model": "lgbm"}}
        ],
        "events": [
            {"endpoint_id": "fraud.1", "time": "now-10m", "fields": {"latency_avg_1s": 120.0}},
            {"endpoint_id": "fraud.1", "time": "now-5m", "fields": {"latency_avg_1s": 80.0}}
        ]
    }"#;

    #[tokio::test]
    async fn test_seeded_stores_serve_queries() {
        let (kv, tsdb) = (MemoryKvStore::new(), MemoryTsdbStore::new());
        let counts = SeedData::from_json(SEED)
            .unwrap()
            .load("projects", &kv, &tsdb)
            .await
            .unwrap();
        assert_eq!(counts, (2, 2));

        let svc = EndpointService::new(Arc::new(kv), Arc::new(tsdb), "projects");
        let list = svc
            .list(
                "fraud",
                &ListQuery {
                    labels: vec!["team=risk".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(list.endpoints.len(), 1);
        assert_eq!(list.endpoints[0].endpoint.metadata.labels["team"], "risk");
        assert_eq!(list.endpoints[0].endpoint.metadata.project, "fraud");

        let id = EndpointId::parse("fraud.1").unwrap();
        let state = svc
            .get(
                "fraud",
                &id,
                &GetQuery {
                    metrics: Some(vec!["latency".to_string()]),
                    features: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let metrics = state.metrics.unwrap();
        assert_eq!(metrics[0].avg, 100.0);
        assert_eq!(state.features.unwrap()[0].name, "age");
    }

    #[tokio::test]
    async fn test_bad_seed_is_rejected() {
        assert!(matches!(
            SeedData::from_json(r#"{"endpoints": [], "extra": 1}"#),
            Err(ApiError::Deserialization { .. })
        ));

        let (kv, tsdb) = (MemoryKvStore::new(), MemoryTsdbStore::new());
        let seed = SeedData::from_json(
            r#"{"events": [{"endpoint_id": "fraud.1", "time": "soon", "fields": {}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            seed.load("projects", &kv, &tsdb).await,
            Err(ApiError::Store(_))
        ));

        let seed = SeedData::from_json(r#"{"endpoints": [{"id": "nodot"}]}"#).unwrap();
        assert!(matches!(
            seed.load("projects", &kv, &tsdb).await,
            Err(ApiError::InvalidArgument(_))
        ));
    }
}
