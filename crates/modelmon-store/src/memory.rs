use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;

use crate::filter::FilterExpression;
use crate::timerange::parse_time;
use crate::types::{Attributes, Frame, KvItem, KvStore, StoreResult, TsdbQuery, TsdbStore};

type TableKey = (String, String);

/// Process-local [`KvStore`]. Used by `--in-memory` mode and tests.
///
/// Every trait call bumps a counter so callers can assert on store traffic;
/// seeding through [`MemoryKvStore::put`] does not.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    tables: Arc<RwLock<BTreeMap<TableKey, BTreeMap<String, Attributes>>>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, container: &str, table: &str, key: &str, attributes: Attributes) {
        let mut tables = self.tables.write().await;
        tables
            .entry((container.to_string(), table.to_string()))
            .or_default()
            .insert(key.to_string(), attributes);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

fn project(attributes: &Attributes, names: &[&str]) -> Attributes {
    if names.is_empty() {
        return attributes.clone();
    }
    names
        .iter()
        .filter_map(|n| attributes.get(*n).map(|v| (n.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(
        &self,
        container: &str,
        table: &str,
        key: &str,
        attributes: &[&str],
    ) -> StoreResult<Option<Attributes>> {
        self.record_call();
        let tables = self.tables.read().await;
        Ok(tables
            .get(&(container.to_string(), table.to_string()))
            .and_then(|t| t.get(key))
            .map(|a| project(a, attributes)))
    }

    async fn list(
        &self,
        container: &str,
        table: &str,
        attributes: &[&str],
        filter: &FilterExpression,
    ) -> StoreResult<Vec<KvItem>> {
        self.record_call();
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&(container.to_string(), table.to_string())) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|(_, a)| filter.matches(a))
            .map(|(k, a)| KvItem {
                key: k.clone(),
                attributes: project(a, attributes),
            })
            .collect())
    }

    async fn delete(&self, container: &str, table: &str, key: &str) -> StoreResult<()> {
        self.record_call();
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(&(container.to_string(), table.to_string())) {
            rows.remove(key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Sample {
    at: DateTime<Utc>,
    tags: Attributes,
    fields: BTreeMap<String, f64>,
}

/// Process-local [`TsdbStore`] holding raw samples per table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTsdbStore {
    tables: Arc<RwLock<BTreeMap<TableKey, Vec<Sample>>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryTsdbStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert<I>(
        &self,
        container: &str,
        table: &str,
        at: DateTime<Utc>,
        tags: Attributes,
        fields: I,
    ) where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut tables = self.tables.write().await;
        tables
            .entry((container.to_string(), table.to_string()))
            .or_default()
            .push(Sample {
                at,
                tags,
                fields: fields.into_iter().collect(),
            });
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TsdbStore for MemoryTsdbStore {
    async fn read(&self, query: &TsdbQuery) -> StoreResult<Frame> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now();
        let start = parse_time(&query.start, now)?;
        let end = parse_time(&query.end, now)?;

        let tables = self.tables.read().await;
        let Some(samples) = tables.get(&(query.container.clone(), query.table.clone())) else {
            return Ok(Frame::default());
        };

        let mut rows: Vec<&Sample> = samples
            .iter()
            .filter(|s| s.at >= start && s.at < end && query.filter.matches(&s.tags))
            .collect();
        rows.sort_by_key(|s| s.at);

        let mut frame = Frame {
            index: rows
                .iter()
                .map(|s| s.at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .collect(),
            columns: BTreeMap::new(),
        };
        for column in &query.columns {
            if !rows.iter().any(|s| s.fields.contains_key(column)) {
                continue;
            }
            let values = rows
                .iter()
                .map(|s| s.fields.get(column).copied().unwrap_or(f64::NAN))
                .collect();
            frame.columns.insert(column.clone(), values);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use chrono::Duration;
    use serde_json::json;

    fn attrs(v: serde_json::Value) -> Attributes {
        v.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_kv_get_projection_and_missing() {
        let kv = MemoryKvStore::new();
        kv.put("c", "p/t", "p.1", attrs(json!({"project": "p", "model": "m", "tag": "v1"})))
            .await;

        let got = kv.get("c", "p/t", "p.1", &["model", "absent"]).await.unwrap();
        assert_eq!(got, Some(attrs(json!({"model": "m"}))));

        let all = kv.get("c", "p/t", "p.1", &[]).await.unwrap().unwrap();
        assert_eq!(all.len(), 3);

        assert_eq!(kv.get("c", "p/t", "p.2", &[]).await.unwrap(), None);
        assert_eq!(kv.get("c", "other", "p.1", &[]).await.unwrap(), None);
        assert_eq!(kv.calls(), 4);
    }

    #[tokio::test]
    async fn test_kv_list_filters() {
        let kv = MemoryKvStore::new();
        kv.put("c", "t", "p.1", attrs(json!({"project": "p", "_team": "risk"}))).await;
        kv.put("c", "t", "p.2", attrs(json!({"project": "p"}))).await;
        kv.put("c", "t", "q.1", attrs(json!({"project": "q", "_team": "risk"}))).await;

        let filter = FilterExpression::new()
            .and(Predicate::equals("project", "p"))
            .and(Predicate::exists("_team"));
        let items = kv.list("c", "t", &["project"], &filter).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "p.1");
        assert_eq!(items[0].attributes, attrs(json!({"project": "p"})));
    }

    #[tokio::test]
    async fn test_kv_delete_idempotent() {
        let kv = MemoryKvStore::new();
        kv.put("c", "t", "p.1", Attributes::new()).await;
        kv.delete("c", "t", "p.1").await.unwrap();
        kv.delete("c", "t", "p.1").await.unwrap();
        kv.delete("c", "missing", "p.1").await.unwrap();
        assert_eq!(kv.get("c", "t", "p.1", &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tsdb_read_window_and_columns() {
        let ts = MemoryTsdbStore::new();
        let now = Utc::now();
        let tags = attrs(json!({"endpoint_id": "p.1"}));
        ts.insert("c", "p/events", now - Duration::minutes(90), tags.clone(), [("lat".to_string(), 9.0)])
            .await;
        ts.insert("c", "p/events", now - Duration::minutes(20), tags.clone(), [("lat".to_string(), 2.0)])
            .await;
        ts.insert("c", "p/events", now - Duration::minutes(10), tags.clone(), [("lat".to_string(), 4.0)])
            .await;
        ts.insert(
            "c",
            "p/events",
            now - Duration::minutes(5),
            attrs(json!({"endpoint_id": "p.2"})),
            [("lat".to_string(), 100.0)],
        )
        .await;

        let query = TsdbQuery {
            container: "c".to_string(),
            backend: "tsdb".to_string(),
            table: "p/events".to_string(),
            columns: vec!["endpoint_id".to_string(), "lat".to_string(), "preds".to_string()],
            filter: FilterExpression::new().and(Predicate::equals("endpoint_id", "p.1")),
            start: "now-1h".to_string(),
            end: "now".to_string(),
        };
        let frame = ts.read(&query).await.unwrap();
        assert_eq!(frame.index.len(), 2);
        assert_eq!(frame.column("lat"), Some(&[2.0, 4.0][..]));
        assert!(frame.column("preds").is_none());
        assert!(frame.column("endpoint_id").is_none());
        assert_eq!(ts.reads(), 1);
    }

    #[tokio::test]
    async fn test_tsdb_read_unknown_table() {
        let ts = MemoryTsdbStore::new();
        let query = TsdbQuery {
            container: "c".to_string(),
            backend: "tsdb".to_string(),
            table: "nope".to_string(),
            columns: vec![],
            filter: FilterExpression::new(),
            start: "now-1h".to_string(),
            end: "now".to_string(),
        };
        assert!(ts.read(&query).await.unwrap().is_empty());
    }
}
