use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::FilterExpression;

/// Attribute name to decoded scalar value (string, number or bool).
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct KvItem {
    pub key: String,
    pub attributes: Attributes,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("invalid time expression '{0}'")]
    InvalidTime(String),
    #[error("invalid store address '{0}'")]
    InvalidAddress(String),
}

impl StoreError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            StoreError::Decode(_) | StoreError::InvalidTime(_) | StoreError::InvalidAddress(_) => {
                false
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value table access. Tables are addressed as `container` + `table`
/// path; keys are unique within a table.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns `None` when the key does not exist. An empty `attributes`
    /// slice requests every attribute.
    async fn get(
        &self,
        container: &str,
        table: &str,
        key: &str,
        attributes: &[&str],
    ) -> StoreResult<Option<Attributes>>;

    /// All items matching `filter`, in the store's cursor order.
    async fn list(
        &self,
        container: &str,
        table: &str,
        attributes: &[&str],
        filter: &FilterExpression,
    ) -> StoreResult<Vec<KvItem>>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, container: &str, table: &str, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsdbQuery {
    pub container: String,
    pub backend: String,
    pub table: String,
    pub columns: Vec<String>,
    pub filter: FilterExpression,
    /// Passed to the store verbatim (`now-1h`, `now`, RFC 3339, ...).
    pub start: String,
    pub end: String,
}

/// Tabular read result indexed by timestamp.
///
/// Only numeric columns are carried; every column has one entry per index
/// row and rows without a sample hold `NaN`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub index: Vec<String>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

#[async_trait]
pub trait TsdbStore: Send + Sync {
    async fn read(&self, query: &TsdbQuery) -> StoreResult<Frame>;
}
