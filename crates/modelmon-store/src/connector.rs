use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::frames::FramesClient;
use crate::memory::{MemoryKvStore, MemoryTsdbStore};
use crate::retry::RetryPolicy;
use crate::types::{KvStore, StoreResult, TsdbStore};
use crate::v3io::V3ioKvClient;

/// Per-request credentials and the service addresses they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub session_key: String,
    pub kv_api: String,
    pub tsdb_api: String,
}

/// Hands out store clients bound to one caller's credentials.
pub trait StoreConnector: Send + Sync {
    fn kv(&self, creds: &Credentials) -> Arc<dyn KvStore>;
    fn tsdb(&self, creds: &Credentials) -> Arc<dyn TsdbStore>;
}

#[derive(Debug, Clone)]
pub struct HttpStoreOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpStoreOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Builds v3io/frames HTTP clients that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpStoreConnector {
    http: Client,
    retry: RetryPolicy,
}

impl HttpStoreConnector {
    pub fn new(opts: HttpStoreOptions) -> StoreResult<Self> {
        let http = Client::builder()
            .connect_timeout(opts.connect_timeout)
            .timeout(opts.request_timeout)
            .build()?;
        Ok(Self {
            http,
            retry: opts.retry,
        })
    }
}

impl StoreConnector for HttpStoreConnector {
    fn kv(&self, creds: &Credentials) -> Arc<dyn KvStore> {
        Arc::new(V3ioKvClient::new(
            self.http.clone(),
            &creds.kv_api,
            &creds.session_key,
            self.retry.clone(),
        ))
    }

    fn tsdb(&self, creds: &Credentials) -> Arc<dyn TsdbStore> {
        Arc::new(FramesClient::new(
            self.http.clone(),
            &creds.tsdb_api,
            &creds.session_key,
            self.retry.clone(),
        ))
    }
}

/// Serves every caller from the same in-memory stores; credentials are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConnector {
    pub kv: MemoryKvStore,
    pub tsdb: MemoryTsdbStore,
}

impl MemoryStoreConnector {
    pub fn new(kv: MemoryKvStore, tsdb: MemoryTsdbStore) -> Self {
        Self { kv, tsdb }
    }
}

impl StoreConnector for MemoryStoreConnector {
    fn kv(&self, _creds: &Credentials) -> Arc<dyn KvStore> {
        Arc::new(self.kv.clone())
    }

    fn tsdb(&self, _creds: &Credentials) -> Arc<dyn TsdbStore> {
        Arc::new(self.tsdb.clone())
    }
}
