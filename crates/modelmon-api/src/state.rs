use std::sync::Arc;

use modelmon_store::{Credentials, StoreConnector};

use crate::config::StoreConfig;
use crate::metrics::Metrics;
use crate::service::EndpointService;

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn StoreConnector>,
    pub config: Arc<StoreConfig>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(connector: Arc<dyn StoreConnector>, config: StoreConfig) -> Self {
        Self {
            connector,
            config: Arc::new(config),
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Store clients bound to one caller's session.
    pub fn service(&self, creds: &Credentials) -> EndpointService {
        EndpointService::new(
            self.connector.kv(creds),
            self.connector.tsdb(creds),
            &self.config.container,
        )
    }
}
