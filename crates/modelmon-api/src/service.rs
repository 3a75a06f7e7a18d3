use std::sync::Arc;

use modelmon_common::{validate_project, EndpointId, ModelEndpointState, ModelEndpointStateList};
use modelmon_store::{KvStore, TsdbStore};

use crate::endpoint_metrics::extract_metrics;
use crate::error::ApiError;
use crate::features::reconstruct_features;
use crate::filters::build_endpoint_filter;
use crate::query::{GetQuery, ListQuery};
use crate::records::{EndpointAccessor, ENDPOINT_ATTRIBUTES, ENDPOINT_ATTRIBUTES_WITH_FEATURES};

/// Parse `endpoint_id` and make sure it belongs to `project`.
///
/// Runs before credentials are resolved or any store is touched.
pub fn verify_endpoint(project: &str, endpoint_id: &str) -> Result<EndpointId, ApiError> {
    validate_project(project)?;
    let id = EndpointId::parse(endpoint_id)?;
    id.ensure_project(project)?;
    Ok(id)
}

/// Endpoint read/clear operations for one caller.
pub struct EndpointService {
    records: EndpointAccessor,
    tsdb: Arc<dyn TsdbStore>,
    container: String,
}

impl EndpointService {
    pub fn new(kv: Arc<dyn KvStore>, tsdb: Arc<dyn TsdbStore>, container: &str) -> Self {
        Self {
            records: EndpointAccessor::new(kv, container),
            tsdb,
            container: container.to_string(),
        }
    }

    pub async fn list(
        &self,
        project: &str,
        query: &ListQuery,
    ) -> Result<ModelEndpointStateList, ApiError> {
        validate_project(project)?;
        let filter = build_endpoint_filter(
            project,
            query.function.as_deref(),
            query.model.as_deref(),
            query.tag.as_deref(),
            &query.labels,
        )?;
        tracing::debug!(project, filter = %filter, "listing model endpoints");

        let records = self
            .records
            .list(project, &filter, ENDPOINT_ATTRIBUTES)
            .await?;

        let mut endpoints = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            let mut state = record.into_state(project)?;
            if let Some(names) = &query.metrics {
                state.metrics = Some(
                    extract_metrics(
                        self.tsdb.as_ref(),
                        &self.container,
                        project,
                        &id,
                        names,
                        &query.range,
                    )
                    .await?,
                );
            }
            endpoints.push(state);
        }

        Ok(ModelEndpointStateList { endpoints })
    }

    pub async fn get(
        &self,
        project: &str,
        endpoint_id: &EndpointId,
        query: &GetQuery,
    ) -> Result<ModelEndpointState, ApiError> {
        let Some(record) = self
            .records
            .get(project, endpoint_id, ENDPOINT_ATTRIBUTES_WITH_FEATURES)
            .await?
        else {
            return Err(ApiError::NotFound(format!(
                "Endpoint {endpoint_id} not found - /projects/{project}/model-endpoints/{endpoint_id}"
            )));
        };

        let features = record.features.clone();
        let mut state = record.into_state(project)?;

        if let Some(names) = &query.metrics {
            state.metrics = Some(
                extract_metrics(
                    self.tsdb.as_ref(),
                    &self.container,
                    project,
                    endpoint_id.as_str(),
                    names,
                    &query.range,
                )
                .await?,
            );
        }

        if query.features {
            state.features = Some(reconstruct_features(
                features.as_deref(),
                project,
                endpoint_id.as_str(),
            )?);
        }

        Ok(state)
    }

    pub async fn clear(&self, project: &str, endpoint_id: &EndpointId) -> Result<(), ApiError> {
        tracing::info!(project, endpoint_id = %endpoint_id, "clearing model endpoint record");
        self.records.delete(project, endpoint_id).await?;
        tracing::info!(project, endpoint_id = %endpoint_id, "model endpoint record cleared");
        Ok(())
    }
}
