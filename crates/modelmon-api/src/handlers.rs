use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use modelmon_common::{ModelEndpointState, ModelEndpointStateList};

use crate::error::ApiError;
use crate::query::{GetQuery, ListQuery};
use crate::secrets::resolve_credentials;
use crate::service::verify_endpoint;
use crate::state::AppState;

type Pairs = Query<Vec<(String, String)>>;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn list_endpoints(
    State(st): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Query(pairs): Pairs,
) -> Result<Json<ModelEndpointStateList>, ApiError> {
    let creds = resolve_credentials(&headers, &st.config)?;
    let query = ListQuery::from_pairs(&pairs)?;
    let list = st.service(&creds).list(&project, &query).await?;
    Ok(Json(list))
}

pub async fn get_endpoint(
    State(st): State<AppState>,
    Path((project, endpoint_id)): Path<(String, String)>,
    headers: HeaderMap,
    Query(pairs): Pairs,
) -> Result<Json<ModelEndpointState>, ApiError> {
    let id = verify_endpoint(&project, &endpoint_id)?;
    let creds = resolve_credentials(&headers, &st.config)?;
    let query = GetQuery::from_pairs(&pairs)?;
    let state = st.service(&creds).get(&project, &id, &query).await?;
    Ok(Json(state))
}

pub async fn clear_endpoint(
    State(st): State<AppState>,
    Path((project, endpoint_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let id = verify_endpoint(&project, &endpoint_id)?;
    let creds = resolve_credentials(&headers, &st.config)?;
    st.service(&creds).clear(&project, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
