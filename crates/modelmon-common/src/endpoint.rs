use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feature::Feature;
use crate::metric::Metric;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointIdError {
    #[error("endpoint_id '{0}' is not of the form '<project>.<suffix>'")]
    Malformed(String),
    #[error("invalid project name '{0}'")]
    InvalidProject(String),
    #[error("project: {project} and endpoint_id: {endpoint_id} mismatch")]
    ProjectMismatch { project: String, endpoint_id: String },
}

/// Identifier of a monitored endpoint, `"{project}.{suffix}"`.
///
/// The project is everything before the first `.`; the suffix may itself
/// contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointId {
    raw: String,
    split: usize,
}

/// Characters that would split a name into several store path segments.
fn has_path_chars(s: &str) -> bool {
    s.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Project names address one table directory each.
pub fn validate_project(project: &str) -> Result<(), EndpointIdError> {
    if project.is_empty() || project == "." || project == ".." || has_path_chars(project) {
        return Err(EndpointIdError::InvalidProject(project.to_string()));
    }
    Ok(())
}

impl EndpointId {
    /// Ids are used verbatim as store keys, so path separators are rejected.
    pub fn parse(raw: &str) -> Result<Self, EndpointIdError> {
        if has_path_chars(raw) {
            return Err(EndpointIdError::Malformed(raw.to_string()));
        }
        let Some(split) = raw.find('.') else {
            return Err(EndpointIdError::Malformed(raw.to_string()));
        };
        if split == 0 || split + 1 == raw.len() {
            return Err(EndpointIdError::Malformed(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            split,
        })
    }

    pub fn project(&self) -> &str {
        &self.raw[..self.split]
    }

    pub fn suffix(&self) -> &str {
        &self.raw[self.split + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Fails when the id was minted for a different project than the one the
    /// caller is scoped to.
    pub fn ensure_project(&self, project: &str) -> Result<(), EndpointIdError> {
        if self.project() != project {
            return Err(EndpointIdError::ProjectMismatch {
                project: project.to_string(),
                endpoint_id: self.raw.clone(),
            });
        }
        Ok(())
    }
}

impl FromStr for EndpointId {
    type Err = EndpointIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelEndpointMetadata {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Label keys as shown to users, without the stored `_` prefix.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelEndpointSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_class: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectStatus {
    pub state: String,
}

impl ObjectStatus {
    pub fn active() -> Self {
        Self {
            state: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEndpoint {
    pub metadata: ModelEndpointMetadata,
    pub spec: ModelEndpointSpec,
    pub status: ObjectStatus,
}

/// Current state of one endpoint as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEndpointState {
    pub id: String,
    pub endpoint: ModelEndpoint,
    #[serde(default)]
    pub first_request: Option<String>,
    #[serde(default)]
    pub last_request: Option<String>,
    #[serde(default)]
    pub error_count: Option<i64>,
    #[serde(default)]
    pub alert_count: Option<i64>,
    #[serde(default)]
    pub drift_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<Metric>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Feature>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelEndpointStateList {
    pub endpoints: Vec<ModelEndpointState>,
}
