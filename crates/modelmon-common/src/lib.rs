pub mod endpoint;
pub mod feature;
pub mod metric;
pub mod telemetry;

pub use endpoint::{
    validate_project, EndpointId, EndpointIdError, ModelEndpoint, ModelEndpointMetadata,
    ModelEndpointSpec, ModelEndpointState, ModelEndpointStateList, ObjectStatus,
};
pub use feature::{Feature, FeatureStats};
pub use metric::Metric;
