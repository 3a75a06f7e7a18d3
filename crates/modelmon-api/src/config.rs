use crate::error::ApiError;

pub const KV_API_ENV: &str = "V3IO_WEBAPI_PORT_8081_TCP";
pub const TSDB_API_ENV: &str = "FRAMESD_PORT_8081_TCP";
pub const DEFAULT_CONTAINER: &str = "projects";

/// Backing-store addresses resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub kv_api: String,
    pub tsdb_api: String,
    pub container: String,
}

impl StoreConfig {
    /// Both addresses are required. Service-link style `tcp://host:port`
    /// values are rewritten to `http://`.
    pub fn resolve(
        kv_api: Option<&str>,
        tsdb_api: Option<&str>,
        container: &str,
    ) -> Result<Self, ApiError> {
        let kv_api = required(kv_api, KV_API_ENV)?;
        let tsdb_api = required(tsdb_api, TSDB_API_ENV)?;
        if container.trim().is_empty() {
            return Err(ApiError::PreconditionFailed(
                "store container must not be empty".to_string(),
            ));
        }
        Ok(Self {
            kv_api,
            tsdb_api,
            container: container.trim().to_string(),
        })
    }

    /// Placeholder addresses for the in-memory stores, which ignore them.
    pub fn in_memory(container: &str) -> Self {
        Self {
            kv_api: "memory://kv".to_string(),
            tsdb_api: "memory://tsdb".to_string(),
            container: container.to_string(),
        }
    }
}

fn required(value: Option<&str>, env: &str) -> Result<String, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(to_http(v)),
        None => Err(ApiError::PreconditionFailed(format!(
            "Environment missing '{env}' parameter."
        ))),
    }
}

fn to_http(addr: &str) -> String {
    match addr.strip_prefix("tcp://") {
        Some(rest) => format!("http://{rest}"),
        None => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rewrites_tcp() {
        let cfg = StoreConfig::resolve(
            Some("tcp://10.0.0.1:8081"),
            Some("http://framesd:8081"),
            "projects",
        )
        .unwrap();
        assert_eq!(cfg.kv_api, "http://10.0.0.1:8081");
        assert_eq!(cfg.tsdb_api, "http://framesd:8081");
        assert_eq!(cfg.container, "projects");
    }

    #[test]
    fn test_resolve_missing_is_precondition_failure() {
        let err = StoreConfig::resolve(None, Some("x"), "projects").unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed(ref m) if m.contains(KV_API_ENV)));

        let err = StoreConfig::resolve(Some("x"), Some("  "), "projects").unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed(ref m) if m.contains(TSDB_API_ENV)));

        let err = StoreConfig::resolve(Some("x"), Some("y"), "").unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed(_)));
    }
}
