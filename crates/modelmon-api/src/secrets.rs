use axum::http::HeaderMap;

use modelmon_store::Credentials;

use crate::config::StoreConfig;
use crate::error::ApiError;

pub const SESSION_KEY_HEADER: &str = "X-V3io-Session-Key";

/// Combine the caller's session key with the configured store addresses.
pub fn resolve_credentials(headers: &HeaderMap, config: &StoreConfig) -> Result<Credentials, ApiError> {
    let session_key = headers
        .get(SESSION_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    if session_key.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Request header missing '{SESSION_KEY_HEADER}' parameter."
        )));
    }

    Ok(Credentials {
        session_key: session_key.to_string(),
        kv_api: config.kv_api.clone(),
        tsdb_api: config.tsdb_api.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> StoreConfig {
        StoreConfig::resolve(Some("http://kv"), Some("http://tsdb"), "projects").unwrap()
    }

    #[test]
    fn test_resolve_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("x-v3io-session-key", HeaderValue::from_static("abc"));
        let creds = resolve_credentials(&headers, &config()).unwrap();
        assert_eq!(creds.session_key, "abc");
        assert_eq!(creds.kv_api, "http://kv");
        assert_eq!(creds.tsdb_api, "http://tsdb");
    }

    #[test]
    fn test_missing_header_is_bad_request() {
        let err = resolve_credentials(&HeaderMap::new(), &config()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let mut headers = HeaderMap::new();
        headers.insert("x-v3io-session-key", HeaderValue::from_static("  "));
        assert!(matches!(
            resolve_credentials(&headers, &config()),
            Err(ApiError::BadRequest(_))
        ));
    }
}
