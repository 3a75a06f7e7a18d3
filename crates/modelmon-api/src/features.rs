use modelmon_common::Feature;

use crate::error::ApiError;

/// Decode the stored `features` attribute of an endpoint.
pub fn reconstruct_features(
    raw: Option<&str>,
    project: &str,
    endpoint_id: &str,
) -> Result<Vec<Feature>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ApiError::NotFound(format!(
            "Endpoint features not found - projects/{project}/model-endpoints/{endpoint_id}/features"
        )));
    };
    serde_json::from_str(raw).map_err(|source| ApiError::Deserialization {
        what: "endpoint features",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct() {
        let raw = r#"[{"name":"age","type":"int"},{"name":"income","weight":0.3}]"#;
        let features = reconstruct_features(Some(raw), "p", "p.1").unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name, "age");
        assert_eq!(features[1].weight, Some(0.3));
    }

    #[test]
    fn test_missing_is_not_found() {
        for raw in [None, Some(""), Some("   ")] {
            let err = reconstruct_features(raw, "p", "p.1").unwrap_err();
            assert!(matches!(err, ApiError::NotFound(ref m) if m.ends_with("/features")));
        }
    }

    #[test]
    fn test_bad_payload_is_deserialization_error() {
        for raw in ["{oops", r#"{"name":"x"}"#, r#"[{"name":"x","extra":1}]"#] {
            assert!(matches!(
                reconstruct_features(Some(raw), "p", "p.1"),
                Err(ApiError::Deserialization { .. })
            ));
        }
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert!(reconstruct_features(Some("[]"), "p", "p.1").unwrap().is_empty());
    }
}
