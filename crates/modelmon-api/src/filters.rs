use modelmon_store::filter::is_valid_field_name;
use modelmon_store::{FilterExpression, Predicate};

use crate::error::ApiError;

/// Stored label attributes carry this prefix to stay clear of reserved
/// attribute names.
pub const LABEL_PREFIX: char = '_';

/// Turn one `label` query token into a predicate.
///
/// `foo` and `_foo` become `exists(_foo)`; `foo=bar` and `_foo=bar` become
/// `_foo=='bar'`. Whitespace around key and value is trimmed.
pub fn label_predicate(token: &str) -> Result<Predicate, ApiError> {
    let token = token.trim();
    let prefixed = if token.starts_with(LABEL_PREFIX) {
        token.to_string()
    } else {
        format!("{LABEL_PREFIX}{token}")
    };

    let (field, value) = match prefixed.split_once('=') {
        Some((k, v)) => (k.trim().to_string(), Some(v.trim().to_string())),
        None => (prefixed.clone(), None),
    };

    if field.len() <= LABEL_PREFIX.len_utf8() || !is_valid_field_name(&field) {
        return Err(ApiError::InvalidArgument(format!(
            "invalid label filter '{token}'"
        )));
    }

    Ok(match value {
        Some(v) => Predicate::equals(field, v),
        None => Predicate::exists(field),
    })
}

/// Flatten repeated `label` values, treating commas as extra separators.
pub fn split_label_values<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filter for the endpoint table: project, then function, model, tag, then
/// labels in input order.
pub fn build_endpoint_filter(
    project: &str,
    function: Option<&str>,
    model: Option<&str>,
    tag: Option<&str>,
    labels: &[String],
) -> Result<FilterExpression, ApiError> {
    let mut filter = FilterExpression::new().and(Predicate::equals("project", project));

    for (field, value) in [("function", function), ("model", model), ("tag", tag)] {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            filter.push(Predicate::equals(field, v));
        }
    }

    for label in labels {
        filter.push(label_predicate(label)?);
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefix_is_idempotent() {
        assert_eq!(label_predicate("foo").unwrap(), Predicate::exists("_foo"));
        assert_eq!(label_predicate("_foo").unwrap(), Predicate::exists("_foo"));
        assert_eq!(
            label_predicate("foo=bar").unwrap(),
            Predicate::equals("_foo", "bar")
        );
        assert_eq!(
            label_predicate("_foo=bar").unwrap(),
            Predicate::equals("_foo", "bar")
        );
        assert_eq!(label_predicate("_foo=bar").unwrap().render(), "_foo=='bar'");
        assert_eq!(label_predicate("foo").unwrap().render(), "exists(_foo)");
    }

    #[test]
    fn test_label_whitespace_trimmed() {
        assert_eq!(
            label_predicate(" foo = bar ").unwrap(),
            Predicate::equals("_foo", "bar")
        );
    }

    #[test]
    fn test_label_rejects_bad_keys() {
        for bad in ["", "_", "=bar", "foo bar", "foo)=x", "a'b"] {
            assert!(
                matches!(label_predicate(bad), Err(ApiError::InvalidArgument(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_split_label_values() {
        let out = split_label_values(["a=1,b", " c ", "", "d=2,,"]);
        assert_eq!(out, vec!["a=1", "b", "c", "d=2"]);
    }

    #[test]
    fn test_filter_order() {
        let labels = vec!["team=risk".to_string(), "canary".to_string()];
        let f = build_endpoint_filter("fraud", Some("serve"), Some("xgb"), Some("v2"), &labels)
            .unwrap();
        assert_eq!(
            f.render(),
            "project=='fraud' AND function=='serve' AND model=='xgb' AND tag=='v2' \
             AND _team=='risk' AND exists(_canary)"
        );
    }

    #[test]
    fn test_filter_skips_empty_optionals() {
        let f = build_endpoint_filter("fraud", None, Some(""), Some("latest"), &[]).unwrap();
        assert_eq!(f.render(), "project=='fraud' AND tag=='latest'");
    }

    #[test]
    fn test_filter_escapes_values() {
        let f = build_endpoint_filter("fraud", None, Some("x' OR '1'=='1"), None, &[]).unwrap();
        assert_eq!(
            f.render(),
            r"project=='fraud' AND model=='x\' OR \'1\'==\'1'"
        );
    }
}
