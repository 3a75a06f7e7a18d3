//! Typed predicates for the store's filter-expression grammar.
//!
//! Expressions are kept as data until they reach a client, which renders
//! them with [`FilterExpression::render`]. In-memory stores evaluate them
//! directly with [`FilterExpression::matches`].

use std::fmt;

use serde_json::Value;

use crate::types::Attributes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals { field: String, value: String },
    Exists { field: String },
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Predicate::Exists {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Equals { field, .. } | Predicate::Exists { field } => field,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Predicate::Equals { field, value } => format!("{field}=={}", quote(value)),
            Predicate::Exists { field } => format!("exists({field})"),
        }
    }

    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Predicate::Equals { field, value } => attributes
                .get(field)
                .and_then(scalar_to_string)
                .is_some_and(|v| v == *value),
            Predicate::Exists { field } => attributes.contains_key(field),
        }
    }
}

/// Predicates conjoined with `AND`, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    predicates: Vec<Predicate>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn render(&self) -> String {
        self.predicates
            .iter()
            .map(Predicate::render)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// An empty expression matches everything.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.predicates.iter().all(|p| p.matches(attributes))
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Attribute names the grammar accepts unquoted.
pub fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
