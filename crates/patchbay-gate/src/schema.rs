//! Per-category document schemas.
//!
//! The gate does not know what a valid document looks like; it asks a
//! [`Validator`] for the schema registered for the document's category.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use patchbay_types::FieldIssue;

/// Outcome of [`Schema::safe_parse`].
#[derive(Clone, Debug, PartialEq)]
pub enum SafeParse {
    Success(Value),
    Failure(Vec<FieldIssue>),
}

impl SafeParse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A document schema.
///
/// `parse` returns the (possibly normalised) document, or every offending
/// field.
pub trait Schema: Send + Sync {
    fn parse(&self, value: &Value) -> Result<Value, Vec<FieldIssue>>;

    fn safe_parse(&self, value: &Value) -> SafeParse {
        match self.parse(value) {
            Ok(data) => SafeParse::Success(data),
            Err(issues) => SafeParse::Failure(issues),
        }
    }
}

/// Looks up the schema for a category. Categories without a schema are not
/// validated.
pub trait Validator: Send + Sync {
    fn schema_for(&self, category: &str) -> Option<Arc<dyn Schema>>;
}

/// A fixed category → schema map.
#[derive(Clone, Default)]
pub struct StaticValidator {
    schemas: BTreeMap<String, Arc<dyn Schema>>,
}

impl StaticValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` for `category`, replacing any previous one.
    pub fn with_schema(mut self, category: impl Into<String>, schema: impl Schema + 'static) -> Self {
        self.schemas.insert(category.into(), Arc::new(schema));
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl Validator for StaticValidator {
    fn schema_for(&self, category: &str) -> Option<Arc<dyn Schema>> {
        self.schemas.get(category).cloned()
    }
}

impl std::fmt::Debug for StaticValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticValidator")
            .field("categories", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Requires the document to be an object holding every listed top-level key.
#[derive(Clone, Debug, Default)]
pub struct RequiredKeysSchema {
    keys: Vec<String>,
}

impl RequiredKeysSchema {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Schema for RequiredKeysSchema {
    fn parse(&self, value: &Value) -> Result<Value, Vec<FieldIssue>> {
        let Some(object) = value.as_object() else {
            return Err(vec![FieldIssue::new("", "expected an object")]);
        };
        let issues: Vec<FieldIssue> = self
            .keys
            .iter()
            .filter(|key| !object.contains_key(key.as_str()))
            .map(|key| FieldIssue::new(key.as_str(), "required"))
            .collect();
        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_keys_lists_every_missing_key() {
        let schema = RequiredKeysSchema::new(["id", "name", "hp"]);
        let issues = schema.parse(&json!({"name": "Knight"})).unwrap_err();
        assert_eq!(
            issues,
            vec![FieldIssue::new("id", "required"), FieldIssue::new("hp", "required")]
        );
    }

    #[test]
    fn required_keys_rejects_non_objects() {
        let schema = RequiredKeysSchema::new(["id"]);
        assert!(!schema.safe_parse(&json!([1, 2])).is_success());
    }

    #[test]
    fn safe_parse_success_returns_data() {
        let schema = RequiredKeysSchema::new(["id"]);
        let doc = json!({"id": "u1"});
        assert_eq!(schema.safe_parse(&doc), SafeParse::Success(doc.clone()));
    }

    #[test]
    fn static_validator_lookup() {
        let validator = StaticValidator::new().with_schema("units", RequiredKeysSchema::new(["id"]));
        assert!(validator.schema_for("units").is_some());
        assert!(validator.schema_for("items").is_none());
        assert_eq!(validator.categories().collect::<Vec<_>>(), vec!["units"]);
    }
}
