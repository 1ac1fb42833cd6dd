//! Schema registry and validation.
//!
//! Validation logic is delegated entirely to the `jsonschema` crate; this
//! module only owns the name -> schema registry and translates validator
//! output into the SDK's error shapes.

use std::collections::HashMap;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{Result, SdkError};

/// Outcome of validating a document: an empty violation list means the
/// document passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub violations: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

struct RegisteredSchema {
    raw: Value,
    compiled: JSONSchema,
}

/// Mapping from configuration name to a loaded, compiled JSON-schema
/// document. Populated on demand by `load_schema`, never refreshed
/// automatically; lives as long as the owning client.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, RegisteredSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store a schema under `name`, overwriting any prior entry.
    pub fn register(&mut self, name: &str, schema: Value) -> Result<()> {
        let compiled = JSONSchema::compile(&schema).map_err(|e| SdkError::SchemaCompile {
            name: name.to_string(),
            details: e.to_string(),
        })?;
        self.schemas.insert(
            name.to_string(),
            RegisteredSchema {
                raw: schema,
                compiled,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// The raw schema document as loaded from the service.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name).map(|s| &s.raw)
    }

    /// Validate `data` against the schema registered under `name`.
    ///
    /// An unregistered name is a usage error, not a validation result; the
    /// caller never sees an outcome pair for a schema that was never loaded.
    pub fn validate(&self, data: &Value, name: &str) -> Result<ValidationOutcome> {
        let schema = self
            .schemas
            .get(name)
            .ok_or_else(|| SdkError::SchemaNotLoaded {
                name: name.to_string(),
            })?;

        let violations = match schema.compiled.validate(data) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|e| e.to_string()).collect(),
        };

        Ok(ValidationOutcome { violations })
    }

    /// Validate and convert a failing outcome into `SdkError::Validation`.
    /// Used by the client operations, which treat an invalid document as a
    /// hard failure.
    pub fn check(&self, data: &Value, name: &str) -> Result<()> {
        let outcome = self.validate(data, name)?;
        if outcome.is_valid() {
            Ok(())
        } else {
            Err(SdkError::Validation {
                name: name.to_string(),
                violations: outcome.violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn display_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "width": {"type": "integer", "minimum": 1},
                "height": {"type": "integer", "minimum": 1}
            },
            "required": ["width", "height"]
        })
    }

    #[test]
    fn test_register_and_validate_pass() {
        let mut registry = SchemaRegistry::new();
        registry.register("display", display_schema()).unwrap();

        let outcome = registry
            .validate(&json!({"width": 800, "height": 600}), "display")
            .unwrap();
        assert!(outcome.is_valid());
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_validate_fail_reports_violations() {
        let mut registry = SchemaRegistry::new();
        registry.register("display", display_schema()).unwrap();

        let outcome = registry
            .validate(&json!({"width": "wide"}), "display")
            .unwrap();
        assert!(!outcome.is_valid());
        // Missing "height" and the wrong type for "width"
        assert!(outcome.violations.len() >= 2);
    }

    #[test]
    fn test_validate_unregistered_is_usage_error() {
        let registry = SchemaRegistry::new();
        let result = registry.validate(&json!({}), "unregistered");
        match result {
            Err(SdkError::SchemaNotLoaded { name }) => assert_eq!(name, "unregistered"),
            other => panic!("Expected SchemaNotLoaded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_register_overwrites_prior_entry() {
        let mut registry = SchemaRegistry::new();
        registry
            .register("display", json!({"type": "object"}))
            .unwrap();
        registry
            .register("display", json!({"type": "array"}))
            .unwrap();

        let outcome = registry.validate(&json!([]), "display").unwrap();
        assert!(outcome.is_valid());
        let outcome = registry.validate(&json!({}), "display").unwrap();
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_register_invalid_schema() {
        let mut registry = SchemaRegistry::new();
        let result = registry.register("broken", json!({"type": "no-such-type"}));
        match result {
            Err(SdkError::SchemaCompile { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("Expected SchemaCompile, got {:?}", other.map(|_| ())),
        }
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_check_converts_failure_to_error() {
        let mut registry = SchemaRegistry::new();
        registry.register("display", display_schema()).unwrap();

        assert!(registry
            .check(&json!({"width": 800, "height": 600}), "display")
            .is_ok());

        let err = registry.check(&json!({}), "display").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_raw_schema_returned() {
        let mut registry = SchemaRegistry::new();
        let schema = display_schema();
        registry.register("display", schema.clone()).unwrap();
        assert_eq!(registry.raw("display"), Some(&schema));
        assert_eq!(registry.raw("other"), None);
    }
}
