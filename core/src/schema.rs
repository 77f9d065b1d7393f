//! Response-shape validation for pet-store entities.
//!
//! # Design
//! Each entity shape is a JSON Schema document compiled once into a
//! `jsonschema::Validator` and wrapped in a `Schema<T>` that remembers which
//! Rust type a conforming value becomes. Two entry points mirror each other:
//! `validate` never fails and returns a tagged `Validation`, `assert_schema`
//! returns the typed value or `ApiError::SchemaViolation`. Both report every
//! field-level violation, not just the first.
//!
//! Extra properties are allowed, matching how the service adds fields over
//! time; they are dropped from the typed value.

use std::fmt;
use std::marker::PhantomData;
use std::sync::LazyLock;

use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{ApiError, Result};
use crate::types::{ApiResponse, Category, Pet, Tag};

/// One reason a value does not conform. `path` is a JSON pointer into the
/// instance (`""` for the root, `/photoUrls/0` for an element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every violation found in one value, in validator order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// True if any violation points at `path` or below it.
    pub fn touches(&self, path: &str) -> bool {
        self.0.iter().any(|v| v.path.starts_with(path))
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Outcome of `validate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Success(T),
    Failure(Violations),
}

impl<T> Validation<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Validation::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Validation::Success(data) => Some(data),
            Validation::Failure(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&Violations> {
        match self {
            Validation::Success(_) => None,
            Validation::Failure(violations) => Some(violations),
        }
    }
}

/// A compiled shape whose conforming values deserialize into `T`.
pub struct Schema<T> {
    name: &'static str,
    validator: Validator,
    _target: PhantomData<fn() -> T>,
}

impl<T> Schema<T> {
    /// Compile `document`. Fails only when the document itself is not a
    /// valid JSON Schema.
    pub fn new(name: &'static str, document: Value) -> Result<Self> {
        let validator = jsonschema::validator_for(&document).map_err(|e| {
            ApiError::SchemaViolation {
                schema: name,
                violations: Violations(vec![Violation {
                    path: String::new(),
                    message: format!("invalid schema document: {e}"),
                }]),
            }
        })?;
        Ok(Self {
            name,
            validator,
            _target: PhantomData,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn violations(&self, data: &Value) -> Violations {
        Violations(
            self.validator
                .iter_errors(data)
                .map(|e| Violation {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        )
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("name", &self.name).finish()
    }
}

// Integers that also fit the `i64` fields of the typed entities.
fn int64_document() -> Value {
    json!({ "type": "integer", "minimum": i64::MIN, "maximum": i64::MAX })
}

fn category_document() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": int64_document(),
            "name": { "type": "string" }
        }
    })
}

// Tags share the category shape.
fn tag_document() -> Value {
    category_document()
}

fn pet_document() -> Value {
    json!({
        "type": "object",
        "required": ["name", "photoUrls"],
        "properties": {
            "id": int64_document(),
            "category": category_document(),
            "name": { "type": "string" },
            "photoUrls": { "type": "array", "items": { "type": "string" } },
            "tags": { "type": "array", "items": tag_document() },
            "status": { "type": "string", "enum": ["available", "pending", "sold"] }
        }
    })
}

fn api_response_document() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": int64_document(),
            "type": { "type": "string" },
            "message": { "type": "string" }
        }
    })
}

fn compiled<T>(name: &'static str, document: Value) -> Schema<T> {
    // The documents above are literals; failing to compile one is a bug in
    // this module, not a runtime condition.
    Schema::new(name, document).unwrap_or_else(|e| panic!("built-in schema {name}: {e}"))
}

pub static CATEGORY: LazyLock<Schema<Category>> =
    LazyLock::new(|| compiled("Category", category_document()));

pub static TAG: LazyLock<Schema<Tag>> = LazyLock::new(|| compiled("Tag", tag_document()));

pub static PET: LazyLock<Schema<Pet>> = LazyLock::new(|| compiled("Pet", pet_document()));

pub static PETS: LazyLock<Schema<Vec<Pet>>> = LazyLock::new(|| {
    compiled("Pet[]", json!({ "type": "array", "items": pet_document() }))
});

pub static API_RESPONSE: LazyLock<Schema<ApiResponse>> =
    LazyLock::new(|| compiled("ApiResponse", api_response_document()));

/// Check `data` against `schema`. Never fails; non-conforming data yields
/// `Validation::Failure` listing every violation.
pub fn validate<T: DeserializeOwned>(data: &Value, schema: &Schema<T>) -> Validation<T> {
    let violations = schema.violations(data);
    if !violations.is_empty() {
        return Validation::Failure(violations);
    }
    match T::deserialize(data) {
        Ok(value) => Validation::Success(value),
        Err(e) => Validation::Failure(Violations(vec![Violation {
            path: String::new(),
            message: e.to_string(),
        }])),
    }
}

/// Check `data` against `schema` and return the typed value, or fail with
/// `ApiError::SchemaViolation`.
pub fn assert_schema<T: DeserializeOwned>(data: &Value, schema: &Schema<T>) -> Result<T> {
    match validate(data, schema) {
        Validation::Success(value) => Ok(value),
        Validation::Failure(violations) => Err(ApiError::SchemaViolation {
            schema: schema.name,
            violations,
        }),
    }
}
