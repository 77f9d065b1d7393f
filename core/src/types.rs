//! Domain entities of the pet-store API and the response envelope.
//!
//! # Design
//! These structs describe the *validated* shape of each entity. The client
//! never decodes straight into them: a reply is first kept as loose JSON in
//! an `Envelope<Value>` and only becomes an `Envelope<Pet>` (or similar) once
//! it passes the schema layer. Negative tests therefore still see whatever
//! the service actually sent.

use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{ApiError, Result};
use crate::schema::{assert_schema, validate, Schema, Validation};

/// Sale status of a pet. Any other string is a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStatus {
    Available,
    Pending,
    Sold,
}

impl PetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PetStatus::Available => "available",
            PetStatus::Pending => "pending",
            PetStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "available" => Ok(PetStatus::Available),
            "pending" => Ok(PetStatus::Pending),
            "sold" => Ok(PetStatus::Sold),
            other => Err(format!("unknown pet status: {other}")),
        }
    }
}

/// JSON Schema `integer` admits `3.0` as well as `3`; accept both so a value
/// that passes the schema also deserializes.
fn integral<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_i64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        _ => Err(D::Error::custom(format!("{number} is not a 64-bit integer"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A pet as stored by the service. `id` is assigned remotely and treated as
/// opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub name: String,
    pub photo_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PetStatus>,
}

/// Generic reply for non-pet results (delete confirmation, errors, uploads).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// HTTP status paired with the decoded body. Every client operation returns
/// one of these; status codes are never interpreted by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub status: u16,
    pub body: T,
}

impl Envelope<Value> {
    /// The `id` field of an object body, if present and integral.
    pub fn id(&self) -> Option<i64> {
        self.body.get("id").and_then(Value::as_i64)
    }

    /// Validate the body against `schema`, failing with
    /// `ApiError::SchemaViolation` when it does not conform.
    pub fn decode<T: DeserializeOwned>(&self, schema: &Schema<T>) -> Result<Envelope<T>> {
        let body = assert_schema(&self.body, schema)?;
        Ok(Envelope {
            status: self.status,
            body,
        })
    }

    /// Like `decode`, but hands back the tagged validation result.
    pub fn try_decode<T: DeserializeOwned>(&self, schema: &Schema<T>) -> Envelope<Validation<T>> {
        Envelope {
            status: self.status,
            body: validate(&self.body, schema),
        }
    }

    /// Ids of every element when the body is an array. Elements without an
    /// integral `id` are skipped.
    pub fn ids(&self) -> Vec<i64> {
        self.body
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(Value::as_i64))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TryFrom<Envelope<Value>> for Envelope<Pet> {
    type Error = ApiError;

    fn try_from(envelope: Envelope<Value>) -> Result<Self> {
        envelope.decode(&crate::schema::PET)
    }
}
