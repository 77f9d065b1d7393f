//! Error types for the pet-store client.
//!
//! # Design
//! Status codes are data, not errors: a 404 or 500 reply comes back inside an
//! `Envelope`. Errors cover only what prevents an envelope from being produced
//! (no transport, network failure, undecodable body) or what a test asserts
//! on top of one (schema violations, unexpected status).

use thiserror::Error;

use crate::schema::Violations;

/// Maximum number of characters of a bad body kept in `BadResponseBody`.
pub const BODY_SNIPPET_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum ApiError {
    /// An operation was invoked before `init()` (or after `dispose()`).
    #[error("PetStoreClient not initialized. Call init() first.")]
    Uninitialized,

    /// The request never produced a response.
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The response body was not JSON.
    #[error("Failed to parse response as JSON. Status: {status}, Body: {snippet}")]
    BadResponseBody { status: u16, snippet: String },

    #[error("schema violation for {schema}: {violations}")]
    SchemaViolation {
        schema: &'static str,
        violations: Violations,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Expected status {expected} but got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },
}

impl ApiError {
    /// Build a `BadResponseBody` keeping at most `BODY_SNIPPET_LEN` characters.
    pub fn bad_body(status: u16, body: &str) -> Self {
        ApiError::BadResponseBody {
            status,
            snippet: body.chars().take(BODY_SNIPPET_LEN).collect(),
        }
    }

    /// Field-level violations carried by a schema error.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            ApiError::SchemaViolation { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_body_truncates_snippet() {
        let body = "x".repeat(1000);
        let err = ApiError::bad_body(502, &body);
        match err {
            ApiError::BadResponseBody { status, snippet } => {
                assert_eq!(status, 502);
                assert_eq!(snippet.len(), BODY_SNIPPET_LEN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_body_keeps_short_bodies_intact() {
        let err = ApiError::bad_body(200, "<html>oops</html>");
        assert_eq!(
            err.to_string(),
            "Failed to parse response as JSON. Status: 200, Body: <html>oops</html>"
        );
    }
}
