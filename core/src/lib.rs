//! Contract-testing client for the Swagger pet-store REST API.
//!
//! # Overview
//! `PetStoreClient` exposes one method per remote pet operation and returns
//! every reply as an `Envelope { status, body }` of decoded JSON. The
//! `schema` module checks such bodies against the canonical entity shapes,
//! and `fixtures` supplies sample pets for test scenarios.
//!
//! # Design
//! - Requests are built as plain data (`build_*`) and executed by a
//!   `Transport`; the default one is a ureq agent opened by `init()`.
//! - The client never interprets status codes and never retries; callers
//!   opt into `helpers::retry` explicitly.
//! - Configuration and logging are passed in (`Config`, `Logger`), there is
//!   no process-wide client state.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod fixtures;
pub mod helpers;
pub mod http;
pub mod logging;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::{IdPolicy, PetStoreClient};
pub use config::{Config, Environment};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use logging::{init_tracing, Logger, TracingLogger};
pub use schema::{assert_schema, validate, Schema, Validation, Violation, Violations};
pub use transport::{Transport, UreqTransport};
pub use types::{ApiResponse, Category, Envelope, Pet, PetStatus, Tag};
