//! Executes `HttpRequest`s against the network.
//!
//! # Design
//! `Transport` is the seam between the pure request builders and real I/O.
//! `UreqTransport` is the transport context opened by `PetStoreClient::init`:
//! one `ureq::Agent` (connection pool, global timeout) plus the default JSON
//! headers applied to every request that does not set its own.

use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Headers every request carries unless it overrides them.
pub const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("accept", "application/json"),
    ("content-type", "application/json"),
];

/// Runs one HTTP exchange. Non-2xx replies are responses, not errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
    default_headers: Vec<(String, String)>,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        // Status codes are handed back as data so tests can assert on them.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            default_headers: DEFAULT_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let headers = merge_headers(&self.default_headers, &request.headers);
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(url), &headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(url), &headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| transport_error(url, e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(url: &str, source: ureq::Error) -> ApiError {
    ApiError::Transport {
        url: url.to_string(),
        source: Box::new(source),
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Defaults first, minus any name the request sets itself, then the
/// request's own headers. Names compare case-insensitively.
fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    defaults
        .iter()
        .filter(|(name, _)| !overrides.iter().any(|(o, _)| o.eq_ignore_ascii_case(name)))
        .chain(overrides.iter())
        .cloned()
        .collect()
}
