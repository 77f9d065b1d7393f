//! Logging capability injected into the client.
//!
//! The client only knows the `Logger` trait. `TracingLogger` is the default
//! and forwards to `tracing`; `init_tracing` installs a subscriber for
//! binaries and test suites that want to see the output.

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub const LOG_TARGET: &str = "petstore";

pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, data: &Value);
    fn info(&self, message: &str, data: &Value);
    fn warn(&self, message: &str, data: &Value);
    fn error(&self, message: &str, data: &Value);
}

/// Emits each call as a `tracing` event on the `petstore` target with the
/// data attached as a JSON field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, data: &Value) {
        tracing::debug!(target: LOG_TARGET, data = %data, "{message}");
    }

    fn info(&self, message: &str, data: &Value) {
        tracing::info!(target: LOG_TARGET, data = %data, "{message}");
    }

    fn warn(&self, message: &str, data: &Value) {
        tracing::warn!(target: LOG_TARGET, data = %data, "{message}");
    }

    fn error(&self, message: &str, data: &Value) {
        tracing::error!(target: LOG_TARGET, data = %data, "{message}");
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` wins; otherwise the level is
/// `debug` when `config.debug` is set and `info` when not. Safe to call more
/// than once: later calls leave the first subscriber in place.
pub fn init_tracing(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_tracing_is_idempotent() {
        let config = Config::default();
        init_tracing(&config);
        init_tracing(&config);
        TracingLogger.info("logger works after repeated init", &json!({"ok": true}));
    }
}
