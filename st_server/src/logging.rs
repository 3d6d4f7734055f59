//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber that also receives the `log` records emitted by the
//! scheduling library, plus helpers for consistently shaped operation events.

use sports_tournament::TournamentError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use st_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed tournament operation
///
/// # Arguments
///
/// * `request_id` - Correlation ID of the HTTP request
/// * `operation` - Operation name, e.g. `advance`
/// * `target_id` - Phase, match or tournament the operation ran on
/// * `duration_ms` - Duration in milliseconds
pub fn log_operation(request_id: &str, operation: &str, target_id: i64, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            request_id = request_id,
            operation = operation,
            target_id = target_id,
            duration_ms = duration_ms,
            "Slow tournament operation"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            operation = operation,
            target_id = target_id,
            duration_ms = duration_ms,
            "Tournament operation completed"
        );
    }
}

/// Log an operation the engine refused, or failed to complete
pub fn log_domain_rejection(
    request_id: &str,
    operation: &str,
    target_id: i64,
    error: &TournamentError,
) {
    if error.is_client_error() {
        tracing::info!(
            request_id = request_id,
            operation = operation,
            target_id = target_id,
            error = %error,
            "Tournament operation rejected"
        );
    } else {
        tracing::error!(
            request_id = request_id,
            operation = operation,
            target_id = target_id,
            error = %error,
            "Tournament operation failed"
        );
    }
}
