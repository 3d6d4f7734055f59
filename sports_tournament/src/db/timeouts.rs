//! Storage timeout helpers
//!
//! Wraps storage futures so a stuck connection surfaces as `TournamentError::Timeout`.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::tournament::{TournamentError, TournamentResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a storage operation with timeout
///
/// When the timeout fires the future is dropped, which rolls back any open transaction
/// it holds.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TournamentError::Timeout(duration)),
    }
}

/// Execute a storage operation with the default query timeout
pub async fn with_default_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
