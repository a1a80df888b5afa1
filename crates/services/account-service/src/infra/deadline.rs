//! Bounded store calls.

use std::future::Future;
use std::time::Duration;

use common::{AppError, AppResult};

/// Run a store call, failing with `Transient` once `limit` elapses.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "Store call timed out"
            );
            Err(AppError::transient(format!("{} timed out", operation)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_call_becomes_transient() {
        let result: AppResult<()> = bounded(Duration::from_millis(10), "load account", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Transient(_))));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = bounded(Duration::from_secs(1), "load account", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
