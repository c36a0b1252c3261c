//! Retry helper for idempotent reads.

use campus_common::{AppResult, get_metrics};
use std::future::Future;
use tracing::warn;

/// Run a read, retrying once if the datastore fails.
///
/// Only for reads: writes are never retried.
pub async fn retry_read<T, F, Fut>(operation: &'static str, mut read: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match read().await {
        Err(e) if e.is_database() => {
            warn!(operation, error = %e, "Datastore read failed, retrying once");
            get_metrics().record_read_retry();
            read().await
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_common::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_one_failure() {
        let calls = AtomicU32::new(0);
        let result = retry_read("test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Database("connection reset".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_second_failure() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_read("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Database("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_database_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_read("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::NotFound("x".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
