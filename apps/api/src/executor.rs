//! Deadline-bounded execution of provider calls on a bounded worker pool.
//!
//! The operation runs as its own task. The caller gets whichever comes first,
//! completion or the deadline. The task is aborted on expiry and also when the
//! caller itself goes away, so an abandoned call neither reaches a later
//! request nor keeps holding a worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ExecutorError<E> {
    #[error("operation exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("operation failed: {0}")]
    Failed(E),

    #[error("worker task aborted: {0}")]
    Aborted(String),
}

/// Aborts the task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs futures under a deadline, at most `pool_size` at a time.
#[derive(Debug, Clone)]
pub struct TimeoutExecutor {
    permits: Arc<Semaphore>,
}

impl TimeoutExecutor {
    pub fn new(pool_size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
        }
    }

    /// Waiting for a free worker counts against `deadline`.
    pub async fn run<F, T, E>(&self, deadline: Duration, operation: F) -> Result<T, ExecutorError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        // Dropping the caller's future (client disconnect) drops the guard too.
        let mut task = AbortOnDrop(tokio::spawn(async move {
            // the semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            operation.await
        }));

        match tokio::time::timeout(deadline, &mut task.0).await {
            Ok(Ok(result)) => result.map_err(ExecutorError::Failed),
            Ok(Err(join_error)) => Err(ExecutorError::Aborted(join_error.to_string())),
            Err(_) => {
                warn!("Operation abandoned after {}ms deadline", deadline.as_millis());
                Err(ExecutorError::DeadlineExceeded(deadline))
            }
        }
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_returns_result_before_deadline() {
        let executor = TimeoutExecutor::new(2);
        let result: Result<u32, ExecutorError<String>> = executor
            .run(Duration::from_secs(5), async { Ok(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_propagates_operation_error() {
        let executor = TimeoutExecutor::new(2);
        let result: Result<(), _> = executor
            .run(Duration::from_secs(5), async { Err("boom".to_string()) })
            .await;
        assert!(matches!(result, Err(ExecutorError::Failed(msg)) if msg == "boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_waiting_for_operation() {
        let executor = TimeoutExecutor::new(2);
        let start = Instant::now();

        let result: Result<(), ExecutorError<String>> = executor
            .run(Duration::from_secs(30), async {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ExecutorError::DeadlineExceeded(_))));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_operation_never_completes_its_side_effect() {
        let executor = TimeoutExecutor::new(1);
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result: Result<(), ExecutorError<String>> = executor
            .run(Duration::from_secs(1), async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
        // the worker slot is released once the task is gone
        assert_eq!(executor.available_workers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_for_worker_counts_against_deadline() {
        let executor = TimeoutExecutor::new(1);

        let busy = executor.clone();
        tokio::spawn(async move {
            let _: Result<(), ExecutorError<String>> = busy
                .run(Duration::from_secs(60), async {
                    tokio::time::sleep(Duration::from_secs(50)).await;
                    Ok(())
                })
                .await;
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        let result: Result<(), ExecutorError<String>> = executor
            .run(Duration::from_secs(5), async { Ok(()) })
            .await;
        assert!(matches!(result, Err(ExecutorError::DeadlineExceeded(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_releases_worker() {
        let executor = TimeoutExecutor::new(1);

        let caller = executor.clone();
        let request = tokio::spawn(async move {
            let _: Result<(), ExecutorError<String>> = caller
                .run(Duration::from_secs(30), async {
                    tokio::time::sleep(Duration::from_secs(120)).await;
                    Ok(())
                })
                .await;
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(executor.available_workers(), 0);

        // client went away mid-call
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(executor.available_workers(), 1);

        let result: Result<(), ExecutorError<String>> = executor
            .run(Duration::from_secs(30), async { Ok(()) })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_operation_reports_aborted() {
        let executor = TimeoutExecutor::new(1);
        let result: Result<(), ExecutorError<String>> = executor
            .run(Duration::from_secs(5), async {
                if true {
                    panic!("provider exploded");
                }
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ExecutorError::Aborted(_))));
    }
}
