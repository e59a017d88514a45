use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::errors::DriverError;
use crate::metrics::PENDING_ASYNC_OPERATIONS;

/// Completion signal of an asynchronous save or delete.
///
/// The write runs on the tokio runtime whether or not the handle is awaited;
/// dropping the handle detaches it.
#[derive(Debug)]
pub struct OperationHandle {
    operation: &'static str,
    table: &'static str,
    task: JoinHandle<Result<(), DriverError>>,
}

struct PendingGuard(&'static str);

impl PendingGuard {
    fn new(operation: &'static str) -> Self {
        PENDING_ASYNC_OPERATIONS.with_label_values(&[operation]).inc();
        Self(operation)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        PENDING_ASYNC_OPERATIONS.with_label_values(&[self.0]).dec();
    }
}

impl OperationHandle {
    /// Spawn `work` on the current tokio runtime.
    ///
    /// Panics when called outside a runtime, like `tokio::spawn`.
    pub(crate) fn spawn<F>(operation: &'static str, table: &'static str, work: F) -> Self
    where
        F: Future<Output = Result<(), DriverError>> + Send + 'static,
    {
        let guard = PendingGuard::new(operation);
        let task = tokio::spawn(async move {
            let _guard = guard;
            let result = work.await;
            if let Err(ref e) = result {
                warn!("Async {} on {} failed: {}", operation, table, e);
            }
            result
        });

        Self {
            operation,
            table,
            task,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the database acknowledged or rejected the write.
    pub async fn wait(self) -> Result<(), DriverError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(DriverError::Task(format!(
                "{} on {} did not complete: {}",
                self.operation, self.table, e
            ))),
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`. The write
    /// itself keeps running.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(timeout)),
        }
    }
}
