//! Registry and worker pool for background operations.

use super::status::AsyncOperationStatus;
use super::task::{AsyncOperation, OperationHandle, OperationState};
use crate::config::OperationRunnerConfig;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Runs background operations on the tokio runtime and keeps their status
/// available for polling.
///
/// At most `max_concurrent_operations` operations execute at once; the rest
/// wait for a permit.
#[derive(Debug)]
pub struct AsyncOperationRunner {
    config: OperationRunnerConfig,
    next_id: AtomicU64,
    operations: DashMap<u64, Arc<AsyncOperation>>,
    permits: Arc<Semaphore>,
}

impl AsyncOperationRunner {
    /// Create a new runner.
    pub fn new(config: OperationRunnerConfig) -> Result<Self> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations));
        Ok(Self {
            config,
            next_id: AtomicU64::new(1),
            operations: DashMap::new(),
            permits,
        })
    }

    /// Create with default config.
    pub fn with_defaults() -> Self {
        let config = OperationRunnerConfig::default();
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations));
        Self {
            config,
            next_id: AtomicU64::new(1),
            operations: DashMap::new(),
            permits,
        }
    }

    pub fn config(&self) -> &OperationRunnerConfig {
        &self.config
    }

    /// Reserve a fresh operation id.
    pub fn request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register `operation` and start it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, operation: AsyncOperation) -> Result<u64> {
        let id = operation.id();
        let operation = Arc::new(operation);

        match self.operations.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::DuplicateOperation(id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(operation.clone());
            }
        }

        let permits = self.permits.clone();
        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await.ok();
            operation.run().await;
        });

        info!(id, "Submitted operation");
        self.trim_history();
        Ok(id)
    }

    /// Build an operation from an async closure under a fresh id and start it.
    pub fn submit_fn<F, Fut>(&self, description: impl Into<String>, work: F) -> Result<u64>
    where
        F: Fn(OperationHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let id = self.request_id();
        self.submit(AsyncOperation::from_fn(id, description, work))
    }

    /// Snapshot of an operation's status.
    pub fn status(&self, id: u64) -> Result<AsyncOperationStatus> {
        self.get(id).map(|op| op.status())
    }

    pub fn is_complete(&self, id: u64) -> Result<bool> {
        self.get(id).map(|op| op.status().is_complete())
    }

    /// Ask an operation to stop. Stopping a finished operation is a no-op.
    pub fn stop(&self, id: u64) -> Result<()> {
        let op = self.get(id)?;
        op.stop();
        debug!(id, "Stop requested");
        Ok(())
    }

    /// Ids of registered operations in ascending order.
    ///
    /// Completed operations are only listed when `show_complete` is set.
    pub fn list(&self, show_complete: bool) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .operations
            .iter()
            .filter(|entry| show_complete || !entry.value().status().is_complete())
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Wait until an operation completes and return its final status.
    pub async fn wait_for_completion(
        &self,
        id: u64,
        timeout: Duration,
    ) -> Result<AsyncOperationStatus> {
        let op = self.get(id)?;
        tokio::time::timeout(timeout, op.wait_for_completion())
            .await
            .map_err(|_| Error::Timeout)?;
        Ok(op.status())
    }

    /// Stop every operation that has not completed.
    pub fn stop_all(&self) {
        for entry in self.operations.iter() {
            if entry.value().state() != OperationState::Complete {
                entry.value().stop();
            }
        }
    }

    fn get(&self, id: u64) -> Result<Arc<AsyncOperation>> {
        self.operations
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::OperationNotFound(id))
    }

    /// Drop the oldest completed operations beyond `max_history`.
    fn trim_history(&self) {
        let mut completed: Vec<u64> = self
            .operations
            .iter()
            .filter(|entry| entry.value().state() == OperationState::Complete)
            .map(|entry| *entry.key())
            .collect();

        if completed.len() <= self.config.max_history {
            return;
        }

        completed.sort_unstable();
        let excess = completed.len() - self.config.max_history;
        for id in completed.into_iter().take(excess) {
            self.operations.remove(&id);
        }
    }
}
