//! A unit of background work with an observable status.

use super::status::AsyncOperationStatus;
use crate::error::{Error, Result};
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle position of an [`AsyncOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Constructed, `run` not called yet.
    Created,
    /// Work is executing.
    Running,
    /// `run` finished, with or without a failure.
    Complete,
}

/// The work executed by an [`AsyncOperation`].
#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    /// Do the work. Errors are captured on the status, never re-raised.
    async fn operate(&self, handle: &OperationHandle) -> Result<()>;

    /// Called by [`AsyncOperation::stop`] while the work may still be running.
    ///
    /// The cancellation token seen by [`OperationHandle`] is already
    /// cancelled when this runs.
    fn on_stop(&self) {}
}

/// What the work sees of its own operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    status: Arc<RwLock<AsyncOperationStatus>>,
    cancellation: CancellationToken,
}

impl OperationHandle {
    /// Append a status message.
    pub fn update_status(&self, message: impl Into<String>) {
        self.status.write().record(message);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Return `Error::Cancelled` once the operation has been stopped.
    ///
    /// Work should call this between remote calls.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the operation is stopped.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

struct FnOperation<F> {
    work: F,
}

#[async_trait::async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn(OperationHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn operate(&self, handle: &OperationHandle) -> Result<()> {
        (self.work)(handle.clone()).await
    }
}

/// A background operation: work plus the status record observers poll.
///
/// `run` executes at most once. Failures of the work are stored on the
/// status and never returned to the caller of `run`.
pub struct AsyncOperation {
    status: Arc<RwLock<AsyncOperationStatus>>,
    state: watch::Sender<OperationState>,
    cancellation: CancellationToken,
    operation: Box<dyn Operation>,
}

impl AsyncOperation {
    /// Create an operation running `operation`.
    pub fn new(
        id: u64,
        description: impl Into<String>,
        operation: impl Operation + 'static,
    ) -> Self {
        let (state, _) = watch::channel(OperationState::Created);
        Self {
            status: Arc::new(RwLock::new(AsyncOperationStatus::new(id, description))),
            state,
            cancellation: CancellationToken::new(),
            operation: Box::new(operation),
        }
    }

    /// Create an operation from an async closure.
    pub fn from_fn<F, Fut>(id: u64, description: impl Into<String>, work: F) -> Self
    where
        F: Fn(OperationHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(id, description, FnOperation { work })
    }

    pub fn id(&self) -> u64 {
        self.status.read().id()
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> AsyncOperationStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> OperationState {
        *self.state.borrow()
    }

    /// Append a status message.
    pub fn update_status(&self, message: impl Into<String>) {
        self.status.write().record(message);
    }

    /// Set the completion flag. Idempotent.
    pub fn mark_complete(&self) {
        self.status.write().mark_complete();
    }

    fn handle(&self) -> OperationHandle {
        OperationHandle {
            status: self.status.clone(),
            cancellation: self.cancellation.clone(),
        }
    }

    /// Execute the operation.
    ///
    /// Records a "started" message, runs the work, captures any failure,
    /// records a "finished" message and marks the status complete. Calling
    /// `run` a second time does nothing.
    pub async fn run(&self) {
        // Only the state transition happens under the watch lock; the status
        // lock is never taken while it is held.
        let started = self.state.send_if_modified(|state| {
            if *state != OperationState::Created {
                return false;
            }
            *state = OperationState::Running;
            true
        });
        if !started {
            warn!(id = self.id(), "Operation already ran, ignoring");
            return;
        }
        let message = format!("started {}", self.status.read());
        self.update_status(message);

        let handle = self.handle();
        let result = if handle.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            AssertUnwindSafe(self.operation.operate(&handle))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::Internal(panic_message(panic))))
        };

        if let Err(e) = result {
            info!(id = self.id(), error = %e, "Operation failed");
            self.status.write().capture_failure(e);
        }

        let message = format!("finished {}", self.status.read());
        self.update_status(message);
        self.mark_complete();
        self.state.send_replace(OperationState::Complete);

        debug!(id = self.id(), "Operation complete");
    }

    /// Ask the operation to stop.
    ///
    /// Safe to call at any time and any number of times. Work observes the
    /// request at its next checkpoint; nothing is interrupted forcibly.
    pub fn stop(&self) {
        let already_stopped = self.cancellation.is_cancelled();
        self.cancellation.cancel();

        if already_stopped || self.state() == OperationState::Complete {
            return;
        }

        debug!(id = self.id(), state = ?self.state(), "Stopping operation");
        self.operation.on_stop();
    }

    /// Resolves once `run` has completed.
    pub async fn wait_for_completion(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == OperationState::Complete).await;
    }
}

impl std::fmt::Debug for AsyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        let state = self.state();
        f.debug_struct("AsyncOperation")
            .field("status", &status)
            .field("state", &state)
            .finish()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("operation panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_successful_run() {
        let op = AsyncOperation::from_fn(1, "noop", |handle| async move {
            handle.update_status("halfway");
            Ok(())
        });
        assert_eq!(op.state(), OperationState::Created);

        op.run().await;

        let status = op.status();
        assert!(status.is_complete());
        assert!(!status.has_failed());
        assert_eq!(op.state(), OperationState::Complete);

        let messages = status.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("started "));
        assert!(messages[0].contains("noop"));
        assert_eq!(messages[1], "halfway");
        assert!(messages[2].starts_with("finished "));
    }

    #[tokio::test]
    async fn test_failure_is_captured_not_raised() {
        let op = AsyncOperation::from_fn(2, "failing", |_| async {
            Err(Error::Internal("boom".into()))
        });

        op.run().await;

        let status = op.status();
        assert!(status.is_complete());
        assert_eq!(status.failure().unwrap().to_string(), "internal error: boom");
        assert!(status.latest().unwrap().starts_with("finished "));
        assert!(status.latest().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let op = AsyncOperation::from_fn(3, "panicking", |_| async {
            let owners: Vec<u32> = Vec::new();
            if owners.is_empty() {
                panic!("bad partition map");
            }
            Ok(())
        });

        op.run().await;

        let status = op.status();
        assert!(status.is_complete());
        assert!(status
            .failure()
            .unwrap()
            .to_string()
            .contains("bad partition map"));
    }

    #[tokio::test]
    async fn test_run_only_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let op = AsyncOperation::from_fn(4, "once", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        op.run().await;
        let messages_after_first = op.status().messages().len();
        op.run().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(op.status().messages().len(), messages_after_first);
    }

    #[tokio::test]
    async fn test_stop_after_completion_is_noop() {
        let op = AsyncOperation::from_fn(5, "done", |_| async { Ok(()) });
        op.run().await;
        let before = op.status();

        op.stop();
        op.stop();

        let after = op.status();
        assert_eq!(before.messages(), after.messages());
        assert!(after.is_complete());
        assert!(!after.has_failed());
    }

    #[tokio::test]
    async fn test_stop_before_run() {
        let op = AsyncOperation::from_fn(6, "never", |_| async { Ok(()) });
        op.stop();

        // Stopping does not touch the status on its own.
        assert!(op.status().messages().is_empty());
        assert!(!op.status().is_complete());

        op.run().await;
        let status = op.status();
        assert!(status.is_complete());
        assert!(matches!(**status.failure().unwrap(), Error::Cancelled));
    }

    #[test]
    fn test_debug_while_run_starts() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            for id in 0..500 {
                let op = Arc::new(AsyncOperation::from_fn(id, "observed", |_| async {
                    Ok(())
                }));
                let observer = op.clone();
                let formatter = std::thread::spawn(move || {
                    for _ in 0..50 {
                        let _ = format!("{:?}", observer);
                    }
                });
                rt.block_on(op.run());
                formatter.join().unwrap();
            }
            let _ = done_tx.send(());
        });

        done_rx
            .recv_timeout(Duration::from_secs(60))
            .expect("formatting an operation blocked run");
    }

    #[tokio::test]
    async fn test_stop_while_running() {
        struct Waiting {
            stopped: Arc<AtomicBool>,
        }

        #[async_trait::async_trait]
        impl Operation for Waiting {
            async fn operate(&self, handle: &OperationHandle) -> Result<()> {
                handle.cancelled().await;
                handle.checkpoint()
            }

            fn on_stop(&self) {
                self.stopped.store(true, Ordering::SeqCst);
            }
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let op = Arc::new(AsyncOperation::new(
            7,
            "waiting",
            Waiting {
                stopped: stopped.clone(),
            },
        ));

        let runner = op.clone();
        let task = tokio::spawn(async move { runner.run().await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while op.state() != OperationState::Running {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        op.stop();
        tokio::time::timeout(Duration::from_secs(5), op.wait_for_completion())
            .await
            .unwrap();
        task.await.unwrap();

        assert!(stopped.load(Ordering::SeqCst));
        assert!(matches!(**op.status().failure().unwrap(), Error::Cancelled));
    }
}
