//! Background operations with pollable status.
//!
//! Long-running admin work (a single partition move, or a whole rebalance
//! plan) runs detached from the caller. The caller keeps an id and polls the
//! operation's [`AsyncOperationStatus`] to follow progress and learn about
//! failures, which are never returned synchronously.
//!
//! # Lifecycle
//!
//! ```text
//!   Created ──run()──► Running ──work returns / fails / panics──► Complete
//!      │                  │
//!      └──── stop() ──────┴──► cancellation token; work sees it at the next checkpoint
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cluster_rebalance::operation::AsyncOperationRunner;
//!
//! let runner = AsyncOperationRunner::with_defaults();
//! let id = runner.submit_fn("copy metadata", |handle| async move {
//!     handle.update_status("pushing to node 3");
//!     handle.checkpoint()?;
//!     Ok(())
//! })?;
//!
//! let status = runner.wait_for_completion(id, Duration::from_secs(30)).await?;
//! if let Some(err) = status.failure() {
//!     eprintln!("operation {} failed: {}", id, err);
//! }
//! ```

mod runner;
mod status;
mod task;

pub use runner::AsyncOperationRunner;
pub use status::AsyncOperationStatus;
pub use task::{AsyncOperation, Operation, OperationHandle, OperationState};
