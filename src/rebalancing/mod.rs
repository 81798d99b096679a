//! Rebalancing of partition ownership between nodes.
//!
//! This module moves partitions from a donor node to a stealer node while
//! keeping every node's copy of the cluster metadata convergent.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  RebalanceController                         │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Phase 1: Resolve                                     │  │
//! │  │  - Poll every node for its versioned cluster          │  │
//! │  │  - Keep the causally latest, fail on conflicts        │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │                          ↓                                   │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Phase 2: Edit                                        │  │
//! │  │  - Move partitions donor → stealer                    │  │
//! │  │  - Increment the clock on the stealer                 │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │                          ↓                                   │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Phase 3: Propagate                                   │  │
//! │  │  - Best effort to every other node                    │  │
//! │  │  - Mandatory on stealer and donor                     │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Copying the data itself happens outside this crate, between moves.
//!
//! # Failure policy
//!
//! - Concurrent cluster versions abort with a conflict. They are never merged.
//! - A required node that cannot be read or written aborts the call.
//! - Optional nodes that fail are logged and catch up on a later resolve.
//!
//! # Example
//!
//! ```rust,ignore
//! use cluster_rebalance::rebalancing::{RebalanceController, RebalanceStep};
//!
//! let controller = Arc::new(RebalanceController::new(admin));
//! let outcome = controller
//!     .execute_move(&RebalanceStep::new(3, 1, vec![4, 7]))
//!     .await?;
//! println!("installed {}", outcome.cluster.version());
//! ```

mod controller;
mod eligibility;
mod propagator;
mod resolver;
mod topology;

pub use controller::{MoveOutcome, RebalanceController, RebalanceStep};
pub use eligibility::{eligible_stores, store_names_for_cluster, REBALANCE_STORE_ENGINE_BLACKLIST};
pub use propagator::{propagate, PropagationReport};
pub use resolver::resolve_latest;
pub use topology::{
    contains_node, current_partition_ownership, merge_nodes, plan_partition_move, update_node,
};
