//! Cluster rebalancing core for a partitioned key-value store.
//!
//! This crate provides the logic that moves partition ownership between
//! nodes and keeps every node's view of the topology consistent:
//! - **Topology edits** computing a new cluster for a donor → stealer move
//! - **Version resolution** picking the causally latest cluster across nodes
//!   using vector clocks, refusing to guess on conflicts
//! - **Propagation** of the agreed cluster with required and best-effort nodes
//! - **Background operations** with pollable status for long-running work
//!
//! # Example
//!
//! ```rust,no_run
//! use cluster_rebalance::admin::InMemoryAdminClient;
//! use cluster_rebalance::rebalancing::{RebalanceController, RebalanceStep};
//! use cluster_rebalance::{Cluster, Node};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cluster = Cluster::new(
//!         "prod",
//!         vec![
//!             Node::new(0, "10.0.0.1", 8081, 6666, 6667, vec![0, 1, 2, 3]),
//!             Node::new(1, "10.0.0.2", 8081, 6666, 6667, vec![]),
//!         ],
//!     );
//!
//!     let admin = Arc::new(InMemoryAdminClient::new(cluster));
//!     let controller = RebalanceController::new(admin);
//!
//!     // Give node 1 half of node 0's partitions.
//!     let outcome = controller
//!         .execute_move(&RebalanceStep::new(1, 0, vec![2, 3]))
//!         .await?;
//!     println!("new cluster at {}", outcome.cluster.version());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Consistency Model
//!
//! - **Cluster metadata**: single authoritative version; concurrent vector
//!   clocks are surfaced as errors and need an operator
//! - **Propagation**: all-or-error on required nodes, best effort elsewhere
//! - **Values**: `Cluster` and `Node` are immutable; edits return new values

pub mod admin;
pub mod config;
pub mod error;
pub mod operation;
pub mod rebalancing;
pub mod testing;
pub mod types;
pub mod versioning;

// Re-export main types for convenience
pub use config::{AdminClientConfig, AdminTimeouts, OperationRunnerConfig};
pub use error::{Error, NetworkError, RebalanceError, Result};
pub use types::{Cluster, Node, NodeId, PartitionId, StoreDefinition};
pub use versioning::{Occurred, VectorClock, Versioned};

// Re-export admin client types
pub use admin::{create_temp_admin_client, AdminClient, AdminClientFactory, InMemoryAdminClient};

// Re-export background operation types
pub use operation::{
    AsyncOperation, AsyncOperationRunner, AsyncOperationStatus, Operation, OperationHandle,
    OperationState,
};

// Re-export rebalancing types
pub use rebalancing::{
    MoveOutcome, PropagationReport, RebalanceController, RebalanceStep,
};
