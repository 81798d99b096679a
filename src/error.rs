//! Error types for cluster rebalancing.

use crate::types::{Cluster, NodeId};
use crate::versioning::VectorClock;
use std::io;
use thiserror::Error;

/// Result type alias for rebalancing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rebalancing core.
#[derive(Error, Debug)]
pub enum Error {
    /// Rebalancing domain errors.
    #[error("rebalance error: {0}")]
    Rebalance(#[from] RebalanceError),

    /// Errors talking to a remote node.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// No background operation registered under this id.
    #[error("operation not found: {0}")]
    OperationNotFound(u64),

    /// A background operation with this id is already registered.
    #[error("operation already registered: {0}")]
    DuplicateOperation(u64),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a vector clock conflict between two nodes.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Rebalance(RebalanceError::ConflictingVersions { .. })
        )
    }
}

/// Errors raised while resolving, editing or propagating cluster metadata.
#[derive(Error, Debug)]
pub enum RebalanceError {
    /// Two nodes hold concurrent versions of the cluster metadata.
    #[error("cluster is in inconsistent state, got conflicting clocks {existing} and {incoming}")]
    ConflictingVersions {
        existing: VectorClock,
        incoming: VectorClock,
    },

    /// A required node could not be reached.
    #[error("failed to get cluster version from required node {node_id}: {reason}")]
    RequiredNodeUnavailable { node_id: NodeId, reason: String },

    /// Pushing the cluster to one or more required nodes failed.
    #[error("failed to copy updated cluster {} on required nodes: {failed_nodes:?}", .cluster.name())]
    PropagationFailed {
        cluster: Box<Cluster>,
        failed_nodes: Vec<NodeId>,
    },

    /// No node answered a request that only needed one answer.
    #[error("unable to reach any node of cluster {cluster}")]
    NoReachableNode { cluster: String },

    /// Node not found in cluster.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A topology edit was requested that the cluster cannot satisfy.
    #[error("invalid topology change: {0}")]
    InvalidTopology(String),
}

/// Errors reported by an admin client talking to remote nodes.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection failed.
    #[error("connection failed to node {node_id}: {reason}")]
    ConnectionFailed { node_id: NodeId, reason: String },

    /// The remote node answered with an error.
    #[error("remote error from node {node_id}: {reason}")]
    Remote { node_id: NodeId, reason: String },

    /// Request timed out.
    #[error("request to node {0} timed out")]
    Timeout(NodeId),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Network(NetworkError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_clocks() {
        let existing = VectorClock::new().incremented(1, 10);
        let incoming = VectorClock::new().incremented(2, 20);
        let err: Error = RebalanceError::ConflictingVersions {
            existing: existing.clone(),
            incoming: incoming.clone(),
        }
        .into();

        assert!(err.is_conflict());
        let msg = err.to_string();
        assert!(msg.contains(&existing.to_string()));
        assert!(msg.contains(&incoming.to_string()));
    }

    #[test]
    fn test_propagation_failure_lists_nodes() {
        let cluster = Cluster::new("test", vec![]);
        let err = RebalanceError::PropagationFailed {
            cluster: Box::new(cluster),
            failed_nodes: vec![2, 5],
        };
        assert!(err.to_string().contains("[2, 5]"));
        assert!(!Error::from(err).is_conflict());
    }
}
