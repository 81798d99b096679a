//! Determine the authoritative cluster metadata across nodes.

use crate::admin::AdminClient;
use crate::error::{RebalanceError, Result};
use crate::types::{Cluster, NodeId};
use crate::versioning::{VectorClock, Versioned};
use tracing::{debug, info, warn};

/// Fetch every node's cluster metadata and return the causally latest one.
///
/// The admin client's own view seeds the search as an unversioned floor.
/// Nodes are polled one at a time in ascending id order.
///
/// Fails if a node in `required_nodes` cannot be reached or is not part of
/// the view, or if two nodes hold concurrent versions. Unreachable optional
/// nodes are skipped.
pub async fn resolve_latest(
    required_nodes: &[NodeId],
    admin: &dyn AdminClient,
) -> Result<Versioned<Cluster>> {
    let view = admin.cluster_view();
    if let Some(&node_id) = required_nodes.iter().find(|id| !view.contains_node(**id)) {
        warn!(node_id, cluster = view.name(), "Required node is not part of the cluster");
        return Err(RebalanceError::RequiredNodeUnavailable {
            node_id,
            reason: format!("node is not part of cluster {}", view.name()),
        }
        .into());
    }
    let mut latest = Versioned::unversioned(view.clone());
    let mut seen: Vec<VectorClock> = vec![latest.version().clone()];

    for node in view.nodes() {
        let node_id = node.id();
        let remote = match admin.remote_cluster(node_id).await {
            Ok(remote) => remote,
            Err(e) if required_nodes.contains(&node_id) => {
                warn!(node_id, error = %e, "Required node failed to return cluster version");
                return Err(RebalanceError::RequiredNodeUnavailable {
                    node_id,
                    reason: e.to_string(),
                }
                .into());
            }
            Err(e) => {
                info!(node_id, error = %e, "Failed to get cluster version from optional node");
                continue;
            }
        };

        let clock = remote.version();
        if seen.contains(clock) {
            continue;
        }
        check_not_concurrent(&seen, clock)?;
        seen.push(clock.clone());

        if clock.is_after(latest.version()) {
            debug!(node_id, clock = %clock, "Found newer cluster version");
            latest = remote;
        }
    }

    Ok(latest)
}

/// Fail if `incoming` is concurrent with any clock in `seen`.
pub(crate) fn check_not_concurrent(seen: &[VectorClock], incoming: &VectorClock) -> Result<()> {
    match seen.iter().find(|clock| clock.is_concurrent_with(incoming)) {
        Some(existing) => Err(RebalanceError::ConflictingVersions {
            existing: existing.clone(),
            incoming: incoming.clone(),
        }
        .into()),
        None => Ok(()),
    }
}
