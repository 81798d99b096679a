//! Push an agreed cluster configuration out to every node.

use crate::admin::AdminClient;
use crate::error::{RebalanceError, Result};
use crate::types::{Cluster, NodeId};
use crate::versioning::VectorClock;
use futures::future::join_all;
use tracing::{debug, info};

/// Outcome of a successful propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Nodes that accepted the new cluster.
    pub updated: Vec<NodeId>,
    /// Optional nodes that could not be updated, with the failure reason.
    pub skipped: Vec<(NodeId, String)>,
}

impl PropagationReport {
    /// Whether every node of the cluster was updated.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Write `(cluster, clock)` to every node of `cluster`.
///
/// Nodes outside `required_nodes` are updated first and their failures are
/// only recorded in the report. Required nodes are updated afterwards; if
/// any of them fails, the call fails with the list of failed ids. A required
/// id that is not part of the cluster counts as failed. No retries.
pub async fn propagate(
    admin: &dyn AdminClient,
    cluster: &Cluster,
    clock: &VectorClock,
    required_nodes: &[NodeId],
) -> Result<PropagationReport> {
    let mut report = PropagationReport::default();

    let optional: Vec<NodeId> = cluster
        .node_ids()
        .into_iter()
        .filter(|id| !required_nodes.contains(id))
        .collect();

    for (node_id, result) in push_all(admin, cluster, clock, &optional).await {
        match result {
            Ok(()) => report.updated.push(node_id),
            Err(e) => {
                debug!(node_id, error = %e, "Failed to copy new cluster to optional node");
                report.skipped.push((node_id, e.to_string()));
            }
        }
    }

    let mut failed = Vec::new();
    let (present, missing): (Vec<NodeId>, Vec<NodeId>) = required_nodes
        .iter()
        .copied()
        .partition(|id| cluster.contains_node(*id));
    for node_id in missing {
        debug!(node_id, "Required node is not part of the cluster");
        failed.push(node_id);
    }

    for (node_id, result) in push_all(admin, cluster, clock, &present).await {
        match result {
            Ok(()) => report.updated.push(node_id),
            Err(e) => {
                debug!(node_id, error = %e, "Failed to copy new cluster to required node");
                failed.push(node_id);
            }
        }
    }

    if !failed.is_empty() {
        failed.sort_unstable();
        return Err(RebalanceError::PropagationFailed {
            cluster: Box::new(cluster.clone()),
            failed_nodes: failed,
        }
        .into());
    }

    info!(
        cluster = cluster.name(),
        clock = %clock,
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "Propagated cluster"
    );

    Ok(report)
}

async fn push_all(
    admin: &dyn AdminClient,
    cluster: &Cluster,
    clock: &VectorClock,
    node_ids: &[NodeId],
) -> Vec<(NodeId, Result<()>)> {
    let pushes = node_ids.iter().map(|&node_id| async move {
        (node_id, admin.update_remote_cluster(node_id, cluster, clock).await)
    });
    join_all(pushes).await
}
