//! Pure topology edits.
//!
//! None of these functions mutate their inputs; each returns a new
//! [`Cluster`].

use crate::error::{RebalanceError, Result};
use crate::types::{Cluster, Node, NodeId, PartitionId};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Move `partitions` from `donor` to `stealer` and return the resulting cluster.
///
/// Ownership is read from `cluster`, which is the source of truth at call
/// time. Ids the donor does not own are skipped without error, so the set of
/// partitions across the cluster never changes. Partitions the stealer
/// already owns are not added twice. Both partition lists come out sorted
/// ascending.
pub fn plan_partition_move(
    cluster: &Cluster,
    stealer: &Node,
    donor: &Node,
    partitions: &[PartitionId],
) -> Result<Cluster> {
    if stealer.id() == donor.id() {
        return Err(RebalanceError::InvalidTopology(format!(
            "stealer and donor are the same node {}",
            stealer.id()
        ))
        .into());
    }
    let stealer = cluster
        .node_by_id(stealer.id())
        .ok_or(RebalanceError::NodeNotFound(stealer.id()))?;
    let donor = cluster
        .node_by_id(donor.id())
        .ok_or(RebalanceError::NodeNotFound(donor.id()))?;

    let (moving, skipped): (Vec<PartitionId>, Vec<PartitionId>) = partitions
        .iter()
        .copied()
        .partition(|p| donor.partition_ids().contains(p));
    if !skipped.is_empty() {
        debug!(
            donor = donor.id(),
            ?skipped,
            "Skipping partitions the donor does not own"
        );
    }
    let moving: HashSet<PartitionId> = moving.into_iter().collect();

    let mut donor_partitions: Vec<PartitionId> = donor
        .partition_ids()
        .iter()
        .copied()
        .filter(|p| !moving.contains(p))
        .collect();

    let mut stealer_partitions = stealer.partition_ids().to_vec();
    for &partition in &moving {
        if !stealer_partitions.contains(&partition) {
            stealer_partitions.push(partition);
        }
    }

    stealer_partitions.sort_unstable();
    donor_partitions.sort_unstable();

    let updated = merge_nodes(
        cluster,
        vec![
            update_node(stealer, stealer_partitions),
            update_node(donor, donor_partitions),
        ],
    );

    debug!(
        stealer = stealer.id(),
        donor = donor.id(),
        ?partitions,
        current = %cluster,
        updated = %updated,
        "Planned partition move"
    );

    Ok(updated)
}

/// Replace nodes of `cluster` by the same-id nodes in `updated_nodes`.
///
/// Nodes without a replacement are carried forward unchanged. If
/// `updated_nodes` repeats an id, the last entry wins. The result is sorted
/// by id and keeps the cluster name.
pub fn merge_nodes(cluster: &Cluster, updated_nodes: Vec<Node>) -> Cluster {
    let mut nodes: BTreeMap<NodeId, Node> = updated_nodes
        .into_iter()
        .map(|node| (node.id(), node))
        .collect();

    for node in cluster.nodes() {
        nodes.entry(node.id()).or_insert_with(|| node.clone());
    }

    Cluster::new(cluster.name(), nodes.into_values().collect())
}

/// Copy of `node` owning `partitions`.
pub fn update_node(node: &Node, partitions: Vec<PartitionId>) -> Node {
    node.with_partitions(partitions)
}

/// Map every partition to the node that owns it.
///
/// Built by scanning nodes in order. If two nodes claim the same partition,
/// the later node wins; this is not a conflict check.
pub fn current_partition_ownership(cluster: &Cluster) -> HashMap<PartitionId, NodeId> {
    let mut ownership = HashMap::with_capacity(cluster.num_partitions());
    for node in cluster.nodes() {
        for &partition in node.partition_ids() {
            ownership.insert(partition, node.id());
        }
    }
    ownership
}

/// Whether `cluster` has a node with `node_id`.
pub fn contains_node(cluster: &Cluster, node_id: NodeId) -> bool {
    cluster.contains_node(node_id)
}
