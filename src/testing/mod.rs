//! Testing utilities for rebalancing.
//!
//! Fixtures for building clusters and checking topology invariants, plus the
//! end-to-end rebalance suite driven through [`InMemoryAdminClient`].
//!
//! [`InMemoryAdminClient`]: crate::admin::InMemoryAdminClient

mod rebalance_e2e_tests;

use crate::types::{Cluster, Node, NodeId, PartitionId};
use std::collections::HashSet;

/// Build a cluster of `num_nodes` nodes, each owning a contiguous block of
/// `partitions_per_node` partitions.
pub fn uniform_cluster(name: &str, num_nodes: u32, partitions_per_node: u32) -> Cluster {
    let nodes = (0..num_nodes)
        .map(|id| {
            let first = id * partitions_per_node;
            Node::new(
                id,
                format!("node-{}.local", id),
                8081,
                6666,
                6667,
                (first..first + partitions_per_node).collect(),
            )
        })
        .collect();
    Cluster::new(name, nodes)
}

/// Add an empty node to `cluster`.
pub fn with_empty_node(cluster: &Cluster, node_id: NodeId) -> Cluster {
    crate::rebalancing::merge_nodes(
        cluster,
        vec![Node::new(node_id, format!("node-{}.local", node_id), 8081, 6666, 6667, vec![])],
    )
}

/// Topology assertions shared by tests.
pub struct TestAssertions;

impl TestAssertions {
    /// Panic unless both clusters own exactly the same set of partitions,
    /// each exactly once.
    pub fn assert_partitions_conserved(before: &Cluster, after: &Cluster) {
        let expected: HashSet<PartitionId> = before.partition_ids().into_iter().collect();
        let actual = after.partition_ids();
        let unique: HashSet<PartitionId> = actual.iter().copied().collect();

        assert_eq!(unique.len(), actual.len(), "partition owned twice in {}", after);
        assert_eq!(expected, unique, "partition set changed: {} -> {}", before, after);
    }

    /// Panic unless node ids are unique and sorted.
    pub fn assert_canonical(cluster: &Cluster) {
        let ids = cluster.node_ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted, "nodes not canonical in {}", cluster);
        for node in cluster.nodes() {
            let mut partitions = node.partition_ids().to_vec();
            partitions.sort_unstable();
            assert_eq!(node.partition_ids(), &partitions[..], "unsorted partitions on {}", node);
        }
    }
}
