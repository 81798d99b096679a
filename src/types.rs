//! Core value types describing cluster topology.
//!
//! All of these are immutable once constructed. Topology edits produce new
//! values instead of mutating existing ones.

use crate::error::{RebalanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Node identifier in the cluster.
pub type NodeId = u32;

/// Partition identifier. Partitions are numbered `0..P`.
pub type PartitionId = u32;

/// A storage node and the partitions it currently owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    host: String,
    http_port: u16,
    socket_port: u16,
    admin_port: u16,
    partition_ids: Vec<PartitionId>,
}

impl Node {
    /// Create a new node.
    pub fn new(
        id: NodeId,
        host: impl Into<String>,
        http_port: u16,
        socket_port: u16,
        admin_port: u16,
        partition_ids: Vec<PartitionId>,
    ) -> Self {
        Self {
            id,
            host: host.into(),
            http_port,
            socket_port,
            admin_port,
            partition_ids,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn socket_port(&self) -> u16 {
        self.socket_port
    }

    pub fn admin_port(&self) -> u16 {
        self.admin_port
    }

    /// Partitions owned by this node, in the order they were supplied.
    pub fn partition_ids(&self) -> &[PartitionId] {
        &self.partition_ids
    }

    /// Number of partitions owned by this node.
    pub fn num_partitions(&self) -> usize {
        self.partition_ids.len()
    }

    /// Return a copy of this node owning `partition_ids` instead.
    ///
    /// Every other field is carried over unchanged.
    pub fn with_partitions(&self, partition_ids: Vec<PartitionId>) -> Self {
        Self {
            partition_ids,
            ..self.clone()
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node{}[{}:{}/{}/{}] partitions={:?}",
            self.id, self.host, self.http_port, self.socket_port, self.admin_port, self.partition_ids
        )
    }
}

/// A named set of nodes, kept sorted by node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ClusterWire")]
pub struct Cluster {
    name: String,
    nodes: Vec<Node>,
}

/// Cluster as received from a remote node, before node ordering is restored.
#[derive(Deserialize)]
struct ClusterWire {
    name: String,
    nodes: Vec<Node>,
}

impl From<ClusterWire> for Cluster {
    fn from(wire: ClusterWire) -> Self {
        Cluster::new(wire.name, wire.nodes)
    }
}

impl Cluster {
    /// Create a new cluster. Nodes are stored in ascending id order.
    pub fn new(name: impl Into<String>, mut nodes: Vec<Node>) -> Self {
        nodes.sort_by_key(|n| n.id);
        Self {
            name: name.into(),
            nodes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node by id.
    pub fn node_by_id(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_by_id(node_id).is_some()
    }

    /// Total number of partitions across all nodes.
    pub fn num_partitions(&self) -> usize {
        self.nodes.iter().map(Node::num_partitions).sum()
    }

    /// All partition ids across all nodes, sorted.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        let mut ids: Vec<PartitionId> = self
            .nodes
            .iter()
            .flat_map(|n| n.partition_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Check that node ids are unique and each partition has a single owner.
    pub fn validate(&self) -> Result<()> {
        let mut seen_nodes = HashSet::new();
        let mut seen_partitions = HashSet::new();

        for node in &self.nodes {
            if !seen_nodes.insert(node.id) {
                return Err(RebalanceError::InvalidTopology(format!(
                    "duplicate node id {} in cluster {}",
                    node.id, self.name
                ))
                .into());
            }
            for &partition in &node.partition_ids {
                if !seen_partitions.insert(partition) {
                    return Err(RebalanceError::InvalidTopology(format!(
                        "partition {} has more than one owner in cluster {}",
                        partition, self.name
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Serialize the cluster to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize a cluster from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster('{}', nodes=[", self.name)?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, "])")
    }
}

/// Definition of a store hosted by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDefinition {
    name: String,
    store_type: String,
    is_view: bool,
}

impl StoreDefinition {
    /// Create a regular (non-view) store definition.
    pub fn new(name: impl Into<String>, store_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store_type: store_type.into(),
            is_view: false,
        }
    }

    /// Create a view store definition.
    pub fn view(name: impl Into<String>, store_type: impl Into<String>) -> Self {
        Self {
            is_view: true,
            ..Self::new(name, store_type)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage engine type, e.g. `bdb` or `read-only`.
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    pub fn is_view(&self) -> bool {
        self.is_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, partitions: Vec<PartitionId>) -> Node {
        Node::new(id, "localhost", 8080, 6666, 6667, partitions)
    }

    #[test]
    fn test_cluster_sorts_nodes() {
        let cluster = Cluster::new("c", vec![node(2, vec![1]), node(0, vec![0]), node(1, vec![2])]);
        assert_eq!(cluster.node_ids(), vec![0, 1, 2]);
        assert_eq!(cluster.partition_ids(), vec![0, 1, 2]);
        assert_eq!(cluster.num_partitions(), 3);
    }

    #[test]
    fn test_with_partitions_keeps_other_fields() {
        let original = Node::new(3, "host-3", 1, 2, 3, vec![4, 5]);
        let updated = original.with_partitions(vec![7]);

        assert_eq!(updated.id(), 3);
        assert_eq!(updated.host(), "host-3");
        assert_eq!(updated.admin_port(), 3);
        assert_eq!(updated.partition_ids(), &[7]);
        assert_eq!(original.partition_ids(), &[4, 5]);
    }

    #[test]
    fn test_validate_detects_double_ownership() {
        let cluster = Cluster::new("c", vec![node(0, vec![0, 1]), node(1, vec![1])]);
        assert!(cluster.validate().is_err());

        let cluster = Cluster::new("c", vec![node(0, vec![0]), node(0, vec![1])]);
        assert!(cluster.validate().is_err());

        let cluster = Cluster::new("c", vec![node(0, vec![0]), node(1, vec![1])]);
        assert!(cluster.validate().is_ok());
    }

    #[test]
    fn test_cluster_serialization() {
        let cluster = Cluster::new("c", vec![node(0, vec![0, 2]), node(1, vec![1])]);
        let bytes = cluster.to_bytes().unwrap();
        assert_eq!(Cluster::from_bytes(&bytes).unwrap(), cluster);
    }

    #[test]
    fn test_decoded_cluster_is_sorted() {
        #[derive(Serialize)]
        struct Unsorted {
            name: String,
            nodes: Vec<Node>,
        }

        let remote = Unsorted {
            name: "c".to_string(),
            nodes: vec![node(2, vec![2]), node(0, vec![0]), node(1, vec![1])],
        };
        let decoded = Cluster::from_bytes(&bincode::serialize(&remote).unwrap()).unwrap();

        assert_eq!(decoded.node_ids(), vec![0, 1, 2]);
        assert_eq!(
            decoded,
            Cluster::new("c", vec![node(0, vec![0]), node(1, vec![1]), node(2, vec![2])])
        );
    }

    #[test]
    fn test_truncated_bytes_are_a_serialization_error() {
        let err = Cluster::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Network(crate::error::NetworkError::Serialization(_))
        ));
    }

    #[test]
    fn test_store_definition_view_flag() {
        assert!(!StoreDefinition::new("users", "bdb").is_view());
        assert!(StoreDefinition::view("users-view", "view").is_view());
    }
}
