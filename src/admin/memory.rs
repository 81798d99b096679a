//! In-memory admin client for tests and local simulations.

use super::AdminClient;
use crate::error::{NetworkError, Result};
use crate::types::{Cluster, NodeId, StoreDefinition};
use crate::versioning::{VectorClock, Versioned};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

/// A request observed by [`InMemoryAdminClient`], in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRequest {
    FetchCluster(NodeId),
    UpdateCluster(NodeId),
    FetchStoreDefinitions(NodeId),
}

#[derive(Debug, Clone)]
struct SimulatedNode {
    cluster: Versioned<Cluster>,
    store_definitions: Vec<StoreDefinition>,
    fail_fetch: bool,
    fail_update: bool,
}

/// Admin client backed by a map of simulated nodes.
///
/// Every node of the initial cluster starts out holding that cluster
/// unversioned and no store definitions. Failures can be injected per node.
#[derive(Debug)]
pub struct InMemoryAdminClient {
    view: RwLock<Cluster>,
    nodes: RwLock<HashMap<NodeId, SimulatedNode>>,
    requests: Mutex<Vec<AdminRequest>>,
}

impl InMemoryAdminClient {
    /// Create a client whose nodes all hold `cluster`.
    pub fn new(cluster: Cluster) -> Self {
        let nodes = cluster
            .nodes()
            .iter()
            .map(|node| {
                (
                    node.id(),
                    SimulatedNode {
                        cluster: Versioned::unversioned(cluster.clone()),
                        store_definitions: Vec::new(),
                        fail_fetch: false,
                        fail_update: false,
                    },
                )
            })
            .collect();

        Self {
            view: RwLock::new(cluster),
            nodes: RwLock::new(nodes),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replace the local cluster view.
    pub fn set_cluster_view(&self, cluster: Cluster) {
        *self.view.write() = cluster;
    }

    /// Set the versioned cluster held by one node.
    pub fn set_remote_cluster(&self, node_id: NodeId, cluster: Versioned<Cluster>) {
        if let Some(node) = self.nodes.write().get_mut(&node_id) {
            node.cluster = cluster;
        }
    }

    /// Set the store definitions held by every node.
    pub fn set_store_definitions(&self, definitions: Vec<StoreDefinition>) {
        for node in self.nodes.write().values_mut() {
            node.store_definitions = definitions.clone();
        }
    }

    /// Make fetches from `node_id` fail (or succeed again).
    pub fn set_fetch_failure(&self, node_id: NodeId, fail: bool) {
        if let Some(node) = self.nodes.write().get_mut(&node_id) {
            node.fail_fetch = fail;
        }
    }

    /// Make updates to `node_id` fail (or succeed again).
    pub fn set_update_failure(&self, node_id: NodeId, fail: bool) {
        if let Some(node) = self.nodes.write().get_mut(&node_id) {
            node.fail_update = fail;
        }
    }

    /// Make every request to `node_id` fail.
    pub fn take_down(&self, node_id: NodeId) {
        self.set_fetch_failure(node_id, true);
        self.set_update_failure(node_id, true);
    }

    /// Versioned cluster currently held by `node_id`.
    pub fn remote_version(&self, node_id: NodeId) -> Option<Versioned<Cluster>> {
        self.nodes.read().get(&node_id).map(|n| n.cluster.clone())
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<AdminRequest> {
        self.requests.lock().clone()
    }

    fn record(&self, request: AdminRequest) {
        self.requests.lock().push(request);
    }

    fn unreachable(node_id: NodeId) -> NetworkError {
        NetworkError::ConnectionFailed {
            node_id,
            reason: "node unreachable".into(),
        }
    }

    fn reachable_node(&self, node_id: NodeId, fetch: bool) -> Result<SimulatedNode> {
        let nodes = self.nodes.read();
        let node = nodes.get(&node_id).ok_or_else(|| NetworkError::Remote {
            node_id,
            reason: "unknown node".into(),
        })?;
        let failing = if fetch { node.fail_fetch } else { node.fail_update };
        if failing {
            return Err(Self::unreachable(node_id).into());
        }
        Ok(node.clone())
    }
}

#[async_trait::async_trait]
impl AdminClient for InMemoryAdminClient {
    fn cluster_view(&self) -> Cluster {
        self.view.read().clone()
    }

    async fn remote_cluster(&self, node_id: NodeId) -> Result<Versioned<Cluster>> {
        self.record(AdminRequest::FetchCluster(node_id));
        Ok(self.reachable_node(node_id, true)?.cluster)
    }

    async fn update_remote_cluster(
        &self,
        node_id: NodeId,
        cluster: &Cluster,
        clock: &VectorClock,
    ) -> Result<()> {
        self.record(AdminRequest::UpdateCluster(node_id));
        self.reachable_node(node_id, false)?;
        self.set_remote_cluster(node_id, Versioned::new(cluster.clone(), clock.clone()));
        Ok(())
    }

    async fn remote_store_definitions(
        &self,
        node_id: NodeId,
    ) -> Result<Versioned<Vec<StoreDefinition>>> {
        self.record(AdminRequest::FetchStoreDefinitions(node_id));
        let node = self.reachable_node(node_id, true)?;
        Ok(Versioned::unversioned(node.store_definitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn cluster() -> Cluster {
        Cluster::new(
            "c",
            vec![
                Node::new(0, "h0", 1, 2, 3, vec![0]),
                Node::new(1, "h1", 1, 2, 3, vec![1]),
            ],
        )
    }

    #[tokio::test]
    async fn test_update_then_fetch() {
        let admin = InMemoryAdminClient::new(cluster());
        let clock = VectorClock::new().incremented(1, 5);

        admin.update_remote_cluster(1, &cluster(), &clock).await.unwrap();
        let fetched = admin.remote_cluster(1).await.unwrap();

        assert_eq!(fetched.version(), &clock);
        assert!(admin.remote_cluster(0).await.unwrap().version().is_empty());
        assert_eq!(
            admin.requests(),
            vec![
                AdminRequest::UpdateCluster(1),
                AdminRequest::FetchCluster(1),
                AdminRequest::FetchCluster(0),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let admin = InMemoryAdminClient::new(cluster());
        admin.take_down(0);

        assert!(admin.remote_cluster(0).await.is_err());
        assert!(admin
            .update_remote_cluster(0, &cluster(), &VectorClock::new())
            .await
            .is_err());
        assert!(admin.remote_store_definitions(0).await.is_err());
        assert!(admin.remote_cluster(9).await.is_err());

        admin.set_fetch_failure(0, false);
        assert!(admin.remote_cluster(0).await.is_ok());
    }
}
