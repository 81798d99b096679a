//! Admin client abstraction used to read and write cluster metadata on
//! remote nodes.
//!
//! The rebalancing logic never talks to the network directly. It goes
//! through [`AdminClient`], which a transport layer implements. The wire
//! protocol is not part of this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use cluster_rebalance::admin::{create_temp_admin_client, AdminClientFactory};
//! use cluster_rebalance::config::AdminTimeouts;
//!
//! let timeouts = AdminTimeouts::new(connect, socket, 64 * 1024);
//! let admin = create_temp_admin_client(&factory, &timeouts, &cluster, 4, 2)?;
//! let remote = admin.remote_cluster(1).await?;
//! ```

mod memory;

pub use memory::{AdminRequest, InMemoryAdminClient};

use crate::config::{AdminClientConfig, AdminTimeouts};
use crate::error::Result;
use crate::types::{Cluster, NodeId, StoreDefinition};
use crate::versioning::{VectorClock, Versioned};
use std::sync::Arc;

/// Operations the rebalancing core needs from remote nodes.
#[async_trait::async_trait]
pub trait AdminClient: Send + Sync + std::fmt::Debug {
    /// The cluster this client was configured with (local view).
    fn cluster_view(&self) -> Cluster;

    /// Fetch the versioned cluster metadata stored on `node_id`.
    async fn remote_cluster(&self, node_id: NodeId) -> Result<Versioned<Cluster>>;

    /// Overwrite the cluster metadata on `node_id`.
    async fn update_remote_cluster(
        &self,
        node_id: NodeId,
        cluster: &Cluster,
        clock: &VectorClock,
    ) -> Result<()>;

    /// Fetch the store definitions hosted by `node_id`.
    async fn remote_store_definitions(
        &self,
        node_id: NodeId,
    ) -> Result<Versioned<Vec<StoreDefinition>>>;
}

/// Builds admin clients for a given cluster.
pub trait AdminClientFactory: Send + Sync {
    fn create(&self, cluster: &Cluster, config: AdminClientConfig) -> Result<Arc<dyn AdminClient>>;
}

/// Create a short-lived admin client for a rebalancing session.
///
/// Timeouts come from the server's admin settings; parallelism is chosen by
/// the caller.
pub fn create_temp_admin_client(
    factory: &dyn AdminClientFactory,
    timeouts: &AdminTimeouts,
    cluster: &Cluster,
    num_threads: usize,
    num_connections_per_node: usize,
) -> Result<Arc<dyn AdminClient>> {
    let config = AdminClientConfig::from_timeouts(timeouts, num_threads, num_connections_per_node);
    config.validate()?;

    tracing::debug!(
        cluster = cluster.name(),
        num_threads,
        num_connections_per_node,
        connection_timeout_ms = config.connection_timeout.as_millis() as u64,
        socket_timeout_ms = config.socket_timeout.as_millis() as u64,
        "Creating temporary admin client"
    );

    factory.create(cluster, config)
}
