//! Decide which stores take part in rebalancing.

use crate::admin::AdminClient;
use crate::error::{RebalanceError, Result};
use crate::types::{Cluster, StoreDefinition};
use tracing::{debug, info};

/// Storage engine types whose data cannot be rebalanced.
pub const REBALANCE_STORE_ENGINE_BLACKLIST: &[&str] = &["read-only"];

fn is_blacklisted(name: &str) -> bool {
    REBALANCE_STORE_ENGINE_BLACKLIST.contains(&name)
}

/// Names of the stores that should be rebalanced, in input order.
///
/// Views are skipped, as is any store whose name or engine type appears in
/// [`REBALANCE_STORE_ENGINE_BLACKLIST`].
pub fn eligible_stores(definitions: &[StoreDefinition]) -> Vec<String> {
    definitions
        .iter()
        .filter(|def| {
            let eligible = !def.is_view()
                && !is_blacklisted(def.name())
                && !is_blacklisted(def.store_type());
            if !eligible {
                debug!(
                    store = def.name(),
                    store_type = def.store_type(),
                    is_view = def.is_view(),
                    "Ignoring store for rebalancing"
                );
            }
            eligible
        })
        .map(|def| def.name().to_string())
        .collect()
}

/// Fetch store definitions from the first reachable node and filter them.
pub async fn store_names_for_cluster(
    cluster: &Cluster,
    admin: &dyn AdminClient,
) -> Result<Vec<String>> {
    for node in cluster.nodes() {
        match admin.remote_store_definitions(node.id()).await {
            Ok(definitions) => return Ok(eligible_stores(definitions.value())),
            Err(e) => {
                info!(node_id = node.id(), error = %e, "Failed to get store definitions");
            }
        }
    }

    Err(RebalanceError::NoReachableNode {
        cluster: cluster.name().to_string(),
    }
    .into())
}
