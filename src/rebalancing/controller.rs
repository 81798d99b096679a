//! Drives partition moves: resolve the latest cluster, edit it, push it out.

use crate::admin::AdminClient;
use crate::error::{RebalanceError, Result};
use crate::operation::{AsyncOperationRunner, OperationHandle};
use crate::rebalancing::eligibility::store_names_for_cluster;
use crate::rebalancing::propagator::{propagate, PropagationReport};
use crate::rebalancing::resolver::resolve_latest;
use crate::rebalancing::topology::plan_partition_move;
use crate::types::{Cluster, NodeId, PartitionId};
use crate::versioning::Versioned;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// One partition move between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceStep {
    /// Node gaining the partitions.
    pub stealer_id: NodeId,
    /// Node losing the partitions.
    pub donor_id: NodeId,
    /// Partitions to move.
    pub partitions: Vec<PartitionId>,
}

impl RebalanceStep {
    pub fn new(stealer_id: NodeId, donor_id: NodeId, partitions: Vec<PartitionId>) -> Self {
        Self {
            stealer_id,
            donor_id,
            partitions,
        }
    }

    /// Nodes that must accept the new cluster for the move to count.
    pub fn required_nodes(&self) -> [NodeId; 2] {
        [self.stealer_id, self.donor_id]
    }
}

impl fmt::Display for RebalanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "move partitions {:?} from node {} to node {}",
            self.partitions, self.donor_id, self.stealer_id
        )
    }
}

/// Result of a committed move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    /// The cluster now installed on the required nodes.
    pub cluster: Versioned<Cluster>,
    /// Which nodes accepted it.
    pub report: PropagationReport,
}

/// Applies rebalance steps to a live cluster through an admin client.
#[derive(Debug)]
pub struct RebalanceController {
    admin: Arc<dyn AdminClient>,
}

impl RebalanceController {
    /// Create a new controller.
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> &Arc<dyn AdminClient> {
        &self.admin
    }

    /// Names of the stores that will be moved along with partitions.
    pub async fn rebalance_stores(&self) -> Result<Vec<String>> {
        store_names_for_cluster(&self.admin.cluster_view(), self.admin.as_ref()).await
    }

    /// Apply one move.
    ///
    /// Stealer and donor are required both when resolving the current
    /// cluster and when pushing the new one. The new clock is the resolved
    /// clock incremented on the stealer.
    pub async fn execute_move(&self, step: &RebalanceStep) -> Result<MoveOutcome> {
        let required = step.required_nodes();
        let admin = self.admin.as_ref();

        let (current, clock) = resolve_latest(&required, admin).await?.into_parts();

        let stealer = current
            .node_by_id(step.stealer_id)
            .ok_or(RebalanceError::NodeNotFound(step.stealer_id))?;
        let donor = current
            .node_by_id(step.donor_id)
            .ok_or(RebalanceError::NodeNotFound(step.donor_id))?;

        let updated = plan_partition_move(&current, stealer, donor, &step.partitions)?;
        let new_clock = clock.incremented(step.stealer_id, now_millis());

        let report = propagate(admin, &updated, &new_clock, &required).await?;

        info!(
            stealer = step.stealer_id,
            donor = step.donor_id,
            partitions = ?step.partitions,
            clock = %new_clock,
            "Partition move committed"
        );

        Ok(MoveOutcome {
            cluster: Versioned::new(updated, new_clock),
            report,
        })
    }

    /// Apply `steps` in order, stopping at the first failure or when the
    /// operation is stopped.
    pub async fn execute_plan(
        &self,
        steps: &[RebalanceStep],
        handle: &OperationHandle,
    ) -> Result<Option<Versioned<Cluster>>> {
        let stores = self.rebalance_stores().await?;
        handle.update_status(format!("rebalancing stores {:?}", stores));

        let mut latest = None;
        for (i, step) in steps.iter().enumerate() {
            handle.checkpoint()?;
            handle.update_status(format!("step {}/{}: {}", i + 1, steps.len(), step));

            let outcome = self.execute_move(step).await?;
            if !outcome.report.is_complete() {
                handle.update_status(format!(
                    "step {}/{}: {} optional node(s) not updated",
                    i + 1,
                    steps.len(),
                    outcome.report.skipped.len()
                ));
            }
            latest = Some(outcome.cluster);
        }

        handle.update_status(format!("completed {} step(s)", steps.len()));
        Ok(latest)
    }

    /// Run `steps` as a background operation and return its id.
    pub fn spawn_plan(
        self: &Arc<Self>,
        runner: &AsyncOperationRunner,
        steps: Vec<RebalanceStep>,
    ) -> Result<u64> {
        let description = format!("rebalance plan with {} step(s)", steps.len());
        let controller = self.clone();
        let steps = Arc::new(steps);

        runner.submit_fn(description, move |handle| {
            let controller = controller.clone();
            let steps = steps.clone();
            async move { controller.execute_plan(&steps, &handle).await.map(|_| ()) }
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
