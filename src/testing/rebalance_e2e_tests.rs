//! Rebalance E2E Test Suite
//!
//! End-to-end runs of the resolve → edit → propagate loop against a
//! simulated cluster, verifying:
//! - Partitions are conserved across a full scale-up plan
//! - Nodes that missed an update catch up on the next resolve
//! - Diverging metadata writes stop the rebalance instead of being merged
//!
//! | Test ID    | Scenario                          | Verification                      |
//! |------------|-----------------------------------|-----------------------------------|
//! | TC_REB_01  | Scale up (add empty node)         | Balanced, conserved, canonical    |
//! | TC_REB_02  | Optional node down during a move  | Node catches up on the next move  |
//! | TC_REB_03  | Split-brain metadata write        | Conflict surfaces, nothing pushed |
//! | TC_REB_04  | Stop a running plan               | Remaining steps are not applied   |

#[cfg(test)]
mod tests {
    use crate::admin::{AdminClient, AdminRequest, InMemoryAdminClient};
    use crate::config::OperationRunnerConfig;
    use crate::error::Error;
    use crate::operation::AsyncOperationRunner;
    use crate::rebalancing::{
        current_partition_ownership, plan_partition_move, resolve_latest, RebalanceController,
        RebalanceStep,
    };
    use crate::testing::{uniform_cluster, with_empty_node, TestAssertions};
    use crate::types::{Cluster, StoreDefinition};
    use crate::versioning::Versioned;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("cluster_rebalance=debug")
            .with_test_writer()
            .try_init();
    }

    /// A simulated cluster plus a controller bound to it.
    struct RebalanceTestCluster {
        admin: Arc<InMemoryAdminClient>,
        controller: Arc<RebalanceController>,
        runner: AsyncOperationRunner,
    }

    impl RebalanceTestCluster {
        fn new(cluster: Cluster) -> Self {
            let admin = Arc::new(InMemoryAdminClient::new(cluster));
            admin.set_store_definitions(vec![
                StoreDefinition::new("users", "bdb"),
                StoreDefinition::view("users-by-email", "view"),
                StoreDefinition::new("catalog", "read-only"),
            ]);
            let controller = Arc::new(RebalanceController::new(admin.clone()));
            let runner =
                AsyncOperationRunner::new(OperationRunnerConfig::default()).expect("valid config");
            Self {
                admin,
                controller,
                runner,
            }
        }

        fn installed(&self, node_id: u32) -> Versioned<Cluster> {
            self.admin.remote_version(node_id).expect("node exists")
        }
    }

    #[tokio::test]
    async fn tc_reb_01_scale_up_plan() {
        init_tracing();
        let before = with_empty_node(&uniform_cluster("scale", 3, 4), 3);
        let env = RebalanceTestCluster::new(before.clone());

        let steps = vec![
            RebalanceStep::new(3, 0, vec![3]),
            RebalanceStep::new(3, 1, vec![7]),
            RebalanceStep::new(3, 2, vec![11]),
        ];
        let id = env.controller.spawn_plan(&env.runner, steps).unwrap();
        let status = env.runner.wait_for_completion(id, WAIT).await.unwrap();
        assert!(!status.has_failed(), "{}", status);

        let after = env.installed(3);
        TestAssertions::assert_partitions_conserved(&before, after.value());
        TestAssertions::assert_canonical(after.value());
        for node in after.value().nodes() {
            assert_eq!(node.num_partitions(), 3, "unbalanced {}", node);
        }
        assert_eq!(after.version().version_of(3), 3);

        let ownership = current_partition_ownership(after.value());
        assert_eq!(ownership[&7], 3);
        assert_eq!(ownership[&6], 1);

        // Every node converged on the same version.
        for node_id in 0..4 {
            assert_eq!(env.installed(node_id), after);
        }
    }

    #[tokio::test]
    async fn tc_reb_02_optional_node_catches_up() {
        init_tracing();
        let env = RebalanceTestCluster::new(uniform_cluster("lagging", 3, 2));
        env.admin.take_down(2);

        let first = env
            .controller
            .execute_move(&RebalanceStep::new(1, 0, vec![0]))
            .await
            .unwrap();
        assert_eq!(first.report.skipped.len(), 1);
        assert!(env.installed(2).version().is_empty());

        env.admin.set_fetch_failure(2, false);
        env.admin.set_update_failure(2, false);

        let second = env
            .controller
            .execute_move(&RebalanceStep::new(1, 0, vec![1]))
            .await
            .unwrap();
        assert!(second.report.is_complete());
        assert_eq!(env.installed(2), second.cluster);
        assert!(second.cluster.version().is_after(first.cluster.version()));

        let resolved = resolve_latest(&[0, 1, 2], env.admin.as_ref()).await.unwrap();
        assert_eq!(resolved, second.cluster);
    }

    #[tokio::test]
    async fn tc_reb_03_split_brain_is_refused() {
        init_tracing();
        let base = uniform_cluster("split", 3, 2);
        let env = RebalanceTestCluster::new(base.clone());

        // Two admins each edit the unversioned cluster without seeing the other.
        let left = plan_partition_move(
            &base,
            base.node_by_id(1).unwrap(),
            base.node_by_id(0).unwrap(),
            &[0],
        )
        .unwrap();
        let right = plan_partition_move(
            &base,
            base.node_by_id(2).unwrap(),
            base.node_by_id(0).unwrap(),
            &[0],
        )
        .unwrap();
        let floor = Versioned::unversioned(base.clone());
        let left_clock = floor.version().incremented(1, 1);
        let right_clock = floor.version().incremented(2, 2);
        env.admin
            .update_remote_cluster(0, &left, &left_clock)
            .await
            .unwrap();
        env.admin
            .update_remote_cluster(2, &right, &right_clock)
            .await
            .unwrap();
        let pushes_before = env.admin.requests().len();

        let err = env
            .controller
            .execute_move(&RebalanceStep::new(1, 2, vec![4]))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        let msg = err.to_string();
        assert!(msg.contains(&left_clock.to_string()));
        assert!(msg.contains(&right_clock.to_string()));

        // Nothing was written after the conflict was found.
        let new_updates = env.admin.requests()[pushes_before..]
            .iter()
            .filter(|r| matches!(r, AdminRequest::UpdateCluster(_)))
            .count();
        assert_eq!(new_updates, 0);
        assert_eq!(env.installed(0).value(), &left);
    }

    #[tokio::test]
    async fn tc_reb_04_stopped_plan_leaves_remaining_steps() {
        init_tracing();
        let env = RebalanceTestCluster::new(with_empty_node(&uniform_cluster("stop", 2, 4), 2));

        let id = env
            .controller
            .spawn_plan(
                &env.runner,
                vec![
                    RebalanceStep::new(2, 0, vec![0]),
                    RebalanceStep::new(2, 1, vec![4]),
                ],
            )
            .unwrap();
        // The current-thread test runtime has not polled the task yet.
        env.runner.stop(id).unwrap();

        let status = env.runner.wait_for_completion(id, WAIT).await.unwrap();
        assert!(status.is_complete());
        assert!(matches!(**status.failure().unwrap(), Error::Cancelled));
        assert!(env.installed(2).version().is_empty());
        assert!(env.installed(2).value().node_by_id(2).unwrap().partition_ids().is_empty());
    }
}
