//! Failure paths: configuration errors surface before any transfer, and
//! transfer or protocol errors abort the collective instead of hanging it.

use nway::collective::ReducePlan;
use nway::{FabricConfig, NwayError, ReduceConfig, ReduceOp, Substrate, WriteRequest};
use nway::{reduce, tree_reduce};
use std::time::Duration;

use super::helpers::{fast_config, run_collective};

#[tokio::test]
async fn notification_space_too_small_is_config_error() {
    let config = FabricConfig {
        notification_capacity: 16,
        ..fast_config()
    };
    let results = run_collective(4, config, |fabric| async move {
        let cfg = ReduceConfig::default().with_max_block_len(10);
        reduce(&*fabric, &[1i32; 100], 0, &ReduceOp::Sum, &cfg).await
    })
    .await;

    for r in results {
        assert!(matches!(r, Err(NwayError::Config { .. })), "got {r:?}");
    }
}

#[tokio::test]
async fn invalid_root_is_rejected() {
    let results = run_collective(2, fast_config(), |fabric| async move {
        reduce(&*fabric, &[1u8; 4], 2, &ReduceOp::Sum, &ReduceConfig::default()).await
    })
    .await;

    for r in results {
        assert!(matches!(r, Err(NwayError::InvalidRank { rank: 2, .. })));
    }
}

#[tokio::test]
async fn severed_link_aborts_without_deadlock() {
    let results = run_collective(3, fast_config(), |fabric| async move {
        // Rank 1 loses its link to the root before the collective starts.
        if fabric.rank() == 1 {
            fabric.sever(0);
        }
        let cfg = ReduceConfig::default().with_fan_in(2).with_max_block_len(4);
        // Callers bound a collective with an external timeout.
        tokio::time::timeout(
            Duration::from_secs(3),
            reduce(&*fabric, &[1i64; 32], 0, &ReduceOp::Sum, &cfg),
        )
        .await
    })
    .await;

    assert!(matches!(
        results[1],
        Ok(Err(NwayError::TransferFailure { rank: 0, .. }))
    ));
    // Rank 2 finishes its part but the exit barrier never completes.
    assert!(matches!(
        results[2],
        Ok(Err(NwayError::BarrierTimeout { rank: 2, .. }))
    ));
    // The root never sees rank 1's blocks and must not report success.
    assert!(!matches!(results[0], Ok(Ok(_))));
}

#[tokio::test]
async fn unexpected_counter_value_is_protocol_violation() {
    const COUNT: usize = 8;
    let results = run_collective(2, fast_config(), |fabric| async move {
        let world = fabric.world_size();
        let cfg = ReduceConfig::default();
        let plan = ReducePlan::new(world, COUNT, 0, &cfg, fabric.notification_capacity()).unwrap();
        let region = fabric.create_region(world as usize * COUNT * 4).unwrap();

        if fabric.rank() == 0 {
            // Corrupt the counter rank 1's first block will land on.
            let tag = plan.tags().encode(1, 0).unwrap();
            fabric
                .write_notify(WriteRequest {
                    local_region: region,
                    local_offset: 0,
                    dest: 0,
                    remote_region: region,
                    remote_offset: 0,
                    len: 0,
                    notify: Some((tag.id(), 2)),
                    queue: 0,
                })
                .unwrap();
            fabric.wait_queue(0).await.unwrap();
        }
        fabric.barrier().await.unwrap();

        tree_reduce::<_, u32, _>(&*fabric, region, &plan, &ReduceOp::Sum).await
    })
    .await;

    assert!(matches!(
        results[0],
        Err(NwayError::ProtocolViolation { rank: 0, .. })
    ));
    assert!(results[1].is_ok());
}
