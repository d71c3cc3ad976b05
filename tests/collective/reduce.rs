use nway::collective::ReducePlan;
use nway::{FnOperator, ReduceConfig, ReduceOp, Substrate, reduce, tree_reduce};

use super::helpers::{fast_config, run_collective};

#[tokio::test]
async fn test_reduce_4_ranks_fan_in_2_sum() {
    let results = run_collective(4, fast_config(), |fabric| async move {
        let rank = fabric.rank();
        let input = vec![rank as i32; 4096];
        let cfg = ReduceConfig::default().with_fan_in(2);
        reduce(&*fabric, &input, 0, &ReduceOp::Sum, &cfg)
            .await
            .unwrap()
    })
    .await;

    assert_eq!(results[0].as_deref(), Some(&[6i32; 4096][..]));
    for other in &results[1..] {
        assert!(other.is_none());
    }
}

#[tokio::test]
async fn test_reduce_single_rank_is_copy() {
    let results = run_collective(1, fast_config(), |fabric| async move {
        let input: Vec<f32> = (0..100).map(|i| i as f32 * 0.5).collect();
        reduce(&*fabric, &input, 0, &ReduceOp::Sum, &ReduceConfig::default())
            .await
            .unwrap()
    })
    .await;

    let expected: Vec<f32> = (0..100).map(|i| i as f32 * 0.5).collect();
    assert_eq!(results[0].as_ref(), Some(&expected));
}

#[tokio::test]
async fn test_reduce_nonzero_root() {
    let results = run_collective(5, fast_config(), |fabric| async move {
        let rank = fabric.rank();
        let input = vec![(rank + 1) as u64; 64];
        let cfg = ReduceConfig::default().with_fan_in(3).with_max_block_len(10);
        reduce(&*fabric, &input, 3, &ReduceOp::Sum, &cfg)
            .await
            .unwrap()
    })
    .await;

    for (rank, out) in results.iter().enumerate() {
        if rank == 3 {
            assert_eq!(out.as_deref(), Some(&[15u64; 64][..]));
        } else {
            assert!(out.is_none(), "rank {rank} should not receive the result");
        }
    }
}

#[tokio::test]
async fn test_reduce_pipelined_shapes() {
    const COUNT: usize = 1000;
    for (world, fan_in, block_len) in [
        (2, 1, 7),
        (3, 2, 64),
        (6, 1, 333),
        (7, 2, 100),
        (9, 3, 128),
        (13, 4, 999),
        (16, 8, 1),
    ] {
        let results = run_collective(world, fast_config(), move |fabric| async move {
            let rank = fabric.rank() as i64;
            let input: Vec<i64> = (0..COUNT as i64).map(|i| rank * 1000 + i).collect();
            let cfg = ReduceConfig {
                fan_in,
                max_block_len: block_len,
                max_blocks: COUNT,
            };
            reduce(&*fabric, &input, 0, &ReduceOp::Sum, &cfg)
                .await
                .unwrap()
        })
        .await;

        let n = world as i64;
        let rank_sum = n * (n - 1) / 2;
        let expected: Vec<i64> = (0..COUNT as i64).map(|i| rank_sum * 1000 + n * i).collect();
        assert_eq!(
            results[0].as_ref(),
            Some(&expected),
            "world={world} fan_in={fan_in} block_len={block_len}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reduce_multi_thread_runtime() {
    let results = run_collective(8, fast_config(), |fabric| async move {
        let rank = fabric.rank();
        let input = vec![rank; 5000];
        let cfg = ReduceConfig::default().with_fan_in(2).with_max_block_len(256);
        reduce(&*fabric, &input, 0, &ReduceOp::Sum, &cfg)
            .await
            .unwrap()
    })
    .await;

    assert_eq!(results[0].as_deref(), Some(&[28u32; 5000][..]));
}

#[tokio::test]
async fn test_reduce_min_max_f64() {
    for (op, expected) in [(ReduceOp::Min, -4.0f64), (ReduceOp::Max, 0.0)] {
        let results = run_collective(5, fast_config(), move |fabric| async move {
            let rank = fabric.rank();
            let input = vec![-(rank as f64); 33];
            let cfg = ReduceConfig::default().with_max_block_len(8);
            reduce(&*fabric, &input, 0, &op, &cfg).await.unwrap()
        })
        .await;

        assert_eq!(results[0].as_deref(), Some(&[expected; 33][..]), "{op}");
    }
}

#[tokio::test]
async fn test_reduce_prod_wraps_integers() {
    let results = run_collective(4, fast_config(), |fabric| async move {
        let input = vec![(fabric.rank() + 2) as u8; 16];
        reduce(&*fabric, &input, 0, &ReduceOp::Prod, &ReduceConfig::default())
            .await
            .unwrap()
    })
    .await;

    // 2 * 3 * 4 * 5 = 120
    assert_eq!(results[0].as_deref(), Some(&[120u8; 16][..]));
}

#[tokio::test]
async fn test_reduce_custom_operator() {
    let results = run_collective(6, fast_config(), |fabric| async move {
        let input = vec![1u32 << fabric.rank(); 20];
        let or = FnOperator(|a: u32, b: u32| a | b);
        let cfg = ReduceConfig::default().with_max_block_len(3);
        reduce(&*fabric, &input, 0, &or, &cfg).await.unwrap()
    })
    .await;

    assert_eq!(results[0].as_deref(), Some(&[0b11_1111u32; 20][..]));
}

#[tokio::test]
async fn test_tree_reduce_on_prepared_region() {
    const COUNT: usize = 50;
    let results = run_collective(4, fast_config(), |fabric| async move {
        let world = fabric.world_size();
        let cfg = ReduceConfig::default().with_fan_in(1).with_max_block_len(16);
        let plan = ReducePlan::new(world, COUNT, 0, &cfg, fabric.notification_capacity()).unwrap();

        let region = fabric.create_region(world as usize * COUNT * 4).unwrap();
        let input: Vec<u8> = (0..COUNT as i32)
            .flat_map(|i| (i + fabric.rank() as i32).to_le_bytes())
            .collect();
        fabric.write_region(region, 0, &input).unwrap();
        fabric.barrier().await.unwrap();

        tree_reduce::<_, i32, _>(&*fabric, region, &plan, &ReduceOp::Sum)
            .await
            .unwrap();
        fabric.barrier().await.unwrap();

        let mut out = vec![0u8; COUNT * 4];
        fabric.read_region(region, 0, &mut out).unwrap();
        out.chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<i32>>()
    })
    .await;

    let expected: Vec<i32> = (0..COUNT as i32).map(|i| 4 * i + 6).collect();
    assert_eq!(results[0], expected);
}

#[tokio::test]
async fn test_reduce_back_to_back() {
    let results = run_collective(3, fast_config(), |fabric| async move {
        let cfg = ReduceConfig::default().with_max_block_len(5);
        let mut outs = Vec::new();
        for round in 0..3i32 {
            let input = vec![round + fabric.rank() as i32; 12];
            outs.push(
                reduce(&*fabric, &input, round as u32, &ReduceOp::Sum, &cfg)
                    .await
                    .unwrap(),
            );
        }
        outs
    })
    .await;

    for round in 0..3usize {
        let expected = vec![3 * round as i32 + 3; 12];
        assert_eq!(results[round][round].as_ref(), Some(&expected));
    }
}

#[tokio::test]
async fn test_repeated_reduces_release_regions() {
    let results = run_collective(1, fast_config(), |fabric| async move {
        let cfg = ReduceConfig::default();
        for round in 0..200i64 {
            let out = reduce(&*fabric, &[round; 4], 0, &ReduceOp::Sum, &cfg)
                .await
                .unwrap();
            assert_eq!(out, Some(vec![round; 4]));
        }
        fabric.region_count()
    })
    .await;
    assert_eq!(results, vec![0]);
}

#[tokio::test]
async fn test_region_ids_stay_bounded_across_ranks() {
    let results = run_collective(4, fast_config(), |fabric| async move {
        let cfg = ReduceConfig::default().with_max_block_len(3);
        for round in 0..50u32 {
            let input = vec![1u32; 10];
            let out = reduce(&*fabric, &input, round % 4, &ReduceOp::Sum, &cfg)
                .await
                .unwrap();
            if fabric.rank() == round % 4 {
                assert_eq!(out, Some(vec![4u32; 10]));
            }
        }
        // Next registration reuses the first id.
        let next = fabric.create_region(4).unwrap();
        (fabric.region_count(), next)
    })
    .await;
    assert!(results.iter().all(|&r| r == (1, 0)));
}
