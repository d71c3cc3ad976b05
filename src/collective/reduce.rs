use super::engine::ReductionEngine;
use super::plan::ReducePlan;
use super::topology::{to_position, to_rank};
use super::tracker::ArrivalState;
use crate::config::ReduceConfig;
use crate::error::{NwayError, Result};
use crate::reduce::{Element, Operator, decode_slice, encode_slice};
use crate::substrate::Substrate;
use crate::types::{Rank, RegionId};
use std::time::Instant;

/// States of the per-rank reduce driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Leaves only: forward every block to the parent.
    SendingInitial,
    /// Round-robin over children, reducing blocks as they complete.
    Polling,
    /// All expected contributions reduced (and forwarded, unless root).
    Done,
}

/// Pipelined N-ary tree reduce on a prepared accumulator region.
///
/// `region` must hold `world * count` elements of `T` on every rank, with this
/// rank's input in the first `count` elements. On return the root's first
/// `count` elements hold the reduced vector; other ranks' contents are
/// unspecified.
///
/// Polling visits the children in a fixed rotation and advances after every
/// check, hit or miss, so a fast child cannot starve a slow one. After a
/// rotation without any arrival the driver yields to the executor.
pub async fn tree_reduce<S, T, O>(
    substrate: &S,
    region: RegionId,
    plan: &ReducePlan,
    op: &O,
) -> Result<()>
where
    S: Substrate + ?Sized,
    T: Element,
    O: Operator<T> + ?Sized,
{
    let world = substrate.world_size();
    let rank = substrate.rank();
    if plan.world() != world {
        return Err(NwayError::config(format!(
            "plan built for {} ranks, substrate has {world}",
            plan.world()
        )));
    }

    let root = plan.root();
    let tree = plan.tree();
    let n_blocks = plan.layout().n_blocks();
    let position = to_position(rank, root, world);
    let children: Vec<Rank> = tree
        .children(position)
        .map(|c| to_rank(c, root, world))
        .collect();

    let engine = ReductionEngine::<S, T, O>::new(substrate, region, plan, op, position);
    let mut arrivals = ArrivalState::new(rank, world, tree.n_recv(position), *plan.tags());

    let mut state = if world == 1 {
        DriverState::Done
    } else if children.is_empty() {
        DriverState::SendingInitial
    } else {
        DriverState::Polling
    };
    tracing::debug!(rank, position, n_recv = children.len(), ?state, "reduce driver start");

    let mut turn = 0usize;
    let mut hits = 0usize;

    loop {
        match state {
            DriverState::SendingInitial => {
                for block in 0..n_blocks {
                    engine.forward_block(block).await?;
                }
                state = DriverState::Done;
                tracing::debug!(rank, n_blocks, "leaf sent all blocks");
            }
            DriverState::Polling => {
                let child = children[turn];
                if let Some(tag) = arrivals.next_tag(child)? {
                    if substrate.poll_notify(region, tag.id())?.is_some() {
                        let value = substrate.reset_notify(region, tag.id())?;
                        if value != 1 {
                            return Err(NwayError::protocol(
                                rank,
                                format!("{tag} from rank {child} carried value {value}, expected 1"),
                            ));
                        }
                        hits += 1;
                        if let Some(block) = arrivals.observe(child, tag)? {
                            engine.reduce_block(block).await?;
                        }
                        if arrivals.is_done() {
                            state = DriverState::Done;
                            tracing::debug!(rank, received = arrivals.received(), "all blocks reduced");
                            continue;
                        }
                    }
                }

                turn = (turn + 1) % children.len();
                if turn == 0 {
                    if hits == 0 {
                        tokio::task::yield_now().await;
                    }
                    hits = 0;
                }
            }
            DriverState::Done => break,
        }
    }

    Ok(())
}

/// Reduce `input` from every rank into `root` using `op`.
///
/// Collective: every rank must call it with the same `root`, `config` and
/// input length. Registers a fresh accumulator region, synchronizes with a
/// barrier, runs [`tree_reduce`], flushes all queues and synchronizes again,
/// then releases the region. Returns the reduced vector on the root and
/// `None` elsewhere.
pub async fn reduce<S, T, O>(
    substrate: &S,
    input: &[T],
    root: Rank,
    op: &O,
    config: &ReduceConfig,
) -> Result<Option<Vec<T>>>
where
    S: Substrate + ?Sized,
    T: Element,
    O: Operator<T> + ?Sized,
{
    let world = substrate.world_size();
    let rank = substrate.rank();
    let plan = ReducePlan::new(
        world,
        input.len(),
        root,
        config,
        substrate.notification_capacity(),
    )?;

    let slot_bytes = input.len() * T::SIZE;
    let region = substrate.create_region(slot_bytes * world as usize)?;
    substrate.write_region(region, 0, &encode_slice(input))?;

    substrate.barrier().await?;
    let start = Instant::now();

    tree_reduce::<S, T, O>(substrate, region, &plan, op).await?;

    let elapsed = start.elapsed();
    for queue in 0..substrate.queue_count() {
        substrate.wait_queue(queue).await?;
    }
    substrate.barrier().await?;

    let secs = elapsed.as_secs_f64();
    tracing::info!(
        rank,
        bytes = slot_bytes,
        secs,
        mib_per_sec = slot_bytes as f64 / (1024.0 * 1024.0) / secs.max(f64::EPSILON),
        "reduce complete"
    );

    let result = if rank == root {
        let mut out = vec![0u8; slot_bytes];
        substrate
            .read_region(region, 0, &mut out)
            .and_then(|()| decode_slice(&out))
            .map(Some)
    } else {
        Ok(None)
    };
    substrate.release_region(region)?;
    result
}
