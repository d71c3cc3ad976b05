use super::plan::ReducePlan;
use super::topology::to_rank;
use crate::error::{NwayError, Result};
use crate::reduce::{Element, Operator, combine_slice};
use crate::substrate::Substrate;
use crate::types::{Rank, RegionId, WriteRequest};
use std::marker::PhantomData;

/// Combines complete blocks into the accumulator and forwards them upward.
///
/// The accumulator region holds `world` slots of `count` elements. Slot 0 is
/// this rank's own data; the child at tree position `p` writes into slot `p`.
pub(crate) struct ReductionEngine<'a, S: ?Sized, T, O: ?Sized> {
    substrate: &'a S,
    region: RegionId,
    plan: &'a ReducePlan,
    op: &'a O,
    rank: Rank,
    position: Rank,
    /// Real rank of the parent, `None` at the root.
    parent: Option<Rank>,
    /// Tree positions of the children, which double as slot indices.
    child_slots: Vec<Rank>,
    _elem: PhantomData<fn() -> T>,
}

impl<'a, S, T, O> ReductionEngine<'a, S, T, O>
where
    S: Substrate + ?Sized,
    T: Element,
    O: Operator<T> + ?Sized,
{
    pub(crate) fn new(
        substrate: &'a S,
        region: RegionId,
        plan: &'a ReducePlan,
        op: &'a O,
        position: Rank,
    ) -> Self {
        let world = plan.world();
        let tree = plan.tree();
        Self {
            substrate,
            region,
            plan,
            op,
            rank: substrate.rank(),
            position,
            parent: tree.parent(position).map(|p| to_rank(p, plan.root(), world)),
            child_slots: tree.children(position).collect(),
            _elem: PhantomData,
        }
    }

    /// Byte offset of `block` inside slot `slot`.
    fn slot_offset(&self, slot: Rank, block: usize) -> usize {
        let layout = self.plan.layout();
        (slot as usize * layout.total_len() + layout.range(block).start) * T::SIZE
    }

    /// Fold every child's contribution to `block` into slot 0, then forward.
    pub(crate) async fn reduce_block(&self, block: usize) -> Result<()> {
        let len = self.plan.layout().len_of(block) * T::SIZE;
        let own_off = self.slot_offset(0, block);

        let mut own = vec![0u8; len];
        let mut incoming = vec![0u8; len];
        self.substrate.read_region(self.region, own_off, &mut own)?;
        for &slot in &self.child_slots {
            self.substrate
                .read_region(self.region, self.slot_offset(slot, block), &mut incoming)?;
            combine_slice::<T, O>(&mut own, &incoming, self.op)?;
        }
        self.substrate.write_region(self.region, own_off, &own)?;

        tracing::trace!(rank = self.rank, block, children = self.child_slots.len(), "block reduced");

        self.forward_block(block).await
    }

    /// Write slot 0's `block` into the parent's slot for this rank.
    ///
    /// Returns once the write is locally complete; no-op at the root.
    pub(crate) async fn forward_block(&self, block: usize) -> Result<()> {
        let Some(parent) = self.parent else {
            return Ok(());
        };
        let tag = self.plan.tags().encode(self.rank, block)?;
        let req = WriteRequest {
            local_region: self.region,
            local_offset: self.slot_offset(0, block),
            dest: parent,
            remote_region: self.region,
            remote_offset: self.slot_offset(self.position, block),
            len: self.plan.layout().len_of(block) * T::SIZE,
            notify: Some((tag.id(), 1)),
            queue: parent % self.substrate.queue_count().max(1),
        };

        write_notify_and_wait(self.substrate, req).await?;
        tracing::trace!(rank = self.rank, parent, block, %tag, "block forwarded");
        Ok(())
    }
}

/// Post `req` and wait for its queue to complete locally.
///
/// A recoverable failure (a full queue) drains the queue once and retries.
pub(crate) async fn write_notify_and_wait<S: Substrate + ?Sized>(
    substrate: &S,
    req: WriteRequest,
) -> Result<()> {
    match substrate.write_notify(req) {
        Ok(()) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(
                rank = substrate.rank(),
                queue = req.queue,
                error = %e,
                "flushing before retry"
            );
            substrate.wait_queue(req.queue).await?;
            substrate.write_notify(req).map_err(|e| {
                if e.is_fatal() {
                    e
                } else {
                    NwayError::transfer_with_source(req.dest, "queue still full after flush", e)
                }
            })?;
        }
    }
    substrate.wait_queue(req.queue).await
}
