//! The one-sided messaging substrate the collective runs on.
//!
//! The reduce only needs registered regions, one-sided writes that bump a
//! remote notification counter, counter polling, queue completion and a
//! barrier. [`LocalFabric`] provides all of these for ranks sharing one
//! process; RDMA-backed implementations plug in through the same trait.

mod local;

pub use local::LocalFabric;

use crate::error::Result;
use crate::types::{NotifyId, QueueId, Rank, RegionId, WriteRequest};
use futures::future::BoxFuture;

pub trait Substrate: Send + Sync {
    /// This rank.
    fn rank(&self) -> Rank;

    /// Number of ranks taking part.
    fn world_size(&self) -> u32;

    /// Outbound transfer queues available to this rank.
    fn queue_count(&self) -> u32;

    /// Notification counters available per region.
    fn notification_capacity(&self) -> u32;

    /// Register a zero-filled region of `size_bytes`.
    ///
    /// Every rank must create and release its regions in the same order. Ids
    /// are the lowest free slot, so the same id names the peer's matching
    /// region.
    fn create_region(&self, size_bytes: usize) -> Result<RegionId>;

    /// Drop a region and its notification counters, freeing its id for reuse.
    ///
    /// Peers must be done writing into it, which the exit barrier of a
    /// collective guarantees.
    fn release_region(&self, region: RegionId) -> Result<()>;

    /// Copy `dst.len()` bytes out of a local region.
    fn read_region(&self, region: RegionId, offset: usize, dst: &mut [u8]) -> Result<()>;

    /// Copy `src` into a local region.
    fn write_region(&self, region: RegionId, offset: usize, src: &[u8]) -> Result<()>;

    /// Post a one-sided write (and optional notification) on `req.queue`.
    ///
    /// Returns `QueueFull` when the queue must be drained with
    /// [`wait_queue`](Self::wait_queue) before posting again.
    fn write_notify(&self, req: WriteRequest) -> Result<()>;

    /// Wait until everything posted on `queue` has been handed to the target.
    fn wait_queue(&self, queue: QueueId) -> BoxFuture<'_, Result<()>>;

    /// Non-blocking read of a local notification counter; `None` while zero.
    fn poll_notify(&self, region: RegionId, id: NotifyId) -> Result<Option<u64>>;

    /// Wait until a local notification counter becomes non-zero.
    fn wait_notify(&self, region: RegionId, id: NotifyId) -> BoxFuture<'_, Result<u64>>;

    /// Clear a notification counter, returning its previous value.
    fn reset_notify(&self, region: RegionId, id: NotifyId) -> Result<u64>;

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> BoxFuture<'_, Result<()>>;
}
