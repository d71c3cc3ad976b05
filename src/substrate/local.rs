use super::Substrate;
use crate::config::FabricConfig;
use crate::error::{NwayError, Result};
use crate::types::{NotifyId, QueueId, Rank, RegionId, WriteRequest};
use crossbeam_queue::ArrayQueue;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A registered region: payload bytes plus its notification counters.
struct Region {
    data: Mutex<Vec<u8>>,
    counters: Vec<AtomicU64>,
    signal: tokio::sync::Notify,
}

impl Region {
    fn new(size_bytes: usize, capacity: u32) -> Self {
        Self {
            data: Mutex::new(vec![0u8; size_bytes]),
            counters: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            signal: tokio::sync::Notify::new(),
        }
    }

    fn counter(&self, rank: Rank, region: RegionId, id: NotifyId) -> Result<&AtomicU64> {
        self.counters.get(id as usize).ok_or_else(|| {
            NwayError::config(format!(
                "notification id {id} out of range for region {region} on rank {rank} (capacity {})",
                self.counters.len()
            ))
        })
    }
}

/// A posted write that has not been handed to the target yet.
struct PendingWrite {
    dest: Rank,
    region: RegionId,
    offset: usize,
    payload: Vec<u8>,
    notify: Option<(NotifyId, u64)>,
}

struct Shared {
    world: u32,
    config: FabricConfig,
    regions: Vec<RwLock<Vec<Option<Arc<Region>>>>>,
    barrier: tokio::sync::Barrier,
}

impl Shared {
    fn region(&self, rank: Rank, region: RegionId) -> Result<Arc<Region>> {
        let regions = self.regions[rank as usize]
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        regions
            .get(region as usize)
            .and_then(Option::clone)
            .ok_or(NwayError::UnknownRegion { rank, region })
    }
}

/// In-process substrate: every rank is a handle onto shared memory.
///
/// Writes are staged into bounded per-queue buffers when posted and land in
/// the target region when the queue is drained by
/// [`wait_queue`](Substrate::wait_queue). The target counter is bumped only
/// after the payload has been copied.
pub struct LocalFabric {
    rank: Rank,
    shared: Arc<Shared>,
    queues: Vec<ArrayQueue<PendingWrite>>,
    severed: Vec<AtomicBool>,
}

impl LocalFabric {
    /// Create `world` connected handles, one per rank, in rank order.
    pub fn bootstrap_local(world: u32, config: FabricConfig) -> Result<Vec<LocalFabric>> {
        if world == 0 {
            return Err(NwayError::config("world size must be at least 1"));
        }
        if config.queue_count == 0 || config.queue_depth == 0 {
            return Err(NwayError::config(
                "fabric needs at least one queue of non-zero depth",
            ));
        }

        let shared = Arc::new(Shared {
            world,
            regions: (0..world).map(|_| RwLock::new(Vec::new())).collect(),
            barrier: tokio::sync::Barrier::new(world as usize),
            config,
        });

        let fabrics = (0..world)
            .map(|rank| LocalFabric {
                rank,
                shared: Arc::clone(&shared),
                queues: (0..shared.config.queue_count)
                    .map(|_| ArrayQueue::new(shared.config.queue_depth))
                    .collect(),
                severed: (0..world).map(|_| AtomicBool::new(false)).collect(),
            })
            .collect();

        tracing::debug!(world, "local fabric bootstrapped");
        Ok(fabrics)
    }

    pub fn config(&self) -> &FabricConfig {
        &self.shared.config
    }

    /// Make every later write from this rank to `dest` fail.
    pub fn sever(&self, dest: Rank) {
        if let Some(flag) = self.severed.get(dest as usize) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Regions currently registered by this rank.
    pub fn region_count(&self) -> usize {
        self.shared.regions[self.rank as usize]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.is_some())
            .count()
    }

    fn queue(&self, queue: QueueId) -> Result<&ArrayQueue<PendingWrite>> {
        self.queues.get(queue as usize).ok_or_else(|| {
            NwayError::config(format!(
                "queue {queue} out of range ({} queues)",
                self.queues.len()
            ))
        })
    }

    fn deliver(&self, write: PendingWrite) -> Result<()> {
        let region = self
            .shared
            .region(write.dest, write.region)
            .map_err(|e| NwayError::transfer_with_source(write.dest, "target region", e))?;

        {
            let mut data = region.data.lock().unwrap_or_else(PoisonError::into_inner);
            let end = write.offset + write.payload.len();
            if end > data.len() {
                return Err(NwayError::transfer_with_source(
                    write.dest,
                    "write past end of target region",
                    NwayError::BufferSizeMismatch {
                        expected: end,
                        actual: data.len(),
                    },
                ));
            }
            data[write.offset..end].copy_from_slice(&write.payload);
        }

        if let Some((id, value)) = write.notify {
            let counter = region
                .counter(write.dest, write.region, id)
                .map_err(|e| NwayError::transfer_with_source(write.dest, "target counter", e))?;
            counter.fetch_add(value, Ordering::AcqRel);
            region.signal.notify_waiters();
        }
        Ok(())
    }
}

impl Substrate for LocalFabric {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> u32 {
        self.shared.world
    }

    fn queue_count(&self) -> u32 {
        self.queues.len() as u32
    }

    fn notification_capacity(&self) -> u32 {
        self.shared.config.notification_capacity
    }

    fn create_region(&self, size_bytes: usize) -> Result<RegionId> {
        let mut regions = self.shared.regions[self.rank as usize]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let region = Some(Arc::new(Region::new(
            size_bytes,
            self.shared.config.notification_capacity,
        )));
        let id = match regions.iter().position(Option::is_none) {
            Some(free) => {
                regions[free] = region;
                free
            }
            None => {
                regions.push(region);
                regions.len() - 1
            }
        };
        Ok(id as RegionId)
    }

    fn release_region(&self, region: RegionId) -> Result<()> {
        let mut regions = self.shared.regions[self.rank as usize]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = regions
            .get_mut(region as usize)
            .filter(|r| r.is_some())
            .ok_or(NwayError::UnknownRegion {
                rank: self.rank,
                region,
            })?;
        *slot = None;
        while matches!(regions.last(), Some(None)) {
            regions.pop();
        }
        Ok(())
    }

    fn read_region(&self, region: RegionId, offset: usize, dst: &mut [u8]) -> Result<()> {
        let region = self.shared.region(self.rank, region)?;
        let data = region.data.lock().unwrap_or_else(PoisonError::into_inner);
        let end = offset + dst.len();
        if end > data.len() {
            return Err(NwayError::BufferSizeMismatch {
                expected: end,
                actual: data.len(),
            });
        }
        dst.copy_from_slice(&data[offset..end]);
        Ok(())
    }

    fn write_region(&self, region: RegionId, offset: usize, src: &[u8]) -> Result<()> {
        let region = self.shared.region(self.rank, region)?;
        let mut data = region.data.lock().unwrap_or_else(PoisonError::into_inner);
        let end = offset + src.len();
        if end > data.len() {
            return Err(NwayError::BufferSizeMismatch {
                expected: end,
                actual: data.len(),
            });
        }
        data[offset..end].copy_from_slice(src);
        Ok(())
    }

    fn write_notify(&self, req: WriteRequest) -> Result<()> {
        if req.dest >= self.shared.world {
            return Err(NwayError::InvalidRank {
                rank: req.dest,
                world_size: self.shared.world,
            });
        }
        if self.severed[req.dest as usize].load(Ordering::Acquire) {
            return Err(NwayError::transfer(req.dest, "link severed"));
        }
        if let Some((id, _)) = req.notify {
            if id >= self.shared.config.notification_capacity {
                return Err(NwayError::transfer(
                    req.dest,
                    format!("notification id {id} beyond substrate capacity"),
                ));
            }
        }
        let queue = self.queue(req.queue)?;

        let mut payload = vec![0u8; req.len];
        self.read_region(req.local_region, req.local_offset, &mut payload)?;

        queue
            .push(PendingWrite {
                dest: req.dest,
                region: req.remote_region,
                offset: req.remote_offset,
                payload,
                notify: req.notify,
            })
            .map_err(|_| NwayError::QueueFull {
                queue: req.queue,
                depth: queue.capacity(),
            })
    }

    fn wait_queue(&self, queue: QueueId) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let q = self.queue(queue)?;
            while let Some(write) = q.pop() {
                self.deliver(write)?;
            }
            Ok(())
        })
    }

    fn poll_notify(&self, region: RegionId, id: NotifyId) -> Result<Option<u64>> {
        let r = self.shared.region(self.rank, region)?;
        let value = r.counter(self.rank, region, id)?.load(Ordering::Acquire);
        Ok((value != 0).then_some(value))
    }

    fn wait_notify(&self, region: RegionId, id: NotifyId) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let r = self.shared.region(self.rank, region)?;
            loop {
                let notified = r.signal.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let value = r.counter(self.rank, region, id)?.load(Ordering::Acquire);
                if value != 0 {
                    return Ok(value);
                }
                notified.await;
            }
        })
    }

    fn reset_notify(&self, region: RegionId, id: NotifyId) -> Result<u64> {
        let r = self.shared.region(self.rank, region)?;
        Ok(r.counter(self.rank, region, id)?.swap(0, Ordering::AcqRel))
    }

    fn barrier(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let timeout = self.shared.config.barrier_timeout;
            match tokio::time::timeout(timeout, self.shared.barrier.wait()).await {
                Ok(_) => Ok(()),
                Err(_) => {
                    tracing::warn!(rank = self.rank, ?timeout, "barrier timed out");
                    Err(NwayError::BarrierTimeout {
                        rank: self.rank,
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
            }
        })
    }
}
