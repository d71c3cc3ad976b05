/// Rank of a participant in the collective (0-indexed).
pub type Rank = u32;

/// Identifier of a registered memory region. Regions are created in the same
/// order on every rank, so an id names the same logical region everywhere.
pub type RegionId = u32;

/// Identifier of a notification counter within a region.
pub type NotifyId = u32;

/// Index of an outbound transfer queue.
pub type QueueId = u32;

/// Built-in reduction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Element-wise sum across ranks.
    Sum,
    /// Element-wise product across ranks.
    Prod,
    /// Element-wise minimum across ranks.
    Min,
    /// Element-wise maximum across ranks.
    Max,
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}

/// One-sided write of a local region range into a remote region, optionally
/// bumping a notification counter on the target once the data has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    pub local_region: RegionId,
    pub local_offset: usize,
    pub dest: Rank,
    pub remote_region: RegionId,
    pub remote_offset: usize,
    pub len: usize,
    /// `(notify_id, value)` added to the target counter after the payload lands.
    pub notify: Option<(NotifyId, u64)>,
    pub queue: QueueId,
}
