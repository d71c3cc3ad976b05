use crate::error::{NwayError, Result};
use crate::types::{NotifyId, Rank};

/// Notification id layout shared by every receiver: `source * n_blocks + block`.
///
/// Validated once at startup so that every id a receiver can expect fits the
/// substrate's per-region notification range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpace {
    world: u32,
    n_blocks: usize,
}

impl TagSpace {
    pub fn new(world: u32, n_blocks: usize, capacity: u32) -> Result<Self> {
        if world == 0 || n_blocks == 0 {
            return Err(NwayError::config("tag space needs at least one rank and block"));
        }
        let needed = world as u64 * n_blocks as u64;
        if needed > capacity as u64 {
            return Err(NwayError::config(format!(
                "{world} ranks x {n_blocks} blocks = {needed} notification ids, substrate provides {capacity}"
            )));
        }
        Ok(Self { world, n_blocks })
    }

    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    /// Number of ids in use.
    pub fn len(&self) -> usize {
        self.world as usize * self.n_blocks
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, source: Rank, block: usize) -> Result<NotificationTag> {
        if source >= self.world || block >= self.n_blocks {
            return Err(NwayError::config(format!(
                "(source {source}, block {block}) outside tag space of {} ranks x {} blocks",
                self.world, self.n_blocks
            )));
        }
        Ok(NotificationTag((source as usize * self.n_blocks + block) as NotifyId))
    }

    pub fn decode(&self, tag: NotificationTag) -> Result<(Rank, usize)> {
        let raw = tag.0 as usize;
        if raw >= self.len() {
            return Err(NwayError::config(format!(
                "notification id {raw} outside tag space of {} ids",
                self.len()
            )));
        }
        Ok(((raw / self.n_blocks) as Rank, raw % self.n_blocks))
    }
}

/// A notification id naming one `(source, block)` contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationTag(NotifyId);

impl NotificationTag {
    /// Wrap a raw id as received from the substrate.
    pub fn from_raw(id: NotifyId) -> Self {
        Self(id)
    }

    pub fn id(self) -> NotifyId {
        self.0
    }
}

impl std::fmt::Display for NotificationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}
