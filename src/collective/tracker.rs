use super::tag::{NotificationTag, TagSpace};
use crate::error::{NwayError, Result};
use crate::types::Rank;

/// Per-rank arrival bookkeeping for one reduce.
///
/// `recv_cursor[source]` is the next block expected from `source`;
/// `recv_per_block[block]` counts children whose contribution to `block` has
/// been observed. Both only ever grow.
#[derive(Debug, Clone)]
pub struct ArrivalState {
    rank: Rank,
    tags: TagSpace,
    expected: u32,
    recv_cursor: Vec<usize>,
    recv_per_block: Vec<u32>,
    received: usize,
}

impl ArrivalState {
    /// `rank` is this rank (for error reports), `expected` its child count.
    pub fn new(rank: Rank, world: u32, expected: u32, tags: TagSpace) -> Self {
        Self {
            rank,
            tags,
            expected,
            recv_cursor: vec![0; world as usize],
            recv_per_block: vec![0; tags.n_blocks()],
            received: 0,
        }
    }

    /// Tag of the next contribution expected from `source`, if any remain.
    pub fn next_tag(&self, source: Rank) -> Result<Option<NotificationTag>> {
        let cursor = self.cursor(source)?;
        if cursor >= self.tags.n_blocks() {
            return Ok(None);
        }
        self.tags.encode(source, cursor).map(Some)
    }

    /// Record that the notification `tag` from `source` has landed.
    ///
    /// Returns the block index once every expected child has contributed to it.
    pub fn observe(&mut self, source: Rank, tag: NotificationTag) -> Result<Option<usize>> {
        let cursor = self.cursor(source)?;
        let (tag_source, block) = self
            .tags
            .decode(tag)
            .map_err(|e| NwayError::protocol(self.rank, e.to_string()))?;

        if tag_source != source || block != cursor {
            tracing::error!(
                rank = self.rank,
                source,
                %tag,
                tag_source,
                block,
                cursor,
                "unexpected notification"
            );
            return Err(NwayError::protocol(
                self.rank,
                format!(
                    "{tag} decodes to (source {tag_source}, block {block}), expected (source {source}, block {cursor})"
                ),
            ));
        }
        if self.recv_per_block[block] >= self.expected {
            return Err(NwayError::protocol(
                self.rank,
                format!("block {block} already has all {} contributions", self.expected),
            ));
        }

        self.recv_cursor[source as usize] += 1;
        self.recv_per_block[block] += 1;
        self.received += 1;

        if self.recv_per_block[block] == self.expected {
            Ok(Some(block))
        } else {
            Ok(None)
        }
    }

    /// Notifications observed so far, across all children.
    pub fn received(&self) -> usize {
        self.received
    }

    /// True once `expected * n_blocks` notifications have been observed.
    pub fn is_done(&self) -> bool {
        self.received == self.expected as usize * self.tags.n_blocks()
    }

    fn cursor(&self, source: Rank) -> Result<usize> {
        self.recv_cursor.get(source as usize).copied().ok_or_else(|| {
            NwayError::protocol(self.rank, format!("notification from unknown rank {source}"))
        })
    }
}
