use super::partition::{BlockLayout, restrict_fan_in};
use super::tag::TagSpace;
use super::topology::ReductionTree;
use crate::config::ReduceConfig;
use crate::error::{NwayError, Result};
use crate::types::Rank;

/// Everything a rank derives locally before the collective starts.
///
/// All configuration errors surface here, so a rank that passes planning can
/// only fail mid-collective on transfer or protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducePlan {
    root: Rank,
    layout: BlockLayout,
    tree: ReductionTree,
    tags: TagSpace,
}

impl ReducePlan {
    pub fn new(
        world: u32,
        count: usize,
        root: Rank,
        config: &ReduceConfig,
        notification_capacity: u32,
    ) -> Result<Self> {
        if world == 0 {
            return Err(NwayError::config("world size must be at least 1"));
        }
        if root >= world {
            return Err(NwayError::InvalidRank {
                rank: root,
                world_size: world,
            });
        }

        let layout = BlockLayout::plan(count, config.max_block_len, config.max_blocks)?;
        let tags = TagSpace::new(world, layout.n_blocks(), notification_capacity)?;
        let fan_in = restrict_fan_in(config.fan_in, world)?;
        let tree = ReductionTree::build(world, fan_in)?;

        tracing::debug!(
            world,
            root,
            count,
            fan_in,
            block_len = layout.block_len(),
            n_blocks = layout.n_blocks(),
            last_len = layout.last_len(),
            "reduce plan"
        );

        Ok(Self {
            root,
            layout,
            tree,
            tags,
        })
    }

    pub fn root(&self) -> Rank {
        self.root
    }

    pub fn world(&self) -> u32 {
        self.tree.world()
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn tree(&self) -> &ReductionTree {
        &self.tree
    }

    pub fn tags(&self) -> &TagSpace {
        &self.tags
    }
}
