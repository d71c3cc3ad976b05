use crate::error::{NwayError, Result};
use crate::types::Rank;

/// Level-structured N-ary reduction tree over tree positions `0..world`.
///
/// Position 0 is the root. Children are assigned breadth-first: the children
/// of position `p` are `p*W + 1 ..= p*W + W`, truncated at `world`. Every rank
/// builds the same tree from `(world, fan_in)` without communicating.
///
/// Tree positions are rotated real ranks, see [`to_position`] and [`to_rank`],
/// so any rank can serve as root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionTree {
    world: u32,
    fan_in: u32,
    parent: Vec<Option<Rank>>,
    /// `fan_in` slots per position; absent children are `None`.
    children: Vec<Vec<Option<Rank>>>,
    n_recv: Vec<u32>,
}

impl ReductionTree {
    pub fn build(world: u32, fan_in: u32) -> Result<Self> {
        if world < 1 {
            return Err(NwayError::config("world size must be at least 1"));
        }
        if fan_in < 1 {
            return Err(NwayError::config("fan-in must be at least 1"));
        }

        let n = world as usize;
        let w = fan_in as u64;
        let mut parent = vec![None; n];
        let mut children = vec![vec![None; fan_in as usize]; n];
        let mut n_recv = vec![0u32; n];

        for pos in 1..world {
            let p = ((pos as u64 - 1) / w) as Rank;
            let slot = ((pos as u64 - 1) % w) as usize;
            parent[pos as usize] = Some(p);
            children[p as usize][slot] = Some(pos);
            n_recv[p as usize] += 1;
        }

        Ok(Self {
            world,
            fan_in,
            parent,
            children,
            n_recv,
        })
    }

    pub fn world(&self) -> u32 {
        self.world
    }

    pub fn fan_in(&self) -> u32 {
        self.fan_in
    }

    /// Parent position, `None` for the root.
    pub fn parent(&self, pos: Rank) -> Option<Rank> {
        self.parent[pos as usize]
    }

    /// All `fan_in` child slots of `pos`, including absent ones.
    pub fn child_slots(&self, pos: Rank) -> &[Option<Rank>] {
        &self.children[pos as usize]
    }

    /// Present children of `pos`, in slot order.
    pub fn children(&self, pos: Rank) -> impl Iterator<Item = Rank> + '_ {
        self.children[pos as usize].iter().flatten().copied()
    }

    /// Number of children whose contributions `pos` waits for.
    pub fn n_recv(&self, pos: Rank) -> u32 {
        self.n_recv[pos as usize]
    }

    pub fn is_leaf(&self, pos: Rank) -> bool {
        self.n_recv[pos as usize] == 0
    }

    /// Number of edges from `pos` up to the root.
    pub fn depth(&self, pos: Rank) -> u32 {
        let mut depth = 0;
        let mut cur = pos;
        while let Some(p) = self.parent(cur) {
            cur = p;
            depth += 1;
        }
        depth
    }
}

/// Tree position of `rank` when `root` sits at position 0.
pub fn to_position(rank: Rank, root: Rank, world: u32) -> Rank {
    ((rank as u64 + world as u64 - root as u64) % world as u64) as Rank
}

/// Real rank occupying tree position `pos` when `root` sits at position 0.
pub fn to_rank(pos: Rank, root: Rank, world: u32) -> Rank {
    ((pos as u64 + root as u64) % world as u64) as Rank
}
