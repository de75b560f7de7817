//! Lightweight CFG analyses.

use crate::declare_entity;
use crate::entity::{entities, EntityRef, EntityVec, PerEntity};
use crate::ir::{Block, Function};

pub mod postorder;

declare_entity!(RPOIndex, "rpo");

/// Block orders and reachability of one function's CFG.
#[derive(Clone, Debug)]
pub struct CFGInfo {
    /// Entry block.
    pub entry: Block,
    /// Blocks without successors, in layout order.
    pub exit_blocks: Vec<Block>,
    /// Reverse-postorder traversal of the blocks reachable from entry.
    pub rpo: EntityVec<RPOIndex, Block>,
    /// Position of each block in RPO, if reachable.
    pub rpo_pos: PerEntity<Block, Option<RPOIndex>>,
    /// Blocks not reachable from entry, in layout order.
    pub unreachable: Vec<Block>,
}

impl CFGInfo {
    pub fn new<F: Function + ?Sized>(f: &F) -> CFGInfo {
        let blocks = entities::<Block>(f.num_blocks());

        let exit_blocks = blocks
            .clone()
            .filter(|&block| f.block_succs(block).is_empty())
            .collect::<Vec<_>>();

        let mut rpo = postorder::calculate(f);
        rpo.reverse();
        let rpo = EntityVec::from(rpo);
        let mut rpo_pos = PerEntity::default();
        for (rpo, &block) in rpo.entries() {
            rpo_pos[block] = Some(rpo);
        }

        let unreachable = blocks
            .filter(|&block| rpo_pos[block].is_none())
            .collect::<Vec<_>>();
        if !unreachable.is_empty() {
            log::debug!("cfg: unreachable blocks {:?}", unreachable);
        }

        CFGInfo {
            entry: f.entry_block(),
            exit_blocks,
            rpo,
            rpo_pos,
            unreachable,
        }
    }

    pub fn is_reachable(&self, block: Block) -> bool {
        self.rpo_pos[block].is_some()
    }

    /// Reachable blocks in postorder: each block after its
    /// (non-back-edge) successors.
    pub fn postorder(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.rpo.len())
            .rev()
            .map(move |i| self.rpo[RPOIndex::new(i)])
    }
}
