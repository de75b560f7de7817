//! Values live only along a particular predecessor edge.

use crate::errors::AnalysisError;
use crate::ir::Block;
use crate::pass::BitVector;
use fxhash::FxHashMap;

/// Per-predecessor sets of phi inputs.
///
/// A phi `%p = phi [%x, left], [%y, right]` uses `%x` only when
/// control arrives from `left`. Such uses are recorded here, keyed by
/// the predecessor, instead of in any block's live-in set. An entry
/// is created the first time a phi names its block as a predecessor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhiEdges {
    domain_len: usize,
    edges: FxHashMap<Block, BitVector>,
}

impl PhiEdges {
    pub fn new(domain_len: usize) -> PhiEdges {
        PhiEdges {
            domain_len,
            edges: FxHashMap::default(),
        }
    }

    /// Records that the value at `index` flows into a phi along the
    /// edge leaving `pred`.
    pub fn mark(&mut self, pred: Block, index: usize) -> Result<(), AnalysisError> {
        let domain_len = self.domain_len;
        self.edges
            .entry(pred)
            .or_insert_with(|| BitVector::new(domain_len))
            .insert(index)
    }

    pub fn get(&self, pred: Block) -> Option<&BitVector> {
        self.edges.get(&pred)
    }

    /// Entries sorted by predecessor.
    pub fn iter(&self) -> impl Iterator<Item = (Block, &BitVector)> {
        let mut entries = self
            .edges
            .iter()
            .map(|(&block, set)| (block, set))
            .collect::<Vec<_>>();
        entries.sort_by_key(|&(block, _)| block);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
