//! Iterative dataflow analysis (forward and backward).
//!
//! A [`DataflowProblem`] supplies the flow-value type and four hooks
//! (boundary condition, initial value, meet, transfer); [`Dataflow`]
//! drives them to a fixpoint with a worklist.
//!
//! Terminology, independent of direction: the *meet side* of a block
//! is the flow value computed by meeting over its neighbors (OUT for
//! a backward problem, IN for a forward one), and the *transfer side*
//! is the value the transfer function produces from it (IN for
//! backward, OUT for forward).

use crate::cfg::CFGInfo;
use crate::entity::{entities, EntityRef, EntityVec};
use crate::errors::AnalysisError;
use crate::ir::{Block, Function};
use fxhash::FxHashSet;
use std::collections::VecDeque;
use std::fmt::Debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Information flows from entry to exits; meet is over predecessors.
    Forward,
    /// Information flows from exits to entry; meet is over successors.
    Backward,
}

pub trait DataflowProblem<F: Function + ?Sized> {
    type Value: Clone + Debug + PartialEq;

    fn direction(&self) -> Direction;

    /// Populates the meet-side value of a block with no neighbors to
    /// meet over (no successors for backward, no predecessors for
    /// forward).
    fn boundary(&self, func: &F, block: Block, value: &mut Self::Value);

    /// A fresh value used to seed IN and OUT of every block, and as
    /// the starting point of each meet.
    fn initial_value(&self, func: &F, block: Block) -> Self::Value;

    /// `lhs = meet(lhs, rhs)`, in place.
    fn meet(&self, lhs: &mut Self::Value, rhs: &Self::Value) -> Result<(), AnalysisError>;

    /// Computes the transfer-side value of `block` from its
    /// meet-side value `input`. `input` is the engine's stored value
    /// and must not be modified; work on a copy.
    fn transfer(
        &mut self,
        func: &F,
        block: Block,
        input: &Self::Value,
    ) -> Result<Self::Value, AnalysisError>;
}

#[derive(Clone, Debug)]
pub struct Dataflow<T: Clone + Debug> {
    direction: Direction,
    meet_side: EntityVec<Block, T>,
    transfer_side: EntityVec<Block, T>,
    visits: EntityVec<Block, usize>,
}

impl<T: Clone + Debug + PartialEq> Dataflow<T> {
    /// Runs `problem` over `func` to a fixpoint.
    pub fn run<F, P>(func: &F, problem: &mut P) -> Result<Dataflow<T>, AnalysisError>
    where
        F: Function + ?Sized,
        P: DataflowProblem<F, Value = T>,
    {
        check_edges(func)?;
        let direction = problem.direction();
        let num_blocks = func.num_blocks();

        let mut meet_side = EntityVec::default();
        let mut transfer_side = EntityVec::default();
        for block in entities::<Block>(num_blocks) {
            let mut value = problem.initial_value(func, block);
            if sources(func, direction, block).is_empty() {
                problem.boundary(func, block, &mut value);
            }
            meet_side.push(value);
            transfer_side.push(problem.initial_value(func, block));
        }

        let mut analysis = Dataflow {
            direction,
            meet_side,
            transfer_side,
            visits: EntityVec::filled(num_blocks, 0),
        };
        analysis.compute(func, problem)?;
        Ok(analysis)
    }

    fn compute<F, P>(&mut self, func: &F, problem: &mut P) -> Result<(), AnalysisError>
    where
        F: Function + ?Sized,
        P: DataflowProblem<F, Value = T>,
    {
        let mut workqueue = VecDeque::new();
        let mut workqueue_set = FxHashSet::default();
        for block in seed_order(func, self.direction) {
            workqueue.push_back(block);
            workqueue_set.insert(block);
        }

        while let Some(block) = workqueue.pop_front() {
            workqueue_set.remove(&block);
            self.visits[block] += 1;
            log::trace!("dataflow: visiting {} (visit {})", block, self.visits[block]);

            if let Some(met) = self.meet_over_sources(func, problem, block)? {
                self.meet_side[block] = met;
            }
            let value = problem.transfer(func, block, &self.meet_side[block])?;
            if value == self.transfer_side[block] {
                continue;
            }
            log::trace!(" -> {} changed: {:?}", block, value);
            self.transfer_side[block] = value;

            for &dependent in dependents(func, self.direction, block) {
                if workqueue_set.insert(dependent) {
                    workqueue.push_back(dependent);
                }
            }
        }

        log::debug!(
            "dataflow: {:?} problem converged after {} block visits over {} blocks",
            self.direction,
            self.total_visits(),
            func.num_blocks()
        );
        Ok(())
    }

    /// The meet over all sources of `block`, or `None` for a boundary
    /// block, whose meet-side value stays at its boundary condition.
    fn meet_over_sources<F, P>(
        &self,
        func: &F,
        problem: &P,
        block: Block,
    ) -> Result<Option<T>, AnalysisError>
    where
        F: Function + ?Sized,
        P: DataflowProblem<F, Value = T>,
    {
        let sources = sources(func, self.direction, block);
        if sources.is_empty() {
            return Ok(None);
        }
        let mut value = problem.initial_value(func, block);
        for &source in sources {
            problem.meet(&mut value, &self.transfer_side[source])?;
        }
        Ok(Some(value))
    }

    /// Re-applies one round of meet and transfer to every block and
    /// reports the first block whose stored value would change.
    pub fn check_fixpoint<F, P>(&self, func: &F, problem: &mut P) -> Result<(), AnalysisError>
    where
        F: Function + ?Sized,
        P: DataflowProblem<F, Value = T>,
    {
        check_edges(func)?;
        for block in entities::<Block>(func.num_blocks()) {
            let meet_side = match self.meet_over_sources(func, problem, block)? {
                Some(met) if met != self.meet_side[block] => {
                    return Err(AnalysisError::NotAFixpoint(block))
                }
                Some(met) => met,
                None => self.meet_side[block].clone(),
            };
            if problem.transfer(func, block, &meet_side)? != self.transfer_side[block] {
                return Err(AnalysisError::NotAFixpoint(block));
            }
        }
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn block_in(&self, block: Block) -> &T {
        match self.direction {
            Direction::Forward => &self.meet_side[block],
            Direction::Backward => &self.transfer_side[block],
        }
    }

    pub fn block_out(&self, block: Block) -> &T {
        match self.direction {
            Direction::Forward => &self.transfer_side[block],
            Direction::Backward => &self.meet_side[block],
        }
    }

    /// How many times `block` was taken off the worklist.
    pub fn visits(&self, block: Block) -> usize {
        self.visits[block]
    }

    pub fn total_visits(&self) -> usize {
        self.visits.values().sum()
    }
}

/// Blocks whose transfer-side values feed the meet of `block`.
fn sources<F: Function + ?Sized>(func: &F, direction: Direction, block: Block) -> &[Block] {
    match direction {
        Direction::Forward => func.block_preds(block),
        Direction::Backward => func.block_succs(block),
    }
}

/// Blocks whose meet reads the transfer-side value of `block`.
fn dependents<F: Function + ?Sized>(func: &F, direction: Direction, block: Block) -> &[Block] {
    match direction {
        Direction::Forward => func.block_succs(block),
        Direction::Backward => func.block_preds(block),
    }
}

/// Every block once: reachable blocks in the order that converges
/// fastest for `direction`, then unreachable ones in layout order.
fn seed_order<F: Function + ?Sized>(func: &F, direction: Direction) -> Vec<Block> {
    let cfg = CFGInfo::new(func);
    let mut order = match direction {
        Direction::Forward => cfg.rpo.values().copied().collect::<Vec<_>>(),
        Direction::Backward => cfg.postorder().collect::<Vec<_>>(),
    };
    order.extend(cfg.unreachable.iter().copied());
    order
}

fn check_edges<F: Function + ?Sized>(func: &F) -> Result<(), AnalysisError> {
    let num_blocks = func.num_blocks();
    if num_blocks > 0 && func.entry_block().index() >= num_blocks {
        return Err(AnalysisError::InvalidBlock(func.entry_block()));
    }
    for block in entities::<Block>(num_blocks) {
        let mut edges = func.block_succs(block).iter().chain(func.block_preds(block));
        if let Some(&bad) = edges.find(|b| b.index() >= num_blocks) {
            return Err(AnalysisError::InvalidBlock(bad));
        }
    }
    Ok(())
}
