//! Liveness analysis.
//!
//! A value is live at a program point if some path from that point
//! reads it before it is redefined. This is a backward may-analysis:
//! OUT of a block is the union of its successors' IN, and IN is
//! computed from OUT by walking the block's instructions in reverse,
//! removing each instruction's own result (kill) and then adding its
//! operands (gen).
//!
//! Phi inputs are not added to any block's IN. They are recorded per
//! predecessor edge in [`PhiEdges`]; a consumer asking "what is live
//! when leaving block P" wants [`Liveness::live_out_on_edges`].

use super::{Domain, LivenessDisplay, PhiEdges};
use crate::entity::{entities, EntityVec};
use crate::errors::AnalysisError;
use crate::ir::{Block, Function, FunctionBody, Inst, InstKind, Value};
use crate::pass::{BitVector, Dataflow, DataflowProblem, Direction};

/// The liveness dataflow problem for one function, together with the
/// side tables its transfer function fills in.
#[derive(Clone, Debug)]
pub struct LivenessProblem {
    domain: Domain,
    inst_live_in: EntityVec<Inst, BitVector>,
    phi_edges: PhiEdges,
}

impl LivenessProblem {
    pub fn new<F: Function + ?Sized>(func: &F) -> LivenessProblem {
        LivenessProblem::with_domain(Domain::build(func), func.num_insts())
    }

    fn with_domain(domain: Domain, num_insts: usize) -> LivenessProblem {
        let empty = domain.empty_set();
        let phi_edges = PhiEdges::new(domain.len());
        LivenessProblem {
            domain,
            inst_live_in: EntityVec::filled(num_insts, empty),
            phi_edges,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Live set immediately before `inst`, as of the last transfer
    /// over its block.
    pub fn live_before(&self, inst: Inst) -> &BitVector {
        &self.inst_live_in[inst]
    }

    pub fn phi_edges(&self) -> &PhiEdges {
        &self.phi_edges
    }

    /// Packages the side tables with the engine's block-level result.
    pub fn finish(self, dataflow: Dataflow<BitVector>) -> Liveness {
        Liveness {
            domain: self.domain,
            dataflow,
            inst_live_in: self.inst_live_in,
            phi_edges: self.phi_edges,
        }
    }
}

impl<F: Function + ?Sized> DataflowProblem<F> for LivenessProblem {
    type Value = BitVector;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    /// Nothing is live past a block that leaves the function.
    fn boundary(&self, _func: &F, _block: Block, value: &mut BitVector) {
        *value = self.domain.empty_set();
    }

    fn initial_value(&self, _func: &F, _block: Block) -> BitVector {
        self.domain.empty_set()
    }

    fn meet(&self, lhs: &mut BitVector, rhs: &BitVector) -> Result<(), AnalysisError> {
        lhs.union_with(rhs).map(|_| ())
    }

    fn transfer(
        &mut self,
        func: &F,
        block: Block,
        out: &BitVector,
    ) -> Result<BitVector, AnalysisError> {
        let mut live = out.clone();
        for &inst in func.block_insts(block).iter().rev() {
            let kind = func.inst_kind(inst);

            // Kill before gen: an instruction using its own result
            // leaves that result live.
            if kind != InstKind::Terminator {
                if let Some(index) = self.domain.index_of(Value::Inst(inst)) {
                    live.remove(index)?;
                }
            }

            match kind {
                InstKind::Phi => {
                    for &(value, pred) in func.phi_incoming(inst) {
                        if let Some(index) = self.domain.lookup(func, value)? {
                            self.phi_edges.mark(pred, index)?;
                        }
                    }
                }
                InstKind::Ordinary | InstKind::Terminator => {
                    for &operand in func.inst_operands(inst) {
                        if let Some(index) = self.domain.lookup(func, operand)? {
                            live.insert(index)?;
                        }
                    }
                }
            }

            self.inst_live_in
                .get_mut(inst)
                .ok_or(AnalysisError::UnknownValue(Value::Inst(inst)))?
                .clone_from(&live);
        }
        log::trace!("liveness: {} in = {:?}", block, live);
        Ok(live)
    }
}

/// Liveness of every value at every block boundary and before every
/// instruction of one function.
#[derive(Clone, Debug)]
pub struct Liveness {
    domain: Domain,
    dataflow: Dataflow<BitVector>,
    inst_live_in: EntityVec<Inst, BitVector>,
    phi_edges: PhiEdges,
}

impl Liveness {
    pub fn compute<F: Function + ?Sized>(func: &F) -> Result<Liveness, AnalysisError> {
        let mut problem = LivenessProblem::new(func);
        let dataflow = Dataflow::run(func, &mut problem)?;
        Ok(problem.finish(dataflow))
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn dataflow(&self) -> &Dataflow<BitVector> {
        &self.dataflow
    }

    pub fn live_in(&self, block: Block) -> &BitVector {
        self.dataflow.block_in(block)
    }

    pub fn live_out(&self, block: Block) -> &BitVector {
        self.dataflow.block_out(block)
    }

    /// Live set immediately before `inst` executes. For phis this
    /// excludes the phi's own inputs.
    pub fn live_before(&self, inst: Inst) -> &BitVector {
        &self.inst_live_in[inst]
    }

    /// Phi inputs flowing along the edges out of `pred`, if any phi
    /// names `pred` as a predecessor.
    pub fn phi_edge(&self, pred: Block) -> Option<&BitVector> {
        self.phi_edges.get(pred)
    }

    pub fn phi_edges(&self) -> &PhiEdges {
        &self.phi_edges
    }

    pub fn is_live_in(&self, block: Block, value: Value) -> bool {
        self.domain
            .index_of(value)
            .map_or(false, |index| self.live_in(block).contains(index))
    }

    pub fn is_live_out(&self, block: Block, value: Value) -> bool {
        self.domain
            .index_of(value)
            .map_or(false, |index| self.live_out(block).contains(index))
    }

    /// OUT of `pred` together with the phi inputs it supplies: what
    /// must be available when control leaves `pred`.
    pub fn live_out_on_edges(&self, pred: Block) -> Result<BitVector, AnalysisError> {
        let mut live = self.live_out(pred).clone();
        if let Some(phi_inputs) = self.phi_edge(pred) {
            live.union_with(phi_inputs)?;
        }
        Ok(live)
    }

    /// Translates a set produced by this analysis back to values.
    pub fn values<'a>(&'a self, set: &'a BitVector) -> impl Iterator<Item = Value> + 'a {
        self.domain.values_in(set)
    }

    /// Verifies that one more round of meet and transfer over every
    /// block changes neither the block sets nor the side tables.
    pub fn check_fixpoint<F: Function + ?Sized>(&self, func: &F) -> Result<(), AnalysisError> {
        let mut problem = LivenessProblem::with_domain(self.domain.clone(), func.num_insts());
        self.dataflow.check_fixpoint(func, &mut problem)?;
        for block in entities::<Block>(func.num_blocks()) {
            for &inst in func.block_insts(block) {
                if problem.inst_live_in.get(inst) != self.inst_live_in.get(inst) {
                    return Err(AnalysisError::NotAFixpoint(block));
                }
            }
        }
        if problem.phi_edges != self.phi_edges {
            // Either table may hold an edge the other lacks.
            let pred = self
                .phi_edges
                .iter()
                .chain(problem.phi_edges.iter())
                .map(|(pred, _)| pred)
                .find(|&pred| problem.phi_edges.get(pred) != self.phi_edges.get(pred))
                .unwrap_or_else(|| func.entry_block());
            return Err(AnalysisError::NotAFixpoint(pred));
        }
        Ok(())
    }

    /// The function's textual IR annotated with live sets.
    pub fn display<'a>(&'a self, body: &'a FunctionBody, indent: &'a str) -> LivenessDisplay<'a> {
        LivenessDisplay {
            body,
            liveness: self,
            indent,
            verbose: false,
        }
    }

    /// Like `display`, plus each block's OUT and phi-edge sets.
    pub fn display_verbose<'a>(
        &'a self,
        body: &'a FunctionBody,
        indent: &'a str,
    ) -> LivenessDisplay<'a> {
        LivenessDisplay {
            body,
            liveness: self,
            indent,
            verbose: true,
        }
    }
}
