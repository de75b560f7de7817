//! The universe of values a liveness bit-vector ranges over.

use crate::entity::{entities, EntityRef};
use crate::errors::AnalysisError;
use crate::ir::{Arg, Block, Function, Value};
use crate::pass::BitVector;
use fxhash::FxHashMap;
use std::collections::hash_map::Entry as HashEntry;

/// Bijection between the tracked values of one function and bit
/// positions `0..len()`.
///
/// Arguments come first, in declaration order, followed by every
/// result-producing instruction in program order. Built once per
/// analyzed function and never extended afterwards.
#[derive(Clone, Debug, Default)]
pub struct Domain {
    values: Vec<Value>,
    index: FxHashMap<Value, usize>,
}

impl Domain {
    pub fn build<F: Function + ?Sized>(func: &F) -> Domain {
        let mut domain = Domain::default();
        for arg in entities::<Arg>(func.num_args()) {
            domain.push(Value::Arg(arg));
        }
        for block in entities::<Block>(func.num_blocks()) {
            for &inst in func.block_insts(block) {
                if func.inst_has_result(inst) {
                    domain.push(Value::Inst(inst));
                }
            }
        }
        log::debug!(
            "domain: {} values ({} args)",
            domain.len(),
            func.num_args()
        );
        domain
    }

    fn push(&mut self, value: Value) {
        match self.index.entry(value) {
            HashEntry::Vacant(v) => {
                v.insert(self.values.len());
                self.values.push(value);
            }
            HashEntry::Occupied(o) => {
                log::trace!("domain: {} already has index {}", value, o.get());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tracked values, ordered by index.
    pub fn values(&self) -> &[Value] {
        &self.values[..]
    }

    /// The value at `index`, or `None` past the end of the domain.
    pub fn value(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    pub fn index_of(&self, value: Value) -> Option<usize> {
        self.index.get(&value).copied()
    }

    /// An all-false vector sized to this domain.
    pub fn empty_set(&self) -> BitVector {
        BitVector::new(self.len())
    }

    /// Resolves an operand to its bit position.
    ///
    /// Constants and instructions without a result are untracked and
    /// yield `None`. A value that should be tracked but has no index,
    /// such as an instruction that no block contains, is an error.
    pub fn lookup<F: Function + ?Sized>(
        &self,
        func: &F,
        value: Value,
    ) -> Result<Option<usize>, AnalysisError> {
        match value {
            Value::Const(_) => Ok(None),
            Value::Inst(inst)
                if inst.index() < func.num_insts() && !func.inst_has_result(inst) =>
            {
                Ok(None)
            }
            _ => self
                .index_of(value)
                .map(Some)
                .ok_or(AnalysisError::UnknownValue(value)),
        }
    }

    /// The values whose bits are set in `set`.
    pub fn values_in<'a>(&'a self, set: &'a BitVector) -> impl Iterator<Item = Value> + 'a {
        set.iter_ones().filter_map(move |index| self.values.get(index).copied())
    }
}
