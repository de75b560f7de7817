//! Intermediate representation.
//!
//! Analyses never touch a concrete IR directly: they read it through
//! the [`Function`] trait, which exposes a function's arguments, its
//! blocks and their CFG edges, and per-instruction operand facts. The
//! arena-based [`FunctionBody`] is the IR this crate ships for its
//! frontend, tool, and tests; any host IR with dense integer handles
//! can implement the trait instead.

use crate::declare_entity;

declare_entity!(Arg, "arg");
declare_entity!(Block, "block");
declare_entity!(Inst, "v");
declare_entity!(Func, "func");

mod display;
mod func;
mod module;
pub use display::*;
pub use func::*;
pub use module::*;

/// Anything that can be the operand of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// A formal argument of the enclosing function.
    Arg(Arg),
    /// The result of an instruction.
    Inst(Inst),
    /// An immediate. Never tracked by any analysis.
    Const(i64),
}

impl From<Arg> for Value {
    fn from(arg: Arg) -> Self {
        Value::Arg(arg)
    }
}

impl From<Inst> for Value {
    fn from(inst: Inst) -> Self {
        Value::Inst(inst)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Arg(arg) => write!(f, "{}", arg),
            Value::Inst(inst) => write!(f, "{}", inst),
            Value::Const(k) => write!(f, "{}", k),
        }
    }
}

/// The closed set of instruction shapes an analysis distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstKind {
    Ordinary,
    Phi,
    /// Ends a block and transfers control; produces no usable value.
    Terminator,
}

/// Read-only view of one function of a host IR.
///
/// Handles are dense: arguments are `0..num_args()` in declaration
/// order, blocks are `0..num_blocks()` in layout order, and
/// instructions are `0..num_insts()`. An instruction that is not
/// listed by any block's `block_insts` is not part of the function
/// body.
pub trait Function {
    fn entry_block(&self) -> Block;
    fn num_args(&self) -> usize;
    fn num_blocks(&self) -> usize;
    fn num_insts(&self) -> usize;

    /// Instructions of `block` in program order, terminator last.
    fn block_insts(&self, block: Block) -> &[Inst];
    fn block_preds(&self, block: Block) -> &[Block];
    fn block_succs(&self, block: Block) -> &[Block];

    fn inst_kind(&self, inst: Inst) -> InstKind;
    /// Whether `inst` defines a value that other instructions may use.
    fn inst_has_result(&self, inst: Inst) -> bool;
    /// Operands of an ordinary instruction or terminator. Empty for
    /// phis, whose inputs are only reachable through `phi_incoming`.
    fn inst_operands(&self, inst: Inst) -> &[Value];
    /// `(value, predecessor)` pairs of a phi. Empty for anything else.
    fn phi_incoming(&self, inst: Inst) -> &[(Value, Block)];

    fn is_phi(&self, inst: Inst) -> bool {
        self.inst_kind(inst) == InstKind::Phi
    }

    fn is_terminator(&self, inst: Inst) -> bool {
        self.inst_kind(inst) == InstKind::Terminator
    }
}
