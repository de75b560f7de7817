//! Error types.

use crate::ir::{Block, Value};

/// An error that aborts the analysis of one function.
///
/// All of these are structural invariant violations: either the IR
/// handed to the analysis is inconsistent, or a flow value was built
/// against a different domain than the one it is combined with. There
/// is no partial result when one of these occurs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    /// A bit-vector access outside `[0, len)`.
    IndexOutOfBounds { index: usize, len: usize },
    /// Two flow values of differing lengths were combined.
    DomainMismatch { left: usize, right: usize },
    /// A block names a predecessor or successor that does not exist
    /// in the function.
    InvalidBlock(Block),
    /// An argument or instruction result is used but was never
    /// assigned a domain index.
    UnknownValue(Value),
    /// A fixpoint check found a block whose flow value still changes.
    NotAFixpoint(Block),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for AnalysisError {}

/// An error that occurs when parsing textual IR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrontendError {
    /// Unrecognized character sequence.
    Lex { line: usize },
    /// Well-formed tokens in an unexpected order.
    Parse { line: usize, message: String },
    /// A `%name` operand that no argument or instruction defines.
    UndefinedValue(String),
    /// A label that no block in the function carries.
    UndefinedBlock(String),
    /// A function, block, or value name defined twice.
    Redefinition(String),
    /// The named block does not end in a terminator.
    MissingTerminator(String),
    /// The named block has a terminator before its last instruction.
    MisplacedTerminator(String),
}

impl std::fmt::Display for FrontendError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for FrontendError {}
