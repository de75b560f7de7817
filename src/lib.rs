//! LIVELY: liveness and iterative dataflow analysis over SSA
//! control-flow graphs.

pub mod analysis;
pub mod cfg;
pub mod entity;
mod errors;
pub mod frontend;
mod ir;
pub mod pass;

pub use analysis::{analyze, analyze_module, Liveness};
pub use errors::*;
pub use ir::*;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
