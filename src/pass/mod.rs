//! Pass framework: the generic dataflow solver and the flow-value
//! types it is usually instantiated with.
//!
//! A pass only reads the function it runs over. It may visit blocks
//! many times before converging; what it produces is per-block flow
//! values plus whatever side tables the problem fills in.

pub mod bitvec;
pub use bitvec::*;
pub mod dataflow;
pub use dataflow::*;
