//! Analyses built on the pass framework.

use crate::entity::EntityVec;
use crate::errors::AnalysisError;
use crate::ir::{Func, Function, Module};
use rayon::prelude::*;

mod annotate;
mod domain;
pub mod liveness;
mod phi_edges;

pub use annotate::LivenessDisplay;
pub use domain::Domain;
pub use liveness::{Liveness, LivenessProblem};
pub use phi_edges::PhiEdges;

/// Computes liveness for one function.
pub fn analyze<F: Function + ?Sized>(func: &F) -> Result<Liveness, AnalysisError> {
    let liveness = Liveness::compute(func)?;
    log::debug!(
        "liveness: {} blocks, {} values, {} phi edges, {} block visits",
        func.num_blocks(),
        liveness.domain().len(),
        liveness.phi_edges().len(),
        liveness.dataflow().total_visits()
    );
    Ok(liveness)
}

/// Computes liveness for every function of `module`, in parallel.
///
/// Each function gets its own domain, tables, and engine; a function
/// that fails to analyze does not affect the others.
pub fn analyze_module(module: &Module) -> EntityVec<Func, Result<Liveness, AnalysisError>> {
    let results = module
        .funcs()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|&(func, body)| {
            log::debug!("Analyzing {} \"{}\"", func, body.name);
            let result = analyze(body);
            if let Err(e) = &result {
                log::debug!("Analysis of {} \"{}\" failed: {}", func, body.name, e);
            }
            result
        })
        .collect::<Vec<_>>();
    EntityVec::from(results)
}
