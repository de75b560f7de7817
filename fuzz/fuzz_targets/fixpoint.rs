//! Fuzzing liveness convergence on arbitrary CFGs.
//!
//! 1. Generate a function with an arbitrary CFG, phis, and uses.
//! 2. Analyze it.
//! 3. Check that the result is a fixpoint, that nothing is live out
//!    of a block without successors, and that no block was visited
//!    more often than its successors' IN sets can grow.

#![no_main]
use libfuzzer_sys::fuzz_target;
use lively::{analyze, fuzzing::ArbitraryFunction, Function};

fuzz_target!(|func: ArbitraryFunction| {
    let _ = env_logger::try_init();
    let body = func.to_body();
    log::debug!("body:\n{}", body.display("| "));
    let liveness = analyze(&body).unwrap();
    liveness.check_fixpoint(&body).unwrap();
    for block in body.blocks.iter() {
        if body.block_succs(block).is_empty() {
            assert_eq!(liveness.live_out(block).count(), 0);
        }
        // One seeded visit, plus one per change of a successor's IN.
        let bound = 1 + body.block_succs(block).len() * liveness.domain().len();
        assert!(liveness.dataflow().visits(block) <= bound);
    }
});
