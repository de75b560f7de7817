//! Depth-first block orders.

use crate::entity::PerEntity;
use crate::ir::{Block, Function};
use smallvec::{smallvec, SmallVec};

/// Blocks reachable from the entry of `func`, each emitted after all
/// of its successors except those reached through a back-edge.
///
/// Iterative, so deep CFGs do not overflow the stack. Successors are
/// explored in the order `block_succs` lists them.
pub fn calculate<F: Function + ?Sized>(func: &F) -> Vec<Block> {
    let mut order = vec![];
    if func.num_blocks() == 0 {
        return order;
    }

    let entry = func.entry_block();
    let mut visited: PerEntity<Block, bool> = PerEntity::default();
    // (block, index of the next successor to try)
    let mut stack: SmallVec<[(Block, usize); 64]> = smallvec![(entry, 0)];
    visited[entry] = true;

    while let Some((block, next)) = stack.last_mut() {
        let block = *block;
        match func.block_succs(block).get(*next) {
            Some(&succ) => {
                *next += 1;
                if !visited[succ] {
                    log::trace!("postorder: {} -> {}", block, succ);
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            }
            None => {
                order.push(block);
                stack.pop();
            }
        }
    }

    order
}
