//! Fuzzing-specific utilities.

use crate::entity::EntityRef;
use crate::ir::{Block, FunctionBody, Terminator, Value};
use libfuzzer_sys::arbitrary::{self, Arbitrary};

/// Recipe for a function with an arbitrary (possibly irreducible,
/// possibly partly unreachable) CFG.
///
/// Public/exported only for access by fuzzers.
#[derive(Clone, Debug)]
pub struct ArbitraryFunction {
    num_args: u8,
    num_blocks: u8,
    edges: Vec<(u8, u8)>,
    insts: Vec<ArbitraryInst>,
}

#[derive(Clone, Debug)]
struct ArbitraryInst {
    block: u8,
    phi: bool,
    has_result: bool,
    operands: Vec<u8>,
}

impl<'a> Arbitrary<'a> for ArbitraryFunction {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(ArbitraryFunction {
            num_args: u.arbitrary()?,
            num_blocks: u.arbitrary()?,
            edges: u.arbitrary()?,
            insts: u.arbitrary()?,
        })
    }
}

impl<'a> Arbitrary<'a> for ArbitraryInst {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(ArbitraryInst {
            block: u.arbitrary()?,
            phi: u.arbitrary()?,
            has_result: u.arbitrary()?,
            operands: u.arbitrary()?,
        })
    }
}

/// Operand `k`: one of the values defined so far, or a constant if
/// there are none yet.
fn pick(pool: &[Value], k: u8) -> Value {
    if pool.is_empty() {
        Value::Const(i64::from(k))
    } else {
        pool[usize::from(k) % pool.len()]
    }
}

impl ArbitraryFunction {
    pub fn to_body(&self) -> FunctionBody {
        let mut body = FunctionBody::new("fuzz");
        let mut pool = vec![];
        for i in 0..(self.num_args % 4) {
            pool.push(body.add_arg(&format!("a{}", i)));
        }

        let num_blocks = std::cmp::max(1, usize::from(self.num_blocks % 16));
        for i in 1..num_blocks {
            body.add_block(&format!("b{}", i));
        }

        let mut succs: Vec<Vec<Block>> = vec![vec![]; num_blocks];
        let mut preds: Vec<Vec<Block>> = vec![vec![]; num_blocks];
        for &(from, to) in &self.edges {
            let from = usize::from(from) % num_blocks;
            let to = usize::from(to) % num_blocks;
            succs[from].push(Block::new(to));
            preds[to].push(Block::new(from));
        }

        // Phis first so they lead their blocks.
        for inst in self.insts.iter().filter(|inst| inst.phi) {
            let block = usize::from(inst.block) % num_blocks;
            let incoming = preds[block]
                .iter()
                .enumerate()
                .map(|(i, &pred)| {
                    let k = inst.operands.get(i).copied().unwrap_or(0);
                    (pick(&pool, k), pred)
                })
                .collect::<Vec<_>>();
            let phi = body.append_phi(Block::new(block), incoming);
            pool.push(Value::Inst(phi));
        }

        for inst in self.insts.iter().filter(|inst| !inst.phi) {
            let block = usize::from(inst.block) % num_blocks;
            let args = inst
                .operands
                .iter()
                .map(|&k| pick(&pool, k))
                .collect::<Vec<_>>();
            let op = body.append_op(Block::new(block), "op", args, inst.has_result);
            if inst.has_result {
                pool.push(Value::Inst(op));
            }
        }

        for (block, dests) in succs.into_iter().enumerate() {
            let value = pick(&pool, block as u8);
            let terminator = match dests.len() {
                0 => Terminator::Return {
                    values: vec![value],
                },
                1 => Terminator::Br { target: dests[0] },
                2 => Terminator::CondBr {
                    cond: value,
                    if_true: dests[0],
                    if_false: dests[1],
                },
                _ => {
                    let mut targets = dests;
                    let default = targets.remove(0);
                    Terminator::Switch {
                        value,
                        default,
                        targets,
                    }
                }
            };
            body.end_block(Block::new(block), terminator);
        }

        body
    }
}
