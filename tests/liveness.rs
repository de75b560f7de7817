//! Liveness results on small hand-built functions.

use lively::analysis::{Domain, LivenessProblem};
use lively::entity::EntityRef;
use lively::pass::{BitVector, Dataflow, DataflowProblem, Direction};
use lively::{
    analyze, analyze_module, AnalysisError, Arg, Block, Function, FunctionBody, Inst, InstData,
    InstDef, Liveness, Module, Terminator, Value,
};

fn parse(text: &str) -> FunctionBody {
    let _ = env_logger::try_init();
    let module = Module::from_text(text).unwrap();
    let (_, body) = module.funcs().next().unwrap();
    body.clone()
}

fn block(body: &FunctionBody, name: &str) -> Block {
    body.blocks
        .entries()
        .find(|(_, def)| def.name == name)
        .map(|(block, _)| block)
        .unwrap_or_else(|| panic!("no block {}", name))
}

fn inst(body: &FunctionBody, name: &str) -> Inst {
    body.insts
        .entries()
        .find(|(_, data)| data.name.as_deref() == Some(name))
        .map(|(inst, _)| inst)
        .unwrap_or_else(|| panic!("no value %{}", name))
}

fn names(body: &FunctionBody, liveness: &Liveness, set: &BitVector) -> Vec<String> {
    liveness.values(set).map(|v| body.value_name(v)).collect()
}

const DIAMOND: &str = "
func @select(%a) {
entry:
  %c = gt %a, 0
  br %c, left, right
left:
  %x = add %a, 1
  br merge
right:
  %y = sub %a, 1
  br merge
merge:
  %p = phi [%x, left], [%y, right]
  %q = mul %p, 2
  ret %q
}
";

#[test]
fn straight_line_block() {
    let mut body = FunctionBody::new("add");
    let a = body.add_arg("a");
    let b = body.add_arg("b");
    let entry = body.entry;
    let t1 = body.append_op(entry, "add", vec![a, b], true);
    body.set_inst_name(t1, "t1");
    let ret = body.end_block(
        entry,
        Terminator::Return {
            values: vec![t1.into()],
        },
    );

    let liveness = analyze(&body).unwrap();
    assert_eq!(liveness.domain().values(), &[a, b, t1.into()]);
    assert_eq!(names(&body, &liveness, liveness.live_in(entry)), ["%a", "%b"]);
    assert_eq!(liveness.live_out(entry).count(), 0);
    assert_eq!(names(&body, &liveness, liveness.live_before(ret)), ["%t1"]);
    assert_eq!(
        names(&body, &liveness, liveness.live_before(t1)),
        ["%a", "%b"]
    );
}

#[test]
fn diamond_keeps_phi_inputs_on_edges() {
    let body = parse(DIAMOND);
    let liveness = analyze(&body).unwrap();
    let (left, right, merge) = (
        block(&body, "left"),
        block(&body, "right"),
        block(&body, "merge"),
    );
    let (x, y, p) = (inst(&body, "x"), inst(&body, "y"), inst(&body, "p"));

    assert_eq!(names(&body, &liveness, liveness.live_in(merge)), Vec::<String>::new());
    assert!(!liveness.is_live_in(merge, x.into()));
    assert!(!liveness.is_live_in(merge, y.into()));
    assert!(!liveness.is_live_in(merge, p.into()));

    // Neither arm's definition reaches the other arm.
    assert!(!liveness.is_live_out(left, x.into()));
    assert!(!liveness.is_live_out(right, y.into()));
    assert_eq!(
        names(&body, &liveness, liveness.phi_edge(left).unwrap()),
        ["%x"]
    );
    assert_eq!(
        names(&body, &liveness, liveness.phi_edge(right).unwrap()),
        ["%y"]
    );
    assert_eq!(
        names(&body, &liveness, &liveness.live_out_on_edges(left).unwrap()),
        ["%x"]
    );
    assert!(liveness.phi_edge(merge).is_none());

    let q = inst(&body, "q");
    assert_eq!(names(&body, &liveness, liveness.live_before(q)), ["%p"]);
    assert_eq!(names(&body, &liveness, liveness.live_in(left)), ["%a"]);
    assert_eq!(names(&body, &liveness, liveness.live_in(body.entry)), ["%a"]);
    assert_eq!(
        names(&body, &liveness, liveness.live_out(body.entry)),
        ["%a"]
    );
}

#[test]
fn stale_results_miss_a_new_phi_edge() {
    let body = parse(DIAMOND);
    let liveness = analyze(&body).unwrap();
    liveness.check_fixpoint(&body).unwrap();

    // Only the edge table of the recomputed run gains an entry; every
    // block and instruction set stays the same.
    let mut changed = body.clone();
    let c = inst(&changed, "c");
    changed.add_phi_incoming(inst(&changed, "p"), c.into(), changed.entry);
    let merge = block(&changed, "merge");
    assert_eq!(
        analyze(&changed).unwrap().live_in(merge),
        liveness.live_in(merge)
    );
    assert_eq!(
        liveness.check_fixpoint(&changed),
        Err(AnalysisError::NotAFixpoint(changed.entry))
    );
}

#[test]
fn loop_converges_within_lattice_height() {
    let body = parse(
        "
func @count(%n) {
entry:
  br loop
loop:
  %i = phi [0, entry], [%next, loop]
  %next = add %i, 1
  %done = eq %next, %n
  br %done, exit, loop
exit:
  ret %next
}
",
    );
    let liveness = analyze(&body).unwrap();
    let lp = block(&body, "loop");
    let next = inst(&body, "next");

    assert!(liveness.dataflow().visits(lp) <= liveness.domain().len() + 1);
    assert_eq!(names(&body, &liveness, liveness.live_in(lp)), ["%n"]);
    assert_eq!(
        names(&body, &liveness, liveness.live_out(lp)),
        ["%n", "%next"]
    );
    assert_eq!(
        names(&body, &liveness, liveness.phi_edge(lp).unwrap()),
        ["%next"]
    );
    assert!(liveness.is_live_in(block(&body, "exit"), next.into()));
    assert_eq!(liveness.check_fixpoint(&body), Ok(()));
}

#[test]
fn kill_happens_before_gen() {
    let body = parse(
        "
func @bump(%limit) {
entry:
  br loop
loop:
  %x = add %x, 1
  %c = lt %x, %limit
  br %c, loop, exit
exit:
  ret
}
",
    );
    let liveness = analyze(&body).unwrap();
    let lp = block(&body, "loop");
    let x = inst(&body, "x");

    let x_index = liveness.domain().index_of(x.into()).unwrap();
    assert!(liveness.live_before(x).contains(x_index));
    assert!(liveness.is_live_in(lp, x.into()));
    assert!(liveness.is_live_out(lp, x.into()));
    // Nothing defines %x on the way in, so it is live at entry too.
    assert!(liveness.is_live_in(body.entry, x.into()));
    assert!(liveness.dataflow().visits(lp) <= liveness.domain().len() + 1);
}

#[test]
fn exit_blocks_take_the_boundary_value() {
    let body = parse(
        "
func @f(%a, %b) {
entry:
  br %a, done, trap
done:
  ret %b
trap:
  unreachable
}
",
    );
    let liveness = analyze(&body).unwrap();
    for name in ["done", "trap"] {
        let out = liveness.live_out(block(&body, name));
        assert_eq!(out.count(), 0);
        assert_eq!(out.len(), liveness.domain().len());
    }
    assert_eq!(
        names(&body, &liveness, liveness.live_in(body.entry)),
        ["%a", "%b"]
    );
    assert_eq!(
        names(&body, &liveness, liveness.live_in(block(&body, "trap"))),
        Vec::<String>::new()
    );
}

#[test]
fn unreachable_blocks_are_analyzed() {
    let body = parse(
        "
func @f(%a, %b) {
entry:
  br exit
dead:
  %z = add %b, 1
  br exit
exit:
  ret %a
}
",
    );
    let liveness = analyze(&body).unwrap();
    let dead = block(&body, "dead");
    assert_eq!(liveness.dataflow().visits(dead), 1);
    assert_eq!(names(&body, &liveness, liveness.live_in(dead)), ["%a", "%b"]);
    assert_eq!(names(&body, &liveness, liveness.live_in(body.entry)), ["%a"]);
}

#[test]
fn constants_and_void_results_are_not_tracked() {
    let body = parse(
        "
func @f(%p) {
entry:
  store 7, %p
  %v = load %p
  call.print %v, 3
  ret
}
",
    );
    let liveness = analyze(&body).unwrap();
    assert_eq!(liveness.domain().len(), 2);
    assert_eq!(names(&body, &liveness, liveness.live_in(body.entry)), ["%p"]);
}

/// Wraps liveness and records every value the engine hands to and
/// gets back from the transfer function.
struct Recording {
    inner: LivenessProblem,
    outs: Vec<(Block, BitVector)>,
    ins: Vec<(Block, BitVector)>,
}

impl<F: Function + ?Sized> DataflowProblem<F> for Recording {
    type Value = BitVector;

    fn direction(&self) -> Direction {
        <LivenessProblem as DataflowProblem<F>>::direction(&self.inner)
    }

    fn boundary(&self, func: &F, block: Block, value: &mut BitVector) {
        self.inner.boundary(func, block, value)
    }

    fn initial_value(&self, func: &F, block: Block) -> BitVector {
        self.inner.initial_value(func, block)
    }

    fn meet(&self, lhs: &mut BitVector, rhs: &BitVector) -> Result<(), AnalysisError> {
        <LivenessProblem as DataflowProblem<F>>::meet(&self.inner, lhs, rhs)
    }

    fn transfer(
        &mut self,
        func: &F,
        block: Block,
        out: &BitVector,
    ) -> Result<BitVector, AnalysisError> {
        let live_in = self.inner.transfer(func, block, out)?;
        self.outs.push((block, out.clone()));
        self.ins.push((block, live_in.clone()));
        Ok(live_in)
    }
}

fn assert_growing(history: &[(Block, BitVector)], block: Block) {
    let mut prev: Option<&BitVector> = None;
    for (_, set) in history.iter().filter(|(b, _)| *b == block) {
        if let Some(prev) = prev {
            assert_eq!(prev.is_subset_of(set), Ok(true), "{}: {:?} -> {:?}", block, prev, set);
        }
        prev = Some(set);
    }
}

#[test]
fn sets_only_grow_between_visits() {
    let body = parse(
        "
func @nested(%base, %n, %m) {
entry:
  br outer
outer:
  %i = phi [0, entry], [%i.next, latch]
  %row = mul %i, %m
  br inner
inner:
  %j = phi [0, outer], [%j.next, inner]
  %idx = add %row, %j
  %addr = add %base, %idx
  store 0, %addr
  %j.next = add %j, 1
  %j.done = eq %j.next, %m
  br %j.done, latch, inner
latch:
  %i.next = add %i, 1
  %i.done = eq %i.next, %n
  br %i.done, exit, outer
exit:
  ret
}
",
    );
    let mut problem = Recording {
        inner: LivenessProblem::new(&body),
        outs: vec![],
        ins: vec![],
    };
    let dataflow = Dataflow::run(&body, &mut problem).unwrap();
    assert_eq!(dataflow.direction(), Direction::Backward);
    assert_eq!(problem.ins.len(), dataflow.total_visits());

    for block in body.blocks.iter() {
        assert_growing(&problem.outs, block);
        assert_growing(&problem.ins, block);
        let (_, last) = problem.ins.iter().rev().find(|(b, _)| *b == block).unwrap();
        assert_eq!(last, dataflow.block_in(block));
    }

    let liveness = problem.inner.finish(dataflow);
    assert_eq!(liveness.check_fixpoint(&body), Ok(()));
    let inner = block(&body, "inner");
    assert_eq!(
        names(&body, &liveness, liveness.live_in(inner)),
        ["%base", "%n", "%m", "%i", "%row"]
    );
}

/// Values defined on every path to a point: a forward must-problem.
struct Defined {
    domain: Domain,
}

impl DataflowProblem<FunctionBody> for Defined {
    type Value = BitVector;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn boundary(&self, func: &FunctionBody, _block: Block, value: &mut BitVector) {
        value.clear();
        for arg in (0..func.num_args()).map(Arg::new) {
            let index = self.domain.index_of(arg.into()).unwrap();
            value.insert(index).unwrap();
        }
    }

    fn initial_value(&self, _func: &FunctionBody, _block: Block) -> BitVector {
        let mut all = self.domain.empty_set();
        for index in 0..self.domain.len() {
            all.insert(index).unwrap();
        }
        all
    }

    fn meet(&self, lhs: &mut BitVector, rhs: &BitVector) -> Result<(), AnalysisError> {
        lhs.intersect_with(rhs).map(|_| ())
    }

    fn transfer(
        &mut self,
        func: &FunctionBody,
        block: Block,
        input: &BitVector,
    ) -> Result<BitVector, AnalysisError> {
        let mut defined = input.clone();
        for &inst in func.block_insts(block) {
            if let Some(index) = self.domain.index_of(inst.into()) {
                defined.insert(index)?;
            }
        }
        Ok(defined)
    }
}

#[test]
fn forward_problems_meet_over_predecessors() {
    let body = parse(DIAMOND);
    let domain = Domain::build(&body);
    let mut problem = Defined {
        domain: domain.clone(),
    };
    let dataflow = Dataflow::run(&body, &mut problem).unwrap();
    assert_eq!(dataflow.direction(), Direction::Forward);

    let values = |set: &BitVector| {
        domain
            .values_in(set)
            .map(|v| body.value_name(v))
            .collect::<Vec<_>>()
    };
    let merge = block(&body, "merge");
    assert_eq!(values(dataflow.block_in(body.entry)), ["%a"]);
    assert_eq!(values(dataflow.block_in(merge)), ["%a", "%c"]);
    assert_eq!(values(dataflow.block_out(merge)), ["%a", "%c", "%p", "%q"]);
    assert_eq!(
        values(dataflow.block_out(block(&body, "left"))),
        ["%a", "%c", "%x"]
    );
    assert_eq!(dataflow.check_fixpoint(&body, &mut problem), Ok(()));
}

#[test]
fn edge_to_missing_block_is_rejected() {
    let mut body = FunctionBody::new("bad");
    let entry = body.entry;
    body.end_block(entry, Terminator::Return { values: vec![] });
    body.blocks[entry].succs.push(Block::new(5));
    assert_eq!(
        analyze(&body).unwrap_err(),
        AnalysisError::InvalidBlock(Block::new(5))
    );
}

#[test]
fn operand_outside_every_block_is_rejected() {
    let mut body = FunctionBody::new("stray");
    let entry = body.entry;
    let stray = body.add_inst(InstData::new(InstDef::Operator {
        opcode: "const".to_owned(),
        args: vec![],
        has_result: true,
    }));
    body.end_block(
        entry,
        Terminator::Return {
            values: vec![stray.into()],
        },
    );
    assert_eq!(
        analyze(&body).unwrap_err(),
        AnalysisError::UnknownValue(Value::Inst(stray))
    );

    let mut body = FunctionBody::new("bad_arg");
    let entry = body.entry;
    let missing = Value::Arg(Arg::new(3));
    body.end_block(
        entry,
        Terminator::Return {
            values: vec![missing],
        },
    );
    assert_eq!(
        analyze(&body).unwrap_err(),
        AnalysisError::UnknownValue(missing)
    );
}

#[test]
fn module_functions_are_analyzed_independently() {
    let mut module = Module::from_text(DIAMOND).unwrap();
    let mut broken = FunctionBody::new("broken");
    let entry = broken.entry;
    broken.end_block(
        entry,
        Terminator::Return {
            values: vec![Value::Arg(Arg::new(0))],
        },
    );
    let broken = module.add_func(broken);

    let results = analyze_module(&module);
    assert_eq!(results.len(), 2);
    let select = module.func_by_name("select").unwrap();
    let body = module.func(select);
    let liveness = results[select].as_ref().unwrap();
    assert_eq!(names(body, liveness, liveness.live_in(body.entry)), ["%a"]);
    assert_eq!(
        results[broken].as_ref().unwrap_err(),
        &AnalysisError::UnknownValue(Value::Arg(Arg::new(0)))
    );
}

#[test]
fn annotated_display() {
    let mut body = FunctionBody::new("add");
    let a = body.add_arg("a");
    let b = body.add_arg("b");
    let entry = body.entry;
    let t1 = body.append_op(entry, "add", vec![a, b], true);
    body.set_inst_name(t1, "t1");
    body.end_block(
        entry,
        Terminator::Return {
            values: vec![t1.into()],
        },
    );
    let liveness = analyze(&body).unwrap();

    assert_eq!(
        format!("{}", liveness.display(&body, "")),
        "func @add(%a, %b) {
entry:
  ; live-in: %a, %b
  ; live: %a, %b
  %t1 = add %a, %b
  ; live: %t1
  ret %t1
}
"
    );
    assert_eq!(
        format!("{}", liveness.display_verbose(&body, "")),
        "func @add(%a, %b) {
entry:
  ; live-in: %a, %b
  ; live: %a, %b
  %t1 = add %a, %b
  ; live: %t1
  ret %t1
  ; live-out:
}
"
    );
}

#[test]
fn verbose_display_shows_phi_edges() {
    let body = parse(DIAMOND);
    let liveness = analyze(&body).unwrap();
    let text = format!("{}", liveness.display_verbose(&body, ""));
    assert!(text.contains("left:  ; preds: entry\n  ; live-in: %a\n"), "{}", text);
    assert!(text.contains("  br merge\n  ; live-out:\n  ; phi-edge live-out: %x\n"), "{}", text);
    assert!(text.contains("merge:  ; preds: left, right\n  ; live-in:\n  %p = phi"), "{}", text);
}
