use super::{Arg, Block, Function, FunctionBodyDisplay, Inst, InstKind, Value};
use crate::entity::{EntityVec, PerEntity};
use smallvec::SmallVec;

#[derive(Clone, Debug, Default)]
pub struct ArgData {
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct FunctionBody {
    pub name: String,
    /// Formal arguments, in declaration order.
    pub args: EntityVec<Arg, ArgData>,
    /// Entry block.
    pub entry: Block,
    /// Block bodies, in layout order.
    pub blocks: EntityVec<Block, BlockDef>,
    /// Instruction definitions, indexed by `Inst`.
    pub insts: EntityVec<Inst, InstData>,
    /// Block in which each instruction is placed. `Block::invalid()`
    /// if not placed.
    pub inst_blocks: PerEntity<Inst, Block>,
}

impl FunctionBody {
    pub fn new(name: &str) -> FunctionBody {
        let mut blocks = EntityVec::default();
        let entry = blocks.push(BlockDef {
            name: "entry".to_owned(),
            ..BlockDef::default()
        });
        FunctionBody {
            name: name.to_owned(),
            entry,
            blocks,
            ..FunctionBody::default()
        }
    }

    pub fn add_arg(&mut self, name: &str) -> Value {
        let arg = self.args.push(ArgData {
            name: name.to_owned(),
        });
        log::trace!("add_arg: {} ({})", arg, name);
        Value::Arg(arg)
    }

    pub fn add_block(&mut self, name: &str) -> Block {
        let id = self.blocks.push(BlockDef {
            name: name.to_owned(),
            ..BlockDef::default()
        });
        log::trace!("add_block: block {}", id);
        id
    }

    fn add_edge(&mut self, from: Block, to: Block) {
        self.blocks[from].succs.push(to);
        self.blocks[to].preds.push(from);
        log::trace!("add_edge: from {} to {}", from, to);
    }

    /// Allocates an instruction without placing it in a block.
    pub fn add_inst(&mut self, data: InstData) -> Inst {
        log::trace!("add_inst: def {:?}", data.def);
        let inst = self.insts.push(data);
        log::trace!(" -> {}", inst);
        inst
    }

    pub fn append_to_block(&mut self, block: Block, inst: Inst) {
        self.blocks[block].insts.push(inst);
        self.inst_blocks[inst] = block;
    }

    pub fn append_op(
        &mut self,
        block: Block,
        opcode: &str,
        args: Vec<Value>,
        has_result: bool,
    ) -> Inst {
        let inst = self.add_inst(InstData::new(InstDef::Operator {
            opcode: opcode.to_owned(),
            args,
            has_result,
        }));
        self.append_to_block(block, inst);
        inst
    }

    pub fn append_phi(&mut self, block: Block, incoming: Vec<(Value, Block)>) -> Inst {
        let inst = self.add_inst(InstData::new(InstDef::Phi { incoming }));
        self.append_to_block(block, inst);
        inst
    }

    /// Adds an incoming edge to an existing phi, e.g. once a loop's
    /// back-edge value has been created.
    pub fn add_phi_incoming(&mut self, phi: Inst, value: Value, pred: Block) {
        match &mut self.insts[phi].def {
            InstDef::Phi { incoming } => incoming.push((value, pred)),
            def => panic!("add_phi_incoming: {} is not a phi: {:?}", phi, def),
        }
    }

    /// Appends `terminator` to `block` and records the CFG edges it
    /// implies.
    pub fn end_block(&mut self, block: Block, terminator: Terminator) -> Inst {
        let inst = self.add_inst(InstData::new(InstDef::Terminator(terminator)));
        self.place_terminator(block, inst);
        inst
    }

    /// Appends an already-allocated terminator instruction to `block`
    /// and records its CFG edges.
    pub fn place_terminator(&mut self, block: Block, inst: Inst) {
        self.append_to_block(block, inst);
        let mut succs: SmallVec<[Block; 4]> = SmallVec::new();
        if let InstDef::Terminator(term) = &self.insts[inst].def {
            term.visit_successors(|succ| succs.push(succ));
        }
        for succ in succs {
            self.add_edge(block, succ);
        }
    }

    /// Rebuilds every block's preds and succs from the terminators.
    pub fn recompute_edges(&mut self) {
        for block in self.blocks.values_mut() {
            block.preds.clear();
            block.succs.clear();
        }
        let mut edges = vec![];
        for (block, def) in self.blocks.entries() {
            if let Some(term) = self.terminator(block) {
                term.visit_successors(|succ| edges.push((block, succ)));
            } else {
                log::trace!("recompute_edges: {} ({}) has no terminator", block, def.name);
            }
        }
        for (from, to) in edges {
            self.add_edge(from, to);
        }
    }

    pub fn set_inst_name(&mut self, inst: Inst, name: &str) {
        self.insts[inst].name = Some(name.to_owned());
    }

    pub fn terminator(&self, block: Block) -> Option<&Terminator> {
        let &last = self.blocks[block].insts.last()?;
        match &self.insts[last].def {
            InstDef::Terminator(term) => Some(term),
            _ => None,
        }
    }

    /// The name under which `value` is printed, with its sigil.
    ///
    /// Unnamed values print as their handle (`%v3`, `%arg0`), with
    /// trailing underscores added while that spelling is taken by a
    /// named value.
    pub fn value_name(&self, value: Value) -> String {
        let fallback = |handle: String| {
            let mut name = handle;
            while self.is_user_name(&name) {
                name.push('_');
            }
            format!("%{}", name)
        };
        match value {
            Value::Arg(arg) => match self.args.get(arg) {
                Some(data) if !data.name.is_empty() => format!("%{}", data.name),
                _ => fallback(arg.to_string()),
            },
            Value::Inst(inst) => match self.insts.get(inst).and_then(|d| d.name.as_ref()) {
                Some(name) => format!("%{}", name),
                None => fallback(inst.to_string()),
            },
            Value::Const(k) => format!("{}", k),
        }
    }

    fn is_user_name(&self, name: &str) -> bool {
        self.args.values().any(|data| data.name == name)
            || self
                .insts
                .values()
                .any(|data| data.name.as_deref() == Some(name))
    }

    pub fn display<'a>(&'a self, indent: &'a str) -> FunctionBodyDisplay<'a> {
        FunctionBodyDisplay(self, indent)
    }
}

impl Function for FunctionBody {
    fn entry_block(&self) -> Block {
        self.entry
    }

    fn num_args(&self) -> usize {
        self.args.len()
    }

    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn num_insts(&self) -> usize {
        self.insts.len()
    }

    fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block].insts[..]
    }

    fn block_preds(&self, block: Block) -> &[Block] {
        &self.blocks[block].preds[..]
    }

    fn block_succs(&self, block: Block) -> &[Block] {
        &self.blocks[block].succs[..]
    }

    fn inst_kind(&self, inst: Inst) -> InstKind {
        match &self.insts[inst].def {
            InstDef::Phi { .. } => InstKind::Phi,
            InstDef::Terminator(_) => InstKind::Terminator,
            InstDef::Operator { .. } | InstDef::Placeholder => InstKind::Ordinary,
        }
    }

    fn inst_has_result(&self, inst: Inst) -> bool {
        match &self.insts[inst].def {
            &InstDef::Operator { has_result, .. } => has_result,
            InstDef::Phi { .. } => true,
            InstDef::Terminator(_) | InstDef::Placeholder => false,
        }
    }

    fn inst_operands(&self, inst: Inst) -> &[Value] {
        match &self.insts[inst].def {
            InstDef::Operator { args, .. } => &args[..],
            InstDef::Terminator(term) => term.operands(),
            InstDef::Phi { .. } | InstDef::Placeholder => &[],
        }
    }

    fn phi_incoming(&self, inst: Inst) -> &[(Value, Block)] {
        match &self.insts[inst].def {
            InstDef::Phi { incoming } => &incoming[..],
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockDef {
    /// Label, for printing.
    pub name: String,
    /// Instructions in this block, terminator last.
    pub insts: Vec<Inst>,
    /// Successor blocks, one entry per outgoing edge.
    pub succs: SmallVec<[Block; 2]>,
    /// Predecessor blocks, one entry per incoming edge.
    pub preds: SmallVec<[Block; 4]>,
}

#[derive(Clone, Debug)]
pub struct InstData {
    pub name: Option<String>,
    pub def: InstDef,
}

impl InstData {
    pub fn new(def: InstDef) -> InstData {
        InstData { name: None, def }
    }

    pub fn named(name: &str, def: InstDef) -> InstData {
        InstData {
            name: Some(name.to_owned()),
            def,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstDef {
    Operator {
        opcode: String,
        args: Vec<Value>,
        has_result: bool,
    },
    Phi {
        incoming: Vec<(Value, Block)>,
    },
    Terminator(Terminator),
    /// Reserved slot whose definition is filled in later.
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Br {
        target: Block,
    },
    CondBr {
        cond: Value,
        if_true: Block,
        if_false: Block,
    },
    Switch {
        value: Value,
        default: Block,
        targets: Vec<Block>,
    },
    Return {
        values: Vec<Value>,
    },
    Unreachable,
}

impl Terminator {
    pub fn visit_successors<F: FnMut(Block)>(&self, mut f: F) {
        match self {
            Terminator::Br { target } => f(*target),
            Terminator::CondBr {
                if_true, if_false, ..
            } => {
                f(*if_true);
                f(*if_false);
            }
            Terminator::Switch {
                default, targets, ..
            } => {
                f(*default);
                for &target in targets {
                    f(target);
                }
            }
            Terminator::Return { .. } | Terminator::Unreachable => {}
        }
    }

    pub fn operands(&self) -> &[Value] {
        match self {
            Terminator::CondBr { cond, .. } => std::slice::from_ref(cond),
            Terminator::Switch { value, .. } => std::slice::from_ref(value),
            Terminator::Return { values } => &values[..],
            Terminator::Br { .. } | Terminator::Unreachable => &[],
        }
    }
}
