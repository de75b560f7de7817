//! Displaying IR.
//!
//! The printed form is the textual IR accepted by the frontend, so
//! `parse(display(f))` yields a function with the same structure.

use super::{Block, FunctionBody, Inst, InstDef, Module, Terminator};

use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct FunctionBodyDisplay<'a>(pub(crate) &'a FunctionBody, pub(crate) &'a str);

impl<'a> Display for FunctionBodyDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let body = self.0;
        writeln!(f, "{}{} {{", self.1, func_header(body))?;
        for block in body.blocks.iter() {
            writeln!(f, "{}{}", self.1, block_header(body, block))?;
            for &inst in &body.blocks[block].insts {
                writeln!(f, "{}  {}", self.1, inst_text(body, inst))?;
            }
        }
        writeln!(f, "{}}}", self.1)
    }
}

pub struct ModuleDisplay<'a>(pub(crate) &'a Module);

impl<'a> Display for ModuleDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        for (i, (_, body)) in self.0.funcs().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", body.display(""))?;
        }
        Ok(())
    }
}

pub(crate) fn func_header(body: &FunctionBody) -> String {
    let args = body
        .args
        .iter()
        .map(|arg| body.value_name(arg.into()))
        .collect::<Vec<_>>();
    format!("func @{}({})", body.name, args.join(", "))
}

pub(crate) fn block_label(body: &FunctionBody, block: Block) -> String {
    let name = &body.blocks[block].name;
    if name.is_empty() {
        format!("{}", block)
    } else {
        name.clone()
    }
}

pub(crate) fn block_header(body: &FunctionBody, block: Block) -> String {
    let preds = &body.blocks[block].preds;
    if preds.is_empty() {
        format!("{}:", block_label(body, block))
    } else {
        let preds = preds
            .iter()
            .map(|&pred| block_label(body, pred))
            .collect::<Vec<_>>();
        format!("{}:  ; preds: {}", block_label(body, block), preds.join(", "))
    }
}

/// One instruction, without indentation or trailing newline.
pub(crate) fn inst_text(body: &FunctionBody, inst: Inst) -> String {
    let data = &body.insts[inst];
    let lhs = match &data.def {
        InstDef::Operator {
            has_result: true, ..
        }
        | InstDef::Phi { .. } => format!("{} = ", body.value_name(inst.into())),
        _ => String::new(),
    };
    let operands = |values: &[super::Value]| {
        values
            .iter()
            .map(|&v| body.value_name(v))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let rhs = match &data.def {
        InstDef::Operator { opcode, args, .. } if args.is_empty() => opcode.clone(),
        InstDef::Operator { opcode, args, .. } => format!("{} {}", opcode, operands(args)),
        InstDef::Phi { incoming } => {
            let incoming = incoming
                .iter()
                .map(|&(value, pred)| {
                    format!("[{}, {}]", body.value_name(value), block_label(body, pred))
                })
                .collect::<Vec<_>>();
            format!("phi {}", incoming.join(", "))
        }
        InstDef::Terminator(term) => match term {
            Terminator::Br { target } => format!("br {}", block_label(body, *target)),
            Terminator::CondBr {
                cond,
                if_true,
                if_false,
            } => format!(
                "br {}, {}, {}",
                body.value_name(*cond),
                block_label(body, *if_true),
                block_label(body, *if_false)
            ),
            Terminator::Switch {
                value,
                default,
                targets,
            } => {
                let targets = targets
                    .iter()
                    .map(|&t| block_label(body, t))
                    .collect::<Vec<_>>();
                format!(
                    "switch {}, {}, [{}]",
                    body.value_name(*value),
                    block_label(body, *default),
                    targets.join(", ")
                )
            }
            Terminator::Return { values } if values.is_empty() => "ret".to_owned(),
            Terminator::Return { values } => format!("ret {}", operands(values)),
            Terminator::Unreachable => "unreachable".to_owned(),
        },
        InstDef::Placeholder => "<placeholder>".to_owned(),
    };
    format!("{}{}", lhs, rhs)
}
