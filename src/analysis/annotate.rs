//! Printing IR annotated with liveness results.

use super::Liveness;
use crate::ir::{block_header, func_header, inst_text, Function, FunctionBody};
use crate::pass::BitVector;

use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct LivenessDisplay<'a> {
    pub(crate) body: &'a FunctionBody,
    pub(crate) liveness: &'a Liveness,
    pub(crate) indent: &'a str,
    pub(crate) verbose: bool,
}

impl<'a> LivenessDisplay<'a> {
    fn set_line(&self, label: &str, set: &BitVector) -> String {
        let names = self
            .liveness
            .values(set)
            .map(|value| self.body.value_name(value))
            .collect::<Vec<_>>();
        if names.is_empty() {
            format!("; {}:", label)
        } else {
            format!("; {}: {}", label, names.join(", "))
        }
    }
}

impl<'a> Display for LivenessDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let body = self.body;
        let indent = self.indent;
        writeln!(f, "{}{} {{", indent, func_header(body))?;
        for block in body.blocks.iter() {
            writeln!(f, "{}{}", indent, block_header(body, block))?;
            writeln!(
                f,
                "{}  {}",
                indent,
                self.set_line("live-in", self.liveness.live_in(block))
            )?;
            for &inst in &body.blocks[block].insts {
                // Phi inputs are edge-qualified; a single set before
                // the phi would misstate them.
                if !body.is_phi(inst) {
                    writeln!(
                        f,
                        "{}  {}",
                        indent,
                        self.set_line("live", self.liveness.live_before(inst))
                    )?;
                }
                writeln!(f, "{}  {}", indent, inst_text(body, inst))?;
            }
            if self.verbose {
                writeln!(
                    f,
                    "{}  {}",
                    indent,
                    self.set_line("live-out", self.liveness.live_out(block))
                )?;
                if let Some(phi_inputs) = self.liveness.phi_edge(block) {
                    writeln!(
                        f,
                        "{}  {}",
                        indent,
                        self.set_line("phi-edge live-out", phi_inputs)
                    )?;
                }
            }
        }
        writeln!(f, "{}}}", indent)
    }
}
