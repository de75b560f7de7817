use super::{Func, FunctionBody, ModuleDisplay};
use crate::entity::EntityVec;
use crate::errors::FrontendError;
use crate::frontend;

/// A collection of independent functions, as produced by the
/// frontend from one source text.
///
/// Functions share nothing: every handle inside a `FunctionBody` is
/// local to that body, so each may be analyzed on its own (and in
/// parallel with the others).
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub funcs: EntityVec<Func, FunctionBody>,
}

impl Module {
    pub fn empty() -> Module {
        Module::default()
    }

    /// Parses the textual IR in `text`.
    pub fn from_text(text: &str) -> Result<Module, FrontendError> {
        frontend::parse_module(text)
    }

    pub fn add_func(&mut self, body: FunctionBody) -> Func {
        let func = self.funcs.push(body);
        log::trace!("add_func: {} = {}", func, self.funcs[func].name);
        func
    }

    pub fn func(&self, func: Func) -> &FunctionBody {
        &self.funcs[func]
    }

    pub fn funcs(&self) -> impl Iterator<Item = (Func, &FunctionBody)> {
        self.funcs.entries()
    }

    pub fn func_by_name(&self, name: &str) -> Option<Func> {
        self.funcs()
            .find(|(_, body)| body.name == name)
            .map(|(func, _)| func)
    }

    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }
}
