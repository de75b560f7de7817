//! Frontend: textual IR to `Module`.
//!
//! The syntax is a small LLVM-flavored subset:
//!
//! ```plain
//! func @max(%a, %b) {
//! entry:
//!   %c = gt %a, %b
//!   br %c, left, right
//! left:
//!   br done
//! right:
//!   br done
//! done:
//!   %m = phi [%a, left], [%b, right]
//!   ret %m
//! }
//! ```
//!
//! One instruction per line. Values may be used before the line that
//! defines them (loop-carried phi inputs need this), so parsing
//! produces a syntax tree first and lowering allocates every
//! instruction as a placeholder before resolving any operand.

use crate::errors::FrontendError;
use crate::ir::{Block, FunctionBody, Inst, InstData, InstDef, Module, Terminator, Value};
use fxhash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry as HashEntry;

mod lexer;
use lexer::{lex, Token};

pub fn parse_module(text: &str) -> Result<Module, FrontendError> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut module = Module::empty();
    let mut names = FxHashSet::default();
    while let Some(func) = parser.parse_func()? {
        if !names.insert(func.name.clone()) {
            return Err(FrontendError::Redefinition(format!("@{}", func.name)));
        }
        let body = lower_func(&func)?;
        log::debug!(
            "frontend: parsed @{}: {} blocks, {} insts",
            body.name,
            body.blocks.len(),
            body.insts.len()
        );
        module.add_func(body);
    }
    Ok(module)
}

#[derive(Clone, Debug)]
struct FuncSyntax {
    name: String,
    args: Vec<String>,
    blocks: Vec<BlockSyntax>,
}

#[derive(Clone, Debug)]
struct BlockSyntax {
    label: String,
    insts: Vec<InstSyntax>,
}

#[derive(Clone, Debug)]
struct InstSyntax {
    result: Option<String>,
    body: InstBody,
}

#[derive(Clone, Debug)]
enum Operand {
    Local(String),
    Int(i64),
}

#[derive(Clone, Debug)]
enum InstBody {
    Op { opcode: String, args: Vec<Operand> },
    Phi { incoming: Vec<(Operand, String)> },
    Br { target: String },
    CondBr { cond: Operand, if_true: String, if_false: String },
    Switch { value: Operand, default: String, targets: Vec<String> },
    Ret { values: Vec<Operand> },
    Unreachable,
}

impl InstBody {
    fn is_terminator(&self) -> bool {
        !matches!(self, InstBody::Op { .. } | InstBody::Phi { .. })
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(token, _)| token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |&(_, line)| line)
    }

    fn error<T>(&self, message: &str) -> Result<T, FrontendError> {
        Err(FrontendError::Parse {
            line: self.line(),
            message: message.to_owned(),
        })
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), FrontendError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(&format!("expected {}", what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, FrontendError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => self.error(&format!("expected {}", what)),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn end_of_line(&mut self) -> Result<(), FrontendError> {
        match self.peek() {
            Some(Token::Newline) => {
                self.pos += 1;
                Ok(())
            }
            Some(Token::RBrace) | None => Ok(()),
            _ => self.error("expected end of line"),
        }
    }

    fn parse_func(&mut self) -> Result<Option<FuncSyntax>, FrontendError> {
        self.skip_newlines();
        if self.peek().is_none() {
            return Ok(None);
        }
        if self.expect_ident("`func`")? != "func" {
            return self.error("expected `func`");
        }
        let name = match self.next() {
            Some(Token::Global(name)) => name,
            _ => return self.error("expected function name"),
        };

        self.expect(Token::LParen, "`(`")?;
        let mut args = vec![];
        while let Some(Token::Local(arg)) = self.peek() {
            args.push(arg.clone());
            self.pos += 1;
            if self.peek() == Some(&Token::Comma) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.expect(Token::RParen, "`)`")?;
        self.expect(Token::LBrace, "`{`")?;

        let mut blocks: Vec<BlockSyntax> = vec![];
        loop {
            self.skip_newlines();
            match (self.peek(), self.peek2()) {
                (Some(Token::RBrace), _) => {
                    self.pos += 1;
                    break;
                }
                (Some(Token::Ident(label)), Some(Token::Colon)) => {
                    let label = label.clone();
                    self.pos += 2;
                    blocks.push(BlockSyntax {
                        label,
                        insts: vec![],
                    });
                }
                (None, _) => return self.error("unterminated function"),
                _ => {
                    let inst = self.parse_inst()?;
                    match blocks.last_mut() {
                        Some(block) => block.insts.push(inst),
                        None => return self.error("expected block label"),
                    }
                }
            }
        }
        if blocks.is_empty() {
            return self.error("function has no blocks");
        }

        Ok(Some(FuncSyntax { name, args, blocks }))
    }

    fn parse_inst(&mut self) -> Result<InstSyntax, FrontendError> {
        let result = match (self.peek(), self.peek2()) {
            (Some(Token::Local(name)), Some(Token::Equals)) => {
                let name = name.clone();
                self.pos += 2;
                Some(name)
            }
            _ => None,
        };
        let opcode = self.expect_ident("opcode")?;
        let body = match opcode.as_str() {
            "phi" => {
                let mut incoming = vec![];
                loop {
                    self.expect(Token::LBracket, "`[`")?;
                    let value = self.parse_operand()?;
                    self.expect(Token::Comma, "`,`")?;
                    let pred = self.expect_ident("predecessor label")?;
                    self.expect(Token::RBracket, "`]`")?;
                    incoming.push((value, pred));
                    if self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                InstBody::Phi { incoming }
            }
            "br" => match self.peek() {
                Some(Token::Ident(_)) => InstBody::Br {
                    target: self.expect_ident("label")?,
                },
                _ => {
                    let cond = self.parse_operand()?;
                    self.expect(Token::Comma, "`,`")?;
                    let if_true = self.expect_ident("label")?;
                    self.expect(Token::Comma, "`,`")?;
                    let if_false = self.expect_ident("label")?;
                    InstBody::CondBr {
                        cond,
                        if_true,
                        if_false,
                    }
                }
            },
            "switch" => {
                let value = self.parse_operand()?;
                self.expect(Token::Comma, "`,`")?;
                let default = self.expect_ident("default label")?;
                self.expect(Token::Comma, "`,`")?;
                self.expect(Token::LBracket, "`[`")?;
                let mut targets = vec![];
                while let Some(Token::Ident(_)) = self.peek() {
                    targets.push(self.expect_ident("label")?);
                    if self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                self.expect(Token::RBracket, "`]`")?;
                InstBody::Switch {
                    value,
                    default,
                    targets,
                }
            }
            "ret" => InstBody::Ret {
                values: self.parse_operands()?,
            },
            "unreachable" => InstBody::Unreachable,
            _ => InstBody::Op {
                args: self.parse_operands()?,
                opcode,
            },
        };
        if result.is_some() && body.is_terminator() {
            return self.error("terminators do not produce a result");
        }
        if result.is_none() && matches!(body, InstBody::Phi { .. }) {
            return self.error("phi must produce a result");
        }
        self.end_of_line()?;
        Ok(InstSyntax { result, body })
    }

    /// A possibly empty comma-separated operand list.
    fn parse_operands(&mut self) -> Result<Vec<Operand>, FrontendError> {
        let mut operands = vec![];
        if let Some(Token::Local(_)) | Some(Token::Int(_)) = self.peek() {
            operands.push(self.parse_operand()?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                operands.push(self.parse_operand()?);
            }
        }
        Ok(operands)
    }

    fn parse_operand(&mut self) -> Result<Operand, FrontendError> {
        let operand = match self.peek() {
            Some(Token::Local(name)) => Operand::Local(name.clone()),
            Some(&Token::Int(k)) => Operand::Int(k),
            _ => return self.error("expected operand"),
        };
        self.pos += 1;
        Ok(operand)
    }
}

struct Scope {
    values: FxHashMap<String, Value>,
    blocks: FxHashMap<String, Block>,
}

impl Scope {
    fn value(&self, operand: &Operand) -> Result<Value, FrontendError> {
        match operand {
            Operand::Local(name) => self
                .values
                .get(name)
                .copied()
                .ok_or_else(|| FrontendError::UndefinedValue(format!("%{}", name))),
            Operand::Int(k) => Ok(Value::Const(*k)),
        }
    }

    fn block(&self, label: &str) -> Result<Block, FrontendError> {
        self.blocks
            .get(label)
            .copied()
            .ok_or_else(|| FrontendError::UndefinedBlock(label.to_owned()))
    }

    fn define_value(&mut self, name: &str, value: Value) -> Result<(), FrontendError> {
        match self.values.entry(name.to_owned()) {
            HashEntry::Vacant(v) => {
                v.insert(value);
                Ok(())
            }
            HashEntry::Occupied(_) => Err(FrontendError::Redefinition(format!("%{}", name))),
        }
    }
}

fn lower_func(func: &FuncSyntax) -> Result<FunctionBody, FrontendError> {
    let mut body = FunctionBody::new(&func.name);
    let mut scope = Scope {
        values: FxHashMap::default(),
        blocks: FxHashMap::default(),
    };

    for arg in &func.args {
        let value = body.add_arg(arg);
        scope.define_value(arg, value)?;
    }

    let mut blocks = vec![];
    for (i, block) in func.blocks.iter().enumerate() {
        let id = if i == 0 {
            body.blocks[body.entry].name = block.label.clone();
            body.entry
        } else {
            body.add_block(&block.label)
        };
        if scope.blocks.insert(block.label.clone(), id).is_some() {
            return Err(FrontendError::Redefinition(block.label.clone()));
        }
        blocks.push(id);
    }

    // Reserve every instruction so operands may refer forward.
    let mut insts: Vec<Vec<Inst>> = vec![];
    for block in &func.blocks {
        let mut ids = vec![];
        for inst in &block.insts {
            let id = match &inst.result {
                Some(name) => {
                    let id = body.add_inst(InstData::named(name, InstDef::Placeholder));
                    scope.define_value(name, Value::Inst(id))?;
                    id
                }
                None => body.add_inst(InstData::new(InstDef::Placeholder)),
            };
            ids.push(id);
        }
        insts.push(ids);
    }

    for ((block, &id), ids) in func.blocks.iter().zip(blocks.iter()).zip(insts.iter()) {
        match block.insts.last() {
            Some(last) if last.body.is_terminator() => {}
            _ => return Err(FrontendError::MissingTerminator(block.label.clone())),
        }
        for (i, (inst, &inst_id)) in block.insts.iter().zip(ids.iter()).enumerate() {
            let def = lower_inst(&scope, inst)?;
            body.insts[inst_id].def = def;
            if inst.body.is_terminator() {
                if i + 1 != block.insts.len() {
                    return Err(FrontendError::MisplacedTerminator(block.label.clone()));
                }
                body.place_terminator(id, inst_id);
            } else {
                body.append_to_block(id, inst_id);
            }
        }
    }

    Ok(body)
}

fn lower_inst(scope: &Scope, inst: &InstSyntax) -> Result<InstDef, FrontendError> {
    let def = match &inst.body {
        InstBody::Op { opcode, args } => InstDef::Operator {
            opcode: opcode.clone(),
            args: args
                .iter()
                .map(|arg| scope.value(arg))
                .collect::<Result<Vec<_>, _>>()?,
            has_result: inst.result.is_some(),
        },
        InstBody::Phi { incoming } => InstDef::Phi {
            incoming: incoming
                .iter()
                .map(|(value, pred)| Ok((scope.value(value)?, scope.block(pred)?)))
                .collect::<Result<Vec<_>, FrontendError>>()?,
        },
        InstBody::Br { target } => InstDef::Terminator(Terminator::Br {
            target: scope.block(target)?,
        }),
        InstBody::CondBr {
            cond,
            if_true,
            if_false,
        } => InstDef::Terminator(Terminator::CondBr {
            cond: scope.value(cond)?,
            if_true: scope.block(if_true)?,
            if_false: scope.block(if_false)?,
        }),
        InstBody::Switch {
            value,
            default,
            targets,
        } => InstDef::Terminator(Terminator::Switch {
            value: scope.value(value)?,
            default: scope.block(default)?,
            targets: targets
                .iter()
                .map(|t| scope.block(t))
                .collect::<Result<Vec<_>, _>>()?,
        }),
        InstBody::Ret { values } => InstDef::Terminator(Terminator::Return {
            values: values
                .iter()
                .map(|v| scope.value(v))
                .collect::<Result<_, _>>()?,
        }),
        InstBody::Unreachable => InstDef::Terminator(Terminator::Unreachable),
    };
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;

    const MAX: &str = "
func @max(%a, %b) {
entry:
  %c = gt %a, %b
  br %c, left, right
left:
  br done
right:
  br done
done:
  %m = phi [%a, left], [%b, right]
  ret %m
}
";

    #[test]
    fn parses_blocks_edges_and_phis() {
        let module = parse_module(MAX).unwrap();
        assert_eq!(module.funcs.len(), 1);
        let func = module.func_by_name("max").unwrap();
        let body = module.func(func);
        assert_eq!(body.num_args(), 2);
        assert_eq!(body.num_blocks(), 4);
        let done = body.blocks.iter().last().unwrap();
        assert_eq!(body.block_preds(done).len(), 2);
        let phi = body.blocks[done].insts[0];
        assert!(body.is_phi(phi));
        assert_eq!(body.phi_incoming(phi).len(), 2);
        assert_eq!(body.block_succs(body.entry).len(), 2);
    }

    #[test]
    fn printed_ir_parses_back_to_the_same_text() {
        let module = parse_module(MAX).unwrap();
        let printed = format!("{}", module.display());
        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(printed, format!("{}", reparsed.display()));
    }

    #[test]
    fn returns_carry_every_listed_value() {
        let mut body = FunctionBody::new("divmod");
        let a = body.add_arg("a");
        let b = body.add_arg("b");
        let entry = body.entry;
        let q = body.append_op(entry, "div", vec![a, b], true);
        body.end_block(entry, Terminator::Return { values: vec![q.into(), b, Value::Const(0)] });
        let mut module = Module::empty();
        module.add_func(body);

        let printed = format!("{}", module.display());
        assert!(printed.contains("ret %v0, %b, 0"), "{}", printed);
        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(printed, format!("{}", reparsed.display()));
        let body = reparsed.func(reparsed.func_by_name("divmod").unwrap());
        let &ret = body.blocks[body.entry].insts.last().unwrap();
        assert_eq!(body.inst_operands(ret).len(), 3);
    }

    #[test]
    fn unnamed_results_print_without_clashing() {
        let mut body = FunctionBody::new("f");
        let entry = body.entry;
        let first = body.append_op(entry, "load", vec![], true);
        let second = body.append_op(entry, "add", vec![first.into(), Value::Const(1)], true);
        body.set_inst_name(second, "v0");
        body.end_block(entry, Terminator::Return { values: vec![second.into()] });
        let mut module = Module::empty();
        module.add_func(body);

        let printed = format!("{}", module.display());
        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(printed, format!("{}", reparsed.display()));
        let body = reparsed.func(reparsed.func_by_name("f").unwrap());
        let insts = &body.blocks[body.entry].insts;
        assert_eq!(body.inst_operands(insts[1])[0], Value::Inst(insts[0]));
    }

    #[test]
    fn result_is_tracked_only_when_named() {
        let module =
            parse_module("func @f(%p) {\nentry:\n  store %p, 1\n  %x = load %p\n  ret %x\n}")
                .unwrap();
        let body = module.func(module.func_by_name("f").unwrap());
        let insts = &body.blocks[body.entry].insts;
        assert!(!body.inst_has_result(insts[0]));
        assert!(body.inst_has_result(insts[1]));
        assert!(body.is_terminator(insts[2]));
    }

    #[test]
    fn forward_references_resolve() {
        let text = "
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
";
        let module = parse_module(text).unwrap();
        let body = module.func(module.func_by_name("count").unwrap());
        let lp = body.blocks.iter().nth(1).unwrap();
        assert_eq!(body.block_succs(lp).len(), 2);
        assert!(body.block_preds(lp).contains(&lp));
    }

    #[test]
    fn reports_undefined_and_redefined_names() {
        assert_eq!(
            parse_module("func @f() {\nentry:\n  ret %nope\n}").unwrap_err(),
            FrontendError::UndefinedValue("%nope".to_owned())
        );
        assert_eq!(
            parse_module("func @f() {\nentry:\n  br nowhere\n}").unwrap_err(),
            FrontendError::UndefinedBlock("nowhere".to_owned())
        );
        assert_eq!(
            parse_module("func @f(%a) {\nentry:\n  %a = add 1, 2\n  ret\n}").unwrap_err(),
            FrontendError::Redefinition("%a".to_owned())
        );
        assert_eq!(
            parse_module("func @f() {\nentry:\n  ret\n}\nfunc @f() {\nentry:\n  ret\n}")
                .unwrap_err(),
            FrontendError::Redefinition("@f".to_owned())
        );
    }

    #[test]
    fn reports_bad_terminator_placement() {
        assert_eq!(
            parse_module("func @f() {\nentry:\n  call\n}").unwrap_err(),
            FrontendError::MissingTerminator("entry".to_owned())
        );
        assert_eq!(
            parse_module("func @f() {\nentry:\n  ret\n  ret\n}").unwrap_err(),
            FrontendError::MisplacedTerminator("entry".to_owned())
        );
        assert!(matches!(
            parse_module("func @f() {\nentry:\n  %x = ret\n}"),
            Err(FrontendError::Parse { line: 3, .. })
        ));
    }
}
