use crate::abi::MIN_SLOT_SIZE;
use crate::ast::{BinaryOp, Node, TranslationUnit};
use crate::scope::ScopeTable;
use crate::{CompileOptions, Error, Result, Scoping};

use super::{Frame, Function, Instruction, SlotId, Temp, TempCell, TempId};

/// Build IR for the single function in `unit`.
///
/// The returned function has not been laid out yet; temporaries get their home
/// slots from [`Function::layout`].
pub fn build_ir(unit: &TranslationUnit, options: &CompileOptions) -> Result<Function> {
    let [toplevel] = unit.toplevels.as_slice() else {
        return Err(Error::Unsupported(format!(
            "expected exactly one function definition, found {} top-level nodes",
            unit.toplevels.len()
        )));
    };
    let Node::FuncDef { name, body } = toplevel else {
        return Err(Error::Unsupported(format!(
            "top-level node is not a function: {toplevel}"
        )));
    };

    let mut builder = IrBuilder::new(name, options.scoping);
    let mut scope = ScopeTable::new();
    builder.walk(body, &mut scope)?;
    Ok(builder.finish())
}

/// Translation state for one function: the instruction list plus the slot and
/// temporary arenas. Nothing here outlives the function being built.
pub struct IrBuilder {
    name: String,
    scoping: Scoping,
    instructions: Vec<Instruction>,
    frame: Frame,
    temps: Vec<TempCell>,
}

impl IrBuilder {
    #[must_use]
    pub fn new(name: &str, scoping: Scoping) -> Self {
        Self {
            name: name.to_owned(),
            scoping,
            instructions: Vec::new(),
            frame: Frame::new(),
            temps: Vec::new(),
        }
    }

    #[must_use]
    pub fn finish(self) -> Function {
        tracing::debug!(
            function = %self.name,
            instructions = self.instructions.len(),
            temps = self.temps.len(),
            locals = self.frame.len(),
            "built IR"
        );
        Function {
            name: self.name,
            instructions: self.instructions,
            frame: self.frame,
            temps: self.temps,
        }
    }

    fn new_temp(&mut self) -> TempId {
        let id = TempId(self.temps.len() as u32);
        self.temps.push(TempCell::default());
        id
    }

    fn emit(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Translate `node`, returning its value for expressions and `None` for
    /// statements.
    pub fn walk(&mut self, node: &Node, scope: &mut ScopeTable<'_, SlotId>) -> Result<Option<Temp>> {
        match node {
            Node::Decl { name, ty, init } => {
                let size = ty.size.max(MIN_SLOT_SIZE);
                let slot = self.frame.alloc(size)?;
                self.emit(Instruction::Alloc { slot, size });
                scope.put(name, slot);
                if let Some(init) = init {
                    let value = self.expr(init, scope)?;
                    self.emit(Instruction::Store {
                        dst: slot,
                        src: value,
                    });
                }
                Ok(None)
            }
            Node::LocalVar { name } => {
                let src = *scope
                    .get(name)
                    .ok_or_else(|| Error::UnboundVariable(name.clone()))?;
                let dst = self.new_temp();
                self.emit(Instruction::Load { dst, src });
                Ok(Some(Temp::Cell(dst)))
            }
            Node::Compound { stmts } => {
                match self.scoping {
                    Scoping::Flat => {
                        for stmt in stmts {
                            self.walk(stmt, scope)?;
                        }
                    }
                    Scoping::Block => {
                        let mut inner = ScopeTable::with_parent(&*scope);
                        for stmt in stmts {
                            self.walk(stmt, &mut inner)?;
                        }
                    }
                }
                Ok(None)
            }
            Node::Return { value } => {
                let value = self.expr(value, scope)?;
                self.emit(Instruction::Ret { value });
                Ok(None)
            }
            Node::Conv { operand, .. } => self.walk(operand, scope),
            Node::Binary {
                op: op @ (BinaryOp::Add | BinaryOp::Mul),
                left,
                right,
            } => {
                let lhs = self.expr(left, scope)?;
                let rhs = self.expr(right, scope)?;
                let dst = self.new_temp();
                self.emit(match op {
                    BinaryOp::Add => Instruction::Add { dst, lhs, rhs },
                    _ => Instruction::Mul { dst, lhs, rhs },
                });
                Ok(Some(Temp::Cell(dst)))
            }
            Node::Literal { ty, value } if ty.is_integer() => Ok(Some(Temp::Imm(*value))),
            Node::Literal { ty, .. } => Err(Error::Unsupported(format!(
                "{:?} literal: {node}",
                ty.kind
            ))),
            Node::Binary { .. } | Node::FuncDef { .. } | Node::If { .. } | Node::FuncCall { .. } => {
                Err(Error::Unsupported(format!("unknown node: {node}")))
            }
        }
    }

    /// Translate a node that must produce a value.
    fn expr(&mut self, node: &Node, scope: &mut ScopeTable<'_, SlotId>) -> Result<Temp> {
        self.walk(node, scope)?
            .ok_or_else(|| Error::Unsupported(format!("statement used as a value: {node}")))
    }
}
