//! AST input contract.
//!
//! The front end (lexer, parser, type checker) lives elsewhere; this module only
//! describes the finished tree the backend consumes. Every node kind a front end
//! may produce is representable, but [`crate::ir::build_ir`] lowers a closed
//! subset and rejects the rest with [`crate::Error::Unsupported`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A whole input file: a list of top-level definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub toplevels: Vec<Node>,
}

impl TranslationUnit {
    #[must_use]
    pub fn new(toplevels: Vec<Node>) -> Self {
        Self { toplevels }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Ptr,
    Array,
    Struct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub kind: TypeKind,
    /// Size in bytes.
    pub size: u32,
}

impl Type {
    #[must_use]
    pub const fn new(kind: TypeKind, size: u32) -> Self {
        Self { kind, size }
    }

    #[must_use]
    pub const fn int() -> Self {
        Self::new(TypeKind::Int, 4)
    }

    #[must_use]
    pub const fn long() -> Self {
        Self::new(TypeKind::Long, 8)
    }

    #[must_use]
    pub const fn ptr() -> Self {
        Self::new(TypeKind::Ptr, 8)
    }

    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Bool | TypeKind::Char | TypeKind::Short | TypeKind::Int | TypeKind::Long
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    FuncDef {
        name: String,
        body: Box<Node>,
    },
    Decl {
        name: String,
        ty: Type,
        #[serde(default)]
        init: Option<Box<Node>>,
    },
    LocalVar {
        name: String,
    },
    Compound {
        stmts: Vec<Node>,
    },
    Return {
        value: Box<Node>,
    },
    Conv {
        ty: Type,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Literal {
        ty: Type,
        value: i64,
    },
    If {
        cond: Box<Node>,
        then: Box<Node>,
        #[serde(default)]
        els: Option<Box<Node>>,
    },
    FuncCall {
        name: String,
        args: Vec<Node>,
    },
}

// Constructors used by tests and programmatic front ends.
impl Node {
    pub fn func(name: impl Into<String>, body: Node) -> Self {
        Node::FuncDef {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn decl(name: impl Into<String>, ty: Type, init: Option<Node>) -> Self {
        Node::Decl {
            name: name.into(),
            ty,
            init: init.map(Box::new),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Node::LocalVar { name: name.into() }
    }

    #[must_use]
    pub fn compound(stmts: Vec<Node>) -> Self {
        Node::Compound { stmts }
    }

    #[must_use]
    pub fn ret(value: Node) -> Self {
        Node::Return {
            value: Box::new(value),
        }
    }

    #[must_use]
    pub fn conv(ty: Type, operand: Node) -> Self {
        Node::Conv {
            ty,
            operand: Box::new(operand),
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn add(left: Node, right: Node) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    #[must_use]
    pub fn mul(left: Node, right: Node) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Node::Literal {
            ty: Type::int(),
            value,
        }
    }
}

/// Renders a node as a compact s-expression, used in error messages.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::FuncDef { name, body } => write!(f, "(func {name} {body})"),
            Node::Decl { name, ty, init } => {
                write!(f, "(decl {:?} {name}", ty.kind)?;
                if let Some(init) = init {
                    write!(f, " {init}")?;
                }
                write!(f, ")")
            }
            Node::LocalVar { name } => write!(f, "{name}"),
            Node::Compound { stmts } => {
                write!(f, "{{")?;
                for stmt in stmts {
                    write!(f, " {stmt}")?;
                }
                write!(f, " }}")
            }
            Node::Return { value } => write!(f, "(return {value})"),
            Node::Conv { ty, operand } => write!(f, "(conv {:?} {operand})", ty.kind),
            Node::Binary { op, left, right } => {
                write!(f, "({} {left} {right})", op.symbol())
            }
            Node::Literal { ty, value } => {
                if ty.is_integer() {
                    write!(f, "{value}")
                } else {
                    write!(f, "({:?} {value})", ty.kind)
                }
            }
            Node::If { cond, then, els } => {
                write!(f, "(if {cond} {then}")?;
                if let Some(els) = els {
                    write!(f, " {els}")?;
                }
                write!(f, ")")
            }
            Node::FuncCall { name, args } => {
                write!(f, "({name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
