//! Expression and statement node definitions.

use thin_vec::ThinVec;

use crate::ast::{NameId, NodeRef};
use crate::semantic::{DeclRef, TagEntry};

/// Binary operators that can appear in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicAnd,
    LogicOr,
}

/// Unary operators that can appear in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    LogicNot,
}

/// Target of a goto statement. Parsed as a bare name; bound to a label
/// declaration when the enclosing function's scope is popped, or left
/// unresolved (a no-op target) if no such label exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoTarget {
    Named(NameId),
    Resolved(DeclRef),
    Unresolved,
}

/// One expression or statement node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    // --- Expressions ---
    LiteralInt(i64),
    /// A string literal; only its length matters to the resolver (array
    /// size deduction from a char-array initializer).
    LiteralString { length: u32 },
    Ident(NameId),
    Unary(UnaryOp, NodeRef),
    Binary(BinaryOp, NodeRef, NodeRef),
    /// Brace-enclosed initializer list.
    InitList(ThinVec<NodeRef>),

    // --- Statements ---
    /// A braced grouping. Created empty at the open brace; declarations,
    /// tags and statements are installed at the close brace.
    Block {
        decls: Vec<DeclRef>,
        tags: Vec<TagEntry>,
        stmts: ThinVec<NodeRef>,
    },
    /// A named label; the payload is its label declaration.
    Label(DeclRef),
    Goto(GotoTarget),
    ExprStmt(NodeRef),
    Return(Option<NodeRef>),
}

impl NodeKind {
    pub fn as_int_literal(&self) -> Option<i64> {
        match self {
            NodeKind::LiteralInt(v) => Some(*v),
            _ => None,
        }
    }
}
