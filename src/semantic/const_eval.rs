//! Compile-time integer constant folding.
//!
//! Array bounds, bit-field widths and enumerator values must be integer
//! constants; this walks the expression nodes the parser handed over and
//! folds what it can. Identifiers fold only when they name an enumerator
//! constant, which is what lets later enumerators reference earlier ones
//! of the same still-open enum.

use crate::ast::{BinaryOp, NodeKind, NodeRef, UnaryOp};
use crate::semantic::decls::DeclKind;
use crate::semantic::resolver::Resolver;

/// Evaluate a constant expression node to an i64 value, or None if it is
/// not a compile-time integer constant.
pub fn eval_const_expr(r: &Resolver, node: NodeRef) -> Option<i64> {
    match r.ast.get_kind(node) {
        NodeKind::LiteralInt(v) => Some(*v),
        NodeKind::Ident(name) => {
            let decl = r.lookup_name(*name)?;
            match r.decls.get(decl).kind {
                DeclKind::EnumConst { value } => Some(value),
                _ => None,
            }
        }
        NodeKind::Unary(op, operand) => {
            let v = eval_const_expr(r, *operand)?;
            match op {
                UnaryOp::Plus => Some(v),
                UnaryOp::Minus => Some(v.wrapping_neg()),
                UnaryOp::BitNot => Some(!v),
                UnaryOp::LogicNot => Some((v == 0) as i64),
            }
        }
        NodeKind::Binary(op, left, right) => {
            let l = eval_const_expr(r, *left)?;

            // Short-circuiting forms do not require the other side to be
            // constant when the outcome is already decided.
            match op {
                BinaryOp::LogicAnd => {
                    if l == 0 {
                        return Some(0);
                    }
                    return eval_const_expr(r, *right).map(|v| (v != 0) as i64);
                }
                BinaryOp::LogicOr => {
                    if l != 0 {
                        return Some(1);
                    }
                    return eval_const_expr(r, *right).map(|v| (v != 0) as i64);
                }
                _ => {}
            }

            let rv = eval_const_expr(r, *right)?;
            match op {
                BinaryOp::Add => Some(l.wrapping_add(rv)),
                BinaryOp::Sub => Some(l.wrapping_sub(rv)),
                BinaryOp::Mul => Some(l.wrapping_mul(rv)),
                BinaryOp::Div => (rv != 0).then(|| l.wrapping_div(rv)),
                BinaryOp::Rem => (rv != 0).then(|| l.wrapping_rem(rv)),
                BinaryOp::BitAnd => Some(l & rv),
                BinaryOp::BitOr => Some(l | rv),
                BinaryOp::BitXor => Some(l ^ rv),
                BinaryOp::LShift => Some(l.wrapping_shl(rv as u32)),
                BinaryOp::RShift => Some(l.wrapping_shr(rv as u32)),
                BinaryOp::Equal => Some((l == rv) as i64),
                BinaryOp::NotEqual => Some((l != rv) as i64),
                BinaryOp::Less => Some((l < rv) as i64),
                BinaryOp::LessEqual => Some((l <= rv) as i64),
                BinaryOp::Greater => Some((l > rv) as i64),
                BinaryOp::GreaterEqual => Some((l >= rv) as i64),
                BinaryOp::LogicAnd | BinaryOp::LogicOr => unreachable!(),
            }
        }
        _ => None,
    }
}
