//! Partial constant evaluator over resolved expressions.
//!
//! The domain is `i64`: integer, char and bool expressions fold; floats
//! never do. Short-circuit laws hold, so `true || rhs` folds to `true`
//! even when `rhs` is unknown. Callers folding guard conditions pass
//! `allow_side_effects = true` to prune branches conservatively.

use crate::resolved::{DeclKind, ResolvedExpr, ResolvedExprKind, ResolvedProgram};
use dmz_parser::ast::{BinaryOp, UnaryOp};

pub fn to_bool(value: Option<i64>) -> Option<bool> {
    value.map(|v| v != 0)
}

pub fn evaluate(
    prog: &ResolvedProgram,
    expr: &ResolvedExpr,
    allow_side_effects: bool,
) -> Option<i64> {
    if let Some(value) = expr.constant {
        return Some(value);
    }
    match &expr.kind {
        ResolvedExprKind::IntLit(v) => Some(*v),
        ResolvedExprKind::CharLit(c) => Some(*c as i64),
        ResolvedExprKind::BoolLit(b) => Some(*b as i64),
        ResolvedExprKind::Group(inner) => evaluate(prog, inner, allow_side_effects),
        ResolvedExprKind::Unary { op, operand } => {
            let value = evaluate(prog, operand, allow_side_effects)?;
            match op {
                UnaryOp::Neg => Some(value.wrapping_neg()),
                UnaryOp::Not => Some((value == 0) as i64),
            }
        }
        ResolvedExprKind::Binary { op, lhs, rhs } => {
            evaluate_binary(prog, *op, lhs, rhs, allow_side_effects)
        }
        ResolvedExprKind::DeclRef(id) => match &prog.decl(*id).kind {
            DeclKind::Var {
                mutable: false,
                init: Some(init),
                ..
            } => evaluate(prog, init, allow_side_effects),
            _ => None,
        },
        _ => None,
    }
}

fn evaluate_binary(
    prog: &ResolvedProgram,
    op: BinaryOp,
    lhs: &ResolvedExpr,
    rhs: &ResolvedExpr,
    allow_side_effects: bool,
) -> Option<i64> {
    let lhs_val = evaluate(prog, lhs, false);

    if lhs_val.is_none() && !allow_side_effects {
        return None;
    }

    if op == BinaryOp::Or {
        if to_bool(lhs_val) == Some(true) {
            return Some(1);
        }
        let rhs_val = evaluate(prog, rhs, allow_side_effects);
        if to_bool(rhs_val) == Some(true) {
            return Some(1);
        }
        if lhs_val.is_some() && rhs_val.is_some() {
            return Some(0);
        }
        return None;
    }
    if op == BinaryOp::And {
        if to_bool(lhs_val) == Some(false) {
            return Some(0);
        }
        let rhs_val = evaluate(prog, rhs, allow_side_effects);
        if to_bool(rhs_val) == Some(false) {
            return Some(0);
        }
        if lhs_val.is_some() && rhs_val.is_some() {
            return Some(1);
        }
        return None;
    }

    let lhs_val = lhs_val?;
    let rhs_val = evaluate(prog, rhs, false)?;

    match op {
        BinaryOp::Mul => lhs_val.checked_mul(rhs_val),
        BinaryOp::Div => lhs_val.checked_div(rhs_val),
        BinaryOp::Rem => lhs_val.checked_rem(rhs_val),
        BinaryOp::Add => lhs_val.checked_add(rhs_val),
        BinaryOp::Sub => lhs_val.checked_sub(rhs_val),
        BinaryOp::Lt => Some((lhs_val < rhs_val) as i64),
        BinaryOp::Le => Some((lhs_val <= rhs_val) as i64),
        BinaryOp::Gt => Some((lhs_val > rhs_val) as i64),
        BinaryOp::Ge => Some((lhs_val >= rhs_val) as i64),
        BinaryOp::Eq => Some((lhs_val == rhs_val) as i64),
        BinaryOp::Ne => Some((lhs_val != rhs_val) as i64),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Ty;
    use dmz_parser::source::{FileId, Span};

    fn span() -> Span {
        Span::new(FileId(0), 1, 1)
    }

    fn int(v: i64) -> ResolvedExpr {
        ResolvedExpr::new(ResolvedExprKind::IntLit(v), Ty::I32, span())
    }

    fn boolean(v: bool) -> ResolvedExpr {
        ResolvedExpr::new(ResolvedExprKind::BoolLit(v), Ty::Bool, span())
    }

    fn float(v: f64) -> ResolvedExpr {
        ResolvedExpr::new(ResolvedExprKind::FloatLit(v), Ty::F64, span())
    }

    fn binary(op: BinaryOp, lhs: ResolvedExpr, rhs: ResolvedExpr) -> ResolvedExpr {
        ResolvedExpr::new(
            ResolvedExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Ty::I32,
            span(),
        )
    }

    #[test]
    fn folds_arithmetic() {
        let prog = ResolvedProgram::default();
        let e = binary(BinaryOp::Add, int(2), int(3));
        assert_eq!(evaluate(&prog, &e, false), Some(5));
    }

    #[test]
    fn short_circuit_or_ignores_unknown_rhs() {
        let prog = ResolvedProgram::default();
        let e = binary(BinaryOp::Or, boolean(true), float(1.5));
        assert_eq!(evaluate(&prog, &e, true), Some(1));
    }

    #[test]
    fn short_circuit_and_with_false_lhs() {
        let prog = ResolvedProgram::default();
        let e = binary(BinaryOp::And, boolean(false), float(1.5));
        assert_eq!(evaluate(&prog, &e, true), Some(0));
    }

    #[test]
    fn unknown_lhs_without_side_effects_is_none() {
        let prog = ResolvedProgram::default();
        let e = binary(BinaryOp::Or, float(0.0), boolean(true));
        assert_eq!(evaluate(&prog, &e, false), None);
        // With side effects allowed, the true rhs decides.
        assert_eq!(evaluate(&prog, &e, true), Some(1));
    }

    #[test]
    fn floats_do_not_fold() {
        let prog = ResolvedProgram::default();
        assert_eq!(evaluate(&prog, &float(1.5), false), None);
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let prog = ResolvedProgram::default();
        let e = binary(BinaryOp::Div, int(1), int(0));
        assert_eq!(evaluate(&prog, &e, false), None);
    }
}
