//! Shared expression/pattern traversal used by the `ExpandAliases`
//! pattern-collapse step and the `Bind` pass — both need to reach every pattern inside a function body's
//! `let` statements and `match` arms.

use rc_ast::expr::{Expr, ExprKind, Stmt};
use rc_ast::pattern::Pattern;

/// Call `f` on every `Pattern` reachable from `expr`: `let` bindings,
/// closures over blocks, and match arms, recursing into sub-expressions.
pub fn visit_patterns_in_expr(expr: &mut Expr, f: &mut impl FnMut(&mut Pattern)) {
    match &mut expr.kind {
        ExprKind::Block(stmts, tail) => {
            for stmt in stmts {
                match stmt {
                    Stmt::Let { pattern, init, .. } => {
                        f(pattern);
                        if let Some(init) = init {
                            visit_patterns_in_expr(init, f);
                        }
                    }
                    Stmt::Expr(e) => visit_patterns_in_expr(e, f),
                    Stmt::Item(_) => {}
                }
            }
            if let Some(tail) = tail {
                visit_patterns_in_expr(tail, f);
            }
        }
        ExprKind::If { cond, then, else_ } => {
            visit_patterns_in_expr(cond, f);
            visit_patterns_in_expr(then, f);
            if let Some(else_) = else_ {
                visit_patterns_in_expr(else_, f);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            visit_patterns_in_expr(scrutinee, f);
            for (pat, body) in arms {
                f(pat);
                visit_patterns_in_expr(body, f);
            }
        }
        ExprKind::Tuple(elems) | ExprKind::Array(elems) => {
            for e in elems {
                visit_patterns_in_expr(e, f);
            }
        }
        ExprKind::ArrayRepeat { value, count } => {
            visit_patterns_in_expr(value, f);
            visit_patterns_in_expr(count, f);
        }
        ExprKind::Struct { fields, base, .. } => {
            for (_, e) in fields {
                visit_patterns_in_expr(e, f);
            }
            if let Some(base) = base {
                visit_patterns_in_expr(base, f);
            }
        }
        ExprKind::Field { base, .. } => visit_patterns_in_expr(base, f),
        ExprKind::Index { base, index } => {
            visit_patterns_in_expr(base, f);
            visit_patterns_in_expr(index, f);
        }
        ExprKind::Call { callee, args } => {
            visit_patterns_in_expr(callee, f);
            for a in args {
                visit_patterns_in_expr(a, f);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            visit_patterns_in_expr(receiver, f);
            for a in args {
                visit_patterns_in_expr(a, f);
            }
        }
        ExprKind::BinOp { lhs, rhs, .. } => {
            visit_patterns_in_expr(lhs, f);
            visit_patterns_in_expr(rhs, f);
        }
        ExprKind::UniOp { operand, .. } => visit_patterns_in_expr(operand, f),
        ExprKind::Return(Some(inner)) => visit_patterns_in_expr(inner, f),
        ExprKind::Return(None)
        | ExprKind::IntLit { .. }
        | ExprKind::FloatLit { .. }
        | ExprKind::BoolLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::PathExpr(_)
        | ExprKind::Synthetic(_)
        | ExprKind::Bytes(_) => {}
    }
}

/// Recurse into a pattern's own sub-patterns, applying `f` post-order so a
/// caller can rewrite a pattern node after its children have already been
/// visited (used by the `MaybeBind` collapse, which only ever needs to
/// look at the node's own shape, but recurses for completeness).
pub fn visit_subpatterns(pat: &mut Pattern, f: &mut impl FnMut(&mut Pattern)) {
    match pat {
        Pattern::Ref(inner) | Pattern::Box(inner) => visit_subpatterns(inner, f),
        Pattern::Tuple(elems) => {
            for p in elems {
                visit_subpatterns(p, f);
            }
        }
        Pattern::Struct { fields, .. } => {
            for fp in fields {
                visit_subpatterns(&mut fp.pattern, f);
            }
        }
        Pattern::TupleStruct { fields, .. } => {
            for p in fields {
                visit_subpatterns(p, f);
            }
        }
        Pattern::Slice { leading, extra_bind, trailing } => {
            for p in leading.iter_mut().chain(trailing.iter_mut()) {
                visit_subpatterns(p, f);
            }
            if let Some(extra) = extra_bind {
                visit_subpatterns(extra, f);
            }
        }
        Pattern::Binding { sub: Some(sub), .. } => visit_subpatterns(sub, f),
        Pattern::MaybeBind { fields: Some(fields), .. } => {
            for fp in fields {
                visit_subpatterns(&mut fp.pattern, f);
            }
        }
        _ => {}
    }
    f(pat);
}
