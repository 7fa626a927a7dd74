//! `ConvertHIR_ResolveUFCS_Outer` and `ConvertHIR_ResolveUFCS`: find every
//! `Path::UfcsUnknown` reachable from item signatures, then from
//! expression bodies, and resolve each in place.

use rc_ast::expr::{Expr, ExprKind, Stmt};
use rc_ast::item::{ItemId, ItemKind};
use rc_ast::krate::Crate;
use rc_ast::path::{NameContext, Path};
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, Span};
use rustc_hash::FxHashMap;

use crate::scope::Scope;
use crate::ufcs::resolve_one;

/// Map from a function item to the generics of the impl block that owns
/// it, if any — `ImplDef::items` is the only place that link is
/// recorded, so it has to be inverted up front. The impl's `Self` type
/// itself needs no tracking here: `ExpandAliases_Self` already
/// substituted every `Self` occurrence with the concrete type before
/// this pass runs.
fn impl_owner_of_items(crate_: &Crate) -> FxHashMap<ItemId, rc_ast::generics::GenericParams> {
    let mut map = FxHashMap::default();
    for iid in crate_.all_item_ids() {
        if let ItemKind::Impl(imp) = &crate_.get(iid).kind {
            for (_, member) in &imp.items {
                map.insert(*member, imp.generics.clone());
            }
        }
    }
    map
}

/// Traits declared in, or use-imported into, `module` — this narrow
/// model's stand-in for full lexical trait-import tracking.
fn traits_visible_in(crate_: &Crate, module: ItemId) -> Vec<rc_ast::path::AbsolutePath> {
    let mut out = Vec::new();
    let m = crate_.module(module);
    for &iid in &m.items {
        if matches!(crate_.get(iid).kind, ItemKind::Trait(_)) {
            if let Some(p) = crate_.path_of(iid) {
                out.push(p);
            }
        }
    }
    for import in &m.imports {
        if let Some(target_path) = path_target(import) {
            if let Some(target) = crate_.lookup_path(&target_path) {
                if matches!(crate_.get(target).kind, ItemKind::Trait(_)) {
                    out.push(target_path);
                }
            }
        }
    }
    out
}

fn path_target(import: &rc_ast::item::UseStmt) -> Option<rc_ast::path::AbsolutePath> {
    match &import.path.binding {
        rc_ast::path::PathBinding::Module(p)
        | rc_ast::path::PathBinding::Struct(p)
        | rc_ast::path::PathBinding::Function(p)
        | rc_ast::path::PathBinding::Const(p)
        | rc_ast::path::PathBinding::Static(p) => Some(p.clone()),
        _ => None,
    }
}

fn scope_for(
    crate_: &Crate,
    owners: &FxHashMap<ItemId, rc_ast::generics::GenericParams>,
    iid: ItemId,
    item_generics: rc_ast::generics::GenericParams,
) -> Scope {
    let impl_generics = owners.get(&iid).cloned();
    Scope {
        item_generics,
        impl_generics,
        enclosing_trait: None,
        in_scope_traits: traits_visible_in(crate_, crate_.root_module),
    }
}

fn resolve_type_paths(crate_: &Crate, dcx: &DiagCtxt, scope: &Scope, span: &Span, ty: &mut TypeRef) {
    match ty {
        TypeRef::Path(p) => resolve_ufcs_in_path(crate_, dcx, scope, span, p),
        TypeRef::Tuple(elems) => {
            for e in elems {
                resolve_type_paths(crate_, dcx, scope, span, e);
            }
        }
        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            resolve_type_paths(crate_, dcx, scope, span, inner)
        }
        TypeRef::Array { inner, .. } => resolve_type_paths(crate_, dcx, scope, span, inner),
        _ => {}
    }
}

fn resolve_ufcs_in_path(crate_: &Crate, dcx: &DiagCtxt, scope: &Scope, span: &Span, path: &mut Path) {
    resolve_one(crate_, dcx, scope, NameContext::Type, span, path);
}

/// `ConvertHIR_ResolveUFCS_Outer`: item signatures only, locals not in
/// scope, any failure to resolve is fatal (already asserted by
/// `resolve_one` reporting an error on every non-match).
pub fn resolve_ufcs_outer(crate_: &mut Crate, dcx: &DiagCtxt) {
    let owners = impl_owner_of_items(crate_);
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        let mut kind = std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None);
        match &mut kind {
            ItemKind::Struct(s) => {
                let scope = scope_for(crate_, &owners, iid, s.generics.clone());
                for (_, ty) in &mut s.fields {
                    resolve_type_paths(crate_, dcx, &scope, &span, ty);
                }
            }
            ItemKind::Union(u) => {
                let scope = scope_for(crate_, &owners, iid, u.generics.clone());
                for (_, ty) in &mut u.fields {
                    resolve_type_paths(crate_, dcx, &scope, &span, ty);
                }
            }
            ItemKind::Enum(e) => {
                let scope = scope_for(crate_, &owners, iid, e.generics.clone());
                for v in &mut e.variants {
                    for (_, ty) in &mut v.fields {
                        resolve_type_paths(crate_, dcx, &scope, &span, ty);
                    }
                }
            }
            ItemKind::Function(f) => {
                let scope = scope_for(crate_, &owners, iid, f.generics.clone());
                for (_, ty) in &mut f.args {
                    resolve_type_paths(crate_, dcx, &scope, &span, ty);
                }
                resolve_type_paths(crate_, dcx, &scope, &span, &mut f.ret);
            }
            ItemKind::Static { ty, .. } | ItemKind::Const { ty, .. } => {
                let scope = scope_for(crate_, &owners, iid, Default::default());
                resolve_type_paths(crate_, dcx, &scope, &span, ty);
            }
            ItemKind::Impl(imp) => {
                let scope = scope_for(crate_, &owners, iid, imp.generics.clone());
                resolve_type_paths(crate_, dcx, &scope, &span, &mut imp.self_ty);
            }
            _ => {}
        }
        crate_.get_mut(iid).kind = kind;
    }
}

fn resolve_paths_in_expr(crate_: &Crate, dcx: &DiagCtxt, scope: &Scope, expr: &mut Expr) {
    let span = expr.span.clone();
    match &mut expr.kind {
        ExprKind::PathExpr(p) => {
            resolve_one(crate_, dcx, scope, NameContext::Value, &span, p);
        }
        ExprKind::Struct { path, fields, base } => {
            resolve_one(crate_, dcx, scope, NameContext::Type, &span, path);
            for (_, e) in fields {
                resolve_paths_in_expr(crate_, dcx, scope, e);
            }
            if let Some(base) = base {
                resolve_paths_in_expr(crate_, dcx, scope, base);
            }
        }
        ExprKind::Tuple(elems) | ExprKind::Array(elems) => {
            for e in elems {
                resolve_paths_in_expr(crate_, dcx, scope, e);
            }
        }
        ExprKind::ArrayRepeat { value, count } => {
            resolve_paths_in_expr(crate_, dcx, scope, value);
            resolve_paths_in_expr(crate_, dcx, scope, count);
        }
        ExprKind::Field { base, .. } => resolve_paths_in_expr(crate_, dcx, scope, base),
        ExprKind::Index { base, index } => {
            resolve_paths_in_expr(crate_, dcx, scope, base);
            resolve_paths_in_expr(crate_, dcx, scope, index);
        }
        ExprKind::Call { callee, args } => {
            resolve_paths_in_expr(crate_, dcx, scope, callee);
            for a in args {
                resolve_paths_in_expr(crate_, dcx, scope, a);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            resolve_paths_in_expr(crate_, dcx, scope, receiver);
            for a in args {
                resolve_paths_in_expr(crate_, dcx, scope, a);
            }
        }
        ExprKind::BinOp { lhs, rhs, .. } => {
            resolve_paths_in_expr(crate_, dcx, scope, lhs);
            resolve_paths_in_expr(crate_, dcx, scope, rhs);
        }
        ExprKind::UniOp { operand, .. } => resolve_paths_in_expr(crate_, dcx, scope, operand),
        ExprKind::Block(stmts, tail) => {
            for stmt in stmts {
                match stmt {
                    Stmt::Let { init: Some(init), .. } => resolve_paths_in_expr(crate_, dcx, scope, init),
                    Stmt::Let { .. } | Stmt::Item(_) => {}
                    Stmt::Expr(e) => resolve_paths_in_expr(crate_, dcx, scope, e),
                }
            }
            if let Some(tail) = tail {
                resolve_paths_in_expr(crate_, dcx, scope, tail);
            }
        }
        ExprKind::If { cond, then, else_ } => {
            resolve_paths_in_expr(crate_, dcx, scope, cond);
            resolve_paths_in_expr(crate_, dcx, scope, then);
            if let Some(else_) = else_ {
                resolve_paths_in_expr(crate_, dcx, scope, else_);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            resolve_paths_in_expr(crate_, dcx, scope, scrutinee);
            for (_, body) in arms {
                resolve_paths_in_expr(crate_, dcx, scope, body);
            }
        }
        ExprKind::Return(Some(inner)) => resolve_paths_in_expr(crate_, dcx, scope, inner),
        _ => {}
    }
}

/// `ConvertHIR_ResolveUFCS`: expression bodies, using the outer phase's
/// results; runs after `LifetimeElision`/`Markings` and before
/// `ConstantEvaluate`, per the driver's pass ordering.
pub fn resolve_ufcs_inner(crate_: &mut Crate, dcx: &DiagCtxt) {
    let owners = impl_owner_of_items(crate_);
    for iid in crate_.all_item_ids() {
        let mut body = match std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None) {
            ItemKind::Function(mut f) => {
                let body = f.body.take();
                let generics = f.generics.clone();
                crate_.get_mut(iid).kind = ItemKind::Function(f);
                body.map(|b| (b, generics))
            }
            other => {
                crate_.get_mut(iid).kind = other;
                None
            }
        };
        if let Some((expr, generics)) = &mut body {
            let scope = scope_for(crate_, &owners, iid, generics.clone());
            resolve_paths_in_expr(crate_, dcx, &scope, expr);
        }
        if let ItemKind::Function(f) = &mut crate_.get_mut(iid).kind {
            f.body = body.map(|(b, _)| b);
        }
    }
}
