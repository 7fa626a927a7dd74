//! `ExpandAliases`: repeatedly substitute `type`
//! aliases wherever they appear in type position, bounded by
//! `MAX_RECURSIVE_TYPE_EXPANSIONS` to catch `type A = B; type B = A;`
//! cycles as a hard error rather than looping forever.
//!
//! Runs before `Bind`, so alias targets are found
//! by walking the module tree directly rather than by trusting an
//! already-populated `PathBinding`.

use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::path::{Path, PathBinding, PathKind};
use rc_ast::pattern::{collapse_maybe_bind, Pattern};
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, ErrorCode, Span};

use crate::name_lookup;
use crate::walk;

pub const MAX_RECURSIVE_TYPE_EXPANSIONS: u32 = 100;

/// Resolve a type-position `Path`'s nodes against the module tree,
/// independent of any (not-yet-populated) `PathBinding`, and return the
/// `ItemId` it names — a cut-down `Module::find_item` walk sufficient for
/// the type-alias-position paths this pass needs to see through.
fn resolve_path_item(crate_: &Crate, path: &Path) -> Option<rc_ast::item::ItemId> {
    if let PathBinding::Struct(p) | PathBinding::Module(p) = &path.binding {
        return crate_.lookup_path(p);
    }
    let nodes: &[rc_ast::path::PathNode] = match &path.kind {
        PathKind::Relative(nodes) | PathKind::SelfPath(nodes) | PathKind::Absolute { nodes, .. } => nodes,
        _ => return None,
    };
    let mut cur = crate_.root_module;
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == nodes.len();
        let found = crate_.find_item(cur, &node.name, is_last, false)?;
        if is_last {
            return Some(found.id);
        }
        match &crate_.get(found.id).kind {
            ItemKind::Module(_) => cur = found.id,
            _ => return None,
        }
    }
    None
}

fn expand_type(crate_: &Crate, dcx: &DiagCtxt, span: &Span, ty: TypeRef, depth: u32) -> TypeRef {
    if depth > MAX_RECURSIVE_TYPE_EXPANSIONS {
        dcx.error(span.clone(), ErrorCode::E0000, "type alias expansion exceeded recursion limit (cycle?)");
        return ty;
    }
    match ty {
        TypeRef::Path(p) => {
            if let Some(iid) = resolve_path_item(crate_, &p) {
                if let ItemKind::TypeAlias { target, .. } = &crate_.get(iid).kind {
                    return expand_type(crate_, dcx, span, target.clone(), depth + 1);
                }
            }
            TypeRef::Path(Box::new(expand_in_path(crate_, dcx, span, *p, depth)))
        }
        TypeRef::Tuple(elems) => {
            TypeRef::Tuple(elems.into_iter().map(|t| expand_type(crate_, dcx, span, t, depth)).collect())
        }
        TypeRef::Borrow { lifetime, is_mut, inner } => TypeRef::Borrow {
            lifetime,
            is_mut,
            inner: Box::new(expand_type(crate_, dcx, span, *inner, depth)),
        },
        TypeRef::Pointer { is_mut, inner } => {
            TypeRef::Pointer { is_mut, inner: Box::new(expand_type(crate_, dcx, span, *inner, depth)) }
        }
        TypeRef::Array { inner, size_expr } => {
            TypeRef::Array { inner: Box::new(expand_type(crate_, dcx, span, *inner, depth)), size_expr }
        }
        TypeRef::Slice(inner) => TypeRef::Slice(Box::new(expand_type(crate_, dcx, span, *inner, depth))),
        other => other,
    }
}

fn expand_in_path(crate_: &Crate, dcx: &DiagCtxt, span: &Span, mut path: Path, depth: u32) -> Path {
    if let PathKind::UfcsUnknown { ty, trait_hint, item } = path.kind {
        path.kind = PathKind::UfcsUnknown {
            ty: Box::new(expand_type(crate_, dcx, span, *ty, depth)),
            trait_hint,
            item,
        };
    }
    path
}

/// Rewrite every type position reachable from `crate_`'s items in place.
/// Struct/enum/union field types, function arg/return types, const/static
/// types, and impl self-types/alias targets are all in scope; expression
/// and pattern interiors are left to their own (narrower) passes.
pub fn expand_aliases(crate_: &mut Crate, dcx: &DiagCtxt) {
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        rewrite_item_types(crate_, iid, &span, dcx);
    }
    for iid in crate_.all_item_ids() {
        collapse_maybe_binds_in_item(crate_, iid);
    }
}

/// Resolve every place a function body still holds a
/// `Pattern::MaybeBind`: look up what its path names and collapse it to
/// `WildcardVariant` when that's a unit struct/variant, else to
/// `TupleStruct`/`Struct` per `collapse_maybe_bind`'s rule. Patterns
/// whose path doesn't resolve here (a local binding shadowing a type
/// name, for instance) are left for `Bind` to sort out — `Bind` runs an
/// identical fallback via `rc_ast::pattern::collapse_maybe_bind` itself.
fn collapse_maybe_binds_in_item(crate_: &mut Crate, iid: rc_ast::item::ItemId) {
    let mut body = match std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None) {
        ItemKind::Function(mut f) => {
            let body = f.body.take();
            crate_.get_mut(iid).kind = ItemKind::Function(f);
            body
        }
        other => {
            crate_.get_mut(iid).kind = other;
            None
        }
    };
    if let Some(expr) = &mut body {
        walk::visit_patterns_in_expr(expr, &mut |pat| {
            walk::visit_subpatterns(pat, &mut |p| collapse_one(crate_, p));
        });
    }
    if let ItemKind::Function(f) = &mut crate_.get_mut(iid).kind {
        f.body = body;
    }
}

fn collapse_one(crate_: &Crate, pat: &mut Pattern) {
    if !matches!(pat, Pattern::MaybeBind { .. }) {
        return;
    }
    let path = match pat {
        Pattern::MaybeBind { path, .. } => path.clone(),
        _ => unreachable!(),
    };
    let target_is_unit = name_lookup::path_nodes(&path)
        .and_then(|nodes| name_lookup::resolve_name_target(crate_, &nodes))
        .map(|(target, _)| name_lookup::is_unit_shaped(crate_, target))
        .unwrap_or(false);
    let taken = std::mem::replace(pat, Pattern::Any);
    *pat = collapse_maybe_bind(taken, target_is_unit);
}

/// Swap the item's `kind` out to `None` so its type positions can be
/// rewritten using an (otherwise-mutably-borrowed) shared view of
/// `crate_` for alias lookups, then swap the rewritten kind back in.
fn rewrite_item_types(crate_: &mut Crate, iid: rc_ast::item::ItemId, span: &Span, dcx: &DiagCtxt) {
    let snapshot_kind = std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None);
    let rewritten = match snapshot_kind {
        ItemKind::Struct(mut s) => {
            for (_, ty) in &mut s.fields {
                *ty = expand_type(crate_, dcx, span, std::mem::replace(ty, TypeRef::Any), 0);
            }
            ItemKind::Struct(s)
        }
        ItemKind::Union(mut u) => {
            for (_, ty) in &mut u.fields {
                *ty = expand_type(crate_, dcx, span, std::mem::replace(ty, TypeRef::Any), 0);
            }
            ItemKind::Union(u)
        }
        ItemKind::Enum(mut e) => {
            for v in &mut e.variants {
                for (_, ty) in &mut v.fields {
                    *ty = expand_type(crate_, dcx, span, std::mem::replace(ty, TypeRef::Any), 0);
                }
            }
            ItemKind::Enum(e)
        }
        ItemKind::Function(mut f) => {
            for (_, ty) in &mut f.args {
                *ty = expand_type(crate_, dcx, span, std::mem::replace(ty, TypeRef::Any), 0);
            }
            f.ret = expand_type(crate_, dcx, span, f.ret, 0);
            ItemKind::Function(f)
        }
        ItemKind::Static { mut ty, value, is_mut } => {
            ty = expand_type(crate_, dcx, span, ty, 0);
            ItemKind::Static { ty, value, is_mut }
        }
        ItemKind::Const { mut ty, value } => {
            ty = expand_type(crate_, dcx, span, ty, 0);
            ItemKind::Const { ty, value }
        }
        ItemKind::Impl(mut imp) => {
            imp.self_ty = expand_type(crate_, dcx, span, imp.self_ty, 0);
            ItemKind::Impl(imp)
        }
        other => other,
    };
    crate_.get_mut(iid).kind = rewritten;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::expr::{Expr, ExprKind};
    use rc_ast::item::{FunctionDef, Item, StructDef, Visibility};
    use rc_ast::types::Primitive;

    fn alias_item(name: &str, target: TypeRef) -> Item {
        Item::new(name, ItemKind::TypeAlias { generics: Default::default(), target }, Span::dummy(), Visibility::Public)
    }

    #[test]
    fn single_alias_expands_to_its_target() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, alias_item("Byte", TypeRef::Primitive(Primitive::U8)));
        let sid = c.add_item(root, true, Item::new(
            "S",
            ItemKind::Struct(StructDef { generics: Default::default(), is_tuple: false, fields: vec![(
                "x".into(),
                TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("Byte")]))),
            )] }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        expand_aliases(&mut c, &dcx);
        assert!(!dcx.had_errors());
        match &c.get(sid).kind {
            ItemKind::Struct(s) => assert_eq!(s.fields[0].1, TypeRef::Primitive(Primitive::U8)),
            _ => panic!("expected struct"),
        }
    }

    #[test]
    fn chained_aliases_expand_transitively() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, alias_item("A", TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("B")])))));
        c.add_item(root, true, alias_item("B", TypeRef::Primitive(Primitive::U32)));
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(rc_ast::item::FunctionDef {
                generics: Default::default(),
                args: vec![],
                ret: TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("A")]))),
                body: None,
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        expand_aliases(&mut c, &dcx);
        match &c.get(fid).kind {
            ItemKind::Function(f) => assert_eq!(f.ret, TypeRef::Primitive(Primitive::U32)),
            _ => panic!("expected fn"),
        }
    }

    #[test]
    fn cyclic_alias_hits_the_recursion_limit() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, alias_item("A", TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("B")])))));
        c.add_item(root, true, alias_item("B", TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("A")])))));
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(rc_ast::item::FunctionDef {
                generics: Default::default(),
                args: vec![],
                ret: TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("A")]))),
                body: None,
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        expand_aliases(&mut c, &dcx);
        let _ = fid;
        assert!(dcx.had_errors());
    }

    #[test]
    fn non_alias_struct_path_is_left_alone() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new("Other", ItemKind::Struct(StructDef { generics: Default::default(), is_tuple: false, fields: vec![] }), Span::dummy(), Visibility::Public));
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(rc_ast::item::FunctionDef {
                generics: Default::default(),
                args: vec![],
                ret: TypeRef::Path(Box::new(Path::relative(vec![rc_ast::path::PathNode::plain("Other")]))),
                body: None,
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        expand_aliases(&mut c, &dcx);
        match &c.get(fid).kind {
            ItemKind::Function(f) => assert!(matches!(&f.ret, TypeRef::Path(_))),
            _ => panic!("expected fn"),
        }
    }

    #[test]
    fn maybe_bind_against_unit_struct_collapses_in_a_match_arm() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new(
            "Unit",
            ItemKind::Struct(StructDef { generics: Default::default(), is_tuple: false, fields: vec![] }),
            Span::dummy(),
            Visibility::Public,
        ));
        let body = Expr::new(
            Span::dummy(),
            ExprKind::Match {
                scrutinee: Box::new(Expr::new(Span::dummy(), ExprKind::PathExpr(Box::new(Path::local("x"))))),
                arms: vec![(
                    rc_ast::pattern::Pattern::MaybeBind {
                        path: Path::relative(vec![rc_ast::path::PathNode::plain("Unit")]),
                        fields: None,
                    },
                    Expr::new(Span::dummy(), ExprKind::BoolLit(true)),
                )],
            },
        );
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(FunctionDef { generics: Default::default(), args: vec![], ret: TypeRef::Unit, body: Some(body) }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        expand_aliases(&mut c, &dcx);
        match &c.get(fid).kind {
            ItemKind::Function(f) => match &f.body.as_ref().unwrap().kind {
                ExprKind::Match { arms, .. } => {
                    assert!(matches!(&arms[0].0, rc_ast::pattern::Pattern::WildcardVariant { .. }));
                }
                _ => panic!("expected match"),
            },
            _ => panic!("expected fn"),
        }
    }
}
