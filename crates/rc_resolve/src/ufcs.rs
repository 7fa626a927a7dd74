//! The UFCS resolution algorithm itself: turn a syntactic
//! `Path::UfcsUnknown { ty, trait_hint, item }` into `UfcsKnown` (a
//! trait member) or `UfcsInherent` (an inherent member), or leave it
//! unresolved and report why.

use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::path::{AbsolutePath, GenericPath, NameContext, Path, PathBinding, PathKind};
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, ErrorCode, Span};

use crate::scope::Scope;

fn trait_declares(crate_: &Crate, trait_path: &AbsolutePath, item: &str, ctx: NameContext) -> bool {
    let Some(iid) = crate_.lookup_path(trait_path) else { return false };
    let ItemKind::Trait(t) = &crate_.get(iid).kind else { return false };
    match ctx {
        NameContext::Value => t.assoc_fns.iter().any(|n| n == item),
        NameContext::Type => t.assoc_types.iter().any(|n| n == item),
        NameContext::Trait => false,
    }
}

enum BoundSearch {
    None,
    Found(AbsolutePath),
    Ambiguous(Vec<AbsolutePath>),
}

/// Breadth-first walk of `bounds`' supertrait closure, level by level,
/// stopping at the first depth with at least one declaring trait: the
/// shallowest successful match wins; multiple shallowest matches are
/// ambiguous.
fn shallowest_declaring_trait(crate_: &Crate, bounds: &[AbsolutePath], item: &str, ctx: NameContext) -> BoundSearch {
    use std::collections::HashSet;
    let mut frontier: Vec<AbsolutePath> = bounds.to_vec();
    let mut visited: HashSet<AbsolutePath> = frontier.iter().cloned().collect();
    while !frontier.is_empty() {
        let matches: Vec<AbsolutePath> =
            frontier.iter().filter(|tp| trait_declares(crate_, tp, item, ctx)).cloned().collect();
        match matches.len() {
            0 => {}
            1 => return BoundSearch::Found(matches.into_iter().next().unwrap()),
            _ => return BoundSearch::Ambiguous(matches),
        }
        let mut next = Vec::new();
        for tp in &frontier {
            if let Some(iid) = crate_.lookup_path(tp) {
                if let ItemKind::Trait(t) = &crate_.get(iid).kind {
                    for gp in &t.supertraits {
                        if visited.insert(gp.path.clone()) {
                            next.push(gp.path.clone());
                        }
                    }
                }
            }
        }
        frontier = next;
    }
    BoundSearch::None
}

fn bound_traits_for(generics: &rc_ast::generics::GenericParams, param_name: &str) -> Option<Vec<AbsolutePath>> {
    let idx = generics.find_any(param_name);
    if idx == rc_ast::generics::NOT_FOUND {
        return None;
    }
    let bounds: Vec<AbsolutePath> = generics
        .bounds_for(idx)
        .iter()
        .filter_map(|b| match b {
            rc_ast::generics::GenericBound::IsTrait { trait_path, .. } => Some(trait_path.path.clone()),
            _ => None,
        })
        .collect();
    Some(bounds)
}

/// Rough textual shape of a type, for step 4's "substring match
/// suffices in this core" applicability check.
fn type_repr(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Path(p) => match &p.binding {
            PathBinding::Struct(abs) | PathBinding::Module(abs) => abs.components.last().cloned().unwrap_or_default(),
            _ => format!("{ty:?}"),
        },
        TypeRef::Generic { name, .. } => name.clone(),
        TypeRef::Primitive(prim) => format!("{prim:?}"),
        other => format!("{other:?}"),
    }
}

fn impl_applies(self_ty: &TypeRef, concrete: &TypeRef) -> bool {
    let a = type_repr(self_ty);
    let b = type_repr(concrete);
    a.contains(&b) || b.contains(&a)
}

fn self_ty_matches_struct(ty: &TypeRef, struct_path: &AbsolutePath) -> bool {
    matches!(ty, TypeRef::Path(p) if matches!(&p.binding, PathBinding::Struct(abs) if abs == struct_path))
}

fn emit_known(path: &mut Path, ty: TypeRef, tr: AbsolutePath, item: String) {
    path.kind = PathKind::UfcsKnown { ty: Box::new(ty), tr: GenericPath::new(tr), item };
    path.binding = PathBinding::Unbound;
}

fn emit_inherent(path: &mut Path, ty: TypeRef, item: String) {
    path.kind = PathKind::UfcsInherent { ty: Box::new(ty), item };
    path.binding = PathBinding::Unbound;
}

/// Resolve a single `Path::UfcsUnknown` in place. Returns `true` once
/// the path has been rewritten to `UfcsKnown`/`UfcsInherent`, `false` if
/// it is some other `PathKind` (a no-op) or genuinely couldn't be
/// resolved (an error was already reported).
pub fn resolve_one(
    crate_: &Crate,
    dcx: &DiagCtxt,
    scope: &Scope,
    ctx: NameContext,
    span: &Span,
    path: &mut Path,
) -> bool {
    let PathKind::UfcsUnknown { ty, trait_hint, item } = &path.kind else { return false };
    let ty = ty.as_ref().clone();
    let item = item.clone();

    if let Some(hint) = trait_hint {
        let tr = hint.path.clone();
        emit_known(path, ty, tr, item);
        return true;
    }

    if let TypeRef::Generic { name, .. } = &ty {
        if name.as_str() == "Self" {
            if let Some(trait_path) = &scope.enclosing_trait {
                return finish_via_bound_search(crate_, dcx, span, path, ty, &[trait_path.clone()], &item, ctx);
            }
        } else {
            let mut bounds = bound_traits_for(&scope.item_generics, name).unwrap_or_default();
            if bounds.is_empty() {
                if let Some(impl_generics) = &scope.impl_generics {
                    bounds = bound_traits_for(impl_generics, name).unwrap_or_default();
                }
            }
            if !bounds.is_empty() {
                return finish_via_bound_search(crate_, dcx, span, path, ty, &bounds, &item, ctx);
            }
        }
    }

    if let TypeRef::Path(p) = &ty {
        if let PathBinding::Struct(struct_path) = &p.binding {
            for iid in crate_.all_item_ids() {
                let ItemKind::Impl(imp) = &crate_.get(iid).kind else { continue };
                if imp.trait_path.is_some() {
                    continue;
                }
                if !self_ty_matches_struct(&imp.self_ty, struct_path) {
                    continue;
                }
                if imp.items.iter().any(|(name, _)| name == &item) {
                    emit_inherent(path, ty, item);
                    return true;
                }
            }
        }
    }

    let mut candidates: Vec<AbsolutePath> = Vec::new();
    for tr in &scope.in_scope_traits {
        let applies = crate_.all_item_ids().into_iter().any(|iid| match &crate_.get(iid).kind {
            ItemKind::Impl(imp) => imp.trait_path.as_ref().is_some_and(|tp| &tp.path == tr) && impl_applies(&imp.self_ty, &ty),
            _ => false,
        });
        if applies && trait_declares(crate_, tr, &item, ctx) {
            candidates.push(tr.clone());
        }
    }
    match candidates.len() {
        0 => {
            dcx.error(span.clone(), ErrorCode::E0000, format!("no member `{item}` found for this type"));
            false
        }
        1 => {
            emit_known(path, ty, candidates.into_iter().next().unwrap(), item);
            true
        }
        _ => {
            dcx.error(span.clone(), ErrorCode::E0223, format!("multiple in-scope traits provide `{item}`"));
            false
        }
    }
}

fn finish_via_bound_search(
    crate_: &Crate,
    dcx: &DiagCtxt,
    span: &Span,
    path: &mut Path,
    ty: TypeRef,
    bounds: &[AbsolutePath],
    item: &str,
    ctx: NameContext,
) -> bool {
    match shallowest_declaring_trait(crate_, bounds, item, ctx) {
        BoundSearch::Found(tr) => {
            emit_known(path, ty, tr, item.to_string());
            true
        }
        BoundSearch::Ambiguous(_) => {
            dcx.error(span.clone(), ErrorCode::E0223, format!("multiple equally-specific bounds provide `{item}`"));
            false
        }
        BoundSearch::None => {
            dcx.error(span.clone(), ErrorCode::E0000, format!("no bound provides `{item}`"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::generics::{GenericBound, GenericParams};
    use rc_ast::item::{FunctionDef, ImplDef, Item, StructDef, TraitDef, Visibility};
    use rc_ast::path::{Path, PathNode};

    fn trait_item(name: &str, supertraits: Vec<GenericPath>, assoc_fns: Vec<&str>) -> Item {
        Item::new(
            name,
            ItemKind::Trait(TraitDef {
                generics: GenericParams::default(),
                supertraits,
                assoc_fns: assoc_fns.into_iter().map(String::from).collect(),
                assoc_types: vec![],
            }),
            Span::dummy(),
            Visibility::Public,
        )
    }

    #[test]
    fn ufcs_through_a_supertrait_bound_picks_the_declaring_trait() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, trait_item("A", vec![], vec!["f"]));
        c.rebuild_indexes();
        let a_path = AbsolutePath::crate_root("demo").child("A");
        c.add_item(root, true, trait_item("B", vec![GenericPath::new(a_path.clone())], vec![]));
        c.rebuild_indexes();

        let mut item_generics = GenericParams::default();
        item_generics.push_type_param(
            "T",
            vec![GenericBound::IsTrait {
                hrbs_outer: vec![],
                ty: TypeRef::Generic { name: "T".into(), index: 0 },
                hrbs_inner: vec![],
                trait_path: GenericPath::new(AbsolutePath::crate_root("demo").child("B")),
            }],
        );
        let scope = Scope { item_generics, ..Scope::bare() };

        let mut path = Path::ufcs_unknown(TypeRef::Generic { name: "T".into(), index: 0 }, None, "f");
        let dcx = DiagCtxt::new();
        let resolved = resolve_one(&c, &dcx, &scope, NameContext::Value, &Span::dummy(), &mut path);
        assert!(resolved);
        assert!(!dcx.had_errors());
        match &path.kind {
            PathKind::UfcsKnown { tr, item, .. } => {
                assert_eq!(tr.path, a_path);
                assert_eq!(item, "f");
            }
            other => panic!("expected UfcsKnown, got {other:?}"),
        }
    }

    #[test]
    fn ufcs_against_a_concrete_type_finds_the_inherent_member() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new(
            "S",
            ItemKind::Struct(StructDef { generics: GenericParams::default(), is_tuple: false, fields: vec![] }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let struct_path = AbsolutePath::crate_root("demo").child("S");

        let method_id = c.add_item(root, true, Item::new(
            "make",
            ItemKind::Function(FunctionDef { generics: GenericParams::default(), args: vec![], ret: TypeRef::Unit, body: None }),
            Span::dummy(),
            Visibility::Public,
        ));
        let mut self_ty_path = Path::relative(vec![PathNode::plain("S")]);
        self_ty_path.bind(&Span::dummy(), PathBinding::Struct(struct_path.clone()));
        c.add_item(root, false, Item::new(
            "<impl>",
            ItemKind::Impl(ImplDef {
                generics: GenericParams::default(),
                trait_path: None,
                is_negative: false,
                self_ty: TypeRef::Path(Box::new(self_ty_path.clone())),
                items: vec![("make".into(), method_id)],
            }),
            Span::dummy(),
            Visibility::Private,
        ));
        c.rebuild_indexes();

        let mut concrete_ty_path = Path::relative(vec![PathNode::plain("S")]);
        concrete_ty_path.bind(&Span::dummy(), PathBinding::Struct(struct_path));
        let mut path = Path::ufcs_unknown(TypeRef::Path(Box::new(concrete_ty_path)), None, "make");
        let dcx = DiagCtxt::new();
        let resolved = resolve_one(&c, &dcx, &Scope::bare(), NameContext::Value, &Span::dummy(), &mut path);
        assert!(resolved);
        assert!(matches!(&path.kind, PathKind::UfcsInherent { item, .. } if item == "make"));
    }

    #[test]
    fn ambiguous_in_scope_traits_report_e0223() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, trait_item("A", vec![], vec!["g"]));
        c.add_item(root, true, trait_item("B", vec![], vec!["g"]));
        c.rebuild_indexes();
        let a_path = AbsolutePath::crate_root("demo").child("A");
        let b_path = AbsolutePath::crate_root("demo").child("B");

        for (tr, name) in [(&a_path, "ImplA"), (&b_path, "ImplB")] {
            c.add_item(root, false, Item::new(
                name,
                ItemKind::Impl(ImplDef {
                    generics: GenericParams::default(),
                    trait_path: Some(GenericPath::new(tr.clone())),
                    is_negative: false,
                    self_ty: TypeRef::Unit,
                    items: vec![],
                }),
                Span::dummy(),
                Visibility::Private,
            ));
        }
        c.rebuild_indexes();

        let scope = Scope { in_scope_traits: vec![a_path, b_path], ..Scope::bare() };
        let mut path = Path::ufcs_unknown(TypeRef::Unit, None, "g");
        let dcx = DiagCtxt::new();
        let resolved = resolve_one(&c, &dcx, &scope, NameContext::Value, &Span::dummy(), &mut path);
        assert!(!resolved);
        assert!(dcx.had_errors());
    }
}
