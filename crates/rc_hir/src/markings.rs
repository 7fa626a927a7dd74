//! `Markings` and the supertrait closure it also
//! computes: populate `facts::HirFacts` with each struct's
//! `StructMarkings` and each trait's transitive `m_all_parent_traits`.

use rc_ast::generics::GenericBound;
use rc_ast::item::{ItemId, ItemKind, StructDef};
use rc_ast::krate::Crate;
use rc_ast::path::AbsolutePath;
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, ErrorCode, Span};

use crate::facts::{CoerceKind, DstType, HirFacts, ParentTrait, StructMarkings};

fn is_phantom_data_field(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Path(p) => matches!(&p.binding, rc_ast::path::PathBinding::Struct(abs) if abs.components.last().map(|s| s.as_str()) == Some("PhantomData")),
        _ => false,
    }
}

/// Find the index and `?Sized`-bounded generic param a struct's last
/// field names directly, the shape `dst_type: Possible` requires.
fn find_unsized_generic(s: &StructDef) -> Option<u32> {
    let (_, last_ty) = s.fields.last()?;
    let idx = match last_ty {
        TypeRef::Generic { index, .. } => *index,
        _ => return None,
    };
    let is_maybe_sized = (idx as usize) < s.generics.params.len()
        && s.generics.bounds_for(idx as usize).iter().any(|b| matches!(b, GenericBound::MaybeTrait { .. }));
    is_maybe_sized.then_some(idx)
}

fn dst_type_of(s: &StructDef) -> (DstType, Option<u32>) {
    match s.fields.last() {
        Some((_, TypeRef::Slice(_))) => (DstType::Slice, None),
        Some((_, TypeRef::TraitObject { .. })) => (DstType::TraitObject, None),
        _ => match find_unsized_generic(s) {
            Some(idx) => (DstType::Possible, Some(idx)),
            None => (DstType::None, None),
        },
    }
}

fn mentions_generic(ty: &TypeRef, idx: u32) -> bool {
    match ty {
        TypeRef::Generic { index, .. } => *index == idx,
        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            mentions_generic(inner, idx)
        }
        _ => false,
    }
}

/// `Coerce::Pointer` if `ty` is a raw/reference pointer straight at the
/// unsize parameter; `Coerce::Passthrough` if `ty` either *is* the
/// parameter (no indirection — as with `struct W<T:
/// ?Sized>(T)`) or is itself a struct whose own markings already unsize
/// over that same shape. `None` otherwise.
fn coerce_kind_of(crate_: &Crate, facts: &HirFacts, ty: &TypeRef, idx: u32) -> CoerceKind {
    match ty {
        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } if mentions_generic(inner, idx) => {
            CoerceKind::Pointer
        }
        TypeRef::Generic { index, .. } if *index == idx => CoerceKind::Passthrough,
        TypeRef::Path(p) => {
            if let rc_ast::path::PathBinding::Struct(abs) = &p.binding {
                if let Some(iid) = crate_.lookup_path(abs) {
                    if let ItemKind::Struct(_) = &crate_.get(iid).kind {
                        if facts.markings.get(abs).is_some_and(|m| m.coerce_unsized != CoerceKind::None) {
                            return CoerceKind::Passthrough;
                        }
                    }
                }
            }
            CoerceKind::None
        }
        _ => CoerceKind::None,
    }
}

fn is_coerce_unsized_impl(imp: &rc_ast::item::ImplDef) -> bool {
    imp.trait_path
        .as_ref()
        .is_some_and(|tp| tp.path.components.last().map(|s| s.as_str()) == Some("CoerceUnsized"))
}

fn self_struct_path(imp: &rc_ast::item::ImplDef) -> Option<&AbsolutePath> {
    match &imp.self_ty {
        TypeRef::Path(p) => match &p.binding {
            rc_ast::path::PathBinding::Struct(abs) => Some(abs),
            _ => None,
        },
        _ => None,
    }
}

/// Apply every `CoerceUnsized` impl's observations onto its self
/// struct's already-computed `StructMarkings` (the DST pass must have
/// already run over every struct before this step, since `Passthrough`
/// detection reads sibling structs' `coerce_unsized`).
fn apply_coerce_unsized_impls(crate_: &Crate, dcx: &DiagCtxt, facts: &mut HirFacts) {
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        let ItemKind::Impl(imp) = &crate_.get(iid).kind else { continue };
        if !is_coerce_unsized_impl(imp) {
            continue;
        }
        let Some(struct_path) = self_struct_path(imp) else { continue };
        let Some(struct_iid) = crate_.lookup_path(struct_path) else { continue };
        let ItemKind::Struct(s) = &crate_.get(struct_iid).kind else { continue };
        let Some(unsized_idx) = facts.markings.get(struct_path).and_then(|m| m.unsized_param) else { continue };

        let mut differing = Vec::new();
        for (i, (_, fty)) in s.fields.iter().enumerate() {
            if is_phantom_data_field(fty) {
                continue;
            }
            if mentions_generic(fty, unsized_idx) {
                differing.push(i);
            }
        }
        if differing.len() > 1 {
            dcx.error(span, ErrorCode::E0000, format!("{struct_path}: more than one field differs under CoerceUnsized"));
            continue;
        }
        let Some(field_idx) = differing.first().copied() else { continue };
        let field_ty = s.fields[field_idx].1.clone();
        let kind = coerce_kind_of(crate_, facts, &field_ty, unsized_idx);
        if let Some(m) = facts.markings.get_mut(struct_path) {
            m.coerce_unsized = kind;
            m.coerce_param = Some(unsized_idx);
            m.coerce_unsized_index = Some(field_idx as u32);
        }
    }
}

/// Transitive supertrait closure: `parent_traits ∪ { bound trait : Self:
/// Trait }`, deduplicated by path (associated-type-binding merging
/// doesn't apply here — `GenericPath` carries no associated-type
/// bindings in this model, only type/lifetime args).
fn compute_parent_traits(crate_: &Crate, trait_iid: ItemId) -> Vec<ParentTrait> {
    let ItemKind::Trait(t) = &crate_.get(trait_iid).kind else { return Vec::new() };
    let mut direct: Vec<ParentTrait> = t
        .supertraits
        .iter()
        .map(|gp| ParentTrait { path: gp.path.clone(), args: gp.args.clone() })
        .collect();
    for b in &t.generics.bounds {
        if let GenericBound::IsTrait { ty: TypeRef::Generic { name, .. }, trait_path, .. } = b {
            if name.as_str() == "Self" {
                direct.push(ParentTrait { path: trait_path.path.clone(), args: trait_path.args.clone() });
            }
        }
    }
    let mut closure: Vec<ParentTrait> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut frontier = direct;
    while let Some(pt) = frontier.pop() {
        if !seen.insert(pt.path.clone()) {
            continue;
        }
        if let Some(parent_iid) = crate_.lookup_path(&pt.path) {
            if let ItemKind::Trait(parent) = &crate_.get(parent_iid).kind {
                for gp in &parent.supertraits {
                    frontier.push(ParentTrait { path: gp.path.clone(), args: gp.args.clone() });
                }
            }
        }
        closure.push(pt);
    }
    closure.sort_by(|a, b| a.path.cmp(&b.path));
    closure
}

/// Run the full `Markings` pass: DST classification, `CoerceUnsized`
/// observation, and supertrait closures, returning the populated facts
/// table.
pub fn compute_markings(crate_: &Crate, dcx: &DiagCtxt) -> HirFacts {
    let mut facts = HirFacts::new();
    for iid in crate_.all_item_ids() {
        if let ItemKind::Struct(s) = &crate_.get(iid).kind {
            let (dst_type, unsized_param) = dst_type_of(s);
            let can_unsize = dst_type != DstType::None;
            let path = crate_.path_of(iid).unwrap_or_else(|| AbsolutePath::crate_root(crate_.name.clone()));
            facts.markings.insert(
                path,
                StructMarkings {
                    dst_type,
                    unsized_param,
                    can_unsize,
                    coerce_unsized: CoerceKind::None,
                    coerce_param: None,
                    coerce_unsized_index: None,
                },
            );
        }
    }
    apply_coerce_unsized_impls(crate_, dcx, &mut facts);
    for iid in crate_.all_item_ids() {
        if let ItemKind::Trait(_) = &crate_.get(iid).kind {
            if let Some(path) = crate_.path_of(iid) {
                facts.parent_traits.insert(path, compute_parent_traits(crate_, iid));
            }
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::generics::{GenericParam, GenericParamKind, GenericParams};
    use rc_ast::item::{Item, StructDef, Visibility};
    use rc_ast::path::{GenericPath, PathBinding};

    fn unsize_bound_struct() -> (GenericParams, Vec<(String, TypeRef)>) {
        let mut gp = GenericParams::default();
        gp.push_type_param(
            "T",
            vec![GenericBound::MaybeTrait {
                ty: TypeRef::Generic { name: "T".into(), index: 0 },
                trait_path: GenericPath::new(AbsolutePath::crate_root("core").child("Sized")),
            }],
        );
        (gp, vec![("0".into(), TypeRef::Generic { name: "T".into(), index: 0 })])
    }

    #[test]
    fn bare_generic_last_field_is_possible_dst() {
        let (generics, fields) = unsize_bound_struct();
        let s = StructDef { generics, is_tuple: true, fields };
        let (dst, idx) = dst_type_of(&s);
        assert_eq!(dst, DstType::Possible);
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn coerce_unsized_impl_marks_passthrough() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        let (generics, fields) = unsize_bound_struct();
        let sid = c.add_item(root, true, Item::new("W", ItemKind::Struct(StructDef { generics, is_tuple: true, fields }), Span::dummy(), Visibility::Public));
        c.rebuild_indexes();
        let struct_path = AbsolutePath::crate_root("demo").child("W");

        let mut self_ty_path = rc_ast::path::Path::relative(vec![rc_ast::path::PathNode::plain("W")]);
        self_ty_path.bind(&Span::dummy(), PathBinding::Struct(struct_path.clone()));
        let impl_item = Item::new(
            "<impl>",
            ItemKind::Impl(rc_ast::item::ImplDef {
                generics: GenericParams { params: vec![
                    GenericParam { name: "T".into(), kind: GenericParamKind::Type { default: None }, bounds_range: 0..0 },
                    GenericParam { name: "U".into(), kind: GenericParamKind::Type { default: None }, bounds_range: 0..0 },
                ], bounds: vec![] },
                trait_path: Some(GenericPath::new(AbsolutePath::crate_root("core").child("CoerceUnsized"))),
                is_negative: false,
                self_ty: TypeRef::Path(Box::new(self_ty_path)),
                items: vec![],
            }),
            Span::dummy(),
            Visibility::Private,
        );
        c.add_item(root, false, impl_item);
        c.rebuild_indexes();

        let dcx = DiagCtxt::new();
        let facts = compute_markings(&c, &dcx);
        assert!(!dcx.had_errors());
        let m = facts.markings.get(&struct_path).unwrap();
        assert_eq!(m.dst_type, DstType::Possible);
        assert_eq!(m.unsized_param, Some(0));
        assert_eq!(m.coerce_unsized_index, Some(0));
        assert_eq!(m.coerce_unsized, CoerceKind::Passthrough);
        assert_eq!(m.coerce_param, Some(0));
        let _ = sid;
    }

    #[test]
    fn supertraits_close_transitively() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new(
            "A",
            ItemKind::Trait(rc_ast::item::TraitDef {
                generics: Default::default(),
                supertraits: vec![],
                assoc_fns: vec![],
                assoc_types: vec![],
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let a_path = AbsolutePath::crate_root("demo").child("A");
        c.add_item(root, true, Item::new(
            "B",
            ItemKind::Trait(rc_ast::item::TraitDef {
                generics: Default::default(),
                supertraits: vec![GenericPath::new(a_path.clone())],
                assoc_fns: vec![],
                assoc_types: vec![],
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let b_iid = c.lookup_path(&AbsolutePath::crate_root("demo").child("B")).unwrap();
        let dcx = DiagCtxt::new();
        let facts = compute_markings(&c, &dcx);
        let closure = facts.parent_traits.get(&c.path_of(b_iid).unwrap()).unwrap();
        assert_eq!(closure.len(), 1);
        assert_eq!(closure[0].path, a_path);
    }
}
