//! `ExpandAliases_Self`: substitute the `Self` type
//! placeholder with the enclosing `impl`'s declared self-type; outside an
//! impl, `Self` is left intact since it's a valid trait-definition anchor.

use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::types::TypeRef;

const SELF_INDEX: u32 = u32::MAX;

fn is_self_marker(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Generic { index, .. } if *index == SELF_INDEX)
}

fn substitute(ty: TypeRef, self_ty: &TypeRef) -> TypeRef {
    if is_self_marker(&ty) {
        return self_ty.clone();
    }
    match ty {
        TypeRef::Tuple(elems) => TypeRef::Tuple(elems.into_iter().map(|t| substitute(t, self_ty)).collect()),
        TypeRef::Borrow { lifetime, is_mut, inner } => {
            TypeRef::Borrow { lifetime, is_mut, inner: Box::new(substitute(*inner, self_ty)) }
        }
        TypeRef::Pointer { is_mut, inner } => TypeRef::Pointer { is_mut, inner: Box::new(substitute(*inner, self_ty)) },
        TypeRef::Array { inner, size_expr } => TypeRef::Array { inner: Box::new(substitute(*inner, self_ty)), size_expr },
        TypeRef::Slice(inner) => TypeRef::Slice(Box::new(substitute(*inner, self_ty))),
        other => other,
    }
}

/// Walk every `impl` block's method signatures and substitute `Self`
/// with that impl's own `self_ty`. Free functions, traits, and top-level
/// type definitions never carry the `impl`-anchored `Self`, so they're
/// untouched — matching "outside impls, `Self` is left intact".
pub fn expand_aliases_self(crate_: &mut Crate) {
    for iid in crate_.all_item_ids() {
        let self_ty = match &crate_.get(iid).kind {
            ItemKind::Impl(imp) => imp.self_ty.clone(),
            _ => continue,
        };
        let method_ids: Vec<_> = match &crate_.get(iid).kind {
            ItemKind::Impl(imp) => imp.items.iter().map(|(_, id)| *id).collect(),
            _ => unreachable!(),
        };
        for mid in method_ids {
            if let ItemKind::Function(f) = &mut crate_.get_mut(mid).kind {
                for (_, ty) in &mut f.args {
                    *ty = substitute(std::mem::replace(ty, TypeRef::Any), &self_ty);
                }
                f.ret = substitute(std::mem::replace(&mut f.ret, TypeRef::Any), &self_ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::item::{FunctionDef, Item, ImplDef, Visibility};
    use rc_ast::types::Primitive;
    use rc_span::Span;

    fn self_ty_marker() -> TypeRef {
        TypeRef::Generic { name: "Self".into(), index: SELF_INDEX }
    }

    #[test]
    fn self_in_method_signature_becomes_the_impl_type() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        let method = Item::new(
            "clone",
            ItemKind::Function(FunctionDef {
                generics: Default::default(),
                args: vec![("self".into(), TypeRef::Borrow { lifetime: None, is_mut: false, inner: Box::new(self_ty_marker()) })],
                ret: self_ty_marker(),
                body: None,
            }),
            Span::dummy(),
            Visibility::Public,
        );
        let mid = c.add_item(root, true, method);
        let impl_item = Item::new(
            "<impl>",
            ItemKind::Impl(ImplDef {
                generics: Default::default(),
                trait_path: None,
                is_negative: false,
                self_ty: TypeRef::Primitive(Primitive::U32),
                items: vec![("clone".into(), mid)],
            }),
            Span::dummy(),
            Visibility::Private,
        );
        c.add_item(root, false, impl_item);
        expand_aliases_self(&mut c);
        match &c.get(mid).kind {
            ItemKind::Function(f) => {
                assert_eq!(f.ret, TypeRef::Primitive(Primitive::U32));
                assert_eq!(f.args[0].1, TypeRef::Borrow { lifetime: None, is_mut: false, inner: Box::new(TypeRef::Primitive(Primitive::U32)) });
            }
            _ => panic!("expected fn"),
        }
    }
}
