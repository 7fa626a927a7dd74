//! "Impl-group sort": the UFCS resolver's closing step, a one-time partition of
//! every impl block into `named` (keyed by the concrete struct/enum/
//! union it targets), `non_named` (primitives, `!`, `()`, tuples) and
//! `generic` (blanket impls over a bare type parameter), so later
//! lookups don't re-scan the whole impl list.

use rc_ast::item::{ItemId, ItemKind};
use rc_ast::krate::Crate;
use rc_ast::path::{AbsolutePath, PathBinding};
use rc_ast::types::TypeRef;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct ImplGroups {
    pub named: FxHashMap<AbsolutePath, Vec<ItemId>>,
    pub non_named: Vec<ItemId>,
    pub generic: Vec<ItemId>,
}

fn head_of(self_ty: &TypeRef) -> Option<AbsolutePath> {
    match self_ty {
        TypeRef::Path(p) => match &p.binding {
            PathBinding::Struct(abs) | PathBinding::Module(abs) => Some(abs.clone()),
            _ => None,
        },
        _ => None,
    }
}

pub fn partition_impls(crate_: &Crate) -> ImplGroups {
    let mut groups = ImplGroups::default();
    for iid in crate_.all_item_ids() {
        let ItemKind::Impl(imp) = &crate_.get(iid).kind else { continue };
        match &imp.self_ty {
            TypeRef::Generic { .. } => groups.generic.push(iid),
            other => match head_of(other) {
                Some(head) => groups.named.entry(head).or_default().push(iid),
                None => groups.non_named.push(iid),
            },
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::generics::GenericParams;
    use rc_ast::item::{ImplDef, Item, StructDef, Visibility};
    use rc_ast::path::{Path, PathNode};
    use rc_span::Span;

    fn impl_item(self_ty: TypeRef) -> Item {
        Item::new(
            "<impl>",
            ItemKind::Impl(ImplDef {
                generics: GenericParams::default(),
                trait_path: None,
                is_negative: false,
                self_ty,
                items: vec![],
            }),
            Span::dummy(),
            Visibility::Private,
        )
    }

    #[test]
    fn partitions_named_non_named_and_generic_impls() {
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

        let mut named_self = Path::relative(vec![PathNode::plain("S")]);
        named_self.bind(&Span::dummy(), PathBinding::Struct(struct_path.clone()));
        c.add_item(root, false, impl_item(TypeRef::Path(Box::new(named_self))));
        c.add_item(root, false, impl_item(TypeRef::Unit));
        c.add_item(root, false, impl_item(TypeRef::Generic { name: "T".into(), index: 0 }));
        c.rebuild_indexes();

        let groups = partition_impls(&c);
        assert_eq!(groups.named.get(&struct_path).map(Vec::len), Some(1));
        assert_eq!(groups.non_named.len(), 1);
        assert_eq!(groups.generic.len(), 1);
    }
}
