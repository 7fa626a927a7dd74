//! A cut-down name resolver shared by `ExpandAliases`'s pattern-collapse
//! step and the `Bind` pass: walk a path's segments against the module
//! tree, falling through to an enum's variant list for the final
//! segment when the prefix names an enum. Neither `ExpandAliases` nor
//! `Bind` can lean on a fully general resolver (that's `rc_resolve`'s
//! UFCS job, and it only handles the `<T>::x` / `Trait::x` forms) — this
//! is deliberately narrower: plain `a::b::c`-shaped paths only.

use rc_ast::item::{ItemId, ItemKind};
use rc_ast::krate::Crate;
use rc_ast::path::{AbsolutePath, Path, PathBinding, PathKind, PathNode};

/// The segment list `resolve_name_target` needs, for the source-level
/// path shapes this narrow resolver understands. `Super`/UFCS forms
/// aren't meaningful here and yield `None`.
pub fn path_nodes(path: &Path) -> Option<Vec<PathNode>> {
    match &path.kind {
        PathKind::Local(name) => Some(vec![PathNode::plain(name.clone())]),
        PathKind::Relative(nodes) | PathKind::SelfPath(nodes) | PathKind::Absolute { nodes, .. } => {
            Some(nodes.clone())
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTarget {
    Item(ItemId),
    EnumVariant { enum_item: ItemId, idx: u32 },
}

fn resolve_item_chain(crate_: &Crate, nodes: &[PathNode]) -> Option<(ItemId, AbsolutePath)> {
    if nodes.is_empty() {
        return None;
    }
    let mut cur_mod = crate_.root_module;
    let mut path = crate_.module(cur_mod).my_path.clone();
    let mut iid = None;
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == nodes.len();
        let found = crate_.find_item(cur_mod, &node.name, true, false)?;
        path = path.child(node.name.clone());
        iid = Some(found.id);
        if !is_last {
            match &crate_.get(found.id).kind {
                ItemKind::Module(_) => cur_mod = found.id,
                _ => return None,
            }
        }
    }
    iid.map(|id| (id, path))
}

/// Resolve `nodes` to either a plain item or, when the path's prefix
/// names an enum, one of its variants by name.
pub fn resolve_name_target(crate_: &Crate, nodes: &[PathNode]) -> Option<(NameTarget, AbsolutePath)> {
    if let Some((iid, path)) = resolve_item_chain(crate_, nodes) {
        return Some((NameTarget::Item(iid), path));
    }
    if nodes.len() >= 2 {
        let (prefix, last) = nodes.split_at(nodes.len() - 1);
        if let Some((enum_iid, enum_path)) = resolve_item_chain(crate_, prefix) {
            if let ItemKind::Enum(e) = &crate_.get(enum_iid).kind {
                if let Some(idx) = e.variants.iter().position(|v| v.name == last[0].name) {
                    return Some((
                        NameTarget::EnumVariant { enum_item: enum_iid, idx: idx as u32 },
                        enum_path,
                    ));
                }
            }
        }
    }
    None
}

/// `true` iff `target` names something with no constructor arguments: a
/// fieldless-tuple/fieldless-named struct counts as unit for the OQ3
/// collapse rule only when it's declared with zero fields and not as a
/// tuple struct; a unit enum variant always counts.
pub fn is_unit_shaped(crate_: &Crate, target: NameTarget) -> bool {
    match target {
        NameTarget::Item(iid) => match &crate_.get(iid).kind {
            ItemKind::Struct(s) => !s.is_tuple && s.fields.is_empty(),
            _ => false,
        },
        NameTarget::EnumVariant { enum_item, idx } => match &crate_.get(enum_item).kind {
            ItemKind::Enum(e) => e.variants.get(idx as usize).is_some_and(|v| v.is_unit),
            _ => false,
        },
    }
}

pub fn is_tuple_shaped(crate_: &Crate, target: NameTarget) -> bool {
    match target {
        NameTarget::Item(iid) => match &crate_.get(iid).kind {
            ItemKind::Struct(s) => s.is_tuple,
            _ => false,
        },
        NameTarget::EnumVariant { enum_item, idx } => match &crate_.get(enum_item).kind {
            ItemKind::Enum(e) => e.variants.get(idx as usize).is_some_and(|v| v.is_tuple),
            _ => false,
        },
    }
}

/// The `PathBinding` a resolved name target corresponds to. `Struct` is
/// used generically for any nominal data-type item (struct, enum, or
/// union) since the `PathBinding` enumeration has no separate
/// `Enum`/`Union` member — see DESIGN.md.
pub fn to_path_binding(crate_: &Crate, target: NameTarget, path: AbsolutePath) -> Option<PathBinding> {
    match target {
        // `resolve_name_target` already returns the enum's own path (not
        // the variant's, since variants aren't separately addressable
        // items) for this case — see its doc comment.
        NameTarget::EnumVariant { idx, .. } => Some(PathBinding::EnumVariant { enum_path: path, idx }),
        NameTarget::Item(iid) => match &crate_.get(iid).kind {
            ItemKind::Module(_) => Some(PathBinding::Module(path)),
            ItemKind::Struct(_) | ItemKind::Enum(_) | ItemKind::Union(_) => Some(PathBinding::Struct(path)),
            ItemKind::Function(_) => Some(PathBinding::Function(path)),
            ItemKind::Const { .. } => Some(PathBinding::Const(path)),
            ItemKind::Static { .. } => Some(PathBinding::Static(path)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::item::{EnumDef, EnumVariant, Item, StructDef, Visibility};
    use rc_span::Span;

    fn node(name: &str) -> PathNode {
        PathNode::plain(name)
    }

    #[test]
    fn resolves_plain_struct_path() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new("S", ItemKind::Struct(StructDef { generics: Default::default(), is_tuple: false, fields: vec![] }), Span::dummy(), Visibility::Public));
        c.rebuild_indexes();
        let (target, path) = resolve_name_target(&c, &[node("S")]).unwrap();
        assert!(matches!(target, NameTarget::Item(_)));
        assert_eq!(path, AbsolutePath::crate_root("demo").child("S"));
        assert!(is_unit_shaped(&c, target));
    }

    #[test]
    fn resolves_enum_variant_via_prefix() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new("E", ItemKind::Enum(EnumDef {
            generics: Default::default(),
            variants: vec![
                EnumVariant { name: "A".into(), is_tuple: true, is_unit: false, fields: vec![], discriminant: None },
                EnumVariant { name: "B".into(), is_tuple: false, is_unit: true, fields: vec![], discriminant: None },
            ],
        }), Span::dummy(), Visibility::Public));
        c.rebuild_indexes();
        let (target_a, _) = resolve_name_target(&c, &[node("E"), node("A")]).unwrap();
        assert!(is_tuple_shaped(&c, target_a));
        let (target_b, path_b) = resolve_name_target(&c, &[node("E"), node("B")]).unwrap();
        assert!(is_unit_shaped(&c, target_b));
        let binding = to_path_binding(&c, target_b, path_b).unwrap();
        assert!(matches!(binding, PathBinding::EnumVariant { idx: 1, .. }));
    }
}
