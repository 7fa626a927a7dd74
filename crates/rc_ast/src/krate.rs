//! `Crate`: the arena that exclusively owns every `Module`/`Item`
//!.
//!
//! Rather than the original's raw back-pointers, every cross-reference
//! (a `Path`'s binding, a glob import's target, `ItemRef`) is an
//! `AbsolutePath` or an `ItemId` indexing into this arena — O(1) hashmap
//! lookups instead of pointer chasing, with no lifetime entanglement.

use crate::item::{Item, ItemId, ItemKind, ItemRef, ItemRefKind, Module, NameEntry};
use crate::path::AbsolutePath;
use rc_span::Span;
use rustc_hash::FxHashSet;

pub struct Crate {
    pub name: String,
    items: Vec<Item>,
    pub root_module: ItemId,
    /// Crate-wide index from absolute path to item, rebuilt after each
    /// expansion pass so resolution never walks the module tree by hand.
    path_index: rustc_hash::FxHashMap<AbsolutePath, ItemId>,
}

impl Crate {
    pub fn new(name: impl Into<String>) -> Crate {
        let name = name.into();
        let root_path = AbsolutePath::crate_root(name.clone());
        let mut items = Vec::new();
        items.push(Item::new(
            "",
            ItemKind::Module(Module::new(root_path.clone())),
            Span::dummy(),
            crate::item::Visibility::Public,
        ));
        let root_module = ItemId(0);
        let mut c = Crate { name, items, root_module, path_index: Default::default() };
        c.path_index.insert(root_path, root_module);
        c
    }

    pub fn alloc_item(&mut self, item: Item) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(item);
        id
    }

    pub fn get(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }
    pub fn get_mut(&mut self, id: ItemId) -> &mut Item {
        &mut self.items[id.0 as usize]
    }

    pub fn module(&self, id: ItemId) -> &Module {
        match &self.get(id).kind {
            ItemKind::Module(m) => m,
            _ => rc_span::bug!(&Span::dummy(), "ItemId does not name a module"),
        }
    }
    pub fn module_mut(&mut self, id: ItemId) -> &mut Module {
        match &mut self.get_mut(id).kind {
            ItemKind::Module(m) => m,
            _ => rc_span::bug!(&Span::dummy(), "ItemId does not name a module"),
        }
    }

    /// `Module::add_item`: appends to `m_items`; does not update the name
    /// indexes (those are rebuilt after expansion).
    pub fn add_item(&mut self, module: ItemId, is_pub: bool, item: Item) -> ItemId {
        let id = self.alloc_item(item);
        let vis = if is_pub { crate::item::Visibility::Public } else { crate::item::Visibility::Private };
        self.get_mut(id).vis = vis;
        self.module_mut(module).items.push(id);
        id
    }

    /// Every live `ItemId` in arena order, `ItemKind::None` placeholders
    /// included — callers that need to skip those already do (e.g.
    /// `find_item_inner`). Used by the expansion driver to snapshot the
    /// item list before a pass, since the arena can grow mid-pass as
    /// derives and proc-macros append new items.
    pub fn all_item_ids(&self) -> Vec<ItemId> {
        (0..self.items.len()).map(|i| ItemId(i as u32)).collect()
    }

    pub fn register_path(&mut self, path: AbsolutePath, id: ItemId) {
        self.path_index.insert(path, id);
    }

    pub fn lookup_path(&self, path: &AbsolutePath) -> Option<ItemId> {
        self.path_index.get(path).copied()
    }

    /// Reverse of `lookup_path` — the `AbsolutePath` an item was last
    /// registered under, if any. A linear scan over the path index;
    /// used by passes that need an item's path for side-table keys
    /// (`HirFacts`) rather than on any resolution hot path.
    pub fn path_of(&self, id: ItemId) -> Option<AbsolutePath> {
        self.path_index.iter().find(|(_, &iid)| iid == id).map(|(p, _)| p.clone())
    }

    /// Rebuild every module's three name indexes from its item list and
    /// imports. Run once expansion has reached a fixed point.
    pub fn rebuild_indexes(&mut self) {
        let module_ids: Vec<ItemId> =
            (0..self.items.len()).filter_map(|i| {
                let id = ItemId(i as u32);
                matches!(self.get(id).kind, ItemKind::Module(_)).then_some(id)
            }).collect();
        for mid in module_ids {
            let (item_ids, my_path) = {
                let m = self.module(mid);
                (m.items.clone(), m.my_path.clone())
            };
            let mut ns = crate::item::NameIndex::default();
            let mut ty = crate::item::NameIndex::default();
            let mut val = crate::item::NameIndex::default();
            for iid in item_ids {
                let item = self.get(iid);
                if item.name.is_empty() {
                    continue;
                }
                let target = my_path.child(&item.name);
                let entry = NameEntry { is_public: matches!(item.vis, crate::item::Visibility::Public), is_import: false };
                match &item.kind {
                    ItemKind::Struct(_) | ItemKind::Enum(_) | ItemKind::Union(_) | ItemKind::Trait(_)
                    | ItemKind::TypeAlias { .. } | ItemKind::Module(_) => ty.insert(&item.name, entry, target.clone()),
                    ItemKind::Function(_) | ItemKind::Static { .. } | ItemKind::Const { .. } => val.insert(&item.name, entry, target.clone()),
                    _ => {}
                }
                ns.insert(&item.name, entry, target);
                self.register_path(my_path.child(&item.name), iid);
            }
            let m = self.module_mut(mid);
            m.namespace_index = ns;
            m.type_index = ty;
            m.value_index = val;
        }
    }

    /// `Module::find_item`: looks up `name` first among declared items,
    /// then among `use` imports, following glob imports recursively with
    /// a visited set to avoid cycles; globs are skipped when
    /// `ignore_private_wildcard` is set and the import is private
    ///.
    pub fn find_item(
        &self,
        module: ItemId,
        name: &str,
        allow_leaves: bool,
        ignore_private_wildcard: bool,
    ) -> Option<ItemRef> {
        let mut visited = FxHashSet::default();
        self.find_item_inner(module, name, allow_leaves, ignore_private_wildcard, &mut visited)
    }

    fn find_item_inner(
        &self,
        module: ItemId,
        name: &str,
        allow_leaves: bool,
        ignore_private_wildcard: bool,
        visited: &mut FxHashSet<ItemId>,
    ) -> Option<ItemRef> {
        if !visited.insert(module) {
            return None;
        }
        let m = self.module(module);
        for &iid in &m.items {
            let item = self.get(iid);
            if matches!(item.kind, ItemKind::None) {
                continue;
            }
            if item.name == name {
                if !allow_leaves && !matches!(item.kind, ItemKind::Module(_)) {
                    continue;
                }
                return Some(ItemRef { id: iid, kind: ItemRefKind::Item });
            }
        }
        for import in &m.imports {
            if import.path.is_glob() {
                if ignore_private_wildcard && !import.is_pub {
                    continue;
                }
                if let crate::path::PathBinding::Module(target_path) = &import.path.binding {
                    if let Some(target_mod) = self.lookup_path(target_path) {
                        if let Some(found) = self.find_item_inner(
                            target_mod,
                            name,
                            allow_leaves,
                            ignore_private_wildcard,
                            visited,
                        ) {
                            return Some(found);
                        }
                    }
                }
            } else if let Some(last) = match &import.path.kind {
                crate::path::PathKind::Relative(nodes)
                | crate::path::PathKind::SelfPath(nodes)
                | crate::path::PathKind::Super { nodes, .. }
                | crate::path::PathKind::Absolute { nodes, .. } => nodes.last(),
                _ => None,
            } {
                let effective_name = import.rename.as_deref().unwrap_or(&last.name);
                if effective_name == name {
                    if let Some(target) = self.lookup_path_from_binding(&import.path.binding) {
                        return Some(ItemRef { id: target, kind: ItemRefKind::Import });
                    }
                }
            }
        }
        None
    }

    fn lookup_path_from_binding(&self, binding: &crate::path::PathBinding) -> Option<ItemId> {
        use crate::path::PathBinding::*;
        match binding {
            Module(p) | Struct(p) | Function(p) | Const(p) | Static(p) => self.lookup_path(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemKind, Visibility};

    #[test]
    fn add_item_appends_without_indexing() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        let sid = c.add_item(root, true, Item::new("S", ItemKind::Struct(crate::item::StructDef {
            generics: Default::default(), is_tuple: false, fields: vec![],
        }), Span::dummy(), Visibility::Public));
        assert_eq!(c.module(root).items, vec![sid]);
        assert!(c.find_item(root, "S", true, false).is_none());
        c.rebuild_indexes();
        assert!(c.find_item(root, "S", true, false).is_some());
    }

    #[test]
    fn find_item_skips_none_placeholder() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new("", ItemKind::None, Span::dummy(), Visibility::Public));
        c.rebuild_indexes();
        assert!(c.find_item(root, "", true, false).is_none());
    }
}
