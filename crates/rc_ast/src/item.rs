//! Items and modules.

use crate::expr::Expr;
use crate::generics::GenericParams;
use crate::path::{AbsolutePath, Path};
use crate::types::TypeRef;
use rc_span::Span;
use rustc_hash::FxHashMap;
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// An index into the owning `Crate`'s item arena. Paths and imports hold
/// only `ItemId`s (never owning pointers): lookups become O(1)
/// hashmap/array indexing instead of chasing raw back-pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaItemValue {
    Word,
    Str(String),
    List(Vec<MetaItem>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaItem {
    pub name: String,
    pub value: MetaItemValue,
    used: Cell<bool>,
}

impl MetaItem {
    pub fn new(name: impl Into<String>, value: MetaItemValue) -> MetaItem {
        MetaItem { name: name.into(), value, used: Cell::new(false) }
    }

    pub fn word(name: impl Into<String>) -> MetaItem {
        MetaItem::new(name, MetaItemValue::Word)
    }

    /// Monotonic: once marked used, stays used. An unused meta-item after
    /// the expansion phase is a warning source.
    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn list_items(&self) -> &[MetaItem] {
        match &self.value {
            MetaItemValue::List(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeList {
    pub attrs: Vec<MetaItem>,
}

impl AttributeList {
    pub fn get(&self, name: &str) -> Option<&MetaItem> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn unused(&self) -> impl Iterator<Item = &MetaItem> {
        self.attrs.iter().filter(|a| !a.is_used())
    }
}

#[derive(Debug, Clone)]
pub struct MacroInvocation {
    pub span: Span,
    pub name: String,
    pub input_text: String,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub generics: GenericParams,
    pub is_tuple: bool,
    pub fields: Vec<(String, TypeRef)>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub is_tuple: bool,
    pub is_unit: bool,
    pub fields: Vec<(String, TypeRef)>,
    pub discriminant: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub generics: GenericParams,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone)]
pub struct UnionDef {
    pub generics: GenericParams,
    pub fields: Vec<(String, TypeRef)>,
}

#[derive(Debug, Clone)]
pub struct TraitDef {
    pub generics: GenericParams,
    pub supertraits: Vec<crate::path::GenericPath>,
    pub assoc_fns: Vec<String>,
    pub assoc_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub generics: GenericParams,
    pub args: Vec<(String, TypeRef)>,
    pub ret: TypeRef,
    pub body: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ImplDef {
    pub generics: GenericParams,
    pub trait_path: Option<crate::path::GenericPath>,
    pub is_negative: bool,
    pub self_ty: TypeRef,
    pub items: Vec<(String, ItemId)>,
}

#[derive(Debug, Clone)]
pub struct UseStmt {
    pub path: Path,
    pub rename: Option<String>,
    pub is_pub: bool,
}

#[derive(Debug, Clone)]
pub struct ProcMacroDef {
    pub exported_name: String,
    pub helper_attrs: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    None,
    MacroInvocation(MacroInvocation),
    Module(Module),
    ExternCrate { name: String },
    TypeAlias { generics: GenericParams, target: TypeRef },
    Struct(StructDef),
    Enum(EnumDef),
    Union(UnionDef),
    Trait(TraitDef),
    Function(FunctionDef),
    Static { ty: TypeRef, value: Expr, is_mut: bool },
    Const { ty: TypeRef, value: Expr },
    Impl(ImplDef),
    UseStatement(UseStmt),
    ProcMacroDef(ProcMacroDef),
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub attrs: AttributeList,
    pub span: Span,
    pub vis: Visibility,
    pub name: String,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind, span: Span, vis: Visibility) -> Item {
        Item { kind, attrs: AttributeList::default(), span, vis, name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEntry {
    pub is_public: bool,
    pub is_import: bool,
}

/// One of the three name indexes a module maintains (namespace/type/value)
/// mapping an interned name to `{is_public, is_import, AbsolutePath}`.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: FxHashMap<String, (NameEntry, AbsolutePath)>,
}

impl NameIndex {
    pub fn insert(&mut self, name: impl Into<String>, entry: NameEntry, target: AbsolutePath) {
        self.entries.insert(name.into(), (entry, target));
    }

    pub fn get(&self, name: &str) -> Option<&(NameEntry, AbsolutePath)> {
        self.entries.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub my_path: AbsolutePath,
    pub items: Vec<ItemId>,
    pub imports: Vec<UseStmt>,
    pub impls: Vec<ItemId>,
    pub neg_impls: Vec<ItemId>,
    pub pending_macros: Vec<MacroInvocation>,
    pub anon_children: Vec<ItemId>,
    /// Statics synthesised by const-eval (hoisted writable relocation
    /// targets) that have not yet been merged into the value-namespace
    /// index, per `rc_consteval`'s `Newval::new_static`.
    pub inline_statics: Vec<ItemId>,
    pub namespace_index: NameIndex,
    pub type_index: NameIndex,
    pub value_index: NameIndex,
}

impl Module {
    pub fn new(my_path: AbsolutePath) -> Module {
        Module {
            my_path,
            items: Vec::new(),
            imports: Vec::new(),
            impls: Vec::new(),
            neg_impls: Vec::new(),
            pending_macros: Vec::new(),
            anon_children: Vec::new(),
            inline_statics: Vec::new(),
            namespace_index: NameIndex::default(),
            type_index: NameIndex::default(),
            value_index: NameIndex::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRefKind {
    Item,
    Import,
}

/// A non-owning, tagged pointer into `Crate`'s item arena, returned by
/// `Module::find_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub id: ItemId,
    pub kind: ItemRefKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_item_used_is_monotonic() {
        let m = MetaItem::word("derive");
        assert!(!m.is_used());
        m.mark_used();
        assert!(m.is_used());
        m.mark_used();
        assert!(m.is_used());
    }

    #[test]
    fn unused_after_use_reports_none_left() {
        let mut attrs = AttributeList::default();
        attrs.attrs.push(MetaItem::word("inline"));
        attrs.attrs.push(MetaItem::word("cold"));
        attrs.get("inline").unwrap().mark_used();
        attrs.get("cold").unwrap().mark_used();
        assert_eq!(attrs.unused().count(), 0);
    }
}
