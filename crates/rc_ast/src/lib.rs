//! Tagged-tree AST model: items, expressions, types, patterns and paths
//!.

pub mod expr;
pub mod generics;
pub mod item;
pub mod krate;
pub mod pattern;
pub mod path;
pub mod types;

pub use expr::{BinOp, Expr, ExprKind, Stmt, UniOp};
pub use generics::{GenericArgs, GenericBound, GenericParam, GenericParamKind, GenericParams};
pub use item::{
    AttributeList, EnumDef, EnumVariant, FunctionDef, Item, ItemId, ItemKind, ItemRef,
    ItemRefKind, MacroInvocation, MetaItem, MetaItemValue, Module, ProcMacroDef, StructDef,
    TraitDef, UnionDef, UseStmt, Visibility,
};
pub use krate::Crate;
pub use pattern::{collapse_maybe_bind, BindingMode, FieldPattern, Pattern};
pub use path::{AbsolutePath, GenericPath, NameContext, Path, PathBinding, PathKind, PathNode, TypeParamRef};
pub use types::{FunctionType, Primitive, TypeRef};
