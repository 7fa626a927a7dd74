//! Side-tables the HIR conversion passes populate against the crate's
//! `AbsolutePath`s.
//!
//! The original keeps a separate `HIR::Crate` tree reached from
//! `Crate.m_root_module`. Here we keep the single `rc_ast::Crate` arena
//! as the backing store for both AST and HIR state and attach everything
//! the HIR passes compute as `AbsolutePath`-keyed facts here, rather
//! than duplicating every item shape into a second tree — see
//! DESIGN.md.

use rc_ast::path::AbsolutePath;
use rustc_hash::FxHashMap;

/// `dst_type` classification of a struct's last field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstType {
    #[default]
    None,
    Slice,
    TraitObject,
    /// Possibly-DST: the last field's type is itself generic over a
    /// `?Sized` parameter, so DST-ness depends on the instantiation.
    Possible,
}

/// How a struct participates in a `CoerceUnsized` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoerceKind {
    #[default]
    None,
    /// The differing field is a raw/reference/pointer to an `Unsize`
    /// parameter — the base case of the chain.
    Pointer,
    /// The differing field is itself a coerce-unsized struct — the
    /// recursive case.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructMarkings {
    pub dst_type: DstType,
    /// Index into the struct's own generics of the `?Sized` parameter
    /// that makes the last field possibly-DST, if `dst_type == Possible`.
    pub unsized_param: Option<u32>,
    pub can_unsize: bool,
    pub coerce_unsized: CoerceKind,
    /// Index of the generic parameter threaded through the coerce chain.
    pub coerce_param: Option<u32>,
    /// Index of the one field that differs between the `CoerceUnsized`
    /// source and destination.
    pub coerce_unsized_index: Option<u32>,
}

/// One entry of a trait's transitive supertrait closure: the supertrait's
/// path plus the generic substitutions that reach it from the subtrait
///.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentTrait {
    pub path: AbsolutePath,
    pub args: rc_ast::generics::GenericArgs,
}

#[derive(Debug, Default)]
pub struct HirFacts {
    pub markings: FxHashMap<AbsolutePath, StructMarkings>,
    /// `m_all_parent_traits`: every trait's transitively closed supertrait
    /// list, populated by the `Markings` pass's supertrait-closure step
    /// and consumed by `rc_resolve`'s
    /// UFCS walk.
    pub parent_traits: FxHashMap<AbsolutePath, Vec<ParentTrait>>,
}

impl HirFacts {
    pub fn new() -> HirFacts {
        HirFacts::default()
    }
}
