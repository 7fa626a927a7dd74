//! Paths and the binding side-channel attached to every one of them
//!.
//!
//! A `Path` has five source-level shapes plus the UFCS forms the
//! resolver produces. Every `Path` carries a `PathBinding`
//! recording what name resolution found; mutating the path's node list
//! invalidates the binding, matching `Path::operator+=` in the original.

use crate::generics::GenericArgs;
use rc_span::Span;
use std::fmt;

/// A single segment of a path: a name plus any angle-bracket generic
/// arguments written at that segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    pub name: String,
    pub args: GenericArgs,
}

impl PathNode {
    pub fn plain(name: impl Into<String>) -> PathNode {
        PathNode { name: name.into(), args: GenericArgs::default() }
    }

    pub fn ord_key(&self) -> (&str, &GenericArgs) {
        (&self.name, &self.args)
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ord_key().cmp(&other.ord_key())
    }
}

/// A fully resolved, crate-rooted path to an item — the handle stored
/// once something has actually been bound. Distinct from `Path`, which
/// is the possibly-unresolved syntactic form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsolutePath {
    pub crate_name: String,
    pub components: Vec<String>,
}

impl AbsolutePath {
    pub fn crate_root(crate_name: impl Into<String>) -> AbsolutePath {
        AbsolutePath { crate_name: crate_name.into(), components: Vec::new() }
    }

    pub fn child(&self, name: impl Into<String>) -> AbsolutePath {
        let mut components = self.components.clone();
        components.push(name.into());
        AbsolutePath { crate_name: self.crate_name.clone(), components }
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}", self.crate_name)?;
        for c in &self.components {
            write!(f, "::{}", c)?;
        }
        Ok(())
    }
}

/// An index into an enclosing item's generic parameter list (self and
/// trait params are disambiguated by `level`: 0 = item's own params,
/// 1 = enclosing impl/trait params), matching `TypeParameter{level,idx}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeParamRef {
    pub level: u32,
    pub idx: u32,
}

/// What a `Path` was ultimately resolved to. Cleared to `Unbound`
/// whenever the path's nodes are mutated; set exactly once thereafter
/// (setting it twice to different kinds is a bug).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBinding {
    Unbound,
    Module(AbsolutePath),
    Struct(AbsolutePath),
    EnumVariant { enum_path: AbsolutePath, idx: u32 },
    Function(AbsolutePath),
    Const(AbsolutePath),
    Static(AbsolutePath),
    TypeParameter(TypeParamRef),
    LocalVariable { slot: u32 },
    StructMethod { ty: AbsolutePath, name: String },
    TraitMethod { tr: AbsolutePath, name: String },
}

impl PathBinding {
    pub fn is_unbound(&self) -> bool {
        matches!(self, PathBinding::Unbound)
    }

    /// Set the binding, enforcing the "exactly once" rule: binding twice
    /// to a *different* kind is a bug-check failure. Binding twice to an
    /// identical value is tolerated (anonymous modules may be visited
    /// more than once during fixed-point expansion).
    pub fn bind(&mut self, span: &Span, new: PathBinding) {
        match self {
            PathBinding::Unbound => *self = new,
            existing if *existing == new => {}
            _ => rc_span::bug!(
                span,
                "path bound twice with different results: {:?} -> {:?}",
                self,
                new
            ),
        }
    }
}

/// The "what kind of in-scope name is this" resolution context used by
/// UFCS resolution: the same syntactic item can name a value, a type, or
/// a trait depending where it's written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameContext {
    Value,
    Type,
    Trait,
}

/// A trait reference plus its own generic arguments, as produced by
/// `GenericBound::IsTrait` and consumed by the UFCS resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericPath {
    pub path: AbsolutePath,
    pub args: GenericArgs,
}

impl GenericPath {
    pub fn new(path: AbsolutePath) -> GenericPath {
        GenericPath { path, args: GenericArgs::default() }
    }
}

/// The five source path shapes plus the two UFCS forms the resolver
/// produces (`UfcsUnknown` is the syntactic form fed *into* resolution;
/// `UfcsKnown`/`UfcsInherent` are its outputs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    Invalid,
    Local(String),
    Relative(Vec<PathNode>),
    SelfPath(Vec<PathNode>),
    Super { count: u32, nodes: Vec<PathNode> },
    Absolute { krate: String, nodes: Vec<PathNode> },
    /// Syntactic `<Type>::name` / `<Type as Trait>::name`, not yet
    /// resolved by the UFCS resolver.
    UfcsUnknown { ty: Box<crate::types::TypeRef>, trait_hint: Option<GenericPath>, item: String },
    UfcsKnown { ty: Box<crate::types::TypeRef>, tr: GenericPath, item: String },
    UfcsInherent { ty: Box<crate::types::TypeRef>, item: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub kind: PathKind,
    pub binding: PathBinding,
}

impl Path {
    pub fn invalid() -> Path {
        Path { kind: PathKind::Invalid, binding: PathBinding::Unbound }
    }

    pub fn local(name: impl Into<String>) -> Path {
        Path { kind: PathKind::Local(name.into()), binding: PathBinding::Unbound }
    }

    pub fn relative(nodes: Vec<PathNode>) -> Path {
        Path { kind: PathKind::Relative(nodes), binding: PathBinding::Unbound }
    }

    pub fn ufcs_unknown(
        ty: crate::types::TypeRef,
        trait_hint: Option<GenericPath>,
        item: impl Into<String>,
    ) -> Path {
        Path {
            kind: PathKind::UfcsUnknown { ty: Box::new(ty), trait_hint, item: item.into() },
            binding: PathBinding::Unbound,
        }
    }

    /// Append further segments, matching `Path::operator+=`: invalidates
    /// any existing binding since the path now names something else.
    pub fn append(&mut self, node: PathNode) {
        match &mut self.kind {
            PathKind::Relative(nodes)
            | PathKind::SelfPath(nodes)
            | PathKind::Super { nodes, .. }
            | PathKind::Absolute { nodes, .. } => nodes.push(node),
            other => rc_span::bug!(
                &Span::dummy(),
                "cannot append a path node onto {:?}",
                other
            ),
        }
        self.binding = PathBinding::Unbound;
    }

    pub fn bind(&mut self, span: &Span, binding: PathBinding) {
        self.binding.bind(span, binding);
    }

    /// A `use` statement whose final segment is empty names a glob
    /// import.
    pub fn is_glob(&self) -> bool {
        match &self.kind {
            PathKind::Relative(nodes)
            | PathKind::SelfPath(nodes)
            | PathKind::Super { nodes, .. }
            | PathKind::Absolute { nodes, .. } => {
                nodes.last().map(|n| n.name.is_empty()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_clears_binding() {
        let mut p = Path::relative(vec![PathNode::plain("foo")]);
        p.bind(&Span::dummy(), PathBinding::Function(AbsolutePath::crate_root("c")));
        assert!(!p.binding.is_unbound());
        p.append(PathNode::plain("bar"));
        assert!(p.binding.is_unbound());
    }

    #[test]
    #[should_panic]
    fn double_bind_with_different_kind_is_a_bug() {
        let mut p = Path::relative(vec![PathNode::plain("foo")]);
        p.bind(&Span::dummy(), PathBinding::Function(AbsolutePath::crate_root("c")));
        p.bind(&Span::dummy(), PathBinding::Static(AbsolutePath::crate_root("c")));
    }

    #[test]
    fn double_bind_with_same_kind_is_tolerated() {
        let mut p = Path::relative(vec![PathNode::plain("foo")]);
        let b = PathBinding::Function(AbsolutePath::crate_root("c"));
        p.bind(&Span::dummy(), b.clone());
        p.bind(&Span::dummy(), b);
    }

    #[test]
    fn glob_import_detection() {
        let p = Path::relative(vec![PathNode::plain("std"), PathNode::plain("")]);
        assert!(p.is_glob());
    }
}
