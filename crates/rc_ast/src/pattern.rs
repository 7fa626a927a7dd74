//! Patterns.

use crate::path::Path;
use crate::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    Move,
    Ref,
    RefMut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Box<Pattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Any,
    Binding { name: String, mode: BindingMode, is_mut: bool, slot: u32, sub: Option<Box<Pattern>> },
    /// An inclusive range `start..=end` (a single value has `start == end`).
    Value { start: Box<crate::expr::Expr>, end: Box<crate::expr::Expr> },
    Ref(Box<Pattern>),
    Box(Box<Pattern>),
    Tuple(Vec<Pattern>),
    Struct { path: Path, fields: Vec<FieldPattern>, is_exhaustive: bool },
    TupleStruct { path: Path, fields: Vec<Pattern> },
    /// A variant name with no associated fields, e.g. `E::B`.
    WildcardVariant { path: Path },
    Slice { leading: Vec<Pattern>, extra_bind: Option<Box<Pattern>>, trailing: Vec<Pattern> },
    /// Transient form produced by the parser before alias expansion knows
    /// whether a bare path names a unit struct/variant (`PathValue`),
    /// a tuple variant (`PathTuple`), or a named-field variant
    /// (`PathNamed`); resolved away by `ExpandAliases`.
    MaybeBind { path: Path, fields: Option<Vec<FieldPattern>> },
    /// Unexpanded macro invocation in pattern position.
    Macro(crate::item::MacroInvocation),
}

impl Pattern {
    /// `Pattern::Struct.is_exhaustive` is true iff the pattern listed all
    /// fields without `..`.
    pub fn struct_pattern(path: Path, fields: Vec<FieldPattern>, has_dotdot: bool) -> Pattern {
        Pattern::Struct { path, fields, is_exhaustive: !has_dotdot }
    }

    pub fn is_refutable_value(&self) -> bool {
        matches!(self, Pattern::Value { .. })
    }

    /// Assert this pattern's kind matches the shape of the variant it was
    /// bound to (tuple variant ⇒ `TupleStruct`, named-field ⇒ `Struct`),
    /// per the `Bind` pass's shape-assertion contract.
    pub fn assert_matches_variant_shape(&self, is_tuple_variant: bool, is_unit_variant: bool) {
        match self {
            Pattern::TupleStruct { .. } => assert!(is_tuple_variant, "tuple pattern against non-tuple variant"),
            Pattern::Struct { .. } => assert!(!is_tuple_variant && !is_unit_variant, "struct pattern against tuple/unit variant"),
            Pattern::WildcardVariant { .. } => assert!(is_unit_variant, "unit pattern against non-unit variant"),
            _ => {}
        }
    }
}

/// Implements the rewrite rule for a `PathNamed`-shaped
/// `MaybeBind` with no inner field patterns, against a unit struct or
/// unit enum variant, collapses to a bare value pattern (`PathValue`)
/// rather than staying a (degenerate) struct pattern.
pub fn collapse_maybe_bind(pat: Pattern, target_is_unit: bool) -> Pattern {
    match pat {
        Pattern::MaybeBind { path, fields: None } if target_is_unit => {
            Pattern::WildcardVariant { path }
        }
        Pattern::MaybeBind { path, fields: Some(fields) } if fields.is_empty() && target_is_unit => {
            Pattern::WildcardVariant { path }
        }
        Pattern::MaybeBind { path, fields: Some(fields) } => {
            Pattern::Struct { path, fields, is_exhaustive: true }
        }
        Pattern::MaybeBind { path, fields: None } => Pattern::TupleStruct { path, fields: vec![] },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn exhaustive_struct_pattern_has_no_dotdot() {
        let p = Pattern::struct_pattern(Path::local("S"), vec![], false);
        match p {
            Pattern::Struct { is_exhaustive, .. } => assert!(is_exhaustive),
            _ => panic!("wrong shape"),
        }
    }

    #[test]
    fn maybe_bind_on_unit_struct_collapses_to_value() {
        let pat = Pattern::MaybeBind { path: Path::local("Unit"), fields: None };
        let collapsed = collapse_maybe_bind(pat, true);
        assert!(matches!(collapsed, Pattern::WildcardVariant { .. }));
    }

    #[test]
    fn maybe_bind_on_non_unit_stays_tuple_struct() {
        let pat = Pattern::MaybeBind { path: Path::local("Some"), fields: None };
        let collapsed = collapse_maybe_bind(pat, false);
        assert!(matches!(collapsed, Pattern::TupleStruct { .. }));
    }
}
