//! Target-specific layout queries: `Target_GetSizeOf` / `Target_GetAlignOf`
//! / `Target_GetTypeRepr`, consumed by
//! the `Markings` pass (for DST/CoerceUnsized classification) and by
//! `rc_consteval` (for `Tuple`/`Struct`/`Array`/`EnumVariant` writes).
//!
//! Only one target is modelled: a 64-bit little-endian target.
//! Multi-target support is out of scope.

use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::types::{Primitive, TypeRef};
use rustc_hash::FxHashMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The type's size depends on a generic parameter or an
    /// unresolved-at-this-point constant — callers fall back to
    /// `rc_consteval`'s `Defer` handling.
    #[error("layout of {0} depends on unresolved generics")]
    Defer(String),
    #[error("unsized type {0} has no static layout")]
    Unsized(String),
    #[error("unknown struct/enum/union path {0}")]
    UnknownItem(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub offset: u64,
}

/// A type's computed layout: total size, alignment, and (for aggregates)
/// the byte offset of each field in declaration order — the "cached
/// offsets for each field" the statement-handling code in `rc_consteval` reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeRepr {
    pub size: u64,
    pub align: u64,
    pub fields: Vec<FieldLayout>,
}

pub const PTR_SIZE: u64 = 8;

pub struct Target {
    pub pointer_bits: u32,
}

impl Default for Target {
    fn default() -> Target {
        Target { pointer_bits: 64 }
    }
}

impl Target {
    pub fn get_pointer_bits(&self) -> u32 {
        self.pointer_bits
    }

    pub fn size_of(&self, crate_: &Crate, ty: &TypeRef) -> Result<u64, LayoutError> {
        Ok(self.type_repr(crate_, ty)?.size)
    }

    pub fn align_of(&self, crate_: &Crate, ty: &TypeRef) -> Result<u64, LayoutError> {
        Ok(self.type_repr(crate_, ty)?.align)
    }

    pub fn type_repr(&self, crate_: &Crate, ty: &TypeRef) -> Result<TypeRepr, LayoutError> {
        match ty {
            TypeRef::Unit => Ok(TypeRepr { size: 0, align: 1, fields: vec![] }),
            TypeRef::Bang => Ok(TypeRepr { size: 0, align: 1, fields: vec![] }),
            TypeRef::Primitive(p) => Ok(primitive_repr(*p)),
            TypeRef::Borrow { .. } | TypeRef::Pointer { .. } | TypeRef::Function(_) => {
                Ok(TypeRepr { size: PTR_SIZE, align: PTR_SIZE, fields: vec![] })
            }
            TypeRef::Tuple(elems) => self.aggregate_repr(crate_, elems.iter()),
            TypeRef::Array { inner, size_expr } => {
                let elem = self.type_repr(crate_, inner)?;
                let len = literal_array_len(size_expr)
                    .ok_or_else(|| LayoutError::Defer("array length not yet const-evaluated".into()))?;
                Ok(TypeRepr { size: elem.size * len, align: elem.align, fields: vec![] })
            }
            TypeRef::Slice(_) | TypeRef::TraitObject { .. } | TypeRef::ErasedType { .. } => {
                Err(LayoutError::Unsized(format!("{ty:?}")))
            }
            TypeRef::Path(p) => self.path_repr(crate_, p),
            TypeRef::Generic { name, .. } => Err(LayoutError::Defer(name.clone())),
            TypeRef::Any | TypeRef::MacroPending(_) => Err(LayoutError::Defer(format!("{ty:?}"))),
        }
    }

    fn path_repr(&self, crate_: &Crate, path: &rc_ast::path::Path) -> Result<TypeRepr, LayoutError> {
        use rc_ast::path::PathBinding;
        let target = match &path.binding {
            PathBinding::Struct(p) => p.clone(),
            other => return Err(LayoutError::Defer(format!("{other:?}"))),
        };
        let iid = crate_.lookup_path(&target).ok_or_else(|| LayoutError::UnknownItem(target.to_string()))?;
        match &crate_.get(iid).kind {
            ItemKind::Struct(s) => self.aggregate_repr(crate_, s.fields.iter().map(|(_, t)| t)),
            ItemKind::Union(u) => {
                let mut size = 0;
                let mut align = 1;
                for (_, fty) in &u.fields {
                    let r = self.type_repr(crate_, fty)?;
                    size = size.max(r.size);
                    align = align.max(r.align);
                }
                Ok(TypeRepr { size: round_up(size, align), align, fields: vec![] })
            }
            ItemKind::Enum(e) => self.enum_repr(crate_, e),
            _ => Err(LayoutError::UnknownItem(target.to_string())),
        }
    }

    fn enum_repr(&self, crate_: &Crate, e: &rc_ast::item::EnumDef) -> Result<TypeRepr, LayoutError> {
        // Tag-plus-largest-payload layout: a one-word discriminant
        // followed by the widest variant's payload, each variant's own
        // fields laid out from the payload's start. Adequate for the
        // in-scope const-eval scenarios; not a bit-accurate niche-filling
        // optimiser (that belongs to codegen, out of scope here).
        let tag_repr = TypeRepr { size: 8, align: 8, fields: vec![] };
        if e.variants.iter().all(|v| v.fields.is_empty()) {
            return Ok(tag_repr);
        }
        let mut payload_size = 0u64;
        let mut payload_align = 1u64;
        for v in &e.variants {
            let r = self.aggregate_repr(crate_, v.fields.iter().map(|(_, t)| t))?;
            payload_size = payload_size.max(r.size);
            payload_align = payload_align.max(r.align);
        }
        let align = tag_repr.align.max(payload_align);
        let size = round_up(tag_repr.size, payload_align) + payload_size;
        Ok(TypeRepr { size: round_up(size, align), align, fields: vec![] })
    }

    fn aggregate_repr<'a>(
        &self,
        crate_: &Crate,
        field_tys: impl Iterator<Item = &'a TypeRef>,
    ) -> Result<TypeRepr, LayoutError> {
        let mut offset = 0u64;
        let mut align = 1u64;
        let mut fields = Vec::new();
        for fty in field_tys {
            let r = self.type_repr(crate_, fty)?;
            offset = round_up(offset, r.align);
            fields.push(FieldLayout { offset });
            offset += r.size;
            align = align.max(r.align);
        }
        let size = round_up(offset, align);
        Ok(TypeRepr { size, align, fields })
    }
}

fn round_up(offset: u64, align: u64) -> u64 {
    if align == 0 {
        offset
    } else {
        (offset + align - 1) / align * align
    }
}

fn primitive_repr(p: Primitive) -> TypeRepr {
    let (size, align) = match p {
        Primitive::Bool | Primitive::U8 | Primitive::I8 => (1, 1),
        Primitive::U16 | Primitive::I16 => (2, 2),
        Primitive::Char | Primitive::U32 | Primitive::I32 | Primitive::F32 => (4, 4),
        Primitive::U64 | Primitive::I64 | Primitive::F64 => (8, 8),
        Primitive::U128 | Primitive::I128 => (16, 16),
        Primitive::Usize | Primitive::Isize => (PTR_SIZE, PTR_SIZE),
        Primitive::Str => (0, 1),
    };
    TypeRepr { size, align, fields: vec![] }
}

/// `Array`'s `size_expr` holds a (by this point, const-evaluated) literal
/// once `ConstantEvaluate` has run; before that, layout queries on arrays
/// must `Defer`. We only recognise the already-folded literal form here —
/// general expression evaluation is `rc_consteval`'s job.
fn literal_array_len(size_expr: &rc_ast::expr::Expr) -> Option<u64> {
    match &size_expr.kind {
        rc_ast::expr::ExprKind::IntLit { value, .. } => Some(value.0 as u64),
        _ => None,
    }
}

/// Per-path cache of already-computed layouts, keyed by a string form of
/// the type (paths compare structurally once bound) — avoids re-walking
/// large structs repeatedly during a single const-eval run.
#[derive(Default)]
pub struct TypeReprCache {
    cache: FxHashMap<String, TypeRepr>,
}

impl TypeReprCache {
    pub fn get_or_compute(
        &mut self,
        target: &Target,
        crate_: &Crate,
        ty: &TypeRef,
    ) -> Result<TypeRepr, LayoutError> {
        let key = format!("{ty:?}");
        if let Some(repr) = self.cache.get(&key) {
            return Ok(repr.clone());
        }
        let repr = target.type_repr(crate_, ty)?;
        self.cache.insert(key, repr.clone());
        Ok(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::item::{Item, StructDef, Visibility};
    use rc_span::Span;

    #[test]
    fn primitives_have_expected_size_and_align() {
        let t = Target::default();
        let c = Crate::new("demo");
        assert_eq!(t.size_of(&c, &TypeRef::Primitive(Primitive::U8)).unwrap(), 1);
        assert_eq!(t.size_of(&c, &TypeRef::Primitive(Primitive::U64)).unwrap(), 8);
        assert_eq!(t.size_of(&c, &TypeRef::Primitive(Primitive::U128)).unwrap(), 16);
    }

    #[test]
    fn tuple_fields_are_aligned_and_padded() {
        let t = Target::default();
        let c = Crate::new("demo");
        let ty = TypeRef::Tuple(vec![TypeRef::Primitive(Primitive::U8), TypeRef::Primitive(Primitive::U32)]);
        let repr = t.type_repr(&c, &ty).unwrap();
        assert_eq!(repr.align, 4);
        assert_eq!(repr.fields[0].offset, 0);
        assert_eq!(repr.fields[1].offset, 4);
        assert_eq!(repr.size, 8);
    }

    #[test]
    fn struct_repr_recurses_through_the_crate() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        let sid = c.add_item(root, true, Item::new(
            "S",
            ItemKind::Struct(StructDef {
                generics: Default::default(),
                is_tuple: false,
                fields: vec![("a".into(), TypeRef::Primitive(Primitive::U32)), ("b".into(), TypeRef::Primitive(Primitive::U8))],
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let _ = sid;
        let path_to_s = rc_ast::path::AbsolutePath::crate_root("demo").child("S");
        let mut p = rc_ast::path::Path::local("S");
        p.bind(&Span::dummy(), rc_ast::path::PathBinding::Struct(path_to_s));
        let ty = TypeRef::Path(Box::new(p));
        let t = Target::default();
        let repr = t.type_repr(&c, &ty).unwrap();
        assert_eq!(repr.size, 8);
        assert_eq!(repr.align, 4);
    }

    #[test]
    fn array_with_unevaluated_length_defers() {
        let t = Target::default();
        let c = Crate::new("demo");
        let len_expr = rc_ast::expr::Expr::new(
            Span::dummy(),
            rc_ast::expr::ExprKind::BinOp {
                op: rc_ast::expr::BinOp::Add,
                lhs: Box::new(rc_ast::expr::Expr::int_lit(Span::dummy(), 2)),
                rhs: Box::new(rc_ast::expr::Expr::int_lit(Span::dummy(), 3)),
            },
        );
        let ty = TypeRef::Array { inner: Box::new(TypeRef::Primitive(Primitive::U8)), size_expr: Box::new(len_expr) };
        assert!(matches!(t.type_repr(&c, &ty), Err(LayoutError::Defer(_))));
    }
}
