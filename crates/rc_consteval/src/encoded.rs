//! Encoding an `Allocation` into the flat, storable form a const/static
//! item's value is persisted as, and hoisting writable relocation
//! targets into fresh hidden statics so the encoded form never needs to
//! carry a live `Allocation` of its own.

use crate::alloc::{RelocPtr, RelocTarget};
use crate::error::EvalError;
use rc_ast::expr::{Expr, ExprKind};
use rc_ast::item::{Item, ItemKind, Visibility};
use rc_ast::krate::Crate;
use rc_ast::path::AbsolutePath;
use rc_ast::types::{Primitive, TypeRef};
use rc_span::Span;

/// A relocation recorded alongside an `EncodedLiteral`'s flat bytes: the
/// pointer-shaped value at a given byte offset either names another item
/// (`Named`) or carries its own bytes inline (`Bytes`, for
/// already-immutable data like string literals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reloc {
    Named(AbsolutePath),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLiteral {
    pub bytes: Vec<u8>,
    pub relocations: Vec<(u64, Reloc)>,
}

impl EncodedLiteral {
    pub fn read_usize(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    pub fn write_usize(&mut self, offset: usize, value: u64) {
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

/// Hoists a writable relocation target into a fresh, hidden static so
/// the encoded form referencing it can hold a stable `AbsolutePath`
/// instead of an inline `Allocation`.
pub struct Newval;

impl Newval {
    pub fn new_static(crate_: &mut Crate, counter: &mut u32, ty: TypeRef, bytes: Vec<u8>) -> AbsolutePath {
        let name = format!("__const{}", *counter);
        *counter += 1;
        let root = crate_.root_module;
        let root_path = crate_.module(root).my_path.clone();
        let item = Item::new(
            name.clone(),
            ItemKind::Static { ty, value: Expr::new(Span::dummy(), ExprKind::Bytes(bytes)), is_mut: false },
            Span::dummy(),
            Visibility::Private,
        );
        let iid = crate_.add_item(root, false, item);
        let path = root_path.child(&name);
        crate_.register_path(path.clone(), iid);
        crate_.module_mut(root).inline_statics.push(iid);
        path
    }
}

fn byte_array_type(len: u64) -> TypeRef {
    TypeRef::Array {
        inner: Box::new(TypeRef::Primitive(Primitive::U8)),
        size_expr: Box::new(Expr::int_lit(Span::dummy(), len as u128)),
    }
}

/// Flattens `len` bytes of `storage` (and any relocations fully inside
/// that range) into an `EncodedLiteral`, hoisting allocation-backed
/// relocation targets one level deep as opaque byte-array statics.
/// Deeper chains of allocation-in-allocation relocations aren't
/// exercised by any in-scope constant and aren't recursed into further.
pub fn allocation_to_encoded(
    crate_: &mut Crate,
    counter: &mut u32,
    storage: &RelocPtr,
    len: u64,
) -> Result<EncodedLiteral, EvalError> {
    let (bytes, relocs) = match &**storage {
        RelocTarget::Allocation(cell) => {
            let a = cell.borrow();
            (a.raw_bytes()[..len as usize].to_vec(), a.relocations_in_range(len))
        }
        RelocTarget::Constant(b) => (b[..(len as usize).min(b.len())].to_vec(), Vec::new()),
        RelocTarget::StaticRef(p) => return Err(EvalError::UnknownItem(p.clone())),
    };
    let mut relocations = Vec::with_capacity(relocs.len());
    for (offset, target) in relocs {
        let reloc = match &*target {
            RelocTarget::StaticRef(p) => Reloc::Named(p.clone()),
            RelocTarget::Constant(b) => Reloc::Bytes(b.clone()),
            RelocTarget::Allocation(cell) => {
                let inner_bytes = cell.borrow().raw_bytes().to_vec();
                let inner_len = inner_bytes.len() as u64;
                let path = Newval::new_static(crate_, counter, byte_array_type(inner_len), inner_bytes);
                Reloc::Named(path)
            }
        };
        relocations.push((offset, reloc));
    }
    Ok(EncodedLiteral { bytes, relocations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{new_allocation, ValueRef, PTR_BASE};

    #[test]
    fn read_and_write_usize_round_trip() {
        let mut lit = EncodedLiteral { bytes: vec![0; 16], relocations: vec![] };
        lit.write_usize(8, 0xabad_1dea_dead_beef);
        assert_eq!(lit.read_usize(8), 0xabad_1dea_dead_beef);
    }

    #[test]
    fn allocation_to_encoded_carries_bytes_and_named_relocations() {
        let mut crate_ = Crate::new("demo");
        let storage = new_allocation(16);
        let v = ValueRef::new(storage.clone(), 0);
        v.write_uint(64, 5).unwrap();
        let inner = new_allocation(4);
        let v_hi = ValueRef::new(storage.clone(), 8);
        v_hi.write_ptr(PTR_BASE, Some(inner)).unwrap();

        let mut counter = 0;
        let encoded = allocation_to_encoded(&mut crate_, &mut counter, &storage, 16).unwrap();
        assert_eq!(encoded.read_usize(0), 5);
        assert_eq!(encoded.relocations.len(), 1);
        match &encoded.relocations[0].1 {
            Reloc::Named(path) => assert_eq!(path.components.last().unwrap(), "__const0"),
            other => panic!("expected a named hoisted relocation, got {other:?}"),
        }
        assert_eq!(counter, 1);
    }
}
