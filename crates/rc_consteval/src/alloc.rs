//! The memory model: one `Allocation` per local/argument/static/const
//! value, addressed through `ValueRef`s that carry a refcounted
//! relocation pointer plus a byte offset so aliasing writes (through a
//! borrow) are visible to every other reference into the same storage.

use crate::error::EvalError;
use rc_ast::path::AbsolutePath;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Added to an in-allocation byte offset to form the bit pattern a
/// pointer-typed value stores, so a null pointer (bit pattern `0`) never
/// collides with a real address.
pub const PTR_BASE: u64 = 0x1000;

fn align_down(offset: u64) -> u64 {
    offset - (offset % 8)
}

/// What a relocation (a pointer-shaped value) ultimately refers to.
pub enum RelocTarget {
    Allocation(RefCell<Allocation>),
    /// Raw bytes owned outside any mutable allocation (e.g. a `&'static
    /// str` literal) — not writable.
    Constant(Vec<u8>),
    /// A named static item, resolved by the driver rather than carrying
    /// its own bytes here.
    StaticRef(AbsolutePath),
}

pub type RelocPtr = Rc<RelocTarget>;

pub fn new_allocation(size: u64) -> RelocPtr {
    Rc::new(RelocTarget::Allocation(RefCell::new(Allocation::new(size))))
}

/// A flat byte buffer plus a per-byte initialisation mask and a table of
/// outgoing relocations (pointer-shaped values stored inside it), keyed
/// by the 8-byte-aligned offset of the pointer slot that holds them.
#[derive(Debug, Clone)]
pub struct Allocation {
    bytes: Vec<u8>,
    init_mask: Vec<bool>,
    relocations: FxHashMap<u64, RelocPtr>,
}

impl std::fmt::Debug for RelocTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelocTarget::Allocation(a) => write!(f, "Allocation({:?})", a.borrow()),
            RelocTarget::Constant(b) => write!(f, "Constant({} bytes)", b.len()),
            RelocTarget::StaticRef(p) => write!(f, "StaticRef({p})"),
        }
    }
}

impl Allocation {
    pub fn new(size: u64) -> Allocation {
        Allocation { bytes: vec![0; size as usize], init_mask: vec![false; size as usize], relocations: FxHashMap::default() }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Raw bytes for serialising this allocation to storage. Any
    /// remaining uninitialised padding reads back as zero rather than
    /// erroring — padding bytes are never meaningfully read back by a
    /// well-typed program, only carried along for a byte-identical copy.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Every relocation whose 8-byte slot lies fully within `[0, len)`.
    pub fn relocations_in_range(&self, len: u64) -> Vec<(u64, RelocPtr)> {
        let mut out: Vec<_> =
            self.relocations.iter().filter(|(&k, _)| k + 8 <= len).map(|(&k, v)| (k, v.clone())).collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }

    fn check_bounds(&self, offset: u64, len: u64) -> Result<(), EvalError> {
        if offset.saturating_add(len) > self.len() {
            return Err(EvalError::OutOfBounds { offset, size: self.len() });
        }
        Ok(())
    }

    fn require_init(&self, offset: u64, len: u64) -> Result<(), EvalError> {
        self.check_bounds(offset, len)?;
        let range = offset as usize..(offset + len) as usize;
        if self.init_mask[range].iter().all(|b| *b) {
            Ok(())
        } else {
            Err(EvalError::UninitRead(offset))
        }
    }

    fn set_init(&mut self, offset: u64, len: u64) {
        let range = offset as usize..(offset + len) as usize;
        self.init_mask[range].fill(true);
    }

    fn clear_relocations_overlapping(&mut self, offset: u64, len: u64) {
        let start = offset;
        let end = offset + len;
        self.relocations.retain(|&key, _| key + 8 <= start || key >= end);
    }

    pub fn read_uint(&self, offset: u64, bits: u32) -> Result<u128, EvalError> {
        let n = byte_count(bits);
        self.require_init(offset, n)?;
        let mut buf = [0u8; 16];
        buf[..n as usize].copy_from_slice(&self.bytes[offset as usize..(offset + n) as usize]);
        Ok(u128::from_le_bytes(buf))
    }

    pub fn read_sint(&self, offset: u64, bits: u32) -> Result<i128, EvalError> {
        let raw = self.read_uint(offset, bits)? as i128;
        let shift = 128 - bits as u32;
        Ok((raw << shift) >> shift)
    }

    pub fn read_float(&self, offset: u64, bits: u32) -> Result<f64, EvalError> {
        let raw = self.read_uint(offset, bits)?;
        Ok(match bits {
            32 => f32::from_bits(raw as u32) as f64,
            _ => f64::from_bits(raw as u64),
        })
    }

    pub fn read_usize(&self, offset: u64) -> Result<u64, EvalError> {
        Ok(self.read_uint(offset, 64)? as u64)
    }

    pub fn read_ptr(&self, offset: u64) -> Result<(u64, Option<RelocPtr>), EvalError> {
        let addr = self.read_usize(offset)?;
        Ok((addr, self.relocations.get(&align_down(offset)).cloned()))
    }

    pub fn write_uint(&mut self, offset: u64, bits: u32, value: u128) -> Result<(), EvalError> {
        let n = byte_count(bits);
        self.check_bounds(offset, n)?;
        let bytes = value.to_le_bytes();
        self.bytes[offset as usize..(offset + n) as usize].copy_from_slice(&bytes[..n as usize]);
        self.set_init(offset, n);
        self.clear_relocations_overlapping(offset, n);
        Ok(())
    }

    pub fn write_sint(&mut self, offset: u64, bits: u32, value: i128) -> Result<(), EvalError> {
        self.write_uint(offset, bits, value as u128)
    }

    pub fn write_float(&mut self, offset: u64, bits: u32, value: f64) -> Result<(), EvalError> {
        let raw: u128 = if bits == 32 { (value as f32).to_bits() as u128 } else { value.to_bits() as u128 };
        self.write_uint(offset, bits, raw)
    }

    pub fn write_ptr(&mut self, offset: u64, addr: u64, target: Option<RelocPtr>) -> Result<(), EvalError> {
        self.write_uint(offset, 64, addr as u128)?;
        let slot = align_down(offset);
        match target {
            Some(t) => {
                self.relocations.insert(slot, t);
            }
            None => {
                self.relocations.remove(&slot);
            }
        }
        Ok(())
    }

    /// Byte-for-byte copy of `len` bytes from `src` at `src_offset` into
    /// `self` at `dst_offset`: bytes, init bits, and any relocations
    /// whose slot falls fully inside the copied range all move together.
    /// Overlap within the *same* allocation is the caller's
    /// responsibility to reject (see `ValueRef::copy_from`).
    pub fn copy_from(&mut self, dst_offset: u64, src: &Allocation, src_offset: u64, len: u64) -> Result<(), EvalError> {
        self.check_bounds(dst_offset, len)?;
        src.check_bounds(src_offset, len)?;
        let src_range = src_offset as usize..(src_offset + len) as usize;
        let dst_range = dst_offset as usize..(dst_offset + len) as usize;
        self.bytes[dst_range.clone()].copy_from_slice(&src.bytes[src_range.clone()]);
        self.init_mask[dst_range].copy_from_slice(&src.init_mask[src_range]);
        self.clear_relocations_overlapping(dst_offset, len);
        for (&key, reloc) in &src.relocations {
            if key >= src_offset && key + 8 <= src_offset + len {
                self.relocations.insert(key - src_offset + dst_offset, reloc.clone());
            }
        }
        Ok(())
    }
}

fn byte_count(bits: u32) -> u64 {
    ((bits as u64) + 7) / 8
}

/// A resolved place: the storage it lives in, plus the byte offset into
/// that storage. Writes go through `RefCell::borrow_mut`, so every
/// `ValueRef` aliasing the same storage observes the write immediately —
/// this is exactly what makes writing through a borrowed pointer visible
/// to the place it was borrowed from.
#[derive(Clone)]
pub struct ValueRef {
    pub storage: RelocPtr,
    pub offset: u64,
}

impl ValueRef {
    pub fn new(storage: RelocPtr, offset: u64) -> ValueRef {
        ValueRef { storage, offset }
    }

    fn with_alloc<T>(&self, f: impl FnOnce(&Allocation) -> Result<T, EvalError>) -> Result<T, EvalError> {
        match &*self.storage {
            RelocTarget::Allocation(a) => f(&a.borrow()),
            RelocTarget::Constant(bytes) => {
                let tmp = Allocation { bytes: bytes.clone(), init_mask: vec![true; bytes.len()], relocations: FxHashMap::default() };
                f(&tmp)
            }
            RelocTarget::StaticRef(p) => Err(EvalError::UnknownItem(p.clone())),
        }
    }

    fn with_alloc_mut<T>(&self, f: impl FnOnce(&mut Allocation) -> Result<T, EvalError>) -> Result<T, EvalError> {
        match &*self.storage {
            RelocTarget::Allocation(a) => f(&mut a.borrow_mut()),
            RelocTarget::Constant(_) => Err(EvalError::Unsupported("write through a constant-backed reference".into())),
            RelocTarget::StaticRef(p) => Err(EvalError::UnknownItem(p.clone())),
        }
    }

    pub fn read_uint(&self, bits: u32) -> Result<u128, EvalError> {
        self.with_alloc(|a| a.read_uint(self.offset, bits))
    }
    pub fn read_sint(&self, bits: u32) -> Result<i128, EvalError> {
        self.with_alloc(|a| a.read_sint(self.offset, bits))
    }
    pub fn read_float(&self, bits: u32) -> Result<f64, EvalError> {
        self.with_alloc(|a| a.read_float(self.offset, bits))
    }
    pub fn read_usize(&self) -> Result<u64, EvalError> {
        self.with_alloc(|a| a.read_usize(self.offset))
    }
    pub fn read_ptr(&self) -> Result<(u64, Option<RelocPtr>), EvalError> {
        self.with_alloc(|a| a.read_ptr(self.offset))
    }

    pub fn write_uint(&self, bits: u32, value: u128) -> Result<(), EvalError> {
        self.with_alloc_mut(|a| a.write_uint(self.offset, bits, value))
    }
    pub fn write_sint(&self, bits: u32, value: i128) -> Result<(), EvalError> {
        self.with_alloc_mut(|a| a.write_sint(self.offset, bits, value))
    }
    pub fn write_float(&self, bits: u32, value: f64) -> Result<(), EvalError> {
        self.with_alloc_mut(|a| a.write_float(self.offset, bits, value))
    }
    pub fn write_ptr(&self, addr: u64, target: Option<RelocPtr>) -> Result<(), EvalError> {
        self.with_alloc_mut(|a| a.write_ptr(self.offset, addr, target))
    }

    /// Copies `len` bytes from `src` into `self`. Rejects the case where
    /// both refer into the same allocation with overlapping ranges —
    /// the memcpy contract this mirrors (`Allocation::copy_from` in the
    /// original) forbids it outright rather than falling back to a
    /// memmove.
    pub fn copy_from(&self, src: &ValueRef, len: u64) -> Result<(), EvalError> {
        if Rc::ptr_eq(&self.storage, &src.storage) {
            let (a, b) = (self.offset, src.offset);
            let overlap = a < b + len && b < a + len;
            if overlap {
                return Err(EvalError::OverlappingCopy);
            }
        }
        match (&*self.storage, &*src.storage) {
            (RelocTarget::Allocation(dst), RelocTarget::Allocation(s)) => {
                dst.borrow_mut().copy_from(self.offset, &s.borrow(), src.offset, len)
            }
            _ => {
                let bytes = src.with_alloc(|a| {
                    a.require_init(src.offset, len)?;
                    Ok(a_bytes(a, src.offset, len))
                })?;
                self.with_alloc_mut(|a| {
                    for (i, b) in bytes.iter().enumerate() {
                        a.bytes[self.offset as usize + i] = *b;
                    }
                    a.set_init(self.offset, len);
                    Ok(())
                })
            }
        }
    }
}

fn a_bytes(a: &Allocation, offset: u64, len: u64) -> Vec<u8> {
    a.bytes[offset as usize..(offset + len) as usize].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_sets_every_byte_of_the_written_range_as_init() {
        let a = new_allocation(8);
        let v = ValueRef::new(a, 0);
        v.write_uint(32, 0xdead_beef).unwrap();
        assert!(v.read_uint(32).is_ok());
        let v2 = ValueRef::new(v.storage.clone(), 4);
        assert!(v2.read_uint(32).is_err());
    }

    #[test]
    fn copy_from_matches_source_bytes_mask_and_relocations() {
        let src_alloc = new_allocation(16);
        let src_lo = ValueRef::new(src_alloc.clone(), 0);
        src_lo.write_uint(64, 0x1122_3344_5566_7788).unwrap();
        let inner = new_allocation(8);
        let src_hi = ValueRef::new(src_alloc.clone(), 8);
        src_hi.write_ptr(PTR_BASE, Some(inner)).unwrap();

        let dst_alloc = new_allocation(16);
        let dst = ValueRef::new(dst_alloc, 0);
        let src = ValueRef::new(src_alloc, 0);
        dst.copy_from(&src, 16).unwrap();

        assert_eq!(dst.read_uint(64).unwrap(), 0x1122_3344_5566_7788);
        let dst_hi = ValueRef::new(dst.storage.clone(), 8);
        let (addr, reloc) = dst_hi.read_ptr().unwrap();
        assert_eq!(addr, PTR_BASE);
        assert!(reloc.is_some());
    }

    #[test]
    fn overlapping_copy_within_the_same_allocation_is_rejected() {
        let storage = new_allocation(16);
        let v1 = ValueRef::new(storage.clone(), 0);
        let v2 = ValueRef::new(storage, 4);
        v1.write_uint(64, 1).unwrap();
        assert_eq!(v2.copy_from(&v1, 8), Err(EvalError::OverlappingCopy));
    }
}
