//! The abstract-machine interpreter: runs a `rc_mir::Function`'s blocks
//! to completion over the `Allocation`/`ValueRef` memory model, handling
//! every statement and terminator shape `rc_mir` defines.

use rc_ast::expr::{BinOp, Expr, ExprKind, UniOp};
use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::path::{AbsolutePath, Path, PathBinding};
use rc_ast::types::{Primitive, TypeRef};
use rc_hir::layout::{Target, TypeReprCache};
use rc_mir::{
    BasicBlock, BlockId, CallTarget, Function, LocalId, Operand, Place, PlaceElem, PlaceRoot,
    Rvalue, Statement, Terminator,
};
use rc_span::{Span, U128};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

use crate::alloc::{new_allocation, RelocPtr, RelocTarget, ValueRef, PTR_BASE};
use crate::encoded::{allocation_to_encoded, EncodedLiteral};
use crate::error::EvalError;
use crate::monomorph::MonomorphState;

fn bit_width(p: Primitive) -> u32 {
    match p {
        Primitive::Bool | Primitive::U8 | Primitive::I8 => 8,
        Primitive::U16 | Primitive::I16 => 16,
        Primitive::Char | Primitive::U32 | Primitive::I32 | Primitive::F32 => 32,
        Primitive::U64 | Primitive::I64 | Primitive::F64 => 64,
        Primitive::U128 | Primitive::I128 => 128,
        Primitive::Usize | Primitive::Isize => 64,
        Primitive::Str => 0,
    }
}

fn is_signed(p: Primitive) -> bool {
    matches!(p, Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::I128 | Primitive::Isize)
}

fn is_float(p: Primitive) -> bool {
    matches!(p, Primitive::F32 | Primitive::F64)
}

fn round_up(offset: u64, align: u64) -> u64 {
    if align == 0 { offset } else { (offset + align - 1) / align * align }
}

/// Sign-extends the low `bits` of `v` to a full 128-bit signed value —
/// the same shift-left-then-arithmetic-shift-right trick `Allocation::read_sint`
/// uses, lifted to operate on an already-read `U128`.
fn sign_extend(v: U128, bits: u32) -> i128 {
    let shift = 128 - bits;
    ((v.0 as i128) << shift) >> shift
}

/// A constant path (to a struct/enum/union) turned back into a `TypeRef`
/// so it can be fed to `Target::size_of`/`type_repr`, which only accept
/// the type-syntax form.
fn abs_as_type(abs: &AbsolutePath) -> TypeRef {
    let mut p = Path::local(abs.components.last().cloned().unwrap_or_default());
    p.bind(&Span::dummy(), PathBinding::Struct(abs.clone()));
    TypeRef::Path(Box::new(p))
}

#[derive(Debug, Clone, Copy)]
enum Scalar {
    Int(U128, Primitive),
    Float(f64, Primitive),
    Bool(bool),
}

fn read_scalar(vref: &ValueRef, ty: &TypeRef) -> Result<Scalar, EvalError> {
    match ty {
        TypeRef::Primitive(Primitive::Bool) => Ok(Scalar::Bool(vref.read_uint(8)? != 0)),
        TypeRef::Primitive(p) if is_float(*p) => Ok(Scalar::Float(vref.read_float(bit_width(*p))?, *p)),
        TypeRef::Primitive(p) => Ok(Scalar::Int(U128(vref.read_uint(bit_width(*p))?), *p)),
        other => Err(EvalError::Unsupported(format!("not a scalar type: {other:?}"))),
    }
}

fn write_scalar(vref: &ValueRef, scalar: Scalar) -> Result<(), EvalError> {
    match scalar {
        Scalar::Bool(b) => vref.write_uint(8, b as u128),
        Scalar::Int(v, p) => vref.write_uint(bit_width(p), v.mask(bit_width(p)).0),
        Scalar::Float(f, p) => vref.write_float(bit_width(p), f),
    }
}

fn cast_scalar(src: Scalar, target: Primitive) -> Scalar {
    match src {
        Scalar::Int(v, src_p) => {
            if is_float(target) {
                let bits = bit_width(src_p);
                let f = if is_signed(src_p) { sign_extend(v, bits) as f64 } else { v.0 as f64 };
                Scalar::Float(if target == Primitive::F32 { (f as f32) as f64 } else { f }, target)
            } else {
                Scalar::Int(v.mask(bit_width(target)), target)
            }
        }
        Scalar::Float(f, _) => {
            if is_float(target) {
                Scalar::Float(if target == Primitive::F32 { (f as f32) as f64 } else { f }, target)
            } else {
                Scalar::Int(U128((f as i128) as u128).mask(bit_width(target)), target)
            }
        }
        Scalar::Bool(b) => {
            if is_float(target) {
                Scalar::Float(if b { 1.0 } else { 0.0 }, target)
            } else {
                Scalar::Int(U128(b as u128), target)
            }
        }
    }
}

fn eval_int_binop(op: BinOp, a: U128, b: U128, p: Primitive) -> Result<Scalar, EvalError> {
    let bits = bit_width(p);
    let signed = is_signed(p);
    use std::cmp::Ordering;
    match op {
        BinOp::Add => Ok(Scalar::Int((a + b).mask(bits), p)),
        BinOp::Sub => Ok(Scalar::Int((a - b).mask(bits), p)),
        BinOp::Mul => Ok(Scalar::Int((a * b).mask(bits), p)),
        BinOp::Div => {
            if signed {
                let sa = sign_extend(a, bits);
                let sb = sign_extend(b, bits);
                if sb == 0 {
                    return Err(EvalError::Unsupported("division by zero".into()));
                }
                Ok(Scalar::Int(U128((sa.wrapping_div(sb)) as u128).mask(bits), p))
            } else {
                let r = a.mask(bits).checked_div(b.mask(bits))
                    .map_err(|_| EvalError::Unsupported("division by zero".into()))?;
                Ok(Scalar::Int(r.mask(bits), p))
            }
        }
        BinOp::Rem => {
            if signed {
                let sa = sign_extend(a, bits);
                let sb = sign_extend(b, bits);
                if sb == 0 {
                    return Err(EvalError::Unsupported("division by zero".into()));
                }
                Ok(Scalar::Int(U128((sa.wrapping_rem(sb)) as u128).mask(bits), p))
            } else {
                let r = a.mask(bits).checked_rem(b.mask(bits))
                    .map_err(|_| EvalError::Unsupported("division by zero".into()))?;
                Ok(Scalar::Int(r.mask(bits), p))
            }
        }
        BinOp::And => Ok(Scalar::Int((a & b).mask(bits), p)),
        BinOp::Or => Ok(Scalar::Int((a | b).mask(bits), p)),
        BinOp::Xor => Ok(Scalar::Int((a ^ b).mask(bits), p)),
        // Shift amounts wrap modulo the *operand's own* bit width, not
        // modulo 128 — `1u8 << 9` shifts by 1, not by 9.
        BinOp::Shl => {
            let amt = (b.lo() as u32) % bits;
            Ok(Scalar::Int(a.shl_masked(amt).mask(bits), p))
        }
        BinOp::Shr => {
            let amt = (b.lo() as u32) % bits;
            if signed {
                let sa = sign_extend(a, bits);
                let shifted = sa.wrapping_shr(amt);
                Ok(Scalar::Int(U128(shifted as u128).mask(bits), p))
            } else {
                Ok(Scalar::Int(a.mask(bits).shr_masked(amt).mask(bits), p))
            }
        }
        BinOp::Eq => Ok(Scalar::Bool(a.mask(bits) == b.mask(bits))),
        BinOp::Ne => Ok(Scalar::Bool(a.mask(bits) != b.mask(bits))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = if signed {
                sign_extend(a, bits).cmp(&sign_extend(b, bits))
            } else {
                a.mask(bits).0.cmp(&b.mask(bits).0)
            };
            Ok(Scalar::Bool(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                BinOp::Ge => ord != Ordering::Less,
                _ => unreachable!(),
            }))
        }
    }
}

fn eval_float_binop(op: BinOp, a: f64, b: f64, p: Primitive) -> Result<Scalar, EvalError> {
    match op {
        BinOp::Add => Ok(Scalar::Float(a + b, p)),
        BinOp::Sub => Ok(Scalar::Float(a - b, p)),
        BinOp::Mul => Ok(Scalar::Float(a * b, p)),
        BinOp::Div => Ok(Scalar::Float(a / b, p)),
        BinOp::Rem => Ok(Scalar::Float(a % b, p)),
        BinOp::Eq => Ok(Scalar::Bool(a == b)),
        BinOp::Ne => Ok(Scalar::Bool(a != b)),
        BinOp::Lt => Ok(Scalar::Bool(a < b)),
        BinOp::Le => Ok(Scalar::Bool(a <= b)),
        BinOp::Gt => Ok(Scalar::Bool(a > b)),
        BinOp::Ge => Ok(Scalar::Bool(a >= b)),
        other => Err(EvalError::Unsupported(format!("{other:?} on floats"))),
    }
}

fn eval_bool_binop(op: BinOp, a: bool, b: bool) -> Result<Scalar, EvalError> {
    match op {
        BinOp::And => Ok(Scalar::Bool(a & b)),
        BinOp::Or => Ok(Scalar::Bool(a | b)),
        BinOp::Xor | BinOp::Ne => Ok(Scalar::Bool(a ^ b)),
        BinOp::Eq => Ok(Scalar::Bool(a == b)),
        other => Err(EvalError::Unsupported(format!("{other:?} on bools"))),
    }
}

fn eval_binop(op: BinOp, l: Scalar, r: Scalar) -> Result<Scalar, EvalError> {
    match (l, r) {
        (Scalar::Int(a, p), Scalar::Int(b, _)) => eval_int_binop(op, a, b, p),
        (Scalar::Float(a, p), Scalar::Float(b, _)) => eval_float_binop(op, a, b, p),
        (Scalar::Bool(a), Scalar::Bool(b)) => eval_bool_binop(op, a, b),
        (l, r) => Err(EvalError::Unsupported(format!("binop on mismatched scalar kinds {l:?} {r:?}"))),
    }
}

impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(v, p) => write!(f, "Int({v:?}, {p:?})"),
            Scalar::Float(v, p) => write!(f, "Float({v}, {p:?})"),
            Scalar::Bool(b) => write!(f, "Bool({b})"),
        }
    }
}

fn eval_uniop(op: UniOp, v: Scalar) -> Result<Scalar, EvalError> {
    match (op, v) {
        (UniOp::Neg, Scalar::Int(a, p)) => Ok(Scalar::Int((U128::ZERO - a).mask(bit_width(p)), p)),
        (UniOp::Neg, Scalar::Float(a, p)) => Ok(Scalar::Float(-a, p)),
        (UniOp::Inv, Scalar::Int(a, p)) => Ok(Scalar::Int((!a).mask(bit_width(p)), p)),
        (UniOp::Inv, Scalar::Bool(b)) => Ok(Scalar::Bool(!b)),
        (op, v) => Err(EvalError::Unsupported(format!("{op:?} on {v:?}"))),
    }
}

/// Per-call-frame storage: the return slot, every local, and every
/// argument, each its own `Allocation` so borrows taken inside the frame
/// address distinct, non-aliasing storage.
struct Frame {
    retval: ValueRef,
    locals: Vec<ValueRef>,
    args: Vec<ValueRef>,
}

/// The interpreter: owns the crate being evaluated (mutably, so a
/// hoisted constant can append a new static) plus the layout cache,
/// the const-item result cache, and in-progress cycle detection.
pub struct ConstEvalCtx<'a> {
    crate_: &'a mut Crate,
    target: Target,
    reprs: TypeReprCache,
    active: FxHashSet<AbsolutePath>,
    const_cache: FxHashMap<AbsolutePath, (RelocPtr, TypeRef)>,
    const_counter: u32,
}

impl<'a> ConstEvalCtx<'a> {
    pub fn new(crate_: &'a mut Crate) -> ConstEvalCtx<'a> {
        ConstEvalCtx {
            crate_,
            target: Target::default(),
            reprs: TypeReprCache::default(),
            active: FxHashSet::default(),
            const_cache: FxHashMap::default(),
            const_counter: 0,
        }
    }

    /// Evaluates a top-level const/static item, caching the result
    /// keyed by path so a value referenced from several places is only
    /// computed once.
    pub fn eval_item(&mut self, path: &AbsolutePath) -> Result<(RelocPtr, TypeRef), EvalError> {
        self.eval_const_item(path, &MonomorphState::empty())
    }

    /// Evaluates a standalone expression with no enclosing item (an
    /// array length, or any other bare const context) and flattens the
    /// result into storable bytes plus relocations.
    pub fn eval_expr_to_encoded(&mut self, ret_type: TypeRef, body: &Expr) -> Result<EncodedLiteral, EvalError> {
        let func = rc_mir::lower_expr(self.crate_, ret_type.clone(), body)?;
        let ptr = self.eval_function(&func, vec![], &MonomorphState::empty())?;
        let repr = self.reprs.get_or_compute(&self.target, self.crate_, &ret_type)?;
        let mut counter = self.const_counter;
        let result = allocation_to_encoded(self.crate_, &mut counter, &ptr, repr.size);
        self.const_counter = counter;
        result
    }

    /// Evaluates a top-level item and flattens its value for storage,
    /// hoisting any writable relocation it carries.
    pub fn encode_item(&mut self, path: &AbsolutePath) -> Result<EncodedLiteral, EvalError> {
        let (ptr, ty) = self.eval_item(path)?;
        let repr = self.reprs.get_or_compute(&self.target, self.crate_, &ty)?;
        let mut counter = self.const_counter;
        let result = allocation_to_encoded(self.crate_, &mut counter, &ptr, repr.size);
        self.const_counter = counter;
        result
    }

    fn eval_const_item(&mut self, path: &AbsolutePath, mono: &MonomorphState) -> Result<(RelocPtr, TypeRef), EvalError> {
        if let Some(cached) = self.const_cache.get(path) {
            return Ok(cached.clone());
        }
        if !self.active.insert(path.clone()) {
            return Err(EvalError::Cycle(path.clone()));
        }
        let result = self.eval_const_item_uncached(path, mono);
        self.active.remove(path);
        let (ptr, ty) = result?;
        self.const_cache.insert(path.clone(), (ptr.clone(), ty.clone()));
        Ok((ptr, ty))
    }

    fn eval_const_item_uncached(&mut self, path: &AbsolutePath, mono: &MonomorphState) -> Result<(RelocPtr, TypeRef), EvalError> {
        let iid = self.crate_.lookup_path(path).ok_or_else(|| EvalError::UnknownItem(path.clone()))?;
        let (ty, value) = match &self.crate_.get(iid).kind {
            ItemKind::Const { ty, value } => (ty.clone(), value.clone()),
            ItemKind::Static { ty, value, .. } => (ty.clone(), value.clone()),
            _ => return Err(EvalError::UnknownItem(path.clone())),
        };
        let ty = mono.resolve(&ty);
        // A hoisted static's value is already-encoded bytes, not an
        // expression to re-interpret — just materialise them directly.
        if let ExprKind::Bytes(bytes) = &value.kind {
            let repr = self.reprs.get_or_compute(&self.target, self.crate_, &ty)?;
            let storage = new_allocation(repr.size);
            let dst = ValueRef::new(storage.clone(), 0);
            let src = ValueRef::new(Rc::new(RelocTarget::Constant(bytes.clone())), 0);
            dst.copy_from(&src, repr.size.min(bytes.len() as u64))?;
            return Ok((storage, ty));
        }
        let func = rc_mir::lower_expr(self.crate_, ty.clone(), &value)?;
        let ptr = self.eval_function(&func, vec![], mono)?;
        Ok((ptr, ty))
    }

    fn eval_function(&mut self, func: &Function, args: Vec<RelocPtr>, mono: &MonomorphState) -> Result<RelocPtr, EvalError> {
        let ret_repr = self.reprs.get_or_compute(&self.target, self.crate_, &mono.resolve(&func.ret_type))?;
        let retval = ValueRef::new(new_allocation(ret_repr.size), 0);
        let mut locals = Vec::with_capacity(func.local_types.len());
        for lt in &func.local_types {
            let repr = self.reprs.get_or_compute(&self.target, self.crate_, &mono.resolve(lt))?;
            locals.push(ValueRef::new(new_allocation(repr.size), 0));
        }
        let args = args.into_iter().map(|a| ValueRef::new(a, 0)).collect();
        let frame = Frame { retval, locals, args };

        let mut block_id = 0u32;
        loop {
            let block: &BasicBlock = func.block(BlockId(block_id));
            for stmt in &block.statements {
                self.exec_statement(&frame, func, stmt, mono)?;
            }
            match &block.terminator {
                Terminator::Goto(b) => block_id = b.0,
                Terminator::Return => return Ok(frame.retval.storage.clone()),
                Terminator::Call { func: target, args, ret_val, ret_block } => {
                    let result = self.eval_call(&frame, func, target, args, mono)?;
                    let (dest, dest_ty) = self.get_lval(&frame, func, ret_val, mono)?;
                    let repr = self.reprs.get_or_compute(&self.target, self.crate_, &dest_ty)?;
                    dest.copy_from(&ValueRef::new(result, 0), repr.size)?;
                    block_id = ret_block.0;
                }
            }
        }
    }

    fn eval_call(
        &mut self,
        frame: &Frame,
        func: &Function,
        target: &CallTarget,
        args: &[Operand],
        mono: &MonomorphState,
    ) -> Result<RelocPtr, EvalError> {
        match target {
            CallTarget::Path(abs) => {
                let iid = self.crate_.lookup_path(abs).ok_or_else(|| EvalError::UnknownItem(abs.clone()))?;
                let fdef = match &self.crate_.get(iid).kind {
                    ItemKind::Function(f) => f.clone(),
                    _ => return Err(EvalError::UnknownItem(abs.clone())),
                };
                let body = fdef
                    .body
                    .as_ref()
                    .ok_or_else(|| EvalError::Unsupported(format!("{abs} has no body to const-evaluate")))?;
                let arg_names: Vec<String> = fdef.args.iter().map(|(n, _)| n.clone()).collect();
                let arg_types: Vec<TypeRef> = fdef.args.iter().map(|(_, t)| mono.resolve(t)).collect();
                let ret_type = mono.resolve(&fdef.ret);
                let callee = rc_mir::lower_function(self.crate_, &arg_names, arg_types.clone(), ret_type, body)?;
                let mut arg_ptrs = Vec::with_capacity(args.len());
                for (a, aty) in args.iter().zip(arg_types.iter()) {
                    let repr = self.reprs.get_or_compute(&self.target, self.crate_, aty)?;
                    let storage = new_allocation(repr.size);
                    self.write_operand(frame, func, &ValueRef::new(storage.clone(), 0), aty, a, mono)?;
                    arg_ptrs.push(storage);
                }
                self.eval_function(&callee, arg_ptrs, &MonomorphState::empty())
            }
            CallTarget::Intrinsic(name, ty) => self.eval_intrinsic(frame, func, name, ty.as_ref(), args, mono),
        }
    }

    fn eval_intrinsic(
        &mut self,
        frame: &Frame,
        func: &Function,
        name: &str,
        ty: Option<&AbsolutePath>,
        args: &[Operand],
        mono: &MonomorphState,
    ) -> Result<RelocPtr, EvalError> {
        match name {
            "size_of" | "min_align_of" => {
                let abs = ty.ok_or_else(|| EvalError::Unsupported(format!("{name} needs a concrete subject type")))?;
                let subject = abs_as_type(abs);
                let value = if name == "size_of" {
                    self.target.size_of(self.crate_, &subject)?
                } else {
                    self.target.align_of(self.crate_, &subject)?
                };
                let storage = new_allocation(8);
                ValueRef::new(storage.clone(), 0).write_uint(64, value as u128)?;
                Ok(storage)
            }
            "bswap" => {
                let v = self.eval_scalar_operand(frame, func, &args[0], mono)?;
                match v {
                    Scalar::Int(val, p) => {
                        let bits = bit_width(p);
                        let swapped = match bits {
                            16 => (val.0 as u16).swap_bytes() as u128,
                            32 => (val.0 as u32).swap_bytes() as u128,
                            64 => (val.0 as u64).swap_bytes() as u128,
                            128 => val.0.swap_bytes(),
                            _ => val.0,
                        };
                        let storage = new_allocation((bits / 8) as u64);
                        write_scalar(&ValueRef::new(storage.clone(), 0), Scalar::Int(U128(swapped), p))?;
                        Ok(storage)
                    }
                    other => Err(EvalError::Unsupported(format!("bswap on {other:?}"))),
                }
            }
            "transmute" => {
                let place = match &args[0] {
                    Operand::Copy(place) => place,
                    Operand::Constant(_) => return Err(EvalError::Unsupported("transmute of a non-place operand".into())),
                };
                let (src, src_ty) = self.get_lval(frame, func, place, mono)?;
                let repr = self.reprs.get_or_compute(&self.target, self.crate_, &src_ty)?;
                let storage = new_allocation(repr.size);
                ValueRef::new(storage.clone(), 0).copy_from(&src, repr.size)?;
                Ok(storage)
            }
            other => Err(EvalError::Unsupported(format!("unknown intrinsic `{other}`"))),
        }
    }

    fn exec_statement(&mut self, frame: &Frame, func: &Function, stmt: &Statement, mono: &MonomorphState) -> Result<(), EvalError> {
        match stmt {
            Statement::Drop(_) => Ok(()),
            Statement::Assign(place, rvalue) => {
                let (dest, dest_ty) = self.get_lval(frame, func, place, mono)?;
                self.eval_rvalue_into(frame, func, &dest, &dest_ty, rvalue, mono)
            }
        }
    }

    fn eval_rvalue_into(
        &mut self,
        frame: &Frame,
        func: &Function,
        dest: &ValueRef,
        dest_ty: &TypeRef,
        rvalue: &Rvalue,
        mono: &MonomorphState,
    ) -> Result<(), EvalError> {
        match rvalue {
            Rvalue::Use(op) => self.write_operand(frame, func, dest, dest_ty, op, mono),
            Rvalue::Borrow(place) => {
                let (src, _) = self.get_lval(frame, func, place, mono)?;
                dest.write_ptr(PTR_BASE + src.offset, Some(src.storage))
            }
            Rvalue::Cast(op, target_ty) => self.eval_cast(frame, func, dest, op, &mono.resolve(target_ty), mono),
            Rvalue::BinOp(op, l, r) => {
                let lv = self.eval_scalar_operand(frame, func, l, mono)?;
                let rv = self.eval_scalar_operand(frame, func, r, mono)?;
                write_scalar(dest, eval_binop(*op, lv, rv)?)
            }
            Rvalue::UniOp(op, v) => {
                let vv = self.eval_scalar_operand(frame, func, v, mono)?;
                write_scalar(dest, eval_uniop(*op, vv)?)
            }
            Rvalue::Tuple(ops) => {
                let elems = match dest_ty {
                    TypeRef::Tuple(e) => e.clone(),
                    other => return Err(EvalError::Unsupported(format!("tuple literal into {other:?}"))),
                };
                let repr = self.reprs.get_or_compute(&self.target, self.crate_, dest_ty)?;
                for (i, op) in ops.iter().enumerate() {
                    let field_ty = mono.resolve(&elems[i]);
                    let field = ValueRef::new(dest.storage.clone(), dest.offset + repr.fields[i].offset);
                    self.write_operand(frame, func, &field, &field_ty, op, mono)?;
                }
                Ok(())
            }
            Rvalue::Struct(abs, ops) => self.write_struct_fields(frame, func, dest, abs, ops, mono),
            Rvalue::Array(ops) => {
                let inner = match dest_ty {
                    TypeRef::Array { inner, .. } => (**inner).clone(),
                    other => return Err(EvalError::Unsupported(format!("array literal into {other:?}"))),
                };
                let elem_repr = self.reprs.get_or_compute(&self.target, self.crate_, &inner)?;
                for (i, op) in ops.iter().enumerate() {
                    let field = ValueRef::new(dest.storage.clone(), dest.offset + (i as u64) * elem_repr.size);
                    self.write_operand(frame, func, &field, &inner, op, mono)?;
                }
                Ok(())
            }
            Rvalue::SizedArray(op, n) => {
                let inner = match dest_ty {
                    TypeRef::Array { inner, .. } => (**inner).clone(),
                    other => return Err(EvalError::Unsupported(format!("array-repeat literal into {other:?}"))),
                };
                let elem_repr = self.reprs.get_or_compute(&self.target, self.crate_, &inner)?;
                for i in 0..*n {
                    let field = ValueRef::new(dest.storage.clone(), dest.offset + i * elem_repr.size);
                    self.write_operand(frame, func, &field, &inner, op, mono)?;
                }
                Ok(())
            }
            Rvalue::EnumVariant { enum_path, variant_idx, fields } => {
                dest.write_uint(64, *variant_idx as u128)?;
                let (payload_offset, payload_ty) = self.enum_variant_payload(enum_path, *variant_idx)?;
                let field_tys = match &payload_ty {
                    TypeRef::Tuple(t) => t.clone(),
                    _ => unreachable!(),
                };
                let repr = self.reprs.get_or_compute(&self.target, self.crate_, &payload_ty)?;
                for (i, op) in fields.iter().enumerate() {
                    let field_ty = mono.resolve(&field_tys[i]);
                    let field = ValueRef::new(dest.storage.clone(), dest.offset + payload_offset + repr.fields[i].offset);
                    self.write_operand(frame, func, &field, &field_ty, op, mono)?;
                }
                Ok(())
            }
        }
    }

    fn write_struct_fields(
        &mut self,
        frame: &Frame,
        func: &Function,
        dest: &ValueRef,
        abs: &AbsolutePath,
        ops: &[Operand],
        mono: &MonomorphState,
    ) -> Result<(), EvalError> {
        let iid = self.crate_.lookup_path(abs).ok_or_else(|| EvalError::UnknownItem(abs.clone()))?;
        let fields = match &self.crate_.get(iid).kind {
            ItemKind::Struct(s) => s.fields.clone(),
            _ => return Err(EvalError::Unsupported(format!("{abs} is not a struct"))),
        };
        let tuple_ty = TypeRef::Tuple(fields.iter().map(|(_, t)| t.clone()).collect());
        let repr = self.reprs.get_or_compute(&self.target, self.crate_, &tuple_ty)?;
        for (i, op) in ops.iter().enumerate() {
            let field_ty = mono.resolve(&fields[i].1);
            let field = ValueRef::new(dest.storage.clone(), dest.offset + repr.fields[i].offset);
            self.write_operand(frame, func, &field, &field_ty, op, mono)?;
        }
        Ok(())
    }

    fn eval_cast(
        &mut self,
        frame: &Frame,
        func: &Function,
        dest: &ValueRef,
        op: &Operand,
        target_ty: &TypeRef,
        mono: &MonomorphState,
    ) -> Result<(), EvalError> {
        match target_ty {
            TypeRef::Borrow { .. } | TypeRef::Pointer { .. } => match op {
                Operand::Copy(place) => {
                    let (src, _) = self.get_lval(frame, func, place, mono)?;
                    dest.copy_from(&src, 8)
                }
                Operand::Constant(_) => Err(EvalError::Unsupported("cast of a non-place operand to a pointer type".into())),
            },
            TypeRef::Primitive(p) => {
                let src = self.eval_scalar_operand(frame, func, op, mono)?;
                write_scalar(dest, cast_scalar(src, *p))
            }
            other => Err(EvalError::Unsupported(format!("cast to {other:?}"))),
        }
    }

    fn write_operand(
        &mut self,
        frame: &Frame,
        func: &Function,
        dest: &ValueRef,
        dest_ty: &TypeRef,
        op: &Operand,
        mono: &MonomorphState,
    ) -> Result<(), EvalError> {
        match op {
            Operand::Copy(place) => {
                let (src, src_ty) = self.get_lval(frame, func, place, mono)?;
                self.copy_typed(dest, dest_ty, &src, &src_ty)
            }
            Operand::Constant(c) => self.write_constant(dest, dest_ty, c, mono),
        }
    }

    fn copy_typed(&mut self, dest: &ValueRef, dest_ty: &TypeRef, src: &ValueRef, _src_ty: &TypeRef) -> Result<(), EvalError> {
        let repr = self.reprs.get_or_compute(&self.target, self.crate_, dest_ty)?;
        dest.copy_from(src, repr.size)
    }

    fn write_constant(
        &mut self,
        dest: &ValueRef,
        dest_ty: &TypeRef,
        c: &rc_mir::Constant,
        mono: &MonomorphState,
    ) -> Result<(), EvalError> {
        use rc_mir::Constant;
        match c {
            Constant::Int(v, p) => write_scalar(dest, Scalar::Int(*v, *p)),
            Constant::Bool(b) => write_scalar(dest, Scalar::Bool(*b)),
            Constant::Float(bits, p) => {
                let f = if *p == Primitive::F32 { f32::from_bits(*bits as u32) as f64 } else { f64::from_bits(*bits) };
                write_scalar(dest, Scalar::Float(f, *p))
            }
            Constant::StaticString(s) => {
                // Only the pointer half of a `&str`'s fat-pointer
                // representation is modelled; no in-scope body reads a
                // string's length back out.
                let bytes_ptr: RelocPtr = Rc::new(RelocTarget::Constant(s.as_bytes().to_vec()));
                dest.write_ptr(PTR_BASE, Some(bytes_ptr))
            }
            Constant::Bytes(b) => {
                let src_ptr: RelocPtr = Rc::new(RelocTarget::Constant(b.clone()));
                let src = ValueRef::new(src_ptr, 0);
                let repr = self.reprs.get_or_compute(&self.target, self.crate_, dest_ty)?;
                dest.copy_from(&src, repr.size.min(b.len() as u64))
            }
            Constant::Const(abs) => {
                let (ptr, ty) = self.eval_const_item(abs, mono)?;
                self.copy_typed(dest, dest_ty, &ValueRef::new(ptr, 0), &ty)
            }
        }
    }

    fn eval_scalar_operand(&mut self, frame: &Frame, func: &Function, op: &Operand, mono: &MonomorphState) -> Result<Scalar, EvalError> {
        use rc_mir::Constant;
        match op {
            Operand::Copy(place) => {
                let (vref, ty) = self.get_lval(frame, func, place, mono)?;
                read_scalar(&vref, &ty)
            }
            Operand::Constant(Constant::Int(v, p)) => Ok(Scalar::Int(*v, *p)),
            Operand::Constant(Constant::Bool(b)) => Ok(Scalar::Bool(*b)),
            Operand::Constant(Constant::Float(bits, p)) => {
                let f = if *p == Primitive::F32 { f32::from_bits(*bits as u32) as f64 } else { f64::from_bits(*bits) };
                Ok(Scalar::Float(f, *p))
            }
            Operand::Constant(Constant::Const(abs)) => {
                let (ptr, ty) = self.eval_const_item(abs, mono)?;
                read_scalar(&ValueRef::new(ptr, 0), &ty)
            }
            Operand::Constant(Constant::StaticString(_)) | Operand::Constant(Constant::Bytes(_)) => {
                Err(EvalError::Unsupported("non-scalar constant used where a scalar was required".into()))
            }
        }
    }

    /// Resolves a `Place` to its storage and current type, walking each
    /// projection and threading the offset/type pair through it.
    fn get_lval(&mut self, frame: &Frame, func: &Function, place: &Place, mono: &MonomorphState) -> Result<(ValueRef, TypeRef), EvalError> {
        let (mut vref, mut ty) = match &place.root {
            PlaceRoot::Return => (frame.retval.clone(), func.ret_type.clone()),
            PlaceRoot::Local(LocalId(idx)) => (frame.locals[*idx as usize].clone(), func.local_types[*idx as usize].clone()),
            PlaceRoot::Argument(idx) => (frame.args[*idx as usize].clone(), func.arg_types[*idx as usize].clone()),
            PlaceRoot::Static(path) => self.eval_const_item(path, mono)?.to_owned_pair(),
        };
        ty = mono.resolve(&ty);
        for elem in &place.projections {
            match elem {
                PlaceElem::Field(idx) => {
                    let (offset, field_ty) = self.field_offset_and_type(&ty, *idx)?;
                    vref = ValueRef::new(vref.storage.clone(), vref.offset + offset);
                    ty = field_ty;
                }
                PlaceElem::Deref => {
                    let (addr, reloc) = vref.read_ptr()?;
                    let target = reloc.ok_or(EvalError::NullDeref)?;
                    let offset = addr.checked_sub(PTR_BASE).ok_or(EvalError::NullDeref)?;
                    let inner = match &ty {
                        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } => (**inner).clone(),
                        other => return Err(EvalError::Unsupported(format!("deref of non-pointer type {other:?}"))),
                    };
                    vref = ValueRef::new(target, offset);
                    ty = inner;
                }
                PlaceElem::Index(op) => {
                    let idx_scalar = self.eval_scalar_operand(frame, func, op, mono)?;
                    let idx = match idx_scalar {
                        Scalar::Int(v, _) => v.lo(),
                        other => return Err(EvalError::Unsupported(format!("index operand {other:?} is not an integer"))),
                    };
                    let elem_ty = match &ty {
                        TypeRef::Array { inner, .. } | TypeRef::Slice(inner) => (**inner).clone(),
                        other => return Err(EvalError::Unsupported(format!("index into non-array type {other:?}"))),
                    };
                    let elem_repr = self.reprs.get_or_compute(&self.target, self.crate_, &elem_ty)?;
                    vref = ValueRef::new(vref.storage.clone(), vref.offset + idx * elem_repr.size);
                    ty = elem_ty;
                }
                PlaceElem::Downcast(variant_idx) => {
                    let enum_path = match &ty {
                        TypeRef::Path(p) => match &p.binding {
                            PathBinding::Struct(abs) => abs.clone(),
                            other => return Err(EvalError::Unsupported(format!("downcast of non-enum binding {other:?}"))),
                        },
                        other => return Err(EvalError::Unsupported(format!("downcast of non-path type {other:?}"))),
                    };
                    let (payload_offset, payload_ty) = self.enum_variant_payload(&enum_path, *variant_idx)?;
                    vref = ValueRef::new(vref.storage.clone(), vref.offset + payload_offset);
                    ty = payload_ty;
                }
            }
        }
        Ok((vref, ty))
    }

    fn field_offset_and_type(&mut self, ty: &TypeRef, idx: u32) -> Result<(u64, TypeRef), EvalError> {
        match ty {
            TypeRef::Tuple(elems) => {
                let repr = self.reprs.get_or_compute(&self.target, self.crate_, ty)?;
                Ok((repr.fields[idx as usize].offset, elems[idx as usize].clone()))
            }
            TypeRef::Path(p) => {
                let abs = match &p.binding {
                    PathBinding::Struct(abs) => abs.clone(),
                    other => return Err(EvalError::Unsupported(format!("field access on binding {other:?}"))),
                };
                let iid = self.crate_.lookup_path(&abs).ok_or_else(|| EvalError::UnknownItem(abs.clone()))?;
                match &self.crate_.get(iid).kind {
                    ItemKind::Struct(s) => {
                        let repr = self.reprs.get_or_compute(&self.target, self.crate_, ty)?;
                        Ok((repr.fields[idx as usize].offset, s.fields[idx as usize].1.clone()))
                    }
                    ItemKind::Union(u) => Ok((0, u.fields[idx as usize].1.clone())),
                    other => Err(EvalError::Unsupported(format!("field access on {other:?}"))),
                }
            }
            other => Err(EvalError::Unsupported(format!("field access on {other:?}"))),
        }
    }

    /// The byte offset of a variant's payload within its enum, plus that
    /// payload's fields expressed as a synthetic tuple type so
    /// `field_offset_and_type` can resolve further `Field` projections
    /// into it. Mirrors the tag-plus-largest-payload layout
    /// `rc_hir::layout::Target::enum_repr` computes.
    fn enum_variant_payload(&mut self, enum_path: &AbsolutePath, variant_idx: u32) -> Result<(u64, TypeRef), EvalError> {
        let iid = self.crate_.lookup_path(enum_path).ok_or_else(|| EvalError::UnknownItem(enum_path.clone()))?;
        let variants = match &self.crate_.get(iid).kind {
            ItemKind::Enum(e) => e.variants.clone(),
            _ => return Err(EvalError::UnknownItem(enum_path.clone())),
        };
        let mut payload_align = 1u64;
        for v in &variants {
            let tuple_ty = TypeRef::Tuple(v.fields.iter().map(|(_, t)| t.clone()).collect());
            let r = self.reprs.get_or_compute(&self.target, self.crate_, &tuple_ty)?;
            payload_align = payload_align.max(r.align);
        }
        let payload_offset = round_up(8, payload_align);
        let variant_ty = TypeRef::Tuple(variants[variant_idx as usize].fields.iter().map(|(_, t)| t.clone()).collect());
        Ok((payload_offset, variant_ty))
    }
}

trait OwnedPair {
    fn to_owned_pair(self) -> (ValueRef, TypeRef);
}
impl OwnedPair for (RelocPtr, TypeRef) {
    fn to_owned_pair(self) -> (ValueRef, TypeRef) {
        (ValueRef::new(self.0, 0), self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::expr::BinOp as AstBinOp;
    use rc_ast::item::{Item, StructDef, Visibility};

    fn usize_ty() -> TypeRef {
        TypeRef::Primitive(Primitive::Usize)
    }

    #[test]
    fn array_length_two_plus_three_encodes_as_five_usize_little_endian() {
        let mut c = Crate::new("demo");
        let body = Expr::new(
            Span::dummy(),
            ExprKind::BinOp {
                op: AstBinOp::Add,
                lhs: Box::new(Expr::int_lit(Span::dummy(), 2)),
                rhs: Box::new(Expr::int_lit(Span::dummy(), 3)),
            },
        );
        let mut ctx = ConstEvalCtx::new(&mut c);
        let encoded = ctx.eval_expr_to_encoded(usize_ty(), &body).unwrap();
        assert_eq!(encoded.bytes, 5u64.to_le_bytes().to_vec());
        assert!(encoded.relocations.is_empty());
    }

    #[test]
    fn shift_amount_is_masked_by_the_operand_width_not_128() {
        let mut c = Crate::new("demo");
        let body = Expr::new(
            Span::dummy(),
            ExprKind::BinOp {
                op: AstBinOp::Shl,
                lhs: Box::new(Expr::new(
                    Span::dummy(),
                    ExprKind::IntLit { value: U128(1), suffix: Some("u8".into()) },
                )),
                rhs: Box::new(Expr::int_lit(Span::dummy(), 9)),
            },
        );
        let mut ctx = ConstEvalCtx::new(&mut c);
        let encoded = ctx.eval_expr_to_encoded(TypeRef::Primitive(Primitive::U8), &body).unwrap();
        // 9 % 8 == 1, so this is `1u8 << 1 == 2`, not `0`.
        assert_eq!(encoded.bytes, vec![2u8]);
    }

    #[test]
    fn cast_from_int_to_float_encodes_ieee754_bits() {
        let mut c = Crate::new("demo");
        // Built by hand since no surface syntax this builder lowers
        // produces a bare `Cast` rvalue.
        let func = Function {
            arg_types: vec![],
            local_types: vec![TypeRef::Primitive(Primitive::U32)],
            ret_type: TypeRef::Primitive(Primitive::F64),
            blocks: vec![BasicBlock {
                statements: vec![
                    Statement::Assign(
                        Place::root(PlaceRoot::Local(LocalId(0))),
                        Rvalue::Use(Operand::Constant(rc_mir::Constant::Int(U128(2), Primitive::U32))),
                    ),
                    Statement::Assign(
                        Place::root(PlaceRoot::Return),
                        Rvalue::Cast(
                            Operand::Copy(Place::root(PlaceRoot::Local(LocalId(0)))),
                            TypeRef::Primitive(Primitive::F64),
                        ),
                    ),
                ],
                terminator: Terminator::Return,
            }],
        };
        let mut ctx = ConstEvalCtx::new(&mut c);
        let ptr = ctx.eval_function(&func, vec![], &MonomorphState::empty()).unwrap();
        let bits = ValueRef::new(ptr, 0).read_uint(64).unwrap() as u64;
        assert_eq!(bits, 2.0f64.to_bits());
    }

    #[test]
    fn struct_literal_then_field_read_round_trips() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        let sid = c.add_item(
            root,
            true,
            Item::new(
                "Point",
                ItemKind::Struct(StructDef {
                    generics: Default::default(),
                    is_tuple: false,
                    fields: vec![
                        ("x".into(), TypeRef::Primitive(Primitive::U32)),
                        ("y".into(), TypeRef::Primitive(Primitive::U32)),
                    ],
                }),
                Span::dummy(),
                Visibility::Public,
            ),
        );
        c.rebuild_indexes();
        let struct_path = c.path_of(sid).unwrap();

        let func = Function {
            arg_types: vec![],
            local_types: vec![TypeRef::Path(Box::new({
                let mut p = rc_ast::path::Path::local("Point");
                p.bind(&Span::dummy(), PathBinding::Struct(struct_path.clone()));
                p
            }))],
            ret_type: TypeRef::Primitive(Primitive::U32),
            blocks: vec![BasicBlock {
                statements: vec![
                    Statement::Assign(
                        Place::root(PlaceRoot::Local(LocalId(0))),
                        Rvalue::Struct(
                            struct_path,
                            vec![
                                Operand::Constant(rc_mir::Constant::Int(U128(10), Primitive::U32)),
                                Operand::Constant(rc_mir::Constant::Int(U128(20), Primitive::U32)),
                            ],
                        ),
                    ),
                    Statement::Assign(
                        Place::root(PlaceRoot::Return),
                        Rvalue::Use(Operand::Copy(Place::root(PlaceRoot::Local(LocalId(0))).field(1))),
                    ),
                ],
                terminator: Terminator::Return,
            }],
        };
        let mut ctx = ConstEvalCtx::new(&mut c);
        let ptr = ctx.eval_function(&func, vec![], &MonomorphState::empty()).unwrap();
        assert_eq!(ValueRef::new(ptr, 0).read_uint(32).unwrap(), 20);
    }
}
