//! Rvalues: the right-hand side of an `Assign` statement.

use crate::operand::Operand;
use crate::place::Place;
use rc_ast::expr::{BinOp, UniOp};
use rc_ast::path::AbsolutePath;
use rc_ast::types::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    Use(Operand),
    /// `&place`. Always produces a pointer-shaped value; `is_mut` only
    /// affects borrow-checking, which is out of scope here.
    Borrow(Place),
    Cast(Operand, TypeRef),
    BinOp(BinOp, Operand, Operand),
    UniOp(UniOp, Operand),
    Tuple(Vec<Operand>),
    Struct(AbsolutePath, Vec<Operand>),
    Array(Vec<Operand>),
    /// `[value; count]`, with `count` already a resolved element count
    /// rather than an unevaluated expression.
    SizedArray(Operand, u64),
    EnumVariant { enum_path: AbsolutePath, variant_idx: u32, fields: Vec<Operand> },
}
