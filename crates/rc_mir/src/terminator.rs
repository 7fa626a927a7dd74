//! Terminators: the single control-transferring instruction that closes
//! every basic block.

use crate::function::BlockId;
use crate::operand::Operand;
use crate::place::Place;
use rc_ast::path::AbsolutePath;

/// What a `Call` terminator invokes: a named item (recursed into with a
/// fresh frame) or one of the handful of intrinsics the interpreter
/// knows natively. The subject type travels with the intrinsic name
/// since `size_of`/`min_align_of` need a concrete type to measure and
/// nothing else on this terminator carries one; `None` when the
/// originating call bound to a trait method with no concrete `Self`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Path(AbsolutePath),
    Intrinsic(&'static str, Option<AbsolutePath>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Goto(BlockId),
    Return,
    Call { func: CallTarget, args: Vec<Operand>, ret_val: Place, ret_block: BlockId },
}
