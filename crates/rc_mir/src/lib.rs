//! MIR: the reduced instruction set constant evaluation interprets.
//! A subset of what a full `rustc_middle::mir` body carries — enough
//! `Statement`/`Rvalue`/`Terminator`/`Place` shape to represent
//! const-item bodies, array lengths, and derive-generated method bodies,
//! nothing about drop elaboration, unwind edges, or borrow-check
//! metadata.

pub mod build;
pub mod function;
pub mod operand;
pub mod place;
pub mod rvalue;
pub mod statement;
pub mod terminator;

pub use build::{lower_expr, lower_function, BuildError};
pub use function::{BasicBlock, BlockId, Function};
pub use operand::{Constant, Operand};
pub use place::{LocalId, Place, PlaceElem, PlaceRoot};
pub use rvalue::Rvalue;
pub use statement::Statement;
pub use terminator::{CallTarget, Terminator};
