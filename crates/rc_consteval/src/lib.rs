//! Constant evaluator: a miri-style abstract-machine interpreter over
//! `rc_mir` bodies. Owns the memory model (`alloc`), the interpreter
//! loop (`interp`), the substitution environment threaded through a
//! call (`monomorph`), and the flat encoding a const/static item's value
//! is persisted as (`encoded`).

pub mod alloc;
pub mod encoded;
pub mod error;
pub mod interp;
pub mod monomorph;

pub use alloc::{new_allocation, Allocation, RelocPtr, RelocTarget, ValueRef, PTR_BASE};
pub use encoded::{allocation_to_encoded, EncodedLiteral, Newval, Reloc};
pub use error::EvalError;
pub use interp::ConstEvalCtx;
pub use monomorph::MonomorphState;
