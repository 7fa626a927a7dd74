//! Shared primitives for the front end: interned strings, spans,
//! identifier hygiene, 128-bit integers and the diagnostics sink
//!.

pub mod diagnostic;
pub mod hygiene;
pub mod int128;
pub mod intern;
pub mod span;

pub use diagnostic::{BugCheck, DiagCtxt, ErrorCode};
pub use hygiene::{fresh_context, Hygiene, SyntaxContextId};
pub use int128::{IntOpError, S128, U128};
pub use intern::Symbol;
pub use span::{spanned, SourceLoc, Span, Spanned};

/// Which Rust edition a crate was written against. Carried through the
/// lang-item and macro-expansion tables. Rather than
/// scattering version checks through handler bodies, each handler is
/// registered with the minimum edition it requires and the dispatcher
/// filters by `Edition >= required`. See DESIGN.md for the full writeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Edition {
    Rust2015,
    Rust2018,
    Rust2021,
}

impl Edition {
    pub fn at_least(self, required: Edition) -> bool {
        self >= required
    }
}
