//! The interpreter's error surface: layout failures fold in directly,
//! `Defer` is a first-class recoverable result (never a panic), and an
//! invariant violation goes through `rc_span::bug!` like everywhere else.

use rc_ast::path::AbsolutePath;
use rc_hir::layout::LayoutError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Evaluation can't proceed yet — a substitution still mentions an
    /// unresolved generic parameter. Callers reattempt after
    /// monomorphisation narrows it further.
    #[error("deferred: {0}")]
    Defer(String),
    #[error("evaluation of {0} depends on itself")]
    Cycle(AbsolutePath),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("read of uninitialised bytes at offset {0}")]
    UninitRead(u64),
    #[error("out-of-bounds access at offset {offset}, allocation is {size} bytes")]
    OutOfBounds { offset: u64, size: u64 },
    #[error("null or dangling pointer dereferenced")]
    NullDeref,
    #[error("overlapping copy_from within the same allocation")]
    OverlappingCopy,
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: u64, len: u64 },
    #[error("unknown item referenced during evaluation: {0}")]
    UnknownItem(AbsolutePath),
    #[error("unsupported construct in const evaluation: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Build(#[from] rc_mir::BuildError),
}
