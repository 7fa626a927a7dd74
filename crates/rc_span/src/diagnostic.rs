//! Diagnostics contract: four severities, user errors
//! collected and reported against a `Span`, bug checks abort the process.
//!
//! Mirrors the shape of `rustc_errors::Handler`: a `DiagCtxt` owned by the
//! driver, handed by reference to every pass, which both prints and
//! accumulates an error count so the pass dispatcher can gate the next
//! phase on "no errors were reported this pass".

use crate::span::Span;
use std::cell::Cell;
use tracing::{error as trace_error, warn as trace_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E0000,
    /// Ambiguous associated type/UFCS member — two equally-deep in-scope
    /// traits both provide the requested item.
    E0223,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E0000 => "E0000",
            ErrorCode::E0223 => "E0223",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub span: Span,
    pub code: Option<ErrorCode>,
    pub message: String,
}

/// Accumulates diagnostics for one compiler phase. Errors are *not*
/// exceptions: a pass keeps running (so it can report as many problems
/// as possible) and the driver checks `had_errors()` at the phase
/// boundary before admitting the next pass.
#[derive(Default)]
pub struct DiagCtxt {
    errors: std::cell::RefCell<Vec<Diagnostic>>,
    warnings: std::cell::RefCell<Vec<Diagnostic>>,
    err_count: Cell<u32>,
}

impl DiagCtxt {
    pub fn new() -> DiagCtxt {
        DiagCtxt::default()
    }

    pub fn error(&self, span: Span, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        trace_error!(span = ?span, code = code.as_str(), message = %message, "compile error");
        self.errors.borrow_mut().push(Diagnostic { span, code: Some(code), message });
        self.err_count.set(self.err_count.get() + 1);
    }

    pub fn warning(&self, span: Span, message: impl Into<String>) {
        let message = message.into();
        trace_warn!(span = ?span, message = %message, "compile warning");
        self.warnings.borrow_mut().push(Diagnostic { span, code: None, message });
    }

    pub fn note(&self, span: Span, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(span = ?span, message = %message, "note");
    }

    pub fn had_errors(&self) -> bool {
        self.err_count.get() > 0
    }

    pub fn err_count(&self) -> u32 {
        self.err_count.get()
    }

    pub fn drain_errors(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }
}

/// An invariant failure. Never recoverable, never expected in a
/// well-formed program — aborts the process, matching `BUG()` in the
/// original source. Use the [`bug`] macro rather than constructing this
/// directly so the panic message carries file/line like `BUG(span, msg)`.
#[derive(thiserror::Error, Debug)]
#[error("internal compiler invariant violated at {span:?}: {message}")]
pub struct BugCheck {
    pub span: Span,
    pub message: String,
}

#[macro_export]
macro_rules! bug {
    ($span:expr, $($arg:tt)*) => {
        panic!("{}", $crate::diagnostic::BugCheck {
            span: $span.clone(),
            message: format!($($arg)*),
        })
    };
}

#[macro_export]
macro_rules! assert_bug {
    ($span:expr, $cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bug!($span, $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_without_unwinding() {
        let dcx = DiagCtxt::new();
        dcx.error(Span::dummy(), ErrorCode::E0000, "first");
        dcx.error(Span::dummy(), ErrorCode::E0223, "second");
        assert_eq!(dcx.err_count(), 2);
        assert!(dcx.had_errors());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let dcx = DiagCtxt::new();
        dcx.warning(Span::dummy(), "just fyi");
        assert!(!dcx.had_errors());
    }

    #[test]
    #[should_panic(expected = "internal compiler invariant violated")]
    fn bug_macro_panics() {
        bug!(Span::dummy(), "unexpected {}", "state");
    }
}
