//! Spans: a refcounted pointer to either a source-file range or a
//! macro-expansion frame, chained to a parent span.
//!
//! Spans are value-comparable by identity, never semantically: two spans
//! covering the same bytes are not `==` unless they are the same handle.

use crate::intern::Symbol;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Symbol,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

#[derive(Debug)]
enum SpanInner {
    Source { parent: Option<Span>, loc: SourceLoc },
    Macro { parent: Option<Span>, source_crate: Symbol, macro_name: Symbol },
}

/// A nullable, refcounted span handle. `Span::dummy()` carries no
/// location and is used where no source position is available (e.g.
/// compiler-synthesised nodes).
#[derive(Clone)]
pub struct Span(Option<Rc<SpanInner>>);

impl Span {
    pub fn dummy() -> Span {
        Span(None)
    }

    pub fn new_source(parent: Span, loc: SourceLoc) -> Span {
        Span(Some(Rc::new(SpanInner::Source { parent: parent.non_dummy(), loc })))
    }

    pub fn new_macro(parent: Span, source_crate: Symbol, macro_name: Symbol) -> Span {
        Span(Some(Rc::new(SpanInner::Macro {
            parent: parent.non_dummy(),
            source_crate,
            macro_name,
        })))
    }

    fn non_dummy(self) -> Option<Span> {
        if self.0.is_some() { Some(self) } else { None }
    }

    pub fn is_dummy(&self) -> bool {
        self.0.is_none()
    }

    pub fn parent(&self) -> Span {
        match &self.0 {
            None => Span::dummy(),
            Some(inner) => match inner.as_ref() {
                SpanInner::Source { parent, .. } => parent.clone().unwrap_or_else(Span::dummy),
                SpanInner::Macro { parent, .. } => parent.clone().unwrap_or_else(Span::dummy),
            },
        }
    }

    /// Walk the `parent_span` chain up to (and including) the first
    /// `Source` frame — the "top file span" used when rendering a
    /// diagnostic's primary location.
    pub fn top_file_loc(&self) -> Option<SourceLoc> {
        let mut cur = self.clone();
        loop {
            match &cur.0 {
                None => return None,
                Some(inner) => match inner.as_ref() {
                    SpanInner::Source { loc, .. } => return Some(loc.clone()),
                    SpanInner::Macro { parent, .. } => match parent {
                        Some(p) => cur = p.clone(),
                        None => return None,
                    },
                },
            }
        }
    }

    /// Render the full macro-expansion backtrace, innermost first, one
    /// line per frame — used by diagnostic formatting to explain which
    /// macro invocation produced an offending token.
    pub fn backtrace(&self) -> Vec<String> {
        let mut frames = Vec::new();
        let mut cur = self.clone();
        loop {
            match &cur.0 {
                None => break,
                Some(inner) => {
                    match inner.as_ref() {
                        SpanInner::Source { loc, parent } => {
                            frames.push(format!(
                                "{}:{}:{}: {}:{}",
                                loc.file, loc.start_line, loc.start_col, loc.end_line, loc.end_col
                            ));
                            match parent {
                                Some(p) => cur = p.clone(),
                                None => break,
                            }
                        }
                        SpanInner::Macro { source_crate, macro_name, parent } => {
                            frames.push(format!(
                                "in expansion of {}::{}!",
                                source_crate, macro_name
                            ));
                            match parent {
                                Some(p) => cur = p.clone(),
                                None => break,
                            }
                        }
                    }
                }
            }
        }
        frames
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl Eq for Span {}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.top_file_loc() {
            Some(loc) => write!(f, "{}:{}:{}", loc.file, loc.start_line, loc.start_col),
            None => write!(f, "<dummy span>"),
        }
    }
}

/// Pairs a span with a payload, for tokens and AST leaves that need a
/// location but aren't full nodes.
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

pub fn spanned<T>(span: Span, node: T) -> Spanned<T> {
    Spanned { span, node }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> SourceLoc {
        SourceLoc {
            file: Symbol::intern("main.rs"),
            start_line: line,
            start_col: 1,
            end_line: line,
            end_col: 5,
        }
    }

    #[test]
    fn dummy_span_has_no_parent_chain() {
        let sp = Span::dummy();
        assert!(sp.is_dummy());
        assert_eq!(sp.backtrace().len(), 0);
    }

    #[test]
    fn macro_span_chain_reaches_source() {
        let src = Span::new_source(Span::dummy(), loc(10));
        let mac = Span::new_macro(src.clone(), Symbol::intern("mycrate"), Symbol::intern("foo"));
        assert_eq!(mac.top_file_loc(), Some(loc(10)));
        assert_eq!(mac.backtrace().len(), 2);
    }

    #[test]
    fn identity_not_structural_equality() {
        let a = Span::new_source(Span::dummy(), loc(1));
        let b = Span::new_source(Span::dummy(), loc(1));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
