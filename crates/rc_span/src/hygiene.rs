//! Identifier hygiene: `(file_num, [context_idx])`, used by name
//! resolution to decide whether an identifier introduced by macro
//! expansion context A is visible from a lookup in context B.
//!
//! Models a full context *stack* rather than a single index, per
//! `src/include/ident.hpp` in the original source: nested macro
//! expansions each push a fresh context, and a name is visible to a use
//! site iff one is a (possibly empty) suffix of the other's context
//! stack.

use smallvec::SmallVec;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_CONTEXT: AtomicU32 = AtomicU32::new(1);

/// Opaque expansion-context id, allocated once per macro invocation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntaxContextId(u32);

pub fn fresh_context() -> SyntaxContextId {
    SyntaxContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hygiene {
    pub file_num: u32,
    pub contexts: SmallVec<[SyntaxContextId; 4]>,
}

impl Hygiene {
    pub fn root(file_num: u32) -> Hygiene {
        Hygiene { file_num, contexts: SmallVec::new() }
    }

    /// Push a fresh context, as happens whenever an identifier is
    /// introduced by expanding a macro at this hygiene's file.
    pub fn push(&self, ctx: SyntaxContextId) -> Hygiene {
        let mut contexts = self.contexts.clone();
        contexts.push(ctx);
        Hygiene { file_num: self.file_num, contexts }
    }

    /// An identifier from `self` is visible to a lookup performed with
    /// hygiene `at` iff `self`'s context stack is a prefix of `at`'s (the
    /// use site is inside, or at, the same expansion nest that introduced
    /// the name).
    pub fn visible_from(&self, at: &Hygiene) -> bool {
        self.file_num == at.file_num
            && self.contexts.len() <= at.contexts.len()
            && self.contexts.iter().zip(at.contexts.iter()).all(|(a, b)| a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_visible_everywhere_in_file() {
        let root = Hygiene::root(0);
        let nested = root.push(fresh_context());
        assert!(root.visible_from(&nested));
    }

    #[test]
    fn sibling_expansions_are_not_mutually_visible() {
        let root = Hygiene::root(0);
        let a = root.push(fresh_context());
        let b = root.push(fresh_context());
        assert!(!a.visible_from(&b));
        assert!(!b.visible_from(&a));
    }

    #[test]
    fn different_files_never_see_each_other() {
        let a = Hygiene::root(0);
        let b = Hygiene::root(1);
        assert!(!a.visible_from(&b));
    }
}
