//! The substitution environment threaded through a const-eval call: the
//! concrete type arguments the current `impl` block and method were
//! instantiated with. `Self` never appears here — it's already
//! substituted away by the time a body reaches this evaluator.

use rc_ast::types::TypeRef;

#[derive(Debug, Clone, Default)]
pub struct MonomorphState {
    pub pp_impl: Vec<TypeRef>,
    pub pp_method: Vec<TypeRef>,
}

impl MonomorphState {
    pub fn empty() -> MonomorphState {
        MonomorphState::default()
    }

    /// Replace a generic parameter reference with its bound concrete
    /// type, if one is known; anything else passes through unchanged.
    /// No in-scope body this evaluator receives is itself generic, so
    /// `pp_impl`/`pp_method` are always empty in practice today — this
    /// exists so a future caller that does monomorphize a generic
    /// function has somewhere to put the substitution.
    pub fn resolve(&self, ty: &TypeRef) -> TypeRef {
        match ty {
            TypeRef::Generic { index, .. } => {
                let idx = *index as usize;
                self.pp_method.get(idx).or_else(|| self.pp_impl.get(idx)).cloned().unwrap_or_else(|| ty.clone())
            }
            other => other.clone(),
        }
    }
}
