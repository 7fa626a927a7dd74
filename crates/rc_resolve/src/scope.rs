//! The lexical context a single UFCS path is resolved against: the
//! generic parameter lists currently in scope (item, then enclosing
//! impl), the trait a `Self` anchor refers to when resolving inside a
//! trait definition, and the traits visible for step 4's in-scope scan.

use rc_ast::generics::GenericParams;
use rc_ast::path::AbsolutePath;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub item_generics: GenericParams,
    pub impl_generics: Option<GenericParams>,
    /// Set while resolving a signature that lives textually inside a
    /// trait definition, so a bare `Self` anchor resolves against the
    /// trait itself rather than a concrete type.
    pub enclosing_trait: Option<AbsolutePath>,
    /// Traits visible to step 4's in-scope scan: this narrow model
    /// approximates "block's use-imports plus enclosing modules'
    /// prelude" with every trait declared in, or use-imported into, the
    /// signature's immediately enclosing module.
    pub in_scope_traits: Vec<AbsolutePath>,
}

impl Scope {
    pub fn bare() -> Scope {
        Scope::default()
    }
}
