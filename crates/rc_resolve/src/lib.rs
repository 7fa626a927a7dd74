//! UFCS (Unified Function Call Syntax) path resolution:
//! turning `<Type>::item` / `<Type as Trait>::item` into a concrete
//! trait or inherent member binding, plus the impl-group partition its
//! output feeds to the type checker.

pub mod driver;
pub mod impl_groups;
pub mod scope;
pub mod ufcs;

pub use driver::{resolve_ufcs_inner, resolve_ufcs_outer};
pub use impl_groups::{partition_impls, ImplGroups};
pub use scope::Scope;
pub use ufcs::resolve_one;
