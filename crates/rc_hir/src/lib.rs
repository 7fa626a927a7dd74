//! HIR conversion: the `ConvertHIR_*` pass pipeline,
//! operating in place on the `rc_ast::Crate` arena rather than building
//! a second parallel tree — see DESIGN.md for why. Derived facts that
//! don't fit naturally on an `Item` (struct markings, supertrait
//! closures) live in the `facts::HirFacts` side-table instead.

pub mod bind;
pub mod expand_aliases;
pub mod expand_aliases_self;
pub mod facts;
pub mod layout;
pub mod lifetime_elision;
pub mod markings;
pub mod name_lookup;
pub mod walk;

pub use bind::{bind_patterns, bind_types};
pub use expand_aliases::expand_aliases;
pub use expand_aliases_self::expand_aliases_self;
pub use facts::HirFacts;
pub use layout::{LayoutError, Target, TypeRepr};
pub use lifetime_elision::lifetime_elision;
pub use markings::compute_markings;
