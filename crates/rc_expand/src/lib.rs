//! Attribute-driven item expansion: built-in derives,
//! lang-item/entry-point attribute binding, `#[cfg]` pruning, and
//! proc-macro subprocess IPC.

pub mod derive;
pub mod expander;
pub mod ipc;
pub mod lang_item;
pub mod registry;
pub mod wire;

pub use derive::{Deriver, DerivedImpl};
pub use expander::{expand_crate, ExpandContext, ExpandOutcome};
pub use ipc::{ProcMacroChild, ProcMacroError};
pub use lang_item::{EntryPointAttr, ItemCategory, LangItems};
pub use registry::{eval_cfg, should_keep, stage_of, AttrStage, CfgEnv};
pub use wire::{Token, TokenClass};
