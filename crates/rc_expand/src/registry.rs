//! Attribute handler staging and `#[cfg(...)]` predicate evaluation
//!]` first... then dispatches each remaining
//! attribute").
//!
//! The original keeps one `ExpandDecorator` subclass per attribute,
//! self-registered into a global map via `STATIC_DECORATOR(name, Type)`
//! at static-init time. A static match table reads the same and needs no
//! init-order care, so that's what [`stage_of`] is.

use rc_ast::item::{MetaItem, MetaItemValue};
use rustc_hash::{FxHashMap, FxHashSet};

/// When in the per-item traversal a handler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrStage {
    /// Before the item's own shape is trusted — `#[cfg_attr(...)]`
    /// rewrites into a plain attribute here, ahead of everything else
    /// that might inspect the attribute list.
    Pre,
    /// The common case: `#[derive]`, `#[lang]`, `#[main]`, and friends
    /// run once the item itself (but not necessarily its siblings) is in
    /// its final shape.
    Post,
    /// Needs the *whole* expansion fixed point reached first — nothing
    /// in this crate's built-in set currently needs it, but the stage
    /// exists so a future handler (e.g. one keyed off fully resolved
    /// supertraits) has somewhere to register.
    LatePost,
}

/// Known built-in attribute names and the stage they run at. `cfg`
/// itself is deliberately absent: it's handled by [`should_keep`] ahead
/// of this table, not dispatched through it.
pub fn stage_of(attr_name: &str) -> Option<AttrStage> {
    Some(match attr_name {
        "cfg_attr" => AttrStage::Pre,
        "derive" => AttrStage::Post,
        "proc_macro_derive" => AttrStage::Post,
        "lang" => AttrStage::Post,
        "main" => AttrStage::Post,
        "start" => AttrStage::Post,
        "panic_handler" => AttrStage::Post,
        "panic_implementation" => AttrStage::Post,
        "alloc_error_handler" => AttrStage::Post,
        "rustc_std_internal_symbol" => AttrStage::Post,
        _ => return None,
    })
}

/// The active `cfg` environment: flag-style settings (`cfg(test)`,
/// `cfg(unix)`) plus key/value settings that may repeat (`cfg(feature =
/// "a")` and `cfg(feature = "b")` both being set simultaneously).
#[derive(Debug, Clone, Default)]
pub struct CfgEnv {
    flags: FxHashSet<String>,
    values: FxHashMap<String, FxHashSet<String>>,
}

impl CfgEnv {
    pub fn new() -> CfgEnv {
        CfgEnv::default()
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> CfgEnv {
        self.flags.insert(flag.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> CfgEnv {
        self.values.entry(key.into()).or_default().insert(value.into());
        self
    }

    pub fn is_set(&self, flag: &str) -> bool {
        self.flags.contains(flag) || self.values.contains_key(flag)
    }

    pub fn has_value(&self, key: &str, value: &str) -> bool {
        self.values.get(key).is_some_and(|vs| vs.contains(value))
    }
}

/// Evaluate a parsed `cfg(...)` predicate tree (`all`/`any`/`not`
/// combinators over flag and key="value" leaves) against `env`.
pub fn eval_cfg(env: &CfgEnv, predicate: &MetaItem) -> bool {
    match predicate.name.as_str() {
        "all" => predicate.list_items().iter().all(|i| eval_cfg(env, i)),
        "any" => predicate.list_items().iter().any(|i| eval_cfg(env, i)),
        "not" => match predicate.list_items().first() {
            Some(inner) => !eval_cfg(env, inner),
            None => true,
        },
        _ => match &predicate.value {
            MetaItemValue::Word => env.is_set(&predicate.name),
            MetaItemValue::Str(value) => env.has_value(&predicate.name, value),
            // A combinator-shaped predicate under an unrecognised name
            // (neither all/any/not) can't be satisfied.
            MetaItemValue::List(_) => false,
        },
    }
}

/// `true` iff the item carrying `attrs` should survive — there is no
/// `#[cfg(...)]` attribute, or its predicate evaluates true against
/// `env`. Marks the `cfg` attribute used either way, since "did you even
/// look at your #[cfg]" isn't a meaningful unused-attribute warning.
pub fn should_keep(env: &CfgEnv, attrs: &rc_ast::item::AttributeList) -> bool {
    match attrs.get("cfg") {
        Some(cfg_attr) => {
            cfg_attr.mark_used();
            match cfg_attr.list_items().first() {
                Some(predicate) => eval_cfg(env, predicate),
                None => true,
            }
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(name: &str) -> MetaItem {
        MetaItem::word(name)
    }
    fn kv(name: &str, value: &str) -> MetaItem {
        MetaItem::new(name, MetaItemValue::Str(value.into()))
    }
    fn list(name: &str, items: Vec<MetaItem>) -> MetaItem {
        MetaItem::new(name, MetaItemValue::List(items))
    }

    #[test]
    fn stage_lookup_covers_built_ins_and_excludes_cfg() {
        assert_eq!(stage_of("derive"), Some(AttrStage::Post));
        assert_eq!(stage_of("cfg_attr"), Some(AttrStage::Pre));
        assert_eq!(stage_of("cfg"), None);
        assert_eq!(stage_of("not_a_real_attr"), None);
    }

    #[test]
    fn flag_and_kv_leaves_evaluate_against_env() {
        let env = CfgEnv::new().with_flag("test").with_value("feature", "fancy");
        assert!(eval_cfg(&env, &word("test")));
        assert!(!eval_cfg(&env, &word("unix")));
        assert!(eval_cfg(&env, &kv("feature", "fancy")));
        assert!(!eval_cfg(&env, &kv("feature", "other")));
    }

    #[test]
    fn all_any_not_combine() {
        let env = CfgEnv::new().with_flag("unix").with_value("feature", "fancy");
        assert!(eval_cfg(&env, &list("all", vec![word("unix"), kv("feature", "fancy")])));
        assert!(!eval_cfg(&env, &list("all", vec![word("unix"), kv("feature", "nope")])));
        assert!(eval_cfg(&env, &list("any", vec![word("windows"), word("unix")])));
        assert!(eval_cfg(&env, &list("not", vec![word("windows")])));
    }

    #[test]
    fn should_keep_prunes_false_predicate_and_marks_attr_used() {
        let mut attrs = rc_ast::item::AttributeList::default();
        attrs.attrs.push(list("cfg", vec![word("windows")]));
        let env = CfgEnv::new().with_flag("unix");
        assert!(!should_keep(&env, &attrs));
        assert!(attrs.get("cfg").unwrap().is_used());
    }

    #[test]
    fn should_keep_defaults_true_without_a_cfg_attribute() {
        let attrs = rc_ast::item::AttributeList::default();
        let env = CfgEnv::new();
        assert!(should_keep(&env, &attrs));
    }
}
