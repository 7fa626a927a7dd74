//! `#[lang = "..."]` binding plus the handful of sibling attributes that
//! feed the same crate-wide table: `#[main]`, `#[start]`,
//! `#[panic_handler]`/`#[panic_implementation]`, `#[alloc_error_handler]`,
//! `#[rustc_std_internal_symbol]`.
//!
//! Grounded on `synexts/lang_item.cpp`'s `handle_lang_item` dispatch and
//! its `Decorator_Main`/`Decorator_Start`/... siblings. The original's
//! version-gated entries (`TARGETVER_LEAST_1_29`/`_1_39`/`_1_54`) become
//! `Edition`-gated entries here, per the Open Question writeup in
//! `rc_span::Edition`'s doc comment.

use rc_ast::path::AbsolutePath;
use rc_span::{DiagCtxt, Edition, ErrorCode, Span};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Trait,
    Struct,
    Enum,
    Union,
    Fn,
    ExternFn,
    Static,
    TypeAlias,
}

/// Crate-wide table from lang-item name to the absolute path of whatever
/// was tagged with it — `AST::Crate::m_lang_items` in the original.
#[derive(Default)]
pub struct LangItems {
    map: FxHashMap<String, AbsolutePath>,
}

impl LangItems {
    pub fn new() -> LangItems {
        LangItems::default()
    }

    pub fn get(&self, name: &str) -> Option<&AbsolutePath> {
        self.map.get(name)
    }

    /// `handle_save`: first definition wins; a second, *different*
    /// definition of the same name is an error (anonymous modules can be
    /// visited twice during fixed-point expansion, so re-registering the
    /// same path is tolerated, not just the first write).
    pub fn bind(&mut self, dcx: &DiagCtxt, sp: Span, name: impl Into<String>, path: AbsolutePath) {
        let name = name.into();
        match self.map.get(&name) {
            Some(existing) if *existing != path => {
                dcx.error(
                    sp,
                    ErrorCode::E0000,
                    format!("duplicate definition of language item '{name}' - {existing} and {path}"),
                );
            }
            Some(_) => {}
            None => {
                tracing::debug!(name = %name, path = %path, "bind lang item");
                self.map.insert(name, path);
            }
        }
    }
}

/// Resolve a `#[lang = "name"]` name to the item category it's expected
/// to tag and the name it's stored under (a handful are renamed on
/// storage, e.g. `Try` -> `try`, or carry an edition-dependent storage
/// name, e.g. the `Range*` family before/after `Edition::Rust2021`).
/// Mirrors `handle_lang_item`'s big dispatch, minus its hashmap-of-callbacks
/// indirection — a match arm per name reads the same and needs no static
/// initialisation dance.
fn classify(name: &str, edition: Edition) -> Option<(ItemCategory, &'static str)> {
    use ItemCategory::*;
    let rust2018 = Edition::Rust2018;
    let rust2021 = Edition::Rust2021;
    Some(match name {
        "phantom_fn" => (Fn, "phantom_fn"),
        "send" => (Trait, "send"),
        "sync" => (Trait, "sync"),
        "sized" => (Trait, "sized"),
        "copy" => (Trait, "copy"),
        "clone" if edition.at_least(rust2018) => (Trait, "clone"),
        "drop" => (Trait, "drop"),
        "add" => (Trait, "add"),
        "sub" => (Trait, "sub"),
        "mul" => (Trait, "mul"),
        "div" => (Trait, "div"),
        "rem" => (Trait, "rem"),
        "neg" => (Trait, "neg"),
        "not" => (Trait, "not"),
        "bitand" => (Trait, "bitand"),
        "bitor" => (Trait, "bitor"),
        "bitxor" => (Trait, "bitxor"),
        "shl" => (Trait, "shl"),
        "shr" => (Trait, "shr"),
        "add_assign" => (Trait, "add_assign"),
        "sub_assign" => (Trait, "sub_assign"),
        "div_assign" => (Trait, "div_assign"),
        "rem_assign" => (Trait, "rem_assign"),
        "mul_assign" => (Trait, "mul_assign"),
        "bitand_assign" => (Trait, "bitand_assign"),
        "bitor_assign" => (Trait, "bitor_assign"),
        "bitxor_assign" => (Trait, "bitxor_assign"),
        "shl_assign" => (Trait, "shl_assign"),
        "shr_assign" => (Trait, "shr_assign"),
        "index" => (Trait, "index"),
        "index_mut" => (Trait, "index_mut"),
        "deref" => (Trait, "deref"),
        "deref_mut" => (Trait, "deref_mut"),
        "fn" => (Trait, "fn"),
        "fn_mut" => (Trait, "fn_mut"),
        "fn_once" => (Trait, "fn_once"),
        "eq" => (Trait, "eq"),
        "ord" => (Trait, "ord"),
        "partial_ord" if edition.at_least(rust2018) => (Trait, "partial_ord"),
        "unsize" => (Trait, "unsize"),
        "coerce_unsized" => (Trait, "coerce_unsized"),
        "freeze" => (Trait, "freeze"),
        "iterator" => (Trait, "iterator"),
        "debug_trait" => (Trait, "debug_trait"),
        "termination" if edition.at_least(rust2018) => (Trait, "termination"),
        "pointee_trait" if edition.at_least(rust2021) => (Trait, "pointee_trait"),
        "dyn_metadata" if edition.at_least(rust2021) => (Struct, "dyn_metadata"),
        "structural_peq" if edition.at_least(rust2021) => (Trait, "structural_peq"),
        "structural_teq" if edition.at_least(rust2021) => (Trait, "structural_teq"),
        "discriminant_kind" if edition.at_least(rust2021) => (Trait, "discriminant_kind"),
        "unwind_safe" if edition.at_least(rust2021) => (Trait, "unwind_safe"),
        "ref_unwind_safe" if edition.at_least(rust2021) => (Trait, "ref_unwind_safe"),

        "non_zero" => (Struct, "non_zero"),
        "phantom_data" => (Struct, "phantom_data"),
        "unsafe_cell" => (Struct, "unsafe_cell"),
        "alloc_layout" if edition.at_least(rust2018) => (Struct, "alloc_layout"),
        "panic_info" if edition.at_least(rust2018) => (Struct, "panic_info"),
        "panic_location" if edition.at_least(rust2021) => (Struct, "panic_location"),
        "manually_drop" if edition.at_least(rust2018) => (Struct, "manually_drop"),
        "arc" if edition.at_least(rust2018) => (Struct, "arc"),
        "rc" if edition.at_least(rust2018) => (Struct, "rc"),
        "maybe_uninit" => (Union, "maybe_uninit"),
        "unpin" => (Trait, "unpin"),
        "pin" => (Struct, "pin"),
        "future_trait" => (Trait, "future_trait"),
        "from_generator" if edition.at_least(rust2021) => (Fn, "from_generator"),
        "get_context" if edition.at_least(rust2021) => (Fn, "get_context"),
        "va_list" => (Struct, "va_list"),
        "receiver" => (Trait, "receiver"),
        "dispatch_from_dyn" => (Trait, "dispatch_from_dyn"),
        "generator" if edition.at_least(rust2018) => (Trait, "generator"),
        "generator_state" if edition.at_least(rust2018) => (Enum, "generator_state"),
        "Try" if edition.at_least(rust2021) => (Trait, "try"),

        "msvc_try_filter" => (Static, "msvc_try_filter"),
        "panic_impl" => (ExternFn, "panic_impl"),
        "oom" => (ExternFn, "oom"),

        "panic" => (Fn, "panic"),
        "panic_bounds_check" => (Fn, "panic_bounds_check"),
        "panic_fmt" => (Fn, "panic_fmt"),
        "str_eq" => (Fn, "str_eq"),
        "drop_in_place" => (Fn, "drop_in_place"),
        "align_offset" => (Fn, "align_offset"),
        "begin_panic" if edition.at_least(rust2018) => (Fn, "begin_panic"),
        "panic_str" if edition.at_least(rust2021) => (Fn, "panic_str"),
        "exchange_malloc" => (Fn, "exchange_malloc"),
        "exchange_free" => (Fn, "exchange_free"),
        "box_free" => (Fn, "box_free"),
        "owned_box" => (Struct, "owned_box"),
        "start" => (Fn, "start"),
        "eh_personality" => (Fn, "eh_personality"),

        "RangeFull" if edition.at_least(rust2021) => (Struct, "range_full"),
        "Range" if edition.at_least(rust2021) => (Struct, "range"),
        "RangeFrom" if edition.at_least(rust2021) => (Struct, "range_from"),
        "RangeTo" if edition.at_least(rust2021) => (Struct, "range_to"),
        "RangeInclusive" if edition.at_least(rust2021) => (Struct, "range_inclusive"),
        "RangeToInclusive" if edition.at_least(rust2021) => (Struct, "range_to_inclusive"),
        "range_full" if !edition.at_least(rust2021) => (Struct, "range_full"),
        "range" if !edition.at_least(rust2021) => (Struct, "range"),
        "range_from" if !edition.at_least(rust2021) => (Struct, "range_from"),
        "range_to" if !edition.at_least(rust2021) => (Struct, "range_to"),

        _ => return None,
    })
}

/// `handle_lang_item`: dispatch a `#[lang = "name"]` attachment at `path`
/// to its expected category, reporting a category mismatch or an unknown
/// name as a user error rather than panicking — an author typo in a
/// `#[lang]` string is not an internal invariant violation.
pub fn handle_lang_item(
    dcx: &DiagCtxt,
    items: &mut LangItems,
    edition: Edition,
    sp: Span,
    path: AbsolutePath,
    name: &str,
    category: ItemCategory,
) {
    match classify(name, edition) {
        Some((expected, stored_name)) => {
            if category != expected {
                dcx.error(
                    sp,
                    ErrorCode::E0000,
                    format!("language item '{name}' {path} - on incorrect item type {category:?} != {expected:?}"),
                );
                return;
            }
            if category == ItemCategory::ExternFn {
                // An extern fn lang item just needs a specific link name
                // wired up at codegen time; that's out of scope here, so
                // there's nothing further to record.
                return;
            }
            items.bind(dcx, sp, stored_name, path);
        }
        None => {
            dcx.error(sp, ErrorCode::E0000, format!("unknown language item '{name}'"));
        }
    }
}

/// The `#[lang = "..."]` names recognised on an `impl` block for a
/// primitive type (`impl i32 { ... }` tagged to let libcore provide
/// inherents on primitives) — these aren't stored anywhere, only
/// validated, matching the original's `Decorator_LangItem::handle(...,
/// AST::ImplDef&)` overload.
pub fn validate_primitive_impl_lang_item(dcx: &DiagCtxt, edition: Edition, sp: Span, name: &str) {
    const ALWAYS: &[&str] = &[
        "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "i128", "u128", "isize", "usize",
        "const_ptr", "mut_ptr", "bool", "char", "str", "slice", "f32", "f64",
    ];
    const SINCE_2021: &[&str] = &["const_slice_ptr", "mut_slice_ptr", "array"];
    if ALWAYS.contains(&name) {
        return;
    }
    if edition.at_least(Edition::Rust2021) && SINCE_2021.contains(&name) {
        return;
    }
    dcx.error(sp, ErrorCode::E0000, format!("unknown lang item '{name}' on impl"));
}

/// `#[main]`/`#[start]`/`#[panic_handler]`/`#[panic_implementation]`/
/// `#[alloc_error_handler]` all reduce to the same shape: bind a
/// well-known pseudo lang-item name to a function item, erroring if it's
/// attached to anything else or attached twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointAttr {
    Main,
    Start,
    PanicHandler,
    AllocErrorHandler,
}

impl EntryPointAttr {
    fn storage_key(self) -> &'static str {
        match self {
            EntryPointAttr::Main => "mrustc-main",
            EntryPointAttr::Start => "mrustc-start",
            // `#[panic_implementation]` and its 1.30+ replacement
            // `#[panic_handler]` share a storage slot, exactly as the
            // original does (same string literal in both decorators).
            EntryPointAttr::PanicHandler => "mrustc-panic_implementation",
            EntryPointAttr::AllocErrorHandler => "mrustc-alloc_error_handler",
        }
    }

    fn attr_name(self) -> &'static str {
        match self {
            EntryPointAttr::Main => "main",
            EntryPointAttr::Start => "start",
            EntryPointAttr::PanicHandler => "panic_handler",
            EntryPointAttr::AllocErrorHandler => "alloc_error_handler",
        }
    }
}

/// `is_function` is the caller's precomputed "does `path`'s item have
/// `ItemKind::Function`" check — kept out of this module so it has no
/// dependency on `rc_ast::Crate`.
pub fn handle_entry_point_attr(
    dcx: &DiagCtxt,
    items: &mut LangItems,
    attr: EntryPointAttr,
    sp: Span,
    path: AbsolutePath,
    is_function: bool,
) {
    if !is_function {
        dcx.error(sp, ErrorCode::E0000, format!("#[{}] on non-function {path}", attr.attr_name()));
        return;
    }
    items.bind(dcx, sp, attr.storage_key(), path);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: &str) -> AbsolutePath {
        AbsolutePath::crate_root("demo").child(n)
    }

    #[test]
    fn known_lang_item_binds_under_its_canonical_name() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_lang_item(&dcx, &mut items, Edition::Rust2021, Span::dummy(), p("MyDrop"), "drop", ItemCategory::Trait);
        assert!(!dcx.had_errors());
        assert_eq!(items.get("drop"), Some(&p("MyDrop")));
    }

    #[test]
    fn wrong_category_is_an_error_not_a_bind() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_lang_item(&dcx, &mut items, Edition::Rust2021, Span::dummy(), p("Oops"), "drop", ItemCategory::Struct);
        assert!(dcx.had_errors());
        assert!(items.get("drop").is_none());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_lang_item(&dcx, &mut items, Edition::Rust2021, Span::dummy(), p("X"), "not_a_real_lang_item", ItemCategory::Trait);
        assert!(dcx.had_errors());
    }

    #[test]
    fn edition_gates_renamed_range_family() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_lang_item(&dcx, &mut items, Edition::Rust2021, Span::dummy(), p("RangeFull"), "RangeFull", ItemCategory::Struct);
        assert_eq!(items.get("range_full"), Some(&p("RangeFull")));

        let mut items15 = LangItems::new();
        handle_lang_item(&dcx, &mut items15, Edition::Rust2015, Span::dummy(), p("RangeFull"), "range_full", ItemCategory::Struct);
        assert_eq!(items15.get("range_full"), Some(&p("RangeFull")));
    }

    #[test]
    fn duplicate_different_definition_is_an_error_same_one_is_tolerated() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        items.bind(&dcx, Span::dummy(), "sized", p("A"));
        items.bind(&dcx, Span::dummy(), "sized", p("A"));
        assert!(!dcx.had_errors());
        items.bind(&dcx, Span::dummy(), "sized", p("B"));
        assert!(dcx.had_errors());
    }

    #[test]
    fn panic_handler_and_panic_implementation_share_a_storage_key() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_entry_point_attr(&dcx, &mut items, EntryPointAttr::PanicHandler, Span::dummy(), p("my_panic"), true);
        assert_eq!(items.get("mrustc-panic_implementation"), Some(&p("my_panic")));
    }

    #[test]
    fn entry_point_attr_on_non_function_errors() {
        let dcx = DiagCtxt::new();
        let mut items = LangItems::new();
        handle_entry_point_attr(&dcx, &mut items, EntryPointAttr::Main, Span::dummy(), p("NotAFn"), false);
        assert!(dcx.had_errors());
    }
}
