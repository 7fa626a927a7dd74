//! `LifetimeElision`: assign concrete lifetime names
//! to every elided `&` (`lifetime: None`), `dyn Trait`, and `impl Trait`
//! appearing in a function signature.
//!
//! Three independent rules, applied in this order:
//! 1. Each elided input (argument) lifetime becomes its own fresh
//!    parameter; the output lifetime is `&self`'s if present, else the
//!    sole input lifetime, else an error (a function can't invent an
//!    output lifetime out of nothing the way a struct field sometimes
//!    can fall back to `'static`).
//! 2. `dyn Trait` with no written lifetime bound takes the nearest
//!    enclosing reference's lifetime; with no enclosing reference,
//!    `'static` (the declared-trait-bound branch of RFC 599 isn't
//!    modelled — no bound propagation machinery exists in this crate —
//!    so it falls straight through to the `'static` default).
//! 3. `impl Trait` captures whatever lifetimes its trait bounds
//!    reference; more than one distinct lifetime gets collapsed to a
//!    single freshly synthesised name (the outlives relationship this
//!    implies is recorded nowhere further — out of scope without a
//!    bound/outlives solver).

use rc_ast::item::FunctionDef;
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, ErrorCode, Span};

struct LifetimeGen(u32);

impl LifetimeGen {
    fn fresh(&mut self) -> String {
        self.0 += 1;
        format!("'_elided{}", self.0)
    }
}

fn dedup_preserve_order(names: &[String]) -> Vec<&String> {
    let mut seen = Vec::new();
    for n in names {
        if !seen.contains(&n) {
            seen.push(n);
        }
    }
    seen
}

/// Assign fresh names to every elided borrow inside an argument's type,
/// recording each name (fresh or already-explicit) into `input_lifetimes`
/// and, when `is_self` is set, into `self_lifetime` too.
fn elide_arg_type(
    ty: &mut TypeRef,
    is_self: bool,
    ambient: Option<String>,
    gen: &mut LifetimeGen,
    input_lifetimes: &mut Vec<String>,
    self_lifetime: &mut Option<String>,
) {
    match ty {
        TypeRef::Borrow { lifetime, inner, .. } => {
            let name = lifetime.clone().unwrap_or_else(|| gen.fresh());
            *lifetime = Some(name.clone());
            input_lifetimes.push(name.clone());
            if is_self {
                *self_lifetime = Some(name.clone());
            }
            elide_arg_type(inner, false, Some(name), gen, input_lifetimes, self_lifetime);
        }
        TypeRef::TraitObject { lifetimes, .. } => elide_trait_object(lifetimes, ambient),
        TypeRef::ErasedType { traits, maybe_traits, lifetimes } => {
            elide_erased_type(traits, maybe_traits, lifetimes, gen)
        }
        TypeRef::Tuple(elems) => {
            for e in elems {
                elide_arg_type(e, false, ambient.clone(), gen, input_lifetimes, self_lifetime);
            }
        }
        TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            elide_arg_type(inner, false, ambient, gen, input_lifetimes, self_lifetime)
        }
        TypeRef::Array { inner, .. } => elide_arg_type(inner, false, ambient, gen, input_lifetimes, self_lifetime),
        TypeRef::Function(f) => {
            for a in &mut f.args {
                elide_arg_type(a, false, None, gen, input_lifetimes, self_lifetime);
            }
            elide_arg_type(&mut f.ret, false, None, gen, input_lifetimes, self_lifetime);
        }
        _ => {}
    }
}

fn elide_return_type(
    ty: &mut TypeRef,
    chosen: Option<&str>,
    gen: &mut LifetimeGen,
    dcx: &DiagCtxt,
    span: &Span,
    ambient: Option<String>,
) {
    match ty {
        TypeRef::Borrow { lifetime, inner, .. } => {
            let name = match (&lifetime, chosen) {
                (Some(l), _) => l.clone(),
                (None, Some(c)) => c.to_string(),
                (None, None) => {
                    dcx.error(
                        span.clone(),
                        ErrorCode::E0000,
                        "cannot infer an appropriate lifetime for this reference in the return type",
                    );
                    "'static".to_string()
                }
            };
            *lifetime = Some(name.clone());
            elide_return_type(inner, chosen, gen, dcx, span, Some(name));
        }
        TypeRef::TraitObject { lifetimes, .. } => elide_trait_object(lifetimes, ambient),
        TypeRef::ErasedType { traits, maybe_traits, lifetimes } => {
            elide_erased_type(traits, maybe_traits, lifetimes, gen)
        }
        TypeRef::Tuple(elems) => {
            for e in elems {
                elide_return_type(e, chosen, gen, dcx, span, ambient.clone());
            }
        }
        TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            elide_return_type(inner, chosen, gen, dcx, span, ambient)
        }
        TypeRef::Array { inner, .. } => elide_return_type(inner, chosen, gen, dcx, span, ambient),
        _ => {}
    }
}

/// RFC 599 `dyn Trait` default: the nearest enclosing reference's
/// lifetime, else `'static`.
fn elide_trait_object(lifetimes: &mut Vec<String>, ambient: Option<String>) {
    if !lifetimes.is_empty() {
        return;
    }
    lifetimes.push(ambient.unwrap_or_else(|| "'static".to_string()));
}

/// `impl Trait` capture rule: union the lifetimes named on its trait
/// bounds; collapse more than one distinct name to a single fresh one.
fn elide_erased_type(
    traits: &[rc_ast::path::GenericPath],
    maybe_traits: &[rc_ast::path::GenericPath],
    lifetimes: &mut Vec<String>,
    gen: &mut LifetimeGen,
) {
    if !lifetimes.is_empty() {
        return;
    }
    let mut captured: Vec<String> = Vec::new();
    for t in traits.iter().chain(maybe_traits.iter()) {
        for l in &t.args.lifetimes {
            if !captured.contains(l) {
                captured.push(l.clone());
            }
        }
    }
    match captured.len() {
        0 => {}
        1 => *lifetimes = captured,
        _ => *lifetimes = vec![gen.fresh()],
    }
}

/// Elide every lifetime in one function's signature in place.
pub fn elide_function(f: &mut FunctionDef, dcx: &DiagCtxt, span: &Span) {
    let mut gen = LifetimeGen(0);
    let mut input_lifetimes = Vec::new();
    let mut self_lifetime = None;
    for (name, ty) in &mut f.args {
        elide_arg_type(ty, name == "self", None, &mut gen, &mut input_lifetimes, &mut self_lifetime);
    }
    let distinct = dedup_preserve_order(&input_lifetimes);
    let chosen = self_lifetime.clone().or_else(|| {
        if distinct.len() == 1 {
            Some(distinct[0].clone())
        } else {
            None
        }
    });
    elide_return_type(&mut f.ret, chosen.as_deref(), &mut gen, dcx, span, None);
}

/// Run `elide_function` over every function item in the crate — this
/// rule applies uniformly to every signature, not just methods.
pub fn lifetime_elision(crate_: &mut rc_ast::krate::Crate, dcx: &DiagCtxt) {
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        if let rc_ast::item::ItemKind::Function(f) = &mut crate_.get_mut(iid).kind {
            elide_function(f, dcx, &span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::types::Primitive;

    fn borrow(lifetime: Option<&str>, inner: TypeRef) -> TypeRef {
        TypeRef::Borrow { lifetime: lifetime.map(str::to_string), is_mut: false, inner: Box::new(inner) }
    }

    #[test]
    fn self_borrow_lifetime_flows_to_the_return_type() {
        let mut f = FunctionDef {
            generics: Default::default(),
            args: vec![("self".into(), borrow(None, TypeRef::Unit))],
            ret: borrow(None, TypeRef::Primitive(Primitive::U8)),
            body: None,
        };
        let dcx = DiagCtxt::new();
        elide_function(&mut f, &dcx, &Span::dummy());
        assert!(!dcx.had_errors());
        let self_lt = match &f.args[0].1 {
            TypeRef::Borrow { lifetime, .. } => lifetime.clone().unwrap(),
            _ => panic!(),
        };
        match &f.ret {
            TypeRef::Borrow { lifetime, .. } => assert_eq!(lifetime.as_deref(), Some(self_lt.as_str())),
            _ => panic!(),
        }
    }

    #[test]
    fn sole_input_lifetime_flows_to_the_return_type_without_self() {
        let mut f = FunctionDef {
            generics: Default::default(),
            args: vec![("x".into(), borrow(None, TypeRef::Unit))],
            ret: borrow(None, TypeRef::Unit),
            body: None,
        };
        let dcx = DiagCtxt::new();
        elide_function(&mut f, &dcx, &Span::dummy());
        assert!(!dcx.had_errors());
        let arg_lt = match &f.args[0].1 {
            TypeRef::Borrow { lifetime, .. } => lifetime.clone().unwrap(),
            _ => panic!(),
        };
        match &f.ret {
            TypeRef::Borrow { lifetime, .. } => assert_eq!(lifetime.as_deref(), Some(arg_lt.as_str())),
            _ => panic!(),
        }
    }

    #[test]
    fn ambiguous_output_lifetime_with_two_inputs_is_an_error() {
        let mut f = FunctionDef {
            generics: Default::default(),
            args: vec![
                ("a".into(), borrow(None, TypeRef::Unit)),
                ("b".into(), borrow(None, TypeRef::Unit)),
            ],
            ret: borrow(None, TypeRef::Unit),
            body: None,
        };
        let dcx = DiagCtxt::new();
        elide_function(&mut f, &dcx, &Span::dummy());
        assert!(dcx.had_errors());
    }

    #[test]
    fn dyn_trait_defaults_to_enclosing_reference_lifetime() {
        let mut f = FunctionDef {
            generics: Default::default(),
            args: vec![(
                "x".into(),
                borrow(None, TypeRef::TraitObject { traits: vec![], lifetimes: vec![] }),
            )],
            ret: TypeRef::Unit,
            body: None,
        };
        let dcx = DiagCtxt::new();
        elide_function(&mut f, &dcx, &Span::dummy());
        match &f.args[0].1 {
            TypeRef::Borrow { lifetime, inner, .. } => match inner.as_ref() {
                TypeRef::TraitObject { lifetimes, .. } => {
                    assert_eq!(lifetimes, &vec![lifetime.clone().unwrap()]);
                }
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn bare_dyn_trait_with_no_enclosing_reference_defaults_to_static() {
        let mut lifetimes = Vec::new();
        elide_trait_object(&mut lifetimes, None);
        assert_eq!(lifetimes, vec!["'static".to_string()]);
    }
}
