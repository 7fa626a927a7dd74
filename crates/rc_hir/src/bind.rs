//! `Bind`: walk every type path and pattern path in
//! the crate and attach a `PathBinding` to the `Struct`/`Enum`/
//! `EnumVariant`/`Module` it names. Asserts P1 ("after `Bind`, every
//! `PathBinding` on a type path is non-`Unbound` or the program is
//! ill-formed") by emitting an error rather than leaving a path
//! silently unbound.

use rc_ast::item::ItemKind;
use rc_ast::krate::Crate;
use rc_ast::path::Path;
use rc_ast::pattern::Pattern;
use rc_ast::types::TypeRef;
use rc_span::{DiagCtxt, ErrorCode, Span};

use crate::name_lookup::{self, NameTarget};
use crate::walk;

/// Resolve and bind a single path in place, reporting E0000 if the name
/// doesn't resolve to anything this narrow walker understands (a
/// generic parameter or local binding are not errors here — they are
/// simply left `Unbound` for the caller to recognise as "not a path
/// this pass owns").
fn bind_path(crate_: &Crate, dcx: &DiagCtxt, span: &Span, path: &mut Path) -> Option<NameTarget> {
    let nodes = name_lookup::path_nodes(path)?;
    let Some((target, target_path)) = name_lookup::resolve_name_target(crate_, &nodes) else {
        return None;
    };
    match name_lookup::to_path_binding(crate_, target, target_path) {
        Some(binding) => {
            path.bind(span, binding);
            Some(target)
        }
        None => {
            dcx.error(span.clone(), ErrorCode::E0000, format!("path does not name a bindable item: {nodes:?}"));
            None
        }
    }
}

fn bind_type(crate_: &Crate, dcx: &DiagCtxt, span: &Span, ty: &mut TypeRef) {
    match ty {
        TypeRef::Path(p) => {
            bind_path(crate_, dcx, span, p);
        }
        TypeRef::Tuple(elems) => {
            for e in elems {
                bind_type(crate_, dcx, span, e);
            }
        }
        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            bind_type(crate_, dcx, span, inner);
        }
        TypeRef::Array { inner, .. } => bind_type(crate_, dcx, span, inner),
        _ => {}
    }
}

/// Walk every struct/enum/union field, function arg/return, const/static
/// type, and impl self-type, binding each reachable `Path`.
pub fn bind_types(crate_: &mut Crate, dcx: &DiagCtxt) {
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        let mut kind = std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None);
        match &mut kind {
            ItemKind::Struct(s) => {
                for (_, ty) in &mut s.fields {
                    bind_type(crate_, dcx, &span, ty);
                }
            }
            ItemKind::Union(u) => {
                for (_, ty) in &mut u.fields {
                    bind_type(crate_, dcx, &span, ty);
                }
            }
            ItemKind::Enum(e) => {
                for v in &mut e.variants {
                    for (_, ty) in &mut v.fields {
                        bind_type(crate_, dcx, &span, ty);
                    }
                }
            }
            ItemKind::Function(f) => {
                for (_, ty) in &mut f.args {
                    bind_type(crate_, dcx, &span, ty);
                }
                bind_type(crate_, dcx, &span, &mut f.ret);
            }
            ItemKind::Static { ty, .. } | ItemKind::Const { ty, .. } => bind_type(crate_, dcx, &span, ty),
            ItemKind::Impl(imp) => bind_type(crate_, dcx, &span, &mut imp.self_ty),
            _ => {}
        }
        crate_.get_mut(iid).kind = kind;
    }
}

/// Bind every `Struct`/`TupleStruct`/`WildcardVariant` pattern's path
/// inside function bodies, then assert the pattern's own shape matches
/// the variant it resolved to.
/// `MaybeBind` should already be gone by this point (`ExpandAliases`
/// collapses it); any survivor is treated as a tuple-style binding,
/// mirroring `collapse_maybe_bind`'s own fallback.
pub fn bind_patterns(crate_: &mut Crate, dcx: &DiagCtxt) {
    for iid in crate_.all_item_ids() {
        let span = crate_.get(iid).span.clone();
        let mut body = match std::mem::replace(&mut crate_.get_mut(iid).kind, ItemKind::None) {
            ItemKind::Function(mut f) => {
                let body = f.body.take();
                crate_.get_mut(iid).kind = ItemKind::Function(f);
                body
            }
            other => {
                crate_.get_mut(iid).kind = other;
                None
            }
        };
        if let Some(expr) = &mut body {
            walk::visit_patterns_in_expr(expr, &mut |pat| {
                walk::visit_subpatterns(pat, &mut |p| bind_one_pattern(crate_, dcx, &span, p));
            });
        }
        if let ItemKind::Function(f) = &mut crate_.get_mut(iid).kind {
            f.body = body;
        }
    }
}

fn bind_one_pattern(crate_: &Crate, dcx: &DiagCtxt, span: &Span, pat: &mut Pattern) {
    let path = match pat {
        Pattern::Struct { path, .. } | Pattern::TupleStruct { path, .. } | Pattern::WildcardVariant { path } => {
            path
        }
        _ => return,
    };
    let Some(target) = bind_path(crate_, dcx, span, path) else { return };
    let is_tuple = name_lookup::is_tuple_shaped(crate_, target);
    let is_unit = name_lookup::is_unit_shaped(crate_, target);
    pat.assert_matches_variant_shape(is_tuple, is_unit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::expr::{Expr, ExprKind};
    use rc_ast::item::{EnumDef, EnumVariant, FunctionDef, Item, Visibility};
    use rc_ast::path::{PathBinding, PathNode};

    #[test]
    fn tuple_variant_pattern_binds_to_its_enum_variant() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new(
            "E",
            ItemKind::Enum(EnumDef {
                generics: Default::default(),
                variants: vec![EnumVariant {
                    name: "V".into(),
                    is_tuple: true,
                    is_unit: false,
                    fields: vec![("0".into(), TypeRef::Primitive(rc_ast::types::Primitive::U32))],
                    discriminant: None,
                }],
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        let body = Expr::new(
            Span::dummy(),
            ExprKind::Match {
                scrutinee: Box::new(Expr::new(Span::dummy(), ExprKind::PathExpr(Box::new(Path::local("x"))))),
                arms: vec![(
                    Pattern::TupleStruct {
                        path: Path::relative(vec![PathNode::plain("E"), PathNode::plain("V")]),
                        fields: vec![],
                    },
                    Expr::new(Span::dummy(), ExprKind::BoolLit(true)),
                )],
            },
        );
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(FunctionDef { generics: Default::default(), args: vec![], ret: TypeRef::Unit, body: Some(body) }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        bind_patterns(&mut c, &dcx);
        assert!(!dcx.had_errors());
        match &c.get(fid).kind {
            ItemKind::Function(f) => match &f.body.as_ref().unwrap().kind {
                ExprKind::Match { arms, .. } => match &arms[0].0 {
                    Pattern::TupleStruct { path, .. } => {
                        assert!(matches!(&path.binding, PathBinding::EnumVariant { idx: 0, .. }));
                    }
                    _ => panic!("expected tuple struct pattern"),
                },
                _ => panic!("expected match"),
            },
            _ => panic!("expected fn"),
        }
    }

    #[test]
    fn type_path_binds_to_struct() {
        let mut c = Crate::new("demo");
        let root = c.root_module;
        c.add_item(root, true, Item::new(
            "S",
            ItemKind::Struct(rc_ast::item::StructDef { generics: Default::default(), is_tuple: false, fields: vec![] }),
            Span::dummy(),
            Visibility::Public,
        ));
        let fid = c.add_item(root, true, Item::new(
            "f",
            ItemKind::Function(FunctionDef {
                generics: Default::default(),
                args: vec![],
                ret: TypeRef::Path(Box::new(Path::relative(vec![PathNode::plain("S")]))),
                body: None,
            }),
            Span::dummy(),
            Visibility::Public,
        ));
        c.rebuild_indexes();
        let dcx = DiagCtxt::new();
        bind_types(&mut c, &dcx);
        assert!(!dcx.had_errors());
        match &c.get(fid).kind {
            ItemKind::Function(f) => match &f.ret {
                TypeRef::Path(p) => assert!(matches!(&p.binding, PathBinding::Struct(_))),
                _ => panic!("expected path"),
            },
            _ => panic!("expected fn"),
        }
    }
}
