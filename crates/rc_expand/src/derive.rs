//! Built-in `#[derive(...)]` handlers.
//!
//! Each handler builds an [`Impl`] from the declaring `GenericParams`, the
//! target `TypeRef`, and the struct/enum/union definition, following
//! `Deriver::handle_item` in the original: clone the declared generics,
//! add a `Ti: Trait` bound for every type parameter plus every field type
//! that mentions one, then emit one method per trait requirement. Method
//! bodies are left as [`ExprKind::Synthetic`] placeholders — full
//! codegen is MIR-construction's job and out of scope here.

use rc_ast::expr::{Expr, ExprKind};
use rc_ast::generics::{GenericBound, GenericParamKind, GenericParams};
use rc_ast::item::{EnumDef, FunctionDef, StructDef, UnionDef};
use rc_ast::path::{AbsolutePath, GenericPath};
use rc_ast::types::{Primitive, TypeRef};
use rc_span::{DiagCtxt, ErrorCode, Span};

/// Sentinel index marking a `Self` type reference, matching the
/// original's `TypeRef(sp, "Self", 0xFFFF)` convention.
const SELF_INDEX: u32 = u32::MAX;

fn self_ty() -> TypeRef {
    TypeRef::Generic { name: "Self".into(), index: SELF_INDEX }
}

fn borrow(is_mut: bool, inner: TypeRef) -> TypeRef {
    TypeRef::Borrow { lifetime: None, is_mut, inner: Box::new(inner) }
}

fn core_path(core_name: &str, module: &str, name: &str) -> GenericPath {
    GenericPath::new(AbsolutePath::crate_root(core_name).child(module).child(name))
}

/// The impl a deriver produces: the caller (the expansion driver) is
/// responsible for allocating the method bodies and the impl itself as
/// items in the owning `Crate`, since derivers themselves have no arena
/// access.
#[derive(Debug, Clone)]
pub struct DerivedImpl {
    pub generics: GenericParams,
    pub trait_path: GenericPath,
    pub self_ty: TypeRef,
    pub methods: Vec<(String, FunctionDef)>,
}

#[derive(thiserror::Error, Debug)]
#[error("cannot derive({trait_name}) on a union")]
pub struct DeriveOnUnionError {
    pub trait_name: &'static str,
}

/// Walk `ty` looking for uses of one of `params`'s type parameters,
/// recording the outermost type that mentions one: for each field type,
/// locate used generic parameters and the sub-types that directly use
/// them. Mirrors `add_field_bound_from_ty`.
fn add_field_bound_from_ty(params: &GenericParams, out: &mut Vec<TypeRef>, ty: &TypeRef) {
    match ty {
        TypeRef::Tuple(inner) => {
            for t in inner {
                add_field_bound_from_ty(params, out, t);
            }
        }
        TypeRef::Borrow { inner, .. } | TypeRef::Pointer { inner, .. } | TypeRef::Slice(inner) => {
            add_field_bound_from_ty(params, out, inner);
        }
        TypeRef::Array { inner, .. } => add_field_bound_from_ty(params, out, inner),
        TypeRef::Path(path) => {
            if let rc_ast::path::PathKind::Relative(nodes) = &path.kind {
                if let Some(first) = nodes.first() {
                    let names_a_param = params.params.iter().any(|p| {
                        matches!(p.kind, GenericParamKind::Type { .. }) && p.name == first.name
                    });
                    if names_a_param {
                        add_field_bound(out, ty);
                    }
                }
                for node in nodes {
                    for t in &node.args.types {
                        add_field_bound_from_ty(params, out, t);
                    }
                    for (_, t) in &node.args.assoc {
                        add_field_bound_from_ty(params, out, t);
                    }
                }
            }
        }
        // Generic params are already handled directly by get_params_with_bounds;
        // primitives, Any/Bang/Unit/Function/TraitObject/ErasedType/MacroPending
        // don't carry a dependency on an owning type parameter worth bounding.
        _ => {}
    }
}

fn add_field_bound(out: &mut Vec<TypeRef>, ty: &TypeRef) {
    if !out.iter().any(|t| t.ord(ty) == std::cmp::Ordering::Equal) {
        out.push(ty.clone());
    }
}

fn get_field_bounds_struct(str: &StructDef) -> Vec<TypeRef> {
    let mut ret = Vec::new();
    for (_, ty) in &str.fields {
        add_field_bound_from_ty(&str.generics, &mut ret, ty);
    }
    ret
}

fn get_field_bounds_enum(enm: &EnumDef) -> Vec<TypeRef> {
    let mut ret = Vec::new();
    for v in &enm.variants {
        for (_, ty) in &v.fields {
            add_field_bound_from_ty(&enm.generics, &mut ret, ty);
        }
    }
    ret
}

fn get_field_bounds_union(unn: &UnionDef) -> Vec<TypeRef> {
    let mut ret = Vec::new();
    for (_, ty) in &unn.fields {
        add_field_bound_from_ty(&unn.generics, &mut ret, ty);
    }
    ret
}

/// Clone `p`, then add a `Ti: trait_path` bound for every declared type
/// parameter plus one for each of `additional_bounded_types`.
fn get_params_with_bounds(
    p: &GenericParams,
    trait_path: &GenericPath,
    additional_bounded_types: Vec<TypeRef>,
) -> GenericParams {
    let mut params = p.clone();
    let mut i = 0u32;
    for idx in 0..params.params.len() {
        if matches!(params.params[idx].kind, GenericParamKind::Type { .. }) {
            let name = params.params[idx].name.clone();
            params.push_where_bound(GenericBound::IsTrait {
                hrbs_outer: vec![],
                ty: TypeRef::Generic { name, index: i },
                hrbs_inner: vec![],
                trait_path: trait_path.clone(),
            });
            i += 1;
        }
    }
    for ty in additional_bounded_types {
        params.push_where_bound(GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty,
            hrbs_inner: vec![],
            trait_path: trait_path.clone(),
        });
    }
    params
}

fn fn_def(
    generics: GenericParams,
    args: Vec<(String, TypeRef)>,
    ret: TypeRef,
    body_tag: &'static str,
    span: Span,
) -> FunctionDef {
    FunctionDef {
        generics,
        args,
        ret,
        body: Some(Expr::new(span, ExprKind::Synthetic(body_tag))),
    }
}

/// Interface every built-in derive handler implements.
pub trait Deriver {
    fn trait_name(&self) -> &'static str;
    fn core_crate(&self) -> &'static str {
        "core"
    }

    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl;
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl;

    /// `false` for derives that categorically can't apply to an enum
    /// (only `Default` today: "for enums this is an error" — picking a
    /// variant to default-construct needs a `#[default]` tag this
    /// registry doesn't parse). Checked by the caller *before*
    /// `handle_enum` runs, so implementors of this method never need a
    /// dummy `EnumDef` to refuse with.
    fn supports_enum(&self) -> bool {
        true
    }

    fn handle_union(
        &self,
        _sp: Span,
        _p: &GenericParams,
        _ty: &TypeRef,
        _unn: &UnionDef,
    ) -> Result<DerivedImpl, DeriveOnUnionError> {
        Err(DeriveOnUnionError { trait_name: self.trait_name() })
    }

    /// Report the union rejection through a `DiagCtxt` rather than
    /// letting the caller decide whether it's fatal — matches the
    /// `ERROR(sp, E0000, ...)` call in the original's default
    /// `handle_item(..., Union&)` overload.
    fn handle_union_reporting(
        &self,
        dcx: &DiagCtxt,
        sp: Span,
        p: &GenericParams,
        ty: &TypeRef,
        unn: &UnionDef,
    ) -> Option<DerivedImpl> {
        match self.handle_union(sp.clone(), p, ty, unn) {
            Ok(derived) => Some(derived),
            Err(e) => {
                dcx.error(sp, ErrorCode::E0000, e.to_string());
                None
            }
        }
    }
}

pub struct Debug;
impl Deriver for Debug {
    fn trait_name(&self) -> &'static str {
        "Debug"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "fmt", "Debug");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let fmt = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("f".into(), borrow(true, TypeRef::Path(Box::new(path_to(self.core_crate(), "fmt", "Formatter"))))),
            ],
            TypeRef::Path(Box::new(path_to(self.core_crate(), "fmt", "Result"))),
            "derived_debug_fmt",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("fmt".into(), fmt)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "fmt", "Debug");
        let fields = get_field_bounds_enum(enm);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let fmt = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("f".into(), borrow(true, TypeRef::Path(Box::new(path_to(self.core_crate(), "fmt", "Formatter"))))),
            ],
            TypeRef::Path(Box::new(path_to(self.core_crate(), "fmt", "Result"))),
            "derived_debug_fmt",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("fmt".into(), fmt)] }
    }
}

/// Build a bound, non-generic `TypeRef::Path` to `crate_name::module::name`
/// (used for well-known core/std types referenced in derive signatures).
fn path_to(crate_name: &str, module: &str, name: &str) -> rc_ast::path::Path {
    let abs = AbsolutePath::crate_root(crate_name).child(module).child(name);
    rc_ast::path::Path {
        kind: rc_ast::path::PathKind::Absolute {
            krate: crate_name.into(),
            nodes: vec![
                rc_ast::path::PathNode::plain(module),
                rc_ast::path::PathNode::plain(name),
            ],
        },
        binding: rc_ast::path::PathBinding::Module(abs),
    }
}

macro_rules! simple_binop_deriver {
    ($name:ident, $trait_name:literal, $module:literal, $method:literal, $ret:expr, $tag:literal) => {
        pub struct $name;
        impl Deriver for $name {
            fn trait_name(&self) -> &'static str {
                $trait_name
            }
            fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
                let trait_path = core_path(self.core_crate(), $module, $trait_name);
                let fields = get_field_bounds_struct(str);
                let generics = get_params_with_bounds(p, &trait_path, fields);
                let method = fn_def(
                    GenericParams::default(),
                    vec![("self".into(), borrow(false, self_ty())), ("other".into(), borrow(false, self_ty()))],
                    $ret,
                    $tag,
                    sp,
                );
                DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![($method.into(), method)] }
            }
            fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
                let trait_path = core_path(self.core_crate(), $module, $trait_name);
                let fields = get_field_bounds_enum(enm);
                let generics = get_params_with_bounds(p, &trait_path, fields);
                let method = fn_def(
                    GenericParams::default(),
                    vec![("self".into(), borrow(false, self_ty())), ("other".into(), borrow(false, self_ty()))],
                    $ret,
                    $tag,
                    sp,
                );
                DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![($method.into(), method)] }
            }
        }
    };
}

simple_binop_deriver!(PartialEq, "PartialEq", "cmp", "eq", TypeRef::Primitive(Primitive::Bool), "derived_partial_eq");
simple_binop_deriver!(Ord, "Ord", "cmp", "cmp", ord_ordering_ty(), "derived_ord_cmp");

fn ord_ordering_ty() -> TypeRef {
    TypeRef::Path(Box::new(path_to("core", "cmp", "Ordering")))
}

pub struct PartialOrd;
impl Deriver for PartialOrd {
    fn trait_name(&self) -> &'static str {
        "PartialOrd"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "cmp", "PartialOrd");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let method = fn_def(
            GenericParams::default(),
            vec![("self".into(), borrow(false, self_ty())), ("other".into(), borrow(false, self_ty()))],
            option_of(ord_ordering_ty()),
            "derived_partial_cmp",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("partial_cmp".into(), method)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "cmp", "PartialOrd");
        let fields = get_field_bounds_enum(enm);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let method = fn_def(
            GenericParams::default(),
            vec![("self".into(), borrow(false, self_ty())), ("other".into(), borrow(false, self_ty()))],
            option_of(ord_ordering_ty()),
            "derived_partial_cmp",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("partial_cmp".into(), method)] }
    }
}

fn option_of(inner: TypeRef) -> TypeRef {
    TypeRef::Path(Box::new(rc_ast::path::Path {
        kind: rc_ast::path::PathKind::Absolute {
            krate: "core".into(),
            nodes: vec![rc_ast::path::PathNode { name: "Option".into(), args: rc_ast::generics::GenericArgs { lifetimes: vec![], types: vec![inner], assoc: vec![] } }],
        },
        binding: rc_ast::path::PathBinding::Unbound,
    }))
}

/// `Eq`/`Copy` are marker traits: the impl carries the bound generics
/// but no methods at all.
pub struct Eq;
impl Deriver for Eq {
    fn trait_name(&self) -> &'static str {
        "Eq"
    }
    fn handle_struct(&self, _sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "cmp", "Eq");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![] }
    }
    fn handle_enum(&self, _sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "cmp", "Eq");
        let fields = get_field_bounds_enum(enm);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![] }
    }
}

pub struct Copy;
impl Deriver for Copy {
    fn trait_name(&self) -> &'static str {
        "Copy"
    }
    fn handle_struct(&self, _sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "marker", "Copy");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![] }
    }
    fn handle_enum(&self, _sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "marker", "Copy");
        let fields = get_field_bounds_enum(enm);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![] }
    }
}

pub struct Clone;
impl Deriver for Clone {
    fn trait_name(&self) -> &'static str {
        "Clone"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "clone", "Clone");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let method = fn_def(GenericParams::default(), vec![("self".into(), borrow(false, self_ty()))], self_ty(), "derived_clone", sp);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("clone".into(), method)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "clone", "Clone");
        let fields = get_field_bounds_enum(enm);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let method = fn_def(GenericParams::default(), vec![("self".into(), borrow(false, self_ty()))], self_ty(), "derived_clone", sp);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("clone".into(), method)] }
    }
}

pub struct Default;
impl Deriver for Default {
    fn trait_name(&self) -> &'static str {
        "Default"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "default", "Default");
        let fields = get_field_bounds_struct(str);
        let generics = get_params_with_bounds(p, &trait_path, fields);
        let method = fn_def(GenericParams::default(), vec![], self_ty(), "derived_default", sp);
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("default".into(), method)] }
    }
    fn supports_enum(&self) -> bool {
        false
    }
    fn handle_enum(&self, _sp: Span, _p: &GenericParams, _ty: &TypeRef, _enm: &EnumDef) -> DerivedImpl {
        unreachable!("caller must check supports_enum() before calling handle_enum on Default")
    }
}

pub struct Hash;
impl Deriver for Hash {
    fn trait_name(&self) -> &'static str {
        "Hash"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "hash", "Hash");
        let fields = get_field_bounds_struct(str);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__H", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__H".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "hash", "Hasher"),
        }]);
        let h_idx = generics.params.len() as u32 - 1;
        let method = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("state".into(), borrow(true, TypeRef::Generic { name: "__H".into(), index: h_idx })),
            ],
            TypeRef::Unit,
            "derived_hash",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("hash".into(), method)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "hash", "Hash");
        let fields = get_field_bounds_enum(enm);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__H", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__H".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "hash", "Hasher"),
        }]);
        let h_idx = generics.params.len() as u32 - 1;
        let method = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("state".into(), borrow(true, TypeRef::Generic { name: "__H".into(), index: h_idx })),
            ],
            TypeRef::Unit,
            "derived_hash",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("hash".into(), method)] }
    }
}

/// `rustc-serialize`-style `Encodable`/`Decodable`, named
/// `RustcEncodable`/`RustcDecodable` to match the derive names mrustc's
/// std/test suite actually uses.
pub struct RustcEncodable;
impl Deriver for RustcEncodable {
    fn trait_name(&self) -> &'static str {
        "Encodable"
    }
    fn core_crate(&self) -> &'static str {
        "rustc_serialize"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "serialize", "Encodable");
        let fields = get_field_bounds_struct(str);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__S", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__S".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "serialize", "Encoder"),
        }]);
        let s_idx = generics.params.len() as u32 - 1;
        let method = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("s".into(), borrow(true, TypeRef::Generic { name: "__S".into(), index: s_idx })),
            ],
            encode_result_ty(s_idx),
            "derived_encode",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("encode".into(), method)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "serialize", "Encodable");
        let fields = get_field_bounds_enum(enm);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__S", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__S".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "serialize", "Encoder"),
        }]);
        let s_idx = generics.params.len() as u32 - 1;
        let method = fn_def(
            GenericParams::default(),
            vec![
                ("self".into(), borrow(false, self_ty())),
                ("s".into(), borrow(true, TypeRef::Generic { name: "__S".into(), index: s_idx })),
            ],
            encode_result_ty(s_idx),
            "derived_encode",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("encode".into(), method)] }
    }
}

fn encode_result_ty(s_idx: u32) -> TypeRef {
    TypeRef::Path(Box::new(rc_ast::path::Path {
        kind: rc_ast::path::PathKind::Absolute {
            krate: "core".into(),
            nodes: vec![rc_ast::path::PathNode {
                name: "Result".into(),
                args: rc_ast::generics::GenericArgs {
                    lifetimes: vec![],
                    types: vec![TypeRef::Unit, assoc_error_ty(s_idx)],
                    assoc: vec![],
                },
            }],
        },
        binding: rc_ast::path::PathBinding::Unbound,
    }))
}

fn assoc_error_ty(s_idx: u32) -> TypeRef {
    TypeRef::Path(Box::new(rc_ast::path::Path {
        kind: rc_ast::path::PathKind::UfcsInherent {
            ty: Box::new(TypeRef::Generic { name: "__S".into(), index: s_idx }),
            item: "Error".into(),
        },
        binding: rc_ast::path::PathBinding::Unbound,
    }))
}

pub struct RustcDecodable;
impl Deriver for RustcDecodable {
    fn trait_name(&self) -> &'static str {
        "Decodable"
    }
    fn core_crate(&self) -> &'static str {
        "rustc_serialize"
    }
    fn handle_struct(&self, sp: Span, p: &GenericParams, ty: &TypeRef, str: &StructDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "serialize", "Decodable");
        let fields = get_field_bounds_struct(str);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__D", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__D".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "serialize", "Decoder"),
        }]);
        let d_idx = generics.params.len() as u32 - 1;
        // `decode` is a static (no-`self`) associated function.
        let method = fn_def(
            GenericParams::default(),
            vec![("d".into(), borrow(true, TypeRef::Generic { name: "__D".into(), index: d_idx }))],
            decode_result_ty(d_idx),
            "derived_decode",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("decode".into(), method)] }
    }
    fn handle_enum(&self, sp: Span, p: &GenericParams, ty: &TypeRef, enm: &EnumDef) -> DerivedImpl {
        let trait_path = core_path(self.core_crate(), "serialize", "Decodable");
        let fields = get_field_bounds_enum(enm);
        let mut generics = get_params_with_bounds(p, &trait_path, fields);
        generics.push_type_param("__D", vec![GenericBound::IsTrait {
            hrbs_outer: vec![],
            ty: TypeRef::Generic { name: "__D".into(), index: generics.params.len() as u32 },
            hrbs_inner: vec![],
            trait_path: core_path(self.core_crate(), "serialize", "Decoder"),
        }]);
        let d_idx = generics.params.len() as u32 - 1;
        let method = fn_def(
            GenericParams::default(),
            vec![("d".into(), borrow(true, TypeRef::Generic { name: "__D".into(), index: d_idx }))],
            decode_result_ty(d_idx),
            "derived_decode",
            sp,
        );
        DerivedImpl { generics, trait_path, self_ty: ty.clone(), methods: vec![("decode".into(), method)] }
    }
}

fn decode_result_ty(d_idx: u32) -> TypeRef {
    TypeRef::Path(Box::new(rc_ast::path::Path {
        kind: rc_ast::path::PathKind::Absolute {
            krate: "core".into(),
            nodes: vec![rc_ast::path::PathNode {
                name: "Result".into(),
                args: rc_ast::generics::GenericArgs { lifetimes: vec![], types: vec![self_ty(), assoc_error_ty(d_idx)], assoc: vec![] },
            }],
        },
        binding: rc_ast::path::PathBinding::Unbound,
    }))
}

/// Resolve a `#[derive(Name)]` identifier to its handler. Unknown names are a registry lookup miss, not a panic here — the
/// caller decides whether that's a hard error or (for e.g. a
/// `#[proc_macro_derive]`) a handoff to IPC.
pub fn lookup(name: &str) -> Option<Box<dyn Deriver>> {
    Some(match name {
        "Debug" => Box::new(Debug),
        "PartialEq" => Box::new(PartialEq),
        "PartialOrd" => Box::new(PartialOrd),
        "Eq" => Box::new(Eq),
        "Ord" => Box::new(Ord),
        "Clone" => Box::new(Clone),
        "Copy" => Box::new(Copy),
        "Default" => Box::new(Default),
        "Hash" => Box::new(Hash),
        "RustcEncodable" => Box::new(RustcEncodable),
        "RustcDecodable" => Box::new(RustcDecodable),
        _ => return None,
    })
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use rc_ast::path::AbsolutePath as Abs;

    fn demo_struct() -> (GenericParams, TypeRef, StructDef) {
        let mut p = GenericParams::default();
        p.push_type_param("T", vec![]);
        let ty = TypeRef::Path(Box::new(path_to("demo", "", "S")));
        let str = StructDef {
            generics: p.clone(),
            is_tuple: false,
            fields: vec![("x".into(), TypeRef::Generic { name: "T".into(), index: 0 })],
        };
        (p, ty, str)
    }

    #[test]
    fn lookup_resolves_all_builtin_names() {
        for name in [
            "Debug", "PartialEq", "PartialOrd", "Eq", "Ord", "Clone", "Copy", "Default", "Hash",
            "RustcEncodable", "RustcDecodable",
        ] {
            assert!(lookup(name).is_some(), "missing deriver for {name}");
        }
        assert!(lookup("NotReal").is_none());
    }

    #[test]
    fn debug_adds_field_bound_for_generic_field() {
        let (p, ty, str) = demo_struct();
        let derived = Debug.handle_struct(Span::dummy(), &p, &ty, &str);
        // one inline bound for T plus one where-bound we just added for T again
        // (the field `x: T` re-uses T directly, so it's captured by the
        // type-parameter loop, not the field-bound loop) -- assert the
        // type-parameter bound landed at minimum.
        assert!(derived.generics.bounds.iter().any(|b| matches!(b,
            GenericBound::IsTrait { trait_path, .. } if trait_path.path == Abs::crate_root("core").child("fmt").child("Debug")
        )));
        assert_eq!(derived.methods.len(), 1);
        assert_eq!(derived.methods[0].0, "fmt");
    }

    #[test]
    fn field_bound_recurses_through_tuple_and_borrow() {
        let mut p = GenericParams::default();
        p.push_type_param("T", vec![]);
        let mut out = Vec::new();
        // `T` as a bare path node named "T" matches the param name.
        let path_ty = TypeRef::Path(Box::new(rc_ast::path::Path {
            kind: rc_ast::path::PathKind::Relative(vec![rc_ast::path::PathNode::plain("T")]),
            binding: rc_ast::path::PathBinding::Unbound,
        }));
        let wrapped = TypeRef::Tuple(vec![path_ty]);
        add_field_bound_from_ty(&p, &mut out, &wrapped);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn eq_and_copy_are_marker_impls_with_no_methods() {
        let (p, ty, str) = demo_struct();
        assert!(Eq.handle_struct(Span::dummy(), &p, &ty, &str).methods.is_empty());
        assert!(Copy.handle_struct(Span::dummy(), &p, &ty, &str).methods.is_empty());
    }

    #[test]
    fn handle_union_reporting_emits_E0000_for_non_union_safe_derive() {
        let dcx = DiagCtxt::new();
        let unn = UnionDef { generics: GenericParams::default(), fields: vec![] };
        let ty = TypeRef::Path(Box::new(path_to("demo", "", "U")));
        let got = Debug.handle_union_reporting(&dcx, Span::dummy(), &GenericParams::default(), &ty, &unn);
        assert!(got.is_none());
        assert!(dcx.had_errors());
    }

    #[test]
    fn hash_and_rustc_encodable_append_a_synthetic_type_param() {
        let (p, ty, str) = demo_struct();
        let derived = Hash.handle_struct(Span::dummy(), &p, &ty, &str);
        assert!(derived.generics.params.iter().any(|gp| gp.name == "__H"));
        let derived = RustcEncodable.handle_struct(Span::dummy(), &p, &ty, &str);
        assert!(derived.generics.params.iter().any(|gp| gp.name == "__S"));
    }
}
