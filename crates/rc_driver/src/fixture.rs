//! A minimal in-memory crate sufficient to drive every pass, standing
//! in for the parser this core deliberately doesn't implement. A real
//! driver replaces `build_demo_crate` with a loader that deserialises a
//! parsed `Crate` (or an `ExternCrate`'s cached `.hir`); nothing else in
//! `pipeline` depends on how the arena got populated.

use rc_ast::expr::{BinOp, Expr, ExprKind};
use rc_ast::generics::GenericParams;
use rc_ast::item::{Item, ItemKind, StructDef, Visibility};
use rc_ast::krate::Crate;
use rc_ast::types::{Primitive, TypeRef};
use rc_span::Span;

/// `struct Point { x: u32, y: u32 }` plus `const SIZE: usize = 2 + 3;` —
/// enough surface to exercise every pass (struct field walk, const
/// evaluation) without needing any path that actually resolves to
/// something, since every type here is a bare primitive.
pub fn build_demo_crate() -> Crate {
    let mut crate_ = Crate::new("demo");
    let root = crate_.root_module;

    let point = Item::new(
        "Point",
        ItemKind::Struct(StructDef {
            generics: GenericParams::default(),
            is_tuple: false,
            fields: vec![
                ("x".to_string(), TypeRef::Primitive(Primitive::U32)),
                ("y".to_string(), TypeRef::Primitive(Primitive::U32)),
            ],
        }),
        Span::dummy(),
        Visibility::Public,
    );
    crate_.add_item(root, true, point);

    let size_expr = Expr::new(
        Span::dummy(),
        ExprKind::BinOp { op: BinOp::Add, lhs: Box::new(Expr::int_lit(Span::dummy(), 2)), rhs: Box::new(Expr::int_lit(Span::dummy(), 3)) },
    );
    let size = Item::new(
        "SIZE",
        ItemKind::Const { ty: TypeRef::Primitive(Primitive::Usize), value: size_expr },
        Span::dummy(),
        Visibility::Public,
    );
    crate_.add_item(root, true, size);

    crate_.rebuild_indexes();
    crate_
}
