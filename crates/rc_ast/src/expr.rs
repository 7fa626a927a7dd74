//! A compact expression tree: just enough shape for const/array-length
//! bodies, derive-generated method bodies, and UFCS call sites inside
//! expression position. Full
//! expression-level desugaring is MIR construction's job and is out of
//! scope.

use crate::path::Path;
use crate::pattern::Pattern;
use rc_span::{Span, Symbol, U128};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniOp {
    Neg,
    Inv,
    Deref,
    Ref,
    RefMut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit { value: U128, suffix: Option<Symbol> },
    FloatLit { bits: u64, suffix: Option<Symbol> },
    BoolLit(bool),
    StrLit(String),
    PathExpr(Box<Path>),
    Tuple(Vec<Expr>),
    Array(Vec<Expr>),
    /// `[value; count]`.
    ArrayRepeat { value: Box<Expr>, count: Box<Expr> },
    Struct { path: Box<Path>, fields: Vec<(String, Expr)>, base: Option<Box<Expr>> },
    Field { base: Box<Expr>, name: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    MethodCall { receiver: Box<Expr>, method: String, args: Vec<Expr> },
    BinOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    UniOp { op: UniOp, operand: Box<Expr> },
    Block(Vec<Stmt>, Option<Box<Expr>>),
    If { cond: Box<Expr>, then: Box<Expr>, else_: Option<Box<Expr>> },
    Match { scrutinee: Box<Expr>, arms: Vec<(Pattern, Expr)> },
    Return(Option<Box<Expr>>),
    /// Compiler-synthesised placeholder, e.g. the receiver of an
    /// expanded `Default::default()` call inside a derive body.
    Synthetic(&'static str),
    /// Raw encoded bytes for a hoisted constant, written by
    /// `Newval::new_static` when const evaluation needs a fresh
    /// addressable static to hold a writable relocation target. No
    /// parser produces this form.
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Expr {
        Expr { span, kind }
    }

    pub fn int_lit(span: Span, value: u128) -> Expr {
        Expr::new(span, ExprKind::IntLit { value: U128(value), suffix: None })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { pattern: Pattern, ty: Option<crate::types::TypeRef>, init: Option<Expr> },
    Expr(Expr),
    Item(crate::item::ItemId),
}
