//! Places: the storage locations a statement can read from or write to.

use crate::operand::Operand;
use rc_ast::path::AbsolutePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

/// Where a place's byte range ultimately lives before any projection is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceRoot {
    Return,
    Local(LocalId),
    Argument(u32),
    Static(AbsolutePath),
}

/// One step of a place's projection chain, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceElem {
    Field(u32),
    Deref,
    /// Indexes by the value an operand evaluates to at the time the
    /// place is resolved, not by a fixed constant.
    Index(Box<Operand>),
    Downcast(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub root: PlaceRoot,
    pub projections: Vec<PlaceElem>,
}

impl Place {
    pub fn root(root: PlaceRoot) -> Place {
        Place { root, projections: Vec::new() }
    }

    pub fn field(mut self, idx: u32) -> Place {
        self.projections.push(PlaceElem::Field(idx));
        self
    }

    pub fn deref(mut self) -> Place {
        self.projections.push(PlaceElem::Deref);
        self
    }

    pub fn downcast(mut self, variant: u32) -> Place {
        self.projections.push(PlaceElem::Downcast(variant));
        self
    }
}
