//! Statements: the non-control-flow instructions inside a basic block.

use crate::place::Place;
use crate::rvalue::Rvalue;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign(Place, Rvalue),
    /// Drop glue. The interpreter never runs destructors, so this is
    /// recorded but ignored.
    Drop(Place),
}
