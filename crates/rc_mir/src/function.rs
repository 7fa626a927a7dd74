//! A function's control-flow graph: a flat vector of basic blocks plus
//! the type of every local the frame needs to allocate.

use crate::statement::Statement;
use crate::terminator::Terminator;
use rc_ast::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(terminator: Terminator) -> BasicBlock {
        BasicBlock { statements: Vec::new(), terminator }
    }
}

/// One function's MIR body: argument types, local types (not including
/// arguments or the return slot, which are addressed separately via
/// `PlaceRoot::Argument`/`PlaceRoot::Return`), and the block list entered
/// at block 0.
#[derive(Debug, Clone)]
pub struct Function {
    pub arg_types: Vec<TypeRef>,
    pub local_types: Vec<TypeRef>,
    pub ret_type: TypeRef,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }
}
