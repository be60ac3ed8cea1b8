//! Syntax tree and the generic rewriting base the transforms build on.

pub mod ast;
pub mod rewrite;

pub use ast::{
    AccessorData, FunctionData, Node, NodeRef, Parameter, SwitchCase, VarKind,
    VariableDeclarator, strip_parens,
};
pub use rewrite::Rewrite;
