//! Output Reconstitution
//!
//! Generated render source is plain text until something turns it back
//! into a callable. `expr` parses the render DSL into an expression tree;
//! `eval` walks that tree against a data context and produces virtual
//! nodes. The function constructor wires both behind `RenderFn` closures.

pub mod eval;
pub mod expr;
