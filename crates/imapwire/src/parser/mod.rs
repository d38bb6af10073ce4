//! Response parsing: the expression grammar and the semantic builders
//! sitting on top of it.

pub mod expr;
pub mod response;
