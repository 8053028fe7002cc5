//! The EQL language: parsing text into a concrete syntax tree, building the
//! abstract query tree from it, and printing a tree back as canonical EQL.

pub mod ast;
pub mod format;
pub mod syntax;
