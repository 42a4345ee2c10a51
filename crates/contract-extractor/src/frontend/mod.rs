//! Language front end.
//!
//! Parsing is the only place the extractor touches a concrete grammar. Every
//! other component works from the [`typescript::SyntaxTree`] it produces and
//! the [`typescript::ast::ParsedModule`] summary derived from it.

pub mod typescript;

pub use typescript::{SyntaxTree, TypeScriptFrontend, TypeScriptParser};
