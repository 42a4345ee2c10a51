//! TypeScript frontend for the contract extractor.

pub mod ast;
pub mod parser;

use std::path::Path;

use crate::diagnostic::ExtractorError;
use crate::fs::FileSystem;
pub use parser::{SyntaxTree, TypeScriptParser};

/// Reads files through a [`FileSystem`] and parses them.
pub struct TypeScriptFrontend {
    parser: TypeScriptParser,
}

impl TypeScriptFrontend {
    /// Creates a new TypeScript frontend.
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            parser: TypeScriptParser::new()?,
        })
    }

    /// Reads a source file, mapping I/O failures to extractor errors.
    pub fn read(&self, fs: &dyn FileSystem, path: &Path) -> Result<String, ExtractorError> {
        fs.read_file(path).map_err(|e| ExtractorError::read(path, &e))
    }

    /// Reads and parses one file.
    pub fn parse_file(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<SyntaxTree, ExtractorError> {
        let source = self.read(fs, path)?;
        self.parser.parse(&source, path)
    }

    /// The underlying parser, for passes that re-parse rewritten text.
    pub fn parser_mut(&mut self) -> &mut TypeScriptParser {
        &mut self.parser
    }
}
