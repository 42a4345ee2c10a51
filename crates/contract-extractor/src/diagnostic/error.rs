//! Extractor error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Broad error classes a caller can branch on.
///
/// Configuration, file-system and parse errors stop the current run.
/// Generator errors come from the optional registry / re-export steps and
/// never roll back contract files that were already written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    FileSystem,
    Parse,
    Generator,
}

/// Errors that can occur during extraction.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum ExtractorError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration for '{field}': {message}")]
    #[diagnostic(code(contracts::config::invalid))]
    InvalidConfig {
        field: String,
        message: String,
    },

    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    #[diagnostic(
        code(contracts::config::invalid_exclude_pattern),
        help("Exclusion patterns use glob syntax, e.g. \"**/*.spec.ts\" or \"**/infra/**\"")
    )]
    InvalidExcludePattern {
        pattern: String,
        message: String,
    },

    #[error("Failed to load configuration '{}': {message}", path.display())]
    #[diagnostic(code(contracts::config::load_failed))]
    ConfigLoad {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // File System Errors
    // =========================================================================
    #[error("File not found: {}", path.display())]
    #[diagnostic(code(contracts::io::not_found))]
    NotFound {
        path: PathBuf,
    },

    #[error("Failed to read '{}': {message}", path.display())]
    #[diagnostic(code(contracts::io::read_error))]
    ReadFailed {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to write '{}': {message}", path.display())]
    #[diagnostic(code(contracts::io::write_error))]
    WriteFailed {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(contracts::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(contracts::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    // =========================================================================
    // Generator Errors
    // =========================================================================
    #[error("{generator} generation failed: {message}")]
    #[diagnostic(
        code(contracts::codegen::generator_failed),
        help("Contract files were written; only this optional output is missing.")
    )]
    GeneratorFailed {
        generator: String,
        message: String,
    },
}

impl ExtractorError {
    /// Creates a read error, mapping `NotFound` to its own variant.
    pub fn read(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::ReadFailed {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Creates a configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wraps any error raised inside an optional generator.
    pub fn generator(generator: impl Into<String>, source: &ExtractorError) -> Self {
        Self::GeneratorFailed {
            generator: generator.into(),
            message: source.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::InvalidExcludePattern { .. }
            | Self::ConfigLoad { .. } => ErrorCategory::Configuration,
            Self::NotFound { .. } | Self::ReadFailed { .. } | Self::WriteFailed { .. } => {
                ErrorCategory::FileSystem
            }
            Self::ParserInitFailed | Self::ParseFailed { .. } => ErrorCategory::Parse,
            Self::GeneratorFailed { .. } => ErrorCategory::Generator,
        }
    }

    /// Whether this error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::Generator
    }
}
