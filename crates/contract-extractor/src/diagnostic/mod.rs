//! Diagnostic types for error reporting.

mod error;
mod span;

pub use error::{ErrorCategory, ExtractorError};
pub use span::Span;
