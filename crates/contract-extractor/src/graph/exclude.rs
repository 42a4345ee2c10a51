//! Dependency exclusion globs.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::diagnostic::ExtractorError;
use crate::paths::to_slash;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled exclusion globs, matched against the root-relative path and the
/// absolute path of a file.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl ExclusionSet {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self, ExtractorError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ExtractorError::InvalidExcludePattern {
                    pattern: p.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root: root.into(),
            patterns,
        })
    }

    /// No patterns at all.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let absolute = to_slash(path);
        let relative = path.strip_prefix(&self.root).ok().map(to_slash);
        self.patterns.iter().any(|p| {
            relative
                .as_deref()
                .map(|r| p.matches_with(r, MATCH_OPTIONS))
                .unwrap_or(false)
                || p.matches_with(&absolute, MATCH_OPTIONS)
        })
    }
}
