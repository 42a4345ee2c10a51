//! Module specifier resolution.
//!
//! Relative specifiers resolve against the importing file's directory;
//! everything else goes through the wildcard path aliases. Candidates are
//! probed with extension and index fallback. Anything that does not land on
//! a source file under the source root is external.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::config::PathAliases;
use crate::fs::FileSystem;
use crate::paths::{is_relative_specifier, normalize, SOURCE_EXTENSIONS};

/// ESM output extensions that map back to TypeScript sources.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs"];

/// One compiled `"@lib/*" -> ["libs/*"]` mapping.
#[derive(Debug, Clone)]
struct AliasPattern {
    prefix: String,
    /// `None` for exact (non-wildcard) patterns.
    suffix: Option<String>,
    targets: Vec<String>,
}

impl AliasPattern {
    fn new(pattern: &str, targets: &[String]) -> Self {
        let (prefix, suffix) = match pattern.split_once('*') {
            Some((prefix, suffix)) => (prefix.to_string(), Some(suffix.to_string())),
            None => (pattern.to_string(), None),
        };
        Self {
            prefix,
            suffix,
            targets: targets.to_vec(),
        }
    }

    /// The text captured by `*`, or `""` for an exact match.
    fn capture<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        match &self.suffix {
            None => (specifier == self.prefix).then_some(""),
            Some(suffix) => {
                let rest = specifier.strip_prefix(self.prefix.as_str())?;
                if rest.len() < suffix.len() {
                    return None;
                }
                rest.strip_suffix(suffix.as_str())
            }
        }
    }
}

/// Resolves module specifiers to files under a source root.
pub struct ModuleResolver<'a> {
    fs: &'a dyn FileSystem,
    source_root: PathBuf,
    base_dir: PathBuf,
    /// Sorted most specific first; ties keep declaration order.
    patterns: Vec<AliasPattern>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, source_root: &Path, aliases: &PathAliases) -> Self {
        let mut patterns: Vec<AliasPattern> = aliases
            .patterns
            .iter()
            .map(|(pattern, targets)| AliasPattern::new(pattern, targets))
            .collect();
        patterns.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self {
            fs,
            source_root: normalize(source_root),
            base_dir: normalize(&aliases.base_dir),
            patterns,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Resolves `specifier` as imported from `importer`. `None` means external.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        if is_relative_specifier(specifier) {
            let dir = importer.parent().unwrap_or(Path::new(""));
            return self.probe(&normalize(&dir.join(specifier)));
        }

        let pattern = self.patterns.iter().find(|p| p.capture(specifier).is_some())?;
        let capture = pattern.capture(specifier)?;
        for target in &pattern.targets {
            let candidate = normalize(&self.base_dir.join(target.replacen('*', capture, 1)));
            if let Some(found) = self.probe(&candidate) {
                return Some(found);
            }
        }
        trace!(specifier, "alias matched but no candidate under the source root");
        None
    }

    /// Extension fallback, `.js` to `.ts`/`.tsx`, then index fallback.
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        let mut candidates = Vec::new();

        let ext = base.extension().map(|e| e.to_string_lossy().to_string());
        if let Some(ext) = &ext {
            if SOURCE_EXTENSIONS.contains(&ext.as_str()) {
                candidates.push(base.to_path_buf());
            }
        }

        let raw = base.as_os_str().to_string_lossy();
        for source_ext in SOURCE_EXTENSIONS {
            candidates.push(PathBuf::from(format!("{}.{}", raw, source_ext)));
        }

        if let Some(ext) = &ext {
            if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
                for source_ext in SOURCE_EXTENSIONS {
                    candidates.push(base.with_extension(source_ext));
                }
            }
        }

        for source_ext in SOURCE_EXTENSIONS {
            candidates.push(base.join(format!("index.{}", source_ext)));
        }

        candidates
            .into_iter()
            .find(|c| c.starts_with(&self.source_root) && self.fs.is_file(c))
    }
}
