//! Marker scanner: a cheap text pre-filter that finds candidate files.
//!
//! No parsing happens here. A file is a candidate when its text mentions
//! `@<marker>` for any configured marker, or imports a marker under an alias.
//! The contract parser makes the real decision.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::MarkerNames;
use crate::diagnostic::ExtractorError;
use crate::fs::FileSystem;
use crate::graph::ExclusionSet;
use crate::paths::is_source_file;

/// Directory names never descended into.
pub fn is_skipped_dir(name: &str) -> bool {
    name == "node_modules" || name.starts_with('.')
}

/// Finds files that may declare marked classes.
pub struct MarkerScanner<'a> {
    needles: Vec<String>,
    exclusions: &'a ExclusionSet,
    ignore: Option<PathBuf>,
}

impl<'a> MarkerScanner<'a> {
    pub fn new(markers: &MarkerNames, exclusions: &'a ExclusionSet) -> Self {
        let mut needles = Vec::new();
        for marker in markers.all() {
            needles.push(format!("@{}", marker));
            needles.push(format!("{} as ", marker));
        }
        Self {
            needles,
            exclusions,
            ignore: None,
        }
    }

    /// Ignores everything below `dir` (typically the output directory when it
    /// lives inside the source tree).
    pub fn ignoring(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ignore = Some(dir.into());
        self
    }

    pub fn mentions_marker(&self, text: &str) -> bool {
        self.needles.iter().any(|n| text.contains(n.as_str()))
    }

    /// Returns candidate files under `root`, sorted by path.
    pub fn scan(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>, ExtractorError> {
        if !fs.exists(root) {
            return Err(ExtractorError::NotFound {
                path: root.to_path_buf(),
            });
        }

        let files = fs
            .walk_files(root, &is_skipped_dir)
            .map_err(|e| ExtractorError::read(root, &e))?;

        let mut candidates = Vec::new();
        for path in files {
            if !is_source_file(&path) {
                continue;
            }
            if self.ignore.as_ref().map(|dir| path.starts_with(dir)).unwrap_or(false) {
                continue;
            }
            if self.exclusions.is_excluded(&path) {
                trace!(path = %path.display(), "excluded from scan");
                continue;
            }
            let text = fs.read_file(&path).map_err(|e| ExtractorError::read(&path, &e))?;
            if self.mentions_marker(&text) {
                debug!(path = %path.display(), "marker candidate");
                candidates.push(path);
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn scan(fs: &MemoryFileSystem, exclusions: &ExclusionSet) -> Vec<PathBuf> {
        MarkerScanner::new(&MarkerNames::default(), exclusions)
            .scan(fs, Path::new("/src"))
            .unwrap()
    }

    #[test]
    fn test_scan_finds_marked_files() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/users/events.ts", "@PublicEvent()\nexport class A {}")
            .with_file("/src/users/plain.ts", "export class B {}")
            .with_file("/src/users/view.tsx", "@PublicQuery() export class C {}")
            .with_file("/src/users/types.d.ts", "@PublicEvent() declare class D {}")
            .with_file("/src/users/readme.md", "@PublicCommand");

        let found = scan(&fs, &ExclusionSet::empty("/src"));
        assert_eq!(
            found,
            vec![PathBuf::from("/src/users/events.ts"), PathBuf::from("/src/users/view.tsx")]
        );
    }

    #[test]
    fn test_scan_skips_vendor_hidden_and_excluded() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/node_modules/lib/index.ts", "@PublicEvent()")
            .with_file("/src/.cache/a.ts", "@PublicEvent()")
            .with_file("/src/users/a.spec.ts", "@PublicEvent()")
            .with_file("/src/users/a.ts", "@PublicCommand()");

        let exclusions = ExclusionSet::new("/src", &["**/*.spec.ts".to_string()]).unwrap();
        assert_eq!(scan(&fs, &exclusions), vec![PathBuf::from("/src/users/a.ts")]);
    }

    #[test]
    fn test_scan_detects_aliased_marker_imports() {
        let fs = MemoryFileSystem::new().with_file(
            "/src/a.ts",
            "import { PublicEvent as Evt } from \"@contracts/markers\";\n@Evt() export class A {}",
        );
        assert_eq!(scan(&fs, &ExclusionSet::empty("/src")).len(), 1);
    }

    #[test]
    fn test_scan_ignores_output_inside_source() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/a.ts", "@PublicEvent() export class A {}")
            .with_file("/src/contracts/users/a.ts", "@PublicEvent() export class A {}");
        let exclusions = ExclusionSet::empty("/src");
        let found = MarkerScanner::new(&MarkerNames::default(), &exclusions)
            .ignoring("/src/contracts")
            .scan(&fs, Path::new("/src"))
            .unwrap();
        assert_eq!(found, vec![PathBuf::from("/src/a.ts")]);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let fs = MemoryFileSystem::new();
        let exclusions = ExclusionSet::empty("/src");
        let err = MarkerScanner::new(&MarkerNames::default(), &exclusions)
            .scan(&fs, Path::new("/src"))
            .unwrap_err();
        assert!(matches!(err, ExtractorError::NotFound { .. }));
    }
}
