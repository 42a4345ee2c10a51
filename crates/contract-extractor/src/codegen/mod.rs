//! TypeScript generation for the package-level outputs.
//!
//! Contract files themselves are copied, not generated. What is generated
//! sits at the top of the output directory:
//! - the cross-context message registry
//! - re-export shims for rewritten alias imports

pub mod reexport;
pub mod registry;

use std::path::{Path, PathBuf};

use crate::diagnostic::ExtractorError;
use crate::fs::FileSystem;

pub use reexport::generate_reexports;
pub use registry::{generate_registry, RegistryContext};

/// Generated TypeScript code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Map of filename (relative to the output directory) to content.
    pub files: Vec<(String, String)>,
}

impl GeneratedCode {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Appends to an existing file entry or adds a new one.
    pub fn append(&mut self, file: &str, content: &str) {
        match self.files.iter_mut().find(|(name, _)| name == file) {
            Some((_, existing)) => existing.push_str(content),
            None => self.files.push((file.to_string(), content.to_string())),
        }
    }

    /// Writes every file below `root`.
    pub fn write(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>, ExtractorError> {
        let mut written = Vec::new();
        for (name, content) in &self.files {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs.create_dir_all(parent)
                    .map_err(|e| ExtractorError::write(parent, &e))?;
            }
            fs.write_file(&path, content)
                .map_err(|e| ExtractorError::write(&path, &e))?;
            written.push(path);
        }
        Ok(written)
    }
}
