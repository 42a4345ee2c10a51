//! File system abstraction.
//!
//! Every component reads and writes through [`FileSystem`] so the pipeline can
//! run against the real disk ([`OsFileSystem`]) or an in-memory tree
//! ([`MemoryFileSystem`]) in tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Result of a `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub is_file: bool,
}

/// Minimal file system surface used by the extractor.
pub trait FileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Lists the direct children of a directory as full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    fn is_file(&self, path: &Path) -> bool {
        self.stat(path).map(|s| s.is_file).unwrap_or(false)
    }

    /// Recursively lists every file under `root`, sorted.
    ///
    /// `skip_dir` is consulted for each directory name below the root; returning
    /// true prunes that subtree.
    fn walk_files(&self, root: &Path, skip_dir: &dyn Fn(&str) -> bool) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in self.read_dir(&dir)? {
                let stat = self.stat(&entry)?;
                if stat.is_dir {
                    let name = entry.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    if !skip_dir(&name) {
                        stack.push(entry);
                    }
                } else if stat.is_file {
                    files.push(entry);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        })
    }

    fn walk_files(&self, root: &Path, skip_dir: &dyn Fn(&str) -> bool) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_type().is_dir() || !skip_dir(&e.file_name().to_string_lossy())
            });
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory file system keyed by absolute path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<BTreeMap<PathBuf, String>>,
    dirs: RefCell<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used heavily by tests.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// Returns a file's contents, if present.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    /// All file paths currently stored, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.borrow().contains(path)
            || self
                .files
                .borrow()
                .keys()
                .any(|f| f.starts_with(path) && f.as_path() != path)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", path.display()),
            ));
        }
        let mut children = BTreeSet::new();
        let files = self.files.borrow();
        let dirs = self.dirs.borrow();
        for candidate in files.keys().chain(dirs.iter()) {
            if let Ok(rest) = candidate.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    children.insert(path.join(first));
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files.borrow_mut().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path) || self.is_dir(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        if self.files.borrow().contains_key(path) {
            return Ok(FileStat { is_dir: false, is_file: true });
        }
        if self.is_dir(path) {
            return Ok(FileStat { is_dir: true, is_file: false });
        }
        Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }
}
