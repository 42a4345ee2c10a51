//! Module dependency graph.
//!
//! Built once per extraction by [`GraphBuilder`] with a breadth-first walk
//! from the entry points over `import` and `export ... from` edges.

pub mod build;
pub mod exclude;
pub mod resolve;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use build::GraphBuilder;
pub use exclude::ExclusionSet;
pub use resolve::ModuleResolver;

/// One dependency edge as written in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfo {
    pub module_specifier: String,
    /// Set for local files, including excluded ones.
    pub resolved_path: Option<PathBuf>,
    pub is_external: bool,
    /// Names as exported by the target; `default` and `*` for default and
    /// namespace bindings. Empty for `export *` and side-effect imports.
    pub imported_names: Vec<String>,
}

/// A file reached by the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub imports: Vec<ImportInfo>,
    pub is_entry_point: bool,
}

impl FileNode {
    /// Local, non-external dependencies in import order.
    pub fn local_dependencies(&self) -> impl Iterator<Item = &Path> {
        self.imports
            .iter()
            .filter(|i| !i.is_external)
            .filter_map(|i| i.resolved_path.as_deref())
    }
}

/// Files reachable from the entry points.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileGraph {
    pub nodes: BTreeMap<PathBuf, FileNode>,
    /// In the order they were given.
    pub entry_points: Vec<PathBuf>,
    pub excluded_paths: BTreeSet<PathBuf>,
    /// Discovery order of the walk.
    pub order: Vec<PathBuf>,
}

impl FileGraph {
    pub fn node(&self, path: &Path) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_entry_point(&self, path: &Path) -> bool {
        self.entry_points.iter().any(|e| e == path)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_paths.contains(path)
    }

    /// Nodes in discovery order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.order.iter().filter_map(|p| self.nodes.get(p))
    }

    /// Every node reachable from `starts` (inclusive) through local edges.
    pub fn closure_from<I>(&self, starts: I) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.closure_with(starts, &BTreeMap::new())
    }

    /// Like [`FileGraph::closure_from`], but a node listed in `overrides`
    /// only follows the edges given there instead of all of its imports.
    pub fn closure_with<I>(&self, starts: I, overrides: &BTreeMap<PathBuf, Vec<PathBuf>>) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = starts.into_iter().collect();
        while let Some(path) = queue.pop_front() {
            let Some(node) = self.nodes.get(&path) else { continue };
            let deps: Vec<&Path> = match overrides.get(&path) {
                Some(edges) => edges.iter().map(PathBuf::as_path).collect(),
                None => node.local_dependencies().collect(),
            };
            if !seen.insert(path) {
                continue;
            }
            for dep in deps {
                if !seen.contains(dep) {
                    queue.push_back(dep.to_path_buf());
                }
            }
        }
        seen
    }
}
