//! Breadth-first construction of the [`FileGraph`].

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::PathAliases;
use crate::diagnostic::ExtractorError;
use crate::frontend::TypeScriptFrontend;
use crate::fs::FileSystem;
use crate::paths::is_relative_specifier;
use super::{ExclusionSet, FileGraph, FileNode, ImportInfo, ModuleResolver};

/// Walks import edges from a set of entry points.
pub struct GraphBuilder<'a> {
    fs: &'a dyn FileSystem,
    resolver: ModuleResolver<'a>,
    exclusions: &'a ExclusionSet,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        source_root: &Path,
        aliases: &PathAliases,
        exclusions: &'a ExclusionSet,
    ) -> Self {
        Self {
            fs,
            resolver: ModuleResolver::new(fs, source_root, aliases),
            exclusions,
        }
    }

    /// Builds the graph. Cycles and diamonds visit each file once; excluded
    /// files are recorded but never entered.
    pub fn build(
        &self,
        frontend: &mut TypeScriptFrontend,
        entry_points: &[PathBuf],
    ) -> Result<FileGraph, ExtractorError> {
        let mut graph = FileGraph::default();
        let mut visited: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();

        for entry in entry_points {
            if visited.insert(entry.clone()) {
                graph.entry_points.push(entry.clone());
                queue.push_back(entry.clone());
            }
        }

        while let Some(path) = queue.pop_front() {
            let tree = frontend.parse_file(self.fs, &path)?;
            let module = tree.summarize();

            let mut imports = Vec::new();
            for (specifier, imported_names) in module.dependencies() {
                let resolved = self.resolver.resolve(&path, &specifier);
                match &resolved {
                    Some(target) if self.exclusions.is_excluded(target) => {
                        trace!(from = %path.display(), to = %target.display(), "excluded dependency");
                        graph.excluded_paths.insert(target.clone());
                    }
                    Some(target) => {
                        if visited.insert(target.clone()) {
                            queue.push_back(target.clone());
                        }
                    }
                    None if is_relative_specifier(&specifier) => {
                        debug!(from = %path.display(), specifier = %specifier, "unresolved relative import treated as external");
                    }
                    None => {}
                }
                imports.push(ImportInfo {
                    module_specifier: specifier,
                    is_external: resolved.is_none(),
                    resolved_path: resolved,
                    imported_names,
                });
            }

            let relative_path = path
                .strip_prefix(self.resolver.source_root())
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            graph.order.push(path.clone());
            graph.nodes.insert(
                path.clone(),
                FileNode {
                    is_entry_point: graph.entry_points.contains(&path),
                    absolute_path: path,
                    relative_path,
                    imports,
                },
            );
        }

        debug!(
            nodes = graph.nodes.len(),
            excluded = graph.excluded_paths.len(),
            "file graph built"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::collections::BTreeMap;

    fn build(fs: &MemoryFileSystem, exclusions: &ExclusionSet, entries: &[&str]) -> FileGraph {
        let aliases = PathAliases::new("/src").with("@lib/*", &["lib/*"]);
        let builder = GraphBuilder::new(fs, Path::new("/src"), &aliases, exclusions);
        let mut frontend = TypeScriptFrontend::new().unwrap();
        let entries: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        builder.build(&mut frontend, &entries).unwrap()
    }

    fn diamond() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file("/src/a.ts", "import { X } from \"./b\";\nimport { Y } from \"./c\";\n")
            .with_file("/src/b.ts", "import { Z } from \"./d\";\nexport type X = Z;\n")
            .with_file("/src/c.ts", "import { Z } from \"./d\";\nexport type Y = Z;\n")
            .with_file("/src/d.ts", "export type Z = string;\n")
            .with_file("/src/unrelated.ts", "export const u = 1;\n")
    }

    #[test]
    fn test_diamond_visits_each_file_once() {
        let graph = build(&diamond(), &ExclusionSet::empty("/src"), &["/src/a.ts"]);

        assert_eq!(graph.len(), 4);
        let order: Vec<&str> = graph.order.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(order, vec!["/src/a.ts", "/src/b.ts", "/src/c.ts", "/src/d.ts"]);
        assert!(graph.node(Path::new("/src/a.ts")).unwrap().is_entry_point);
        assert!(!graph.node(Path::new("/src/d.ts")).unwrap().is_entry_point);

        let a = graph.node(Path::new("/src/a.ts")).unwrap();
        assert_eq!(a.imports[0].imported_names, vec!["X"]);
        assert_eq!(a.imports[0].resolved_path, Some(PathBuf::from("/src/b.ts")));
    }

    #[test]
    fn test_cycles_terminate() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/a.ts", "import { B } from \"./b\";\nexport type A = B;\n")
            .with_file("/src/b.ts", "import type { A } from \"./a\";\nexport type B = A[];\n");
        let graph = build(&fs, &ExclusionSet::empty("/src"), &["/src/a.ts"]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.order.len(), 2);
    }

    #[test]
    fn test_excluded_files_are_recorded_not_entered() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/a.ts", "import { Repo } from \"./infra/repo\";\nimport { B } from \"./b\";\n")
            .with_file("/src/infra/repo.ts", "import { Secret } from \"./secret\";\n")
            .with_file("/src/infra/secret.ts", "")
            .with_file("/src/b.ts", "export type B = string;\n");
        let exclusions = ExclusionSet::new("/src", &["**/infra/**".to_string()]).unwrap();
        let graph = build(&fs, &exclusions, &["/src/a.ts"]);

        assert_eq!(graph.len(), 2);
        assert!(!graph.contains(Path::new("/src/infra/repo.ts")));
        assert!(graph.is_excluded(Path::new("/src/infra/repo.ts")));
        assert!(!graph.is_excluded(Path::new("/src/infra/secret.ts")));

        let import = &graph.node(Path::new("/src/a.ts")).unwrap().imports[0];
        assert!(!import.is_external);
        assert_eq!(import.resolved_path, Some(PathBuf::from("/src/infra/repo.ts")));
    }

    #[test]
    fn test_reexports_aliases_and_externals() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/src/a.ts",
                "import { z } from \"zod\";\nimport { Id } from \"@lib/ids\";\nexport * from \"./barrel\";\nimport { Gone } from \"./gone\";\n",
            )
            .with_file("/src/lib/ids.ts", "export type Id = string;\n")
            .with_file("/src/barrel/index.ts", "export { Money } from \"./money\";\n")
            .with_file("/src/barrel/money.ts", "export type Money = number;\n");
        let graph = build(&fs, &ExclusionSet::empty("/src"), &["/src/a.ts"]);

        assert_eq!(graph.len(), 4);
        let a = graph.node(Path::new("/src/a.ts")).unwrap();
        let external: Vec<&str> = a
            .imports
            .iter()
            .filter(|i| i.is_external)
            .map(|i| i.module_specifier.as_str())
            .collect();
        assert_eq!(external, vec!["zod", "./gone"]);
        assert!(a.imports.iter().all(|i| !i.is_external || i.resolved_path.is_none()));

        let star = a.imports.iter().find(|i| i.module_specifier == "./barrel").unwrap();
        assert!(star.imported_names.is_empty());
        assert_eq!(
            graph.node(Path::new("/src/barrel/money.ts")).unwrap().relative_path,
            PathBuf::from("barrel/money.ts")
        );
    }

    #[test]
    fn test_closure_from_subset() {
        let graph = build(&diamond(), &ExclusionSet::empty("/src"), &["/src/a.ts"]);
        let closure = graph.closure_from([PathBuf::from("/src/c.ts")]);
        let paths: Vec<&str> = closure.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/src/c.ts", "/src/d.ts"]);
    }

    #[test]
    fn test_closure_with_restricted_edges() {
        let graph = build(&diamond(), &ExclusionSet::empty("/src"), &["/src/a.ts"]);
        let mut overrides = BTreeMap::new();
        overrides.insert(PathBuf::from("/src/a.ts"), vec![PathBuf::from("/src/b.ts")]);

        let closure = graph.closure_with([PathBuf::from("/src/a.ts")], &overrides);
        let paths: Vec<&str> = closure.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/src/a.ts", "/src/b.ts", "/src/d.ts"]);
    }

    #[test]
    fn test_unreadable_entry_is_fatal() {
        let fs = MemoryFileSystem::new();
        let aliases = PathAliases::default();
        let exclusions = ExclusionSet::empty("/src");
        let builder = GraphBuilder::new(&fs, Path::new("/src"), &aliases, &exclusions);
        let mut frontend = TypeScriptFrontend::new().unwrap();
        let err = builder
            .build(&mut frontend, &[PathBuf::from("/src/missing.ts")])
            .unwrap_err();
        assert!(matches!(err, ExtractorError::NotFound { .. }));
    }
}
