//! Extraction and rewrite engine.
//!
//! Decides which files (or, when narrowing, which symbols) are copied, runs
//! the per-file transforms and writes the output tree plus its barrel.

pub mod barrel;
pub mod edit;
pub mod narrow;
pub mod transforms;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::contract::ContractFile;
use crate::diagnostic::ExtractorError;
use crate::frontend::TypeScriptFrontend;
use crate::fs::FileSystem;
use crate::graph::FileGraph;
use crate::types::TypeRef;
use self::barrel::{is_root_index, render_barrel, BARREL_FILE};
use self::narrow::narrow;
use self::transforms::{apply_all, TransformContext};

pub use edit::EditSet;
pub use narrow::NarrowedFile;

/// What the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct RewriteOutput {
    /// Output files in barrel order, barrel excluded.
    pub written_files: Vec<PathBuf>,
    pub barrel_path: PathBuf,
    /// Applied rewrites keyed by output path.
    pub rewrites: BTreeMap<PathBuf, Vec<String>>,
    /// Entry files that were narrowed to their target symbols.
    pub narrowed_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RewriteOutput {
    pub fn rewrite_count(&self) -> usize {
        self.rewrites.values().map(Vec::len).sum()
    }
}

/// Which files get copied, in output order, and the narrowed text of entries.
struct CopyPlan {
    order: Vec<PathBuf>,
    narrowed: BTreeMap<PathBuf, String>,
}

pub struct RewriteEngine<'a> {
    config: &'a ExtractorConfig,
    fs: &'a dyn FileSystem,
    graph: &'a FileGraph,
    contracts: &'a BTreeMap<PathBuf, ContractFile>,
}

impl<'a> RewriteEngine<'a> {
    pub fn new(
        config: &'a ExtractorConfig,
        fs: &'a dyn FileSystem,
        graph: &'a FileGraph,
        contracts: &'a BTreeMap<PathBuf, ContractFile>,
    ) -> Self {
        Self {
            config,
            fs,
            graph,
            contracts,
        }
    }

    pub fn run(&self, frontend: &mut TypeScriptFrontend) -> Result<RewriteOutput, ExtractorError> {
        let context_dir = self.config.context_output_dir();
        let barrel_path = context_dir.join(BARREL_FILE);
        let plan = self.plan(frontend)?;

        let mut output = RewriteOutput {
            barrel_path: barrel_path.clone(),
            narrowed_files: plan.narrowed.keys().cloned().collect(),
            ..RewriteOutput::default()
        };

        let mut output_paths = BTreeMap::new();
        for source in &plan.order {
            let Some(node) = self.graph.node(source) else { continue };
            let target = if is_root_index(&node.relative_path) {
                let message = format!(
                    "{} collides with the generated barrel; its content is merged into the barrel",
                    source.display()
                );
                warn!("{}", message);
                output.warnings.push(message);
                barrel_path.clone()
            } else {
                context_dir.join(&node.relative_path)
            };
            output_paths.insert(source.clone(), target);
        }

        let transforms = self.config.effective_transforms();
        let mut barrel_head: Option<String> = None;
        for source in &plan.order {
            let Some(target) = output_paths.get(source) else { continue };
            let text = match plan.narrowed.get(source) {
                Some(text) => text.clone(),
                None => frontend.read(self.fs, source)?,
            };
            let export_types = self
                .contracts
                .get(source)
                .map(ContractFile::unexported_result_types)
                .unwrap_or_default();

            let ctx = TransformContext {
                output_path: target,
                node: self.graph.node(source),
                graph: self.graph,
                output_paths: &output_paths,
                markers: &self.config.markers,
                export_types: &export_types,
                alias_rewrites: &self.config.alias_rewrites,
            };
            let transformed = apply_all(frontend.parser_mut(), &text, &ctx, transforms)?;

            if *target == barrel_path {
                barrel_head = Some(transformed.text);
                if !transformed.descriptions.is_empty() {
                    output.rewrites.insert(target.clone(), transformed.descriptions);
                }
                continue;
            }

            self.write(target, &transformed.text)?;
            debug!(
                from = %source.display(),
                to = %target.display(),
                rewrites = transformed.descriptions.len(),
                "copied"
            );
            if !transformed.descriptions.is_empty() {
                output.rewrites.insert(target.clone(), transformed.descriptions);
            }
            output.written_files.push(target.clone());
        }

        let mut barrel = render_barrel(&context_dir, &output.written_files);
        if let Some(head) = barrel_head {
            barrel = match barrel.trim() {
                "" => format!("{}\n", head.trim_end()),
                exports => format!("{}\n\n{}\n", head.trim_end(), exports),
            };
        }
        self.write(&barrel_path, &barrel)?;

        info!(
            context = %self.config.context_name,
            files = output.written_files.len(),
            rewrites = output.rewrite_count(),
            "context written"
        );
        Ok(output)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), ExtractorError> {
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| ExtractorError::write(parent, &e))?;
        }
        self.fs
            .write_file(path, contents)
            .map_err(|e| ExtractorError::write(path, &e))
    }

    fn plan(&self, frontend: &mut TypeScriptFrontend) -> Result<CopyPlan, ExtractorError> {
        let entries = &self.graph.entry_points;
        let mut narrowed = BTreeMap::new();

        let copied: BTreeSet<PathBuf> = if self.config.is_narrowing() {
            // A narrowed entry only reaches what its surviving imports name,
            // also when another entry's walk arrives at it.
            let mut retained: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
            for entry in entries {
                let Some(node) = self.graph.node(entry) else { continue };
                let Some(file) = self.narrow_entry(frontend, entry)? else { continue };
                let mut edges = Vec::new();
                for specifier in &file.retained_specifiers {
                    let resolved = node
                        .imports
                        .iter()
                        .find(|i| &i.module_specifier == specifier)
                        .and_then(|i| i.resolved_path.clone());
                    if let Some(path) = resolved.filter(|p| self.graph.contains(p)) {
                        edges.push(path);
                    }
                }
                retained.insert(entry.clone(), edges);
                narrowed.insert(entry.clone(), file.text);
            }
            self.graph.closure_with(entries.iter().cloned(), &retained)
        } else {
            self.graph.nodes.keys().cloned().collect()
        };

        let mut order: Vec<PathBuf> = entries.iter().filter(|e| copied.contains(*e)).cloned().collect();
        for path in &self.graph.order {
            if copied.contains(path) && !order.contains(path) {
                order.push(path.clone());
            }
        }
        Ok(CopyPlan { order, narrowed })
    }

    fn narrow_entry(
        &self,
        frontend: &mut TypeScriptFrontend,
        entry: &Path,
    ) -> Result<Option<NarrowedFile>, ExtractorError> {
        let Some(contract) = self.contracts.get(entry).filter(|c| c.has_messages()) else {
            return Ok(None);
        };
        let targets: Vec<String> = contract.messages.iter().map(|m| m.name.clone()).collect();
        let result_types: Vec<String> = contract
            .messages
            .iter()
            .filter_map(|m| m.result_type.as_ref())
            .flat_map(TypeRef::referenced_names)
            .collect();

        let tree = frontend.parse_file(self.fs, entry)?;
        let module = tree.summarize();
        let narrowed = narrow(
            &tree,
            &module,
            &targets,
            &result_types,
            &self.config.response_conventions,
        );
        if let Some(file) = &narrowed {
            debug!(
                entry = %entry.display(),
                kept = file.included.len(),
                imports = file.retained_specifiers.len(),
                "narrowed entry"
            );
        }
        Ok(narrowed)
    }
}
