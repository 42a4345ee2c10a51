//! # Contract Extractor
//!
//! This crate extracts a self-contained "public contract" package from a
//! large TypeScript source tree. Classes marked as public events, commands or
//! queries are located, the files (or, in narrowing mode, the symbols) they
//! need to compile on their own are collected, and that slice is copied into
//! an output package with rewritten imports and a barrel export.
//!
//! ## Architecture
//!
//! ```text
//! Source tree (.ts / .tsx)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Scanner    │  Text pre-filter for marker candidates
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Contract   │  Marked classes + local type table
//! │   Parser     │  (tree-sitter)
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │    Graph     │  BFS over imports / re-exports,
//! │   Resolver   │  aliases, exclusions
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Rewrite    │  Narrowing, AST rewrites,
//! │   Engine     │  output files + barrel
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  Registry + re-export shims
//! │  (optional)  │  (workspace level)
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contract_extractor::{Extractor, ExtractorConfig, OsFileSystem};
//!
//! let config = ExtractorConfig::new("users", "src/users", "dist/contracts");
//! let result = Extractor::new(config).execute(&OsFileSystem)?;
//! println!("{} messages", result.messages.len());
//! ```

pub mod codegen;
pub mod config;
pub mod contract;
pub mod diagnostic;
pub mod frontend;
pub mod fs;
pub mod graph;
pub mod paths;
pub mod rewrite;
pub mod scanner;
pub mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use config::{ExtractorConfig, WorkspaceConfig, WorkspaceOptions};
pub use contract::{ContractFile, Message, MessageKind, SourceFile};
pub use diagnostic::{ErrorCategory, ExtractorError};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use graph::FileGraph;

use codegen::{generate_registry, generate_reexports, RegistryContext};
use contract::ContractParser;
use frontend::TypeScriptFrontend;
use graph::{ExclusionSet, GraphBuilder};
use rewrite::{RewriteEngine, RewriteOutput};
use scanner::MarkerScanner;

/// Marked files of a context and what was parsed out of them.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Files with at least one extracted message, sorted by path.
    pub entry_points: Vec<PathBuf>,
    pub contracts: BTreeMap<PathBuf, ContractFile>,
    /// Files the scanner flagged, including ones with no surviving message.
    pub candidates: Vec<PathBuf>,
}

impl Discovery {
    /// Every extracted message in entry-point then declaration order.
    pub fn messages(&self) -> Vec<Message> {
        self.entry_points
            .iter()
            .filter_map(|p| self.contracts.get(p))
            .flat_map(|c| c.messages.iter().cloned())
            .collect()
    }
}

/// Runs the pipeline for one context.
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Creates a new extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn exclusions(&self) -> Result<ExclusionSet, ExtractorError> {
        ExclusionSet::new(&self.config.source_dir, &self.config.exclude_dependencies)
    }

    /// Scans the source tree and parses every candidate.
    pub fn discover(
        &self,
        fs: &dyn FileSystem,
        frontend: &mut TypeScriptFrontend,
    ) -> Result<Discovery, ExtractorError> {
        let exclusions = self.exclusions()?;
        let mut scanner = MarkerScanner::new(&self.config.markers, &exclusions);
        if self.config.output_dir.starts_with(&self.config.source_dir) {
            scanner = scanner.ignoring(&self.config.output_dir);
        }
        let candidates = scanner.scan(fs, &self.config.source_dir)?;

        let parser = ContractParser::new(&self.config);
        let mut discovery = Discovery {
            candidates: candidates.clone(),
            ..Discovery::default()
        };
        for path in candidates {
            let tree = frontend.parse_file(fs, &path)?;
            let file = SourceFile::new(&self.config.source_dir, &path);
            let contract = parser.parse(&tree, &file);
            if contract.has_messages() {
                discovery.entry_points.push(path.clone());
            }
            discovery.contracts.insert(path, contract);
        }
        Ok(discovery)
    }

    /// Builds the file graph from the discovered entry points.
    pub fn build_graph(
        &self,
        fs: &dyn FileSystem,
        frontend: &mut TypeScriptFrontend,
        entry_points: &[PathBuf],
    ) -> Result<FileGraph, ExtractorError> {
        let exclusions = self.exclusions()?;
        GraphBuilder::new(fs, &self.config.source_dir, &self.config.path_aliases, &exclusions)
            .build(frontend, entry_points)
    }

    /// Scans, parses, resolves and writes this context.
    ///
    /// This runs the full pipeline:
    /// 1. Validate configuration
    /// 2. Scan for marker candidates and parse contracts
    /// 3. Build the file graph from the entry points
    /// 4. Copy (or narrow) and rewrite files, write the barrel
    pub fn execute(&self, fs: &dyn FileSystem) -> Result<ExtractResult, ExtractorError> {
        self.config.validate()?;
        let mut frontend = TypeScriptFrontend::new()?;

        let discovery = self.discover(fs, &mut frontend)?;
        if discovery.entry_points.is_empty() {
            warn!(context = %self.config.context_name, "no marked messages found");
        }

        let graph = self.build_graph(fs, &mut frontend, &discovery.entry_points)?;
        let output = RewriteEngine::new(&self.config, fs, &graph, &discovery.contracts).run(&mut frontend)?;

        Ok(ExtractResult {
            context_name: self.config.context_name.clone(),
            context_dir: self.config.context_output_dir(),
            messages: discovery.messages(),
            graph,
            output,
        })
    }
}

/// Result of extracting one context.
#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub context_name: String,
    /// `output_dir/<context>`.
    pub context_dir: PathBuf,
    pub messages: Vec<Message>,
    pub graph: FileGraph,
    pub output: RewriteOutput,
}

/// Counters for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub events: usize,
    pub commands: usize,
    pub queries: usize,
    pub nodes: usize,
    pub excluded: usize,
    pub files_written: usize,
    pub rewrites: usize,
}

impl ExtractResult {
    pub fn stats(&self) -> ExtractStats {
        let count = |kind: MessageKind| self.messages.iter().filter(|m| m.message_type == kind).count();
        ExtractStats {
            events: count(MessageKind::Event),
            commands: count(MessageKind::Command),
            queries: count(MessageKind::Query),
            nodes: self.graph.len(),
            excluded: self.graph.excluded_paths.len(),
            files_written: self.output.written_files.len(),
            rewrites: self.output.rewrite_count(),
        }
    }
}

/// Result of extracting every context of a workspace.
#[derive(Debug)]
pub struct WorkspaceResult {
    pub contexts: Vec<ExtractResult>,
    pub registry_path: Option<PathBuf>,
    pub reexport_files: Vec<PathBuf>,
    /// Generator failures. Contract files were written regardless.
    pub generator_errors: Vec<ExtractorError>,
    /// Non-fatal notes from the contexts and generators.
    pub warnings: Vec<String>,
}

/// Extracts every context in order, then runs the optional registry and
/// re-export generators. Context failures are fatal; generator failures are
/// collected into [`WorkspaceResult::generator_errors`].
pub fn extract_workspace(
    configs: &[ExtractorConfig],
    options: &WorkspaceOptions,
    fs: &dyn FileSystem,
) -> Result<WorkspaceResult, ExtractorError> {
    let mut result = WorkspaceResult {
        contexts: Vec::new(),
        registry_path: None,
        reexport_files: Vec::new(),
        generator_errors: Vec::new(),
        warnings: Vec::new(),
    };

    for config in configs {
        info!(context = %config.context_name, source = %config.source_dir.display(), "extracting context");
        let extracted = Extractor::new(config.clone()).execute(fs)?;
        result.warnings.extend(extracted.output.warnings.iter().cloned());
        result.contexts.push(extracted);
    }

    if let Some(registry) = &options.registry {
        match write_registry(fs, &options.output_dir, registry, &result.contexts) {
            Ok(path) => result.registry_path = Some(path),
            Err(e) => {
                warn!(error = %e, "registry generation failed");
                result.generator_errors.push(ExtractorError::generator("registry", &e));
            }
        }
    }

    if options.generate_reexports && !options.alias_rewrites.is_empty() {
        match write_reexports(fs, options, &result.contexts) {
            Ok((files, skipped)) => {
                result.reexport_files = files;
                result.warnings.extend(skipped);
            }
            Err(e) => {
                warn!(error = %e, "re-export generation failed");
                result.generator_errors.push(ExtractorError::generator("re-export", &e));
            }
        }
    }

    Ok(result)
}

fn write_registry(
    fs: &dyn FileSystem,
    output_dir: &Path,
    options: &config::RegistryOptions,
    contexts: &[ExtractResult],
) -> Result<PathBuf, ExtractorError> {
    let registry_contexts: Vec<RegistryContext> = contexts
        .iter()
        .map(|c| RegistryContext {
            name: c.context_name.clone(),
            import_path: format!("./{}", c.context_name),
            messages: c.messages.clone(),
        })
        .collect();
    let code = generate_registry(&registry_contexts, options);
    let path = output_dir.join(&options.file_name);
    fs.create_dir_all(output_dir)
        .map_err(|e| ExtractorError::write(output_dir, &e))?;
    fs.write_file(&path, &code)
        .map_err(|e| ExtractorError::write(&path, &e))?;
    Ok(path)
}

/// Writes the shims; shims that would overwrite a contract file are skipped.
fn write_reexports(
    fs: &dyn FileSystem,
    options: &WorkspaceOptions,
    contexts: &[ExtractResult],
) -> Result<(Vec<PathBuf>, Vec<String>), ExtractorError> {
    let written: Vec<PathBuf> = contexts
        .iter()
        .flat_map(|c| c.output.written_files.iter().cloned())
        .collect();
    let mut frontend = TypeScriptFrontend::new()?;
    let mut code = generate_reexports(fs, &mut frontend, &written, &options.alias_rewrites)?;

    let mut skipped = Vec::new();
    code.files.retain(|(name, _)| {
        let path = options.output_dir.join(name);
        let collides = written.contains(&path) || contexts.iter().any(|c| c.output.barrel_path == path);
        if collides {
            skipped.push(format!("re-export shim {} would overwrite a contract file", path.display()));
        }
        !collides
    });
    for note in &skipped {
        warn!("{}", note);
    }

    let files = code.write(fs, &options.output_dir)?;
    Ok((files, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{AliasRewrite, RegistryOptions, ResponseConvention};

    fn config(context: &str) -> ExtractorConfig {
        ExtractorConfig::new(context, "/repo/src", "/repo/out")
    }

    fn read(fs: &MemoryFileSystem, path: &str) -> String {
        fs.get(path).unwrap_or_else(|| panic!("{} was not written", path))
    }

    #[test]
    fn test_diamond_scenario() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/repo/src/a.ts",
                "import { X } from \"./b\";\nimport { Y } from \"./c\";\n\n@PublicEvent()\nexport class Created extends DomainEvent<{ x: X; y: Y }> {}\n",
            )
            .with_file("/repo/src/b.ts", "import { Z } from \"./d\";\nexport type X = Z;\n")
            .with_file("/repo/src/c.ts", "import { Z } from \"./d\";\nexport type Y = Z;\n")
            .with_file("/repo/src/d.ts", "export type Z = string;\n")
            .with_file("/repo/src/other.ts", "export const unrelated = 1;\n");

        let result = Extractor::new(config("users")).execute(&fs).unwrap();

        assert_eq!(result.graph.len(), 4);
        assert_eq!(
            read(&fs, "/repo/out/users/index.ts"),
            "export * from \"./a\";\nexport * from \"./b\";\nexport * from \"./c\";\nexport * from \"./d\";\n"
        );
        assert!(fs.get("/repo/out/users/other.ts").is_none());
        assert!(!read(&fs, "/repo/out/users/a.ts").contains("@PublicEvent"));

        let stats = result.stats();
        assert_eq!(stats.events, 1);
        assert_eq!(stats.files_written, 4);
    }

    #[test]
    fn test_convention_result_type_is_exported() {
        let fs = MemoryFileSystem::new().with_file(
            "/repo/src/users/create-user.ts",
            r#"import { PublicCommand } from "@contracts/markers";

type CreateUserCommandResult = { id: string };

@PublicCommand()
export class CreateUserCommand extends Command<{ email: string }> {}
"#,
        );
        let mut config = config("users");
        config.response_conventions = vec![ResponseConvention::new("Command", "CommandResult")];

        let result = Extractor::new(config).execute(&fs).unwrap();

        assert_eq!(
            result.messages[0].result_type,
            Some(types::TypeRef::reference("CreateUserCommandResult"))
        );
        let text = read(&fs, "/repo/out/users/users/create-user.ts");
        assert!(text.contains("export type CreateUserCommandResult"));
        assert!(!text.contains("@contracts/markers"));
        let rewrites = &result.output.rewrites[&PathBuf::from("/repo/out/users/users/create-user.ts")];
        assert!(rewrites.contains(&"exported 'CreateUserCommandResult'".to_string()));
    }

    #[test]
    fn test_event_narrowing_drops_command_side() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/repo/src/users/messages.ts",
                r#"import { PublicEvent, PublicCommand } from "@contracts/markers";
import { UserId } from "./ids";
import { PasswordPolicy } from "./password";

function validatePassword(p: string) { return PasswordPolicy.check(p); }

@PublicEvent()
export class UserRegistered extends DomainEvent<{ id: UserId }> {}

@PublicCommand()
export class RegisterUser extends Command<{ password: string }> {
  validate() { return validatePassword("x"); }
}
"#,
            )
            .with_file("/repo/src/users/ids.ts", "export type UserId = string;\n")
            .with_file("/repo/src/users/password.ts", "export const PasswordPolicy = { check: (p: string) => p.length > 8 };\n");

        let mut config = config("users");
        config.message_types = Some(vec![MessageKind::Event]);
        let result = Extractor::new(config).execute(&fs).unwrap();

        let text = read(&fs, "/repo/out/users/users/messages.ts");
        assert!(text.contains("export class UserRegistered"));
        assert!(!text.contains("RegisterUser"));
        assert!(!text.contains("validatePassword"));
        assert!(!text.contains("./password"));
        assert!(text.contains("import { UserId } from \"./ids\";"));

        assert!(fs.get("/repo/out/users/users/ids.ts").is_some());
        assert!(fs.get("/repo/out/users/users/password.ts").is_none());
        assert_eq!(result.output.narrowed_files, vec![PathBuf::from("/repo/src/users/messages.ts")]);
        // the graph still saw the dropped dependency
        assert!(result.graph.contains(Path::new("/repo/src/users/password.ts")));
    }

    #[test]
    fn test_excluded_import_is_removed_from_output() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/repo/src/orders/placed.ts",
                "import { OrderId } from \"./ids\";\nimport { Repo } from \"./infra/repo\";\n\n@PublicEvent()\nexport class OrderPlaced extends DomainEvent<{ id: OrderId }> {}\n",
            )
            .with_file("/repo/src/orders/ids.ts", "export type OrderId = string;\n")
            .with_file("/repo/src/orders/infra/repo.ts", "export class Repo {}\n");

        let result = Extractor::new(config("orders")).execute(&fs).unwrap();

        assert!(result.graph.is_excluded(Path::new("/repo/src/orders/infra/repo.ts")));
        assert!(!result.graph.contains(Path::new("/repo/src/orders/infra/repo.ts")));
        let text = read(&fs, "/repo/out/orders/orders/placed.ts");
        assert!(!text.contains("infra/repo"));
        assert!(text.contains("import { OrderId } from \"./ids\";"));
        assert!(fs.get("/repo/out/orders/orders/infra/repo.ts").is_none());
        assert_eq!(result.stats().excluded, 1);
    }

    #[test]
    fn test_root_index_is_merged_into_barrel() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/repo/src/index.ts",
                "import { Base } from \"./lib/base\";\n\nexport type Shared = Base;\n",
            )
            .with_file("/repo/src/lib/base.ts", "export type Base = string;\n")
            .with_file(
                "/repo/src/event.ts",
                "import { Shared } from \"./index\";\n@PublicEvent()\nexport class E extends DomainEvent<{ s: Shared }> {}\n",
            );

        let result = Extractor::new(config("ctx")).execute(&fs).unwrap();

        assert_eq!(result.output.warnings.len(), 1);
        assert_eq!(
            read(&fs, "/repo/out/ctx/index.ts"),
            "import { Base } from \"./lib/base\";\n\nexport type Shared = Base;\n\nexport * from \"./event\";\nexport * from \"./lib/base\";\n"
        );
        assert!(read(&fs, "/repo/out/ctx/event.ts").contains("from \"./index\""));
        assert!(!result.output.written_files.contains(&PathBuf::from("/repo/out/ctx/index.ts")));
    }

    #[test]
    fn test_narrowing_does_not_follow_dropped_imports_of_other_entries() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/repo/src/a.ts",
                "import { BId } from \"./b\";\n\n@PublicEvent()\nexport class ACreated extends DomainEvent<{ id: BId }> {}\n",
            )
            .with_file(
                "/repo/src/b.ts",
                r#"import { PasswordPolicy } from "./password";

export type BId = string;

@PublicEvent()
export class BCreated extends DomainEvent<{ id: BId }> {}

@PublicCommand()
export class ResetPassword extends Command<{ id: BId }> {
  run() { return PasswordPolicy.check("x"); }
}
"#,
            )
            .with_file("/repo/src/password.ts", "export const PasswordPolicy = { check: (p: string) => p.length > 8 };\n");

        let mut config = config("ctx");
        config.message_types = Some(vec![MessageKind::Event]);
        let result = Extractor::new(config).execute(&fs).unwrap();

        assert!(!read(&fs, "/repo/out/ctx/b.ts").contains("./password"));
        assert!(fs.get("/repo/out/ctx/password.ts").is_none());
        assert_eq!(
            read(&fs, "/repo/out/ctx/index.ts"),
            "export * from \"./a\";\nexport * from \"./b\";\n"
        );
        assert!(result.graph.contains(Path::new("/repo/src/password.ts")));
    }

    /// Memory file system that refuses to write one file.
    struct RefusingFs {
        inner: MemoryFileSystem,
        refused: PathBuf,
    }

    impl FileSystem for RefusingFs {
        fn read_file(&self, path: &Path) -> std::io::Result<String> {
            self.inner.read_file(path)
        }
        fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
            self.inner.read_dir(path)
        }
        fn write_file(&self, path: &Path, contents: &str) -> std::io::Result<()> {
            if path == self.refused {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.inner.write_file(path, contents)
        }
        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            self.inner.create_dir_all(path)
        }
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }
        fn stat(&self, path: &Path) -> std::io::Result<fs::FileStat> {
            self.inner.stat(path)
        }
    }

    fn workspace_fixture() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file(
                "/repo/src/users/created.ts",
                "import { Email } from \"@shared/email\";\n@PublicEvent()\nexport class UserCreated extends DomainEvent<{ email: Email }> {}\n",
            )
            .with_file(
                "/repo/src/billing/paid.ts",
                "import type { Money } from \"@shared/money\";\n@PublicEvent()\nexport class InvoicePaid extends DomainEvent<{ amount: Money }> {}\n",
            )
    }

    fn workspace_configs() -> Vec<ExtractorConfig> {
        let mut users = ExtractorConfig::new("users", "/repo/src/users", "/repo/out");
        users.alias_rewrites = vec![AliasRewrite::new("@shared/", "@contracts/shared/")];
        let mut billing = ExtractorConfig::new("billing", "/repo/src/billing", "/repo/out");
        billing.alias_rewrites = users.alias_rewrites.clone();
        vec![users, billing]
    }

    fn workspace_options() -> WorkspaceOptions {
        WorkspaceOptions {
            output_dir: PathBuf::from("/repo/out"),
            registry: Some(RegistryOptions::default()),
            generate_reexports: true,
            alias_rewrites: vec![AliasRewrite::new("@shared/", "@contracts/shared/")],
        }
    }

    #[test]
    fn test_workspace_writes_registry_and_shims() {
        let fs = workspace_fixture();
        let result = extract_workspace(&workspace_configs(), &workspace_options(), &fs).unwrap();

        assert_eq!(result.contexts.len(), 2);
        assert!(result.generator_errors.is_empty());
        assert!(read(&fs, "/repo/out/users/created.ts").contains("from \"@contracts/shared/email\""));

        let registry = read(&fs, "/repo/out/registry.ts");
        assert!(registry.contains("import * as users from \"./users\";"));
        assert!(registry.contains(".register(users.UserCreated)\n  .register(billing.InvoicePaid);"));

        assert_eq!(
            read(&fs, "/repo/out/shared/email.ts"),
            "export { Email } from \"@shared/email\";\n"
        );
        assert_eq!(
            read(&fs, "/repo/out/shared/money.ts"),
            "export type { Money } from \"@shared/money\";\n"
        );
        assert_eq!(result.reexport_files.len(), 2);
    }

    #[test]
    fn test_generator_failure_is_not_fatal() {
        let fs = RefusingFs {
            inner: workspace_fixture(),
            refused: PathBuf::from("/repo/out/registry.ts"),
        };
        let result = extract_workspace(&workspace_configs(), &workspace_options(), &fs).unwrap();

        assert_eq!(result.generator_errors.len(), 1);
        assert_eq!(result.generator_errors[0].category(), ErrorCategory::Generator);
        assert!(result.registry_path.is_none());
        assert!(fs.inner.get("/repo/out/users/created.ts").is_some());
        assert_eq!(result.reexport_files.len(), 2);
    }

    #[test]
    fn test_invalid_config_fails_before_io() {
        let fs = MemoryFileSystem::new();
        let err = Extractor::new(config("")).execute(&fs).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_missing_source_dir_is_fatal() {
        let fs = MemoryFileSystem::new();
        let err = Extractor::new(config("users")).execute(&fs).unwrap_err();
        assert!(matches!(err, ExtractorError::NotFound { .. }));
    }
}
