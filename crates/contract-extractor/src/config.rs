//! Extractor configuration.
//!
//! Configuration is plain data. [`ExtractorConfig`] drives one context;
//! [`WorkspaceConfig`] is the on-disk shape the CLI loads (shared settings
//! plus a list of contexts) and resolves into one `ExtractorConfig` each.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::contract::MessageKind;
use crate::diagnostic::ExtractorError;

/// Default dependency exclusion globs: test files and infrastructure paths.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*.spec.ts",
    "**/*.test.ts",
    "**/*.spec.tsx",
    "**/*.test.tsx",
    "**/__tests__/**",
    "**/__mocks__/**",
    "**/infra/**",
    "**/infrastructure/**",
    "**/migrations/**",
];

/// Marker decorator names, one per message kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerNames {
    pub event: String,
    pub command: String,
    pub query: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            event: "PublicEvent".to_string(),
            command: "PublicCommand".to_string(),
            query: "PublicQuery".to_string(),
        }
    }
}

impl MarkerNames {
    /// Maps a decorator name to the kind it marks.
    pub fn kind_of(&self, decorator: &str) -> Option<MessageKind> {
        if decorator == self.event {
            Some(MessageKind::Event)
        } else if decorator == self.command {
            Some(MessageKind::Command)
        } else if decorator == self.query {
            Some(MessageKind::Query)
        } else {
            None
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.event, &self.command, &self.query]
    }
}

/// A `{messageSuffix -> responseSuffix}` naming rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConvention {
    pub message_suffix: String,
    pub response_suffix: String,
}

impl ResponseConvention {
    pub fn new(message_suffix: impl Into<String>, response_suffix: impl Into<String>) -> Self {
        Self {
            message_suffix: message_suffix.into(),
            response_suffix: response_suffix.into(),
        }
    }

    /// `CreateUserCommand` + `{Command -> CommandResult}` = `CreateUserCommandResult`.
    pub fn derive(&self, message_name: &str) -> Option<String> {
        let stem = message_name.strip_suffix(&self.message_suffix)?;
        if stem.is_empty() {
            return None;
        }
        Some(format!("{}{}", stem, self.response_suffix))
    }
}

/// A literal prefix substitution applied to external import specifiers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasRewrite {
    pub from: String,
    pub to: String,
}

impl AliasRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Wildcard path mappings used to resolve non-relative specifiers,
/// e.g. `"@lib/*" -> ["libs/*"]`, relative to `base_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAliases {
    pub base_dir: PathBuf,
    pub patterns: Vec<(String, Vec<String>)>,
}

impl PathAliases {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            patterns: Vec::new(),
        }
    }

    pub fn with(mut self, pattern: impl Into<String>, targets: &[&str]) -> Self {
        self.patterns
            .push((pattern.into(), targets.iter().map(|t| t.to_string()).collect()));
        self
    }
}

/// Per-transform toggles for the rewrite engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub strip_excluded_imports: bool,
    pub strip_markers: bool,
    pub export_response_types: bool,
    pub rewrite_internal_paths: bool,
    pub rewrite_external_aliases: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            strip_excluded_imports: true,
            strip_markers: true,
            export_response_types: true,
            rewrite_internal_paths: true,
            rewrite_external_aliases: true,
        }
    }
}

/// Configuration for extracting one context.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Context name; output goes to `output_dir/<context_name>`.
    pub context_name: String,
    /// Source root of the context.
    pub source_dir: PathBuf,
    /// Root of the generated package.
    pub output_dir: PathBuf,
    /// Ordered prefix rewrites for external imports.
    pub alias_rewrites: Vec<AliasRewrite>,
    /// Path mappings for alias resolution.
    pub path_aliases: PathAliases,
    pub markers: MarkerNames,
    /// When set, only these kinds are extracted and symbol narrowing is on.
    pub message_types: Option<Vec<MessageKind>>,
    pub response_conventions: Vec<ResponseConvention>,
    /// Strip marker decorators from copied files.
    pub remove_decorators: bool,
    pub exclude_dependencies: Vec<String>,
    pub transforms: TransformOptions,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            context_name: "contracts".to_string(),
            source_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("contracts"),
            alias_rewrites: Vec::new(),
            path_aliases: PathAliases::default(),
            markers: MarkerNames::default(),
            message_types: None,
            response_conventions: Vec::new(),
            remove_decorators: true,
            exclude_dependencies: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            transforms: TransformOptions::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn new(
        context_name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let source_dir = source_dir.into();
        Self {
            context_name: context_name.into(),
            path_aliases: PathAliases::new(source_dir.clone()),
            source_dir,
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Directory this context's files are written to.
    pub fn context_output_dir(&self) -> PathBuf {
        self.output_dir.join(&self.context_name)
    }

    /// Whether the stricter symbol-narrowing mode is active.
    pub fn is_narrowing(&self) -> bool {
        self.message_types.is_some()
    }

    /// Whether a message kind passes the configured filter.
    pub fn accepts(&self, kind: MessageKind) -> bool {
        self.message_types
            .as_ref()
            .map(|kinds| kinds.contains(&kind))
            .unwrap_or(true)
    }

    /// Effective transform toggles (`remove_decorators` gates marker stripping).
    pub fn effective_transforms(&self) -> TransformOptions {
        TransformOptions {
            strip_markers: self.transforms.strip_markers && self.remove_decorators,
            ..self.transforms
        }
    }

    /// Checks required settings.
    pub fn validate(&self) -> Result<(), ExtractorError> {
        let name = self.context_name.trim();
        if name.is_empty() {
            return Err(ExtractorError::config("contextName", "must not be empty"));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ExtractorError::config(
                "contextName",
                format!("'{}' must be a single directory name", name),
            ));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(ExtractorError::config("sourceDir", "must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ExtractorError::config("outputDir", "must not be empty"));
        }
        for (field, value) in self.markers.all().iter().zip(["markers.event", "markers.command", "markers.query"]) {
            if field.trim().is_empty() {
                return Err(ExtractorError::config(value, "marker name must not be empty"));
            }
        }
        let markers = self.markers.all();
        if markers[0] == markers[1] || markers[1] == markers[2] || markers[0] == markers[2] {
            return Err(ExtractorError::config("markers", "marker names must be distinct"));
        }
        if let Some(kinds) = &self.message_types {
            if kinds.is_empty() {
                return Err(ExtractorError::config(
                    "messageTypes",
                    "must list at least one kind when present",
                ));
            }
        }
        for convention in &self.response_conventions {
            if convention.message_suffix.is_empty() || convention.response_suffix.is_empty() {
                return Err(ExtractorError::config(
                    "responseConventions",
                    "suffixes must not be empty",
                ));
            }
        }
        for rewrite in &self.alias_rewrites {
            if rewrite.from.is_empty() || rewrite.to.is_empty() {
                return Err(ExtractorError::config("aliasRewrites", "prefixes must not be empty"));
            }
        }
        for (pattern, targets) in &self.path_aliases.patterns {
            if pattern.matches('*').count() > 1 {
                return Err(ExtractorError::config(
                    "paths",
                    format!("pattern '{}' may contain at most one '*'", pattern),
                ));
            }
            if targets.is_empty() {
                return Err(ExtractorError::config(
                    "paths",
                    format!("pattern '{}' has no targets", pattern),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// On-disk workspace configuration
// =============================================================================

/// Registry generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryOptions {
    /// `import * as ctx from "./ctx"` instead of named imports.
    pub namespaced: bool,
    /// Module the registry class is imported from.
    pub runtime_module: String,
    pub registry_class: String,
    /// Name of the exported registry constant.
    pub export_name: String,
    /// File name relative to the output directory.
    pub file_name: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            namespaced: true,
            runtime_module: "@contracts/runtime".to_string(),
            registry_class: "MessageRegistry".to_string(),
            export_name: "messageRegistry".to_string(),
            file_name: "registry.ts".to_string(),
        }
    }
}

/// One context entry in `contracts.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub name: String,
    pub source_dir: PathBuf,
    #[serde(default)]
    pub message_types: Option<Vec<MessageKind>>,
}

/// Shape of `contracts.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    pub output_dir: PathBuf,
    pub contexts: Vec<ContextEntry>,
    #[serde(default)]
    pub alias_rewrites: BTreeMap<String, String>,
    /// Path mappings, e.g. `{ "@lib/*": ["libs/*"] }`.
    #[serde(default)]
    pub paths: BTreeMap<String, Vec<String>>,
    /// Base directory for `paths` targets; defaults to the config file's directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub markers: MarkerNames,
    #[serde(default)]
    pub message_types: Option<Vec<MessageKind>>,
    #[serde(default)]
    pub response_conventions: Vec<ResponseConvention>,
    #[serde(default = "default_true")]
    pub remove_decorators: bool,
    #[serde(default)]
    pub exclude_dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub transforms: TransformOptions,
    #[serde(default)]
    pub registry: Option<RegistryOptions>,
    #[serde(default)]
    pub generate_reexports: bool,
}

fn default_true() -> bool {
    true
}

impl WorkspaceConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ExtractorError> {
        serde_json::from_str(text).map_err(|e| ExtractorError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolves every context into its own extractor config. Relative paths
    /// are anchored at `root` (the config file's directory).
    pub fn resolve(&self, root: &Path) -> Result<Vec<ExtractorConfig>, ExtractorError> {
        if self.contexts.is_empty() {
            return Err(ExtractorError::config("contexts", "at least one context is required"));
        }
        let base_dir = root.join(self.base_dir.clone().unwrap_or_default());
        let output_dir = root.join(&self.output_dir);
        let mut seen = std::collections::BTreeSet::new();
        let mut configs = Vec::new();
        for entry in &self.contexts {
            if !seen.insert(entry.name.clone()) {
                return Err(ExtractorError::config(
                    "contexts",
                    format!("duplicate context name '{}'", entry.name),
                ));
            }
            let config = ExtractorConfig {
                context_name: entry.name.clone(),
                source_dir: crate::paths::normalize(&root.join(&entry.source_dir)),
                output_dir: crate::paths::normalize(&output_dir),
                alias_rewrites: self
                    .alias_rewrites
                    .iter()
                    .map(|(from, to)| AliasRewrite::new(from, to))
                    .collect(),
                path_aliases: PathAliases {
                    base_dir: crate::paths::normalize(&base_dir),
                    patterns: self.paths.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                },
                markers: self.markers.clone(),
                message_types: entry.message_types.clone().or_else(|| self.message_types.clone()),
                response_conventions: self.response_conventions.clone(),
                remove_decorators: self.remove_decorators,
                exclude_dependencies: self
                    .exclude_dependencies
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()),
                transforms: self.transforms,
            };
            config.validate()?;
            configs.push(config);
        }
        Ok(configs)
    }

    /// Every alias rewrite in declaration order (shared by all contexts).
    pub fn alias_rewrite_list(&self) -> Vec<AliasRewrite> {
        self.alias_rewrites
            .iter()
            .map(|(from, to)| AliasRewrite::new(from, to))
            .collect()
    }

    /// Settings for the cross-context generators.
    pub fn options(&self, root: &Path) -> WorkspaceOptions {
        WorkspaceOptions {
            output_dir: crate::paths::normalize(&root.join(&self.output_dir)),
            registry: self.registry.clone(),
            generate_reexports: self.generate_reexports,
            alias_rewrites: self.alias_rewrite_list(),
        }
    }
}

/// Settings for the steps that run once after every context is extracted.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    pub output_dir: PathBuf,
    /// Generate the message registry when set.
    pub registry: Option<RegistryOptions>,
    pub generate_reexports: bool,
    pub alias_rewrites: Vec<AliasRewrite>,
}
