//! Marked message classes and the per-file contract table.

pub mod parser;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{Field, TypeDefinition, TypeRef};

pub use parser::{parse_contracts, ContractParser};

/// The three message kinds a marker can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Event,
    Command,
    Query,
}

impl MessageKind {
    pub const ALL: [MessageKind; 3] = [MessageKind::Event, MessageKind::Command, MessageKind::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Event => "event",
            MessageKind::Command => "command",
            MessageKind::Query => "query",
        }
    }

    /// Parses `event`, `command` or `query` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical identity of a source file: where it is, and where it sits
/// relative to the context's source root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
}

impl SourceFile {
    pub fn new(root: &Path, absolute_path: impl Into<PathBuf>) -> Self {
        let absolute_path = absolute_path.into();
        let relative_path = absolute_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());
        Self {
            absolute_path,
            relative_path,
        }
    }
}

/// A marked event, command or query class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub name: String,
    pub message_type: MessageKind,
    pub source_file: SourceFile,
    /// Payload fields when the payload is written inline.
    pub fields: Vec<Field>,
    pub base_class_name: Option<String>,
    /// The class statement as written, decorators included.
    pub raw_source_text: String,
    /// Module specifiers imported by the declaring file.
    pub imports: Vec<String>,
    pub payload_type: Option<TypeRef>,
    /// Response type, always a plain [`TypeRef::Reference`].
    pub result_type: Option<TypeRef>,
}

/// Everything the contract parser learned from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractFile {
    pub messages: Vec<Message>,
    /// Type table of the file: aliases, interfaces, enums and unmarked classes.
    pub types: Vec<TypeDefinition>,
}

impl ContractFile {
    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Result types declared in this file without an `export`; the rewrite
    /// engine has to export them.
    pub fn unexported_result_types(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for message in &self.messages {
            let Some(result) = message.result_type.as_ref().and_then(TypeRef::reference_name) else {
                continue;
            };
            let unexported = self
                .type_definition(result)
                .map(|t| !t.exported)
                .unwrap_or(false);
            if unexported && !names.iter().any(|n| n == result) {
                names.push(result.to_string());
            }
        }
        names
    }

    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }
}
