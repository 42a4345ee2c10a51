//! Extraction of marked message classes from one parsed file.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::config::{ExtractorConfig, MarkerNames, ResponseConvention};
use crate::frontend::typescript::ast::ParsedModule;
use crate::frontend::typescript::parser::{
    decorator_name, decorator_nodes, is_class_kind, node_text, top_level_declarations, TopLevelItem,
};
use crate::frontend::SyntaxTree;
use crate::types::{Field, TypeDefinition, TypeExtractor, TypeRef};
use super::{ContractFile, Message, MessageKind, SourceFile};

/// Decorator option naming the result type explicitly.
pub const RESPONSE_OPTION: &str = "response";

/// Parses marked classes and the local type table out of syntax trees.
pub struct ContractParser<'c> {
    markers: &'c MarkerNames,
    filter: Option<&'c [MessageKind]>,
    conventions: &'c [ResponseConvention],
}

impl<'c> ContractParser<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Self {
            markers: &config.markers,
            filter: config.message_types.as_deref(),
            conventions: &config.response_conventions,
        }
    }

    fn accepts(&self, kind: MessageKind) -> bool {
        self.filter.map(|kinds| kinds.contains(&kind)).unwrap_or(true)
    }

    /// Kind marked on a class, resolving import aliases of the decorator.
    pub fn marker_kind(&self, tree: &SyntaxTree, module: &ParsedModule, item: &TopLevelItem) -> Option<MessageKind> {
        decorator_nodes(item).into_iter().find_map(|d| {
            let local = decorator_name(tree.source(), d)?;
            let imported = module.imported_name(&local).unwrap_or(&local);
            self.markers.kind_of(imported)
        })
    }

    /// Builds the contract table of one file.
    pub fn parse(&self, tree: &SyntaxTree, file: &SourceFile) -> ContractFile {
        let module = tree.summarize();
        let source = tree.source();
        let extractor = TypeExtractor::new(source);
        let imports: Vec<String> = module.imports.iter().map(|i| i.source.clone()).collect();

        let mut marked = BTreeSet::new();
        let mut pending = Vec::new();
        for item in top_level_declarations(tree.root()) {
            if !is_class_kind(item.declaration.kind()) {
                continue;
            }
            let Some(kind) = self.marker_kind(tree, &module, &item) else { continue };
            let Some(name_node) = item.declaration.child_by_field_name("name") else { continue };
            let name = node_text(source, name_node).to_string();
            marked.insert(name.clone());

            if !self.accepts(kind) {
                debug!(class = %name, kind = %kind, "skipping filtered message");
                continue;
            }
            pending.push((item, kind, name));
        }

        // The whole type table exists before any result type is resolved, so
        // declaration order does not matter.
        let types = extractor.definitions(tree.root(), &file.absolute_path, &marked, &module.local_exports);

        let messages = pending
            .into_iter()
            .map(|(item, kind, name)| {
                let (base_class_name, payload) = heritage(&extractor, source, item.declaration);
                let (fields, payload_type) = match payload {
                    Some(payload) => split_payload(payload, &name),
                    None => (Vec::new(), None),
                };
                let result_type = self.result_type(tree, &module, &item, &name, &types);
                Message {
                    name,
                    message_type: kind,
                    source_file: file.clone(),
                    fields,
                    base_class_name,
                    raw_source_text: node_text(source, item.statement).to_string(),
                    imports: imports.clone(),
                    payload_type,
                    result_type,
                }
            })
            .collect();

        ContractFile { messages, types }
    }

    /// Explicit decorator option, then the first convention with a same-file
    /// type, then nothing.
    fn result_type(
        &self,
        tree: &SyntaxTree,
        module: &ParsedModule,
        item: &TopLevelItem,
        name: &str,
        types: &[TypeDefinition],
    ) -> Option<TypeRef> {
        let declaration = module.declaration(name).filter(|d| d.span.start == item.statement.start_byte());
        if let Some(declaration) = declaration {
            for decorator in &declaration.decorators {
                let imported = module.imported_name(&decorator.name).unwrap_or(&decorator.name);
                if self.markers.kind_of(imported).is_none() {
                    continue;
                }
                if let Some(explicit) = decorator.option(RESPONSE_OPTION) {
                    return Some(TypeRef::reference(explicit));
                }
            }
        } else {
            debug!(class = %name, path = %tree.path().display(), "no summary for marked class");
        }

        self.conventions
            .iter()
            .filter_map(|c| c.derive(name))
            .find(|candidate| types.iter().any(|t| &t.name == candidate))
            .map(TypeRef::reference)
    }
}

/// Parses one file with the extractor's settings.
pub fn parse_contracts(tree: &SyntaxTree, file: &SourceFile, config: &ExtractorConfig) -> ContractFile {
    ContractParser::new(config).parse(tree, file)
}

/// Base class name and first type argument of the `extends` clause.
fn heritage(extractor: &TypeExtractor, source: &str, class: Node) -> (Option<String>, Option<TypeRef>) {
    let mut cursor = class.walk();
    let Some(heritage) = class.named_children(&mut cursor).find(|c| c.kind() == "class_heritage") else {
        return (None, None);
    };
    let mut cursor = heritage.walk();
    let Some(extends) = heritage.named_children(&mut cursor).find(|c| c.kind() == "extends_clause") else {
        return (None, None);
    };

    let base = extends
        .child_by_field_name("value")
        .map(|v| node_text(source, v).to_string());
    let payload = extends.child_by_field_name("type_arguments").and_then(|args| {
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).find(|c| c.kind() != "comment");
        first.map(|t| extractor.type_ref(t))
    });
    (base, payload)
}

/// Splits a payload into inline fields and a preserved payload type.
fn split_payload(payload: TypeRef, message: &str) -> (Vec<Field>, Option<TypeRef>) {
    match payload {
        TypeRef::Reference { .. } => (Vec::new(), Some(payload)),
        TypeRef::Object { fields } => (fields, None),
        TypeRef::Intersection { ref members } => {
            let fields = members
                .iter()
                .filter_map(|m| match m {
                    TypeRef::Object { fields } => Some(fields.iter().cloned()),
                    _ => None,
                })
                .flatten()
                .collect();
            (fields, Some(payload))
        }
        other => {
            warn!(
                message = %message,
                payload = %crate::types::to_ts_type(&other),
                "unsupported payload shape, treating payload as empty"
            );
            (Vec::new(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::config::ResponseConvention;
    use crate::frontend::TypeScriptParser;

    fn parse_with(source: &str, config: &ExtractorConfig) -> ContractFile {
        let mut parser = TypeScriptParser::new().unwrap();
        let tree = parser.parse(source, Path::new("/src/users/messages.ts")).unwrap();
        let file = SourceFile::new(Path::new("/src"), "/src/users/messages.ts");
        parse_contracts(&tree, &file, config)
    }

    fn parse(source: &str) -> ContractFile {
        parse_with(source, &ExtractorConfig::new("users", "/src", "/out"))
    }

    #[test]
    fn test_payload_shapes() {
        let contract = parse(
            r#"
import { PublicEvent, PublicCommand, PublicQuery } from "@contracts/markers";

export interface UserRef { id: string }

@PublicEvent()
export class UserCreated extends DomainEvent<{ id: string; email?: string }> {}

@PublicCommand()
export class RenameUser extends Command<UserRef> {}

@PublicQuery()
export class FindUser extends Query<UserRef & { includeDeleted: boolean }> {}
"#,
        );

        assert_eq!(contract.messages.len(), 3);

        let created = &contract.messages[0];
        assert_eq!(created.message_type, MessageKind::Event);
        assert_eq!(created.base_class_name.as_deref(), Some("DomainEvent"));
        assert_eq!(created.fields.len(), 2);
        assert!(created.fields[1].optional);
        assert!(created.payload_type.is_none());

        let rename = &contract.messages[1];
        assert!(rename.fields.is_empty());
        assert_eq!(rename.payload_type, Some(TypeRef::reference("UserRef")));

        let find = &contract.messages[2];
        assert_eq!(find.fields.len(), 1);
        assert_eq!(find.fields[0].name, "includeDeleted");
        assert!(matches!(find.payload_type, Some(TypeRef::Intersection { .. })));
        assert_eq!(find.imports, vec!["@contracts/markers"]);
    }

    #[test]
    fn test_unsupported_payload_is_empty() {
        let contract = parse(
            r#"
@PublicEvent()
export class Weird extends DomainEvent<string[]> {}

@PublicEvent()
export class Plain {}
"#,
        );
        assert_eq!(contract.messages.len(), 2);
        assert!(contract.messages[0].fields.is_empty());
        assert!(contract.messages[0].payload_type.is_none());
        assert!(contract.messages[1].base_class_name.is_none());
    }

    #[test]
    fn test_aliased_and_renamed_markers() {
        let mut config = ExtractorConfig::new("users", "/src", "/out");
        config.markers.event = "Integration".to_string();
        let contract = parse_with(
            r#"
import { Integration as Evt } from "@contracts/markers";

@Evt()
export class UserCreated extends DomainEvent<{ id: string }> {}

@PublicEvent()
export class NotMarkedAnymore extends DomainEvent<{ id: string }> {}
"#,
            &config,
        );

        let names: Vec<&str> = contract.messages.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["UserCreated"]);
        assert!(contract.type_definition("NotMarkedAnymore").is_some());
        assert!(contract.type_definition("UserCreated").is_none());
    }

    #[test]
    fn test_filter_skips_messages_entirely() {
        let mut config = ExtractorConfig::new("users", "/src", "/out");
        config.message_types = Some(vec![MessageKind::Event]);
        let contract = parse_with(
            r#"
@PublicEvent()
export class UserCreated extends DomainEvent<{ id: string }> {}

@PublicCommand()
export class CreateUser extends Command<{ email: string }> {}
"#,
            &config,
        );

        assert_eq!(contract.messages.len(), 1);
        assert_eq!(contract.messages[0].name, "UserCreated");
        // filtered marked classes are not part of the type table either
        assert!(contract.type_definition("CreateUser").is_none());
    }

    #[test]
    fn test_result_type_resolution_order() {
        let mut config = ExtractorConfig::new("users", "/src", "/out");
        config.response_conventions = vec![
            ResponseConvention::new("Command", "CommandResult"),
            ResponseConvention::new("Query", "Result"),
        ];
        let contract = parse_with(
            r#"
@PublicCommand()
export class CreateUserCommand extends Command<{ email: string }> {}

@PublicQuery({ response: "UserView" })
export class GetUserQuery extends Query<{ id: string }> {}

@PublicCommand()
export class DeleteUserCommand extends Command<{ id: string }> {}

type CreateUserCommandResult = { id: string };
type GetUserResult = { id: string };
"#,
            &config,
        );

        let results: Vec<Option<&str>> = contract
            .messages
            .iter()
            .map(|m| m.result_type.as_ref().and_then(TypeRef::reference_name))
            .collect();
        assert_eq!(results, vec![Some("CreateUserCommandResult"), Some("UserView"), None]);
        assert_eq!(contract.unexported_result_types(), vec!["CreateUserCommandResult"]);
    }

    #[test]
    fn test_raw_source_includes_decorators() {
        let contract = parse(
            r#"
@PublicEvent()
@Versioned(2)
export class UserCreated extends DomainEvent<{ id: string }> {}
"#,
        );
        let raw = &contract.messages[0].raw_source_text;
        assert!(raw.starts_with("@PublicEvent()"));
        assert!(raw.contains("@Versioned(2)"));
    }
}
