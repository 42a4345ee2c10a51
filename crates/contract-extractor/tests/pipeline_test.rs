use std::fs;
use std::path::Path;

use contract_extractor::{extract_workspace, Extractor, ExtractorConfig, MessageKind, OsFileSystem, WorkspaceConfig};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap_or_else(|e| panic!("{}: {}", relative, e))
}

fn users_fixture(root: &Path) {
    write(
        root,
        "src/users/events/user-created.ts",
        r#"import { PublicEvent } from "@contracts/markers";
import { UserId } from "@users/ids";
import { Email } from "../values/email";
import { Clock } from "../infra/clock";

@PublicEvent()
export class UserCreated extends DomainEvent<{ id: UserId; email: Email }> {}
"#,
    );
    write(root, "src/users/ids.ts", "export type UserId = string;\n");
    write(
        root,
        "src/users/values/email.ts",
        "import type { Brand } from \"@shared/brand\";\nexport type Email = Brand<string, \"email\">;\n",
    );
    write(root, "src/users/infra/clock.ts", "export class Clock {}\n");
    write(root, "src/users/events/user-created.spec.ts", "@PublicEvent()\nexport class Fake {}\n");
    write(root, "src/users/node_modules/pkg/index.ts", "@PublicEvent()\nexport class Vendored {}\n");
}

#[test]
fn extracts_context_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    users_fixture(root);

    let json = r#"{
        "outputDir": "dist/contracts",
        "contexts": [{ "name": "users", "sourceDir": "src/users" }],
        "paths": { "@users/*": ["src/users/*"] },
        "aliasRewrites": { "@shared/": "@contracts/shared/" }
    }"#;
    let workspace = WorkspaceConfig::from_json(&root.join("contracts.json"), json).unwrap();
    let configs = workspace.resolve(root).unwrap();
    let result = extract_workspace(&configs, &workspace.options(root), &OsFileSystem).unwrap();

    let context = &result.contexts[0];
    assert_eq!(context.messages.len(), 1);
    assert_eq!(context.messages[0].name, "UserCreated");
    assert_eq!(context.messages[0].message_type, MessageKind::Event);
    assert_eq!(context.stats().excluded, 1);

    let event = read(root, "dist/contracts/users/events/user-created.ts");
    assert!(event.contains("import { UserId } from \"../ids\";"));
    assert!(event.contains("import { Email } from \"../values/email\";"));
    assert!(!event.contains("infra/clock"));
    assert!(!event.contains("@PublicEvent"));
    assert!(!event.contains("@contracts/markers"));
    assert!(event.contains("export class UserCreated"));

    let email = read(root, "dist/contracts/users/values/email.ts");
    assert!(email.contains("from \"@contracts/shared/brand\""));

    assert_eq!(
        read(root, "dist/contracts/users/index.ts"),
        "export * from \"./events/user-created\";\nexport * from \"./ids\";\nexport * from \"./values/email\";\n"
    );
    assert!(!root.join("dist/contracts/users/infra/clock.ts").exists());
    assert!(!root.join("dist/contracts/users/events/user-created.spec.ts").exists());

    // re-exports are off unless requested
    assert!(result.reexport_files.is_empty());
    assert!(result.registry_path.is_none());
}

#[test]
fn rerun_is_stable() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    users_fixture(root);

    let mut config = ExtractorConfig::new("users", root.join("src/users"), root.join("out"));
    config.path_aliases = config.path_aliases.clone().with("@users/*", &["*"]);

    let first = Extractor::new(config.clone()).execute(&OsFileSystem).unwrap();
    let snapshot = read(root, "out/users/events/user-created.ts");
    let second = Extractor::new(config).execute(&OsFileSystem).unwrap();

    assert_eq!(first.output.written_files, second.output.written_files);
    assert_eq!(snapshot, read(root, "out/users/events/user-created.ts"));
}

#[test]
fn output_inside_source_tree_is_not_rescanned() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/orders/placed.ts",
        "@PublicEvent()\nexport class OrderPlaced extends DomainEvent<{ total: number }> {}\n",
    );
    // leftovers from an earlier run that kept decorators
    write(
        root,
        "src/orders/generated/orders/placed.ts",
        "@PublicEvent()\nexport class OrderPlaced extends DomainEvent<{ total: number }> {}\n",
    );

    let config = ExtractorConfig::new("orders", root.join("src/orders"), root.join("src/orders/generated"));
    let result = Extractor::new(config).execute(&OsFileSystem).unwrap();

    assert_eq!(result.messages.len(), 1);
    assert_eq!(result.graph.len(), 1);
}
