//! Message registry generation.

use std::collections::BTreeMap;

use crate::config::RegistryOptions;
use crate::contract::Message;
use crate::types::render::to_camel_case;

/// One context as seen by the registry.
#[derive(Debug, Clone)]
pub struct RegistryContext {
    pub name: String,
    /// Module specifier of the context barrel relative to the registry file.
    pub import_path: String,
    pub messages: Vec<Message>,
}

/// Generates the registry module: one import per context and a `register`
/// call per message, context-major then declaration order.
pub fn generate_registry(contexts: &[RegistryContext], options: &RegistryOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "import {{ {} }} from \"{}\";\n",
        options.registry_class, options.runtime_module
    ));

    let mut registrations: Vec<String> = Vec::new();
    if options.namespaced {
        for context in contexts {
            let namespace = to_camel_case(&context.name);
            output.push_str(&format!(
                "import * as {} from \"{}\";\n",
                namespace, context.import_path
            ));
            registrations.extend(
                context
                    .messages
                    .iter()
                    .map(|m| format!("{}.{}", namespace, m.name)),
            );
        }
    } else {
        // Names declared by more than one context are aliased everywhere.
        let mut owners: BTreeMap<&str, usize> = BTreeMap::new();
        for context in contexts {
            let mut seen = Vec::new();
            for message in &context.messages {
                if !seen.contains(&message.name.as_str()) {
                    seen.push(message.name.as_str());
                    *owners.entry(message.name.as_str()).or_default() += 1;
                }
            }
        }

        for context in contexts {
            if context.messages.is_empty() {
                continue;
            }
            let prefix = to_camel_case(&context.name);
            let mut specifiers: Vec<String> = Vec::new();
            for message in &context.messages {
                let duplicated = owners.get(message.name.as_str()).copied().unwrap_or(0) > 1;
                let (specifier, local) = if duplicated {
                    let alias = format!("{}{}", prefix, message.name);
                    (format!("{} as {}", message.name, alias), alias)
                } else {
                    (message.name.clone(), message.name.clone())
                };
                if !specifiers.contains(&specifier) {
                    specifiers.push(specifier);
                }
                registrations.push(local);
            }
            output.push_str(&format!(
                "import {{ {} }} from \"{}\";\n",
                specifiers.join(", "),
                context.import_path
            ));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "export const {} = new {}()",
        options.export_name, options.registry_class
    ));
    for registration in &registrations {
        output.push_str(&format!("\n  .register({})", registration));
    }
    output.push_str(";\n");

    output
}
