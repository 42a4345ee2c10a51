//! TypeScript rendering of [`TypeRef`] and identifier case helpers.

use super::{Field, TypeRef};

/// Converts a TypeRef back to a TypeScript type string.
pub fn to_ts_type(typ: &TypeRef) -> String {
    match typ {
        TypeRef::Primitive { name } => name.clone(),
        TypeRef::Array { element } => match element.as_ref() {
            TypeRef::Union { .. } | TypeRef::Intersection { .. } | TypeRef::Function { .. } => {
                format!("({})[]", to_ts_type(element))
            }
            _ => format!("{}[]", to_ts_type(element)),
        },
        TypeRef::Object { fields } => generate_object_type(fields),
        TypeRef::Union { members } => join_members(members, " | "),
        TypeRef::Intersection { members } => join_members(members, " & "),
        TypeRef::Reference { name, type_args } => {
            if type_args.is_empty() {
                name.clone()
            } else {
                let args: Vec<String> = type_args.iter().map(to_ts_type).collect();
                format!("{}<{}>", name, args.join(", "))
            }
        }
        TypeRef::Literal { value } => value.clone(),
        TypeRef::Tuple { elements } => {
            let parts: Vec<String> = elements.iter().map(to_ts_type).collect();
            format!("[{}]", parts.join(", "))
        }
        TypeRef::Function { params, return_type } => {
            let parts: Vec<String> = params.iter().map(format_field).collect();
            format!("({}) => {}", parts.join(", "), to_ts_type(return_type))
        }
    }
}

fn join_members(members: &[TypeRef], separator: &str) -> String {
    let parts: Vec<String> = members
        .iter()
        .map(|m| match m {
            TypeRef::Function { .. } => format!("({})", to_ts_type(m)),
            _ => to_ts_type(m),
        })
        .collect();
    parts.join(separator)
}

/// Generates an inline TypeScript object type.
pub fn generate_object_type(fields: &[Field]) -> String {
    if fields.is_empty() {
        return "{}".to_string();
    }

    let fields: Vec<String> = fields.iter().map(format_field).collect();
    format!("{{ {} }}", fields.join("; "))
}

/// Formats a single field definition.
fn format_field(field: &Field) -> String {
    let readonly = if field.readonly { "readonly " } else { "" };
    let optional_marker = if field.optional { "?" } else { "" };
    format!("{}{}{}: {}", readonly, field.name, optional_marker, to_ts_type(&field.type_ref))
}

/// Converts a kebab-case, snake_case or PascalCase name to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ' || c == '.')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Converts a name to camelCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}
