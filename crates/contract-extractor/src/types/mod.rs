//! Structural type IR.
//!
//! Type expressions from the source are converted into [`TypeRef`] by
//! [`extract::TypeExtractor`]; top-level type declarations become
//! [`TypeDefinition`]s.

pub mod extract;
pub mod render;

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

pub use extract::TypeExtractor;
pub use render::to_ts_type;

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeRef {
    /// string, number, boolean, null, undefined, ...
    Primitive { name: String },
    /// T[]
    Array { element: Box<TypeRef> },
    /// { a: T; b?: U }
    Object { fields: Vec<Field> },
    /// T | U
    Union { members: Vec<TypeRef> },
    /// T & U
    Intersection { members: Vec<TypeRef> },
    /// A named type, possibly generic. Opaque type operators are kept here
    /// with their source text as the name.
    Reference {
        name: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        type_args: Vec<TypeRef>,
    },
    /// "Created", 42, true (source text)
    Literal { value: String },
    /// [A, B]
    Tuple { elements: Vec<TypeRef> },
    /// (a: A) => R
    Function {
        params: Vec<Field>,
        return_type: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive { name: name.into() }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference {
            name: name.into(),
            type_args: Vec::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::primitive("unknown")
    }

    /// Every reference name mentioned, recursively.
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeRef::Primitive { .. } | TypeRef::Literal { .. } => {}
            TypeRef::Array { element } => element.collect_references(out),
            TypeRef::Object { fields } => {
                for f in fields {
                    f.type_ref.collect_references(out);
                }
            }
            TypeRef::Union { members } | TypeRef::Intersection { members } => {
                for m in members {
                    m.collect_references(out);
                }
            }
            TypeRef::Reference { name, type_args } => {
                out.insert(name.clone());
                for arg in type_args {
                    arg.collect_references(out);
                }
            }
            TypeRef::Tuple { elements } => {
                for e in elements {
                    e.collect_references(out);
                }
            }
            TypeRef::Function { params, return_type } => {
                for p in params {
                    p.type_ref.collect_references(out);
                }
                return_type.collect_references(out);
            }
        }
    }

    /// Name of a plain reference.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            TypeRef::Reference { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A named member of an object type or a function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub optional: bool,
    pub readonly: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            optional: false,
            readonly: false,
        }
    }
}

/// Declaration kind of a [`TypeDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Interface,
    Type,
    Enum,
    Class,
}

/// A top-level type declaration. Identity is `(name, source_file)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub source_file: PathBuf,
    pub body: TypeRef,
    pub type_parameters: Vec<String>,
    pub exported: bool,
}
