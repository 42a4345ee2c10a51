//! Re-export shim generation.
//!
//! After alias rewriting, copied files import from modules such as
//! `@contracts/shared/ids`. For each such target a shim is emitted at the
//! target's subpath inside the output package that re-exports the used
//! symbols from the original module.

use std::path::PathBuf;

use tracing::debug;

use crate::config::AliasRewrite;
use crate::diagnostic::ExtractorError;
use crate::frontend::typescript::ast::ImportSpecifier;
use crate::frontend::TypeScriptFrontend;
use crate::fs::FileSystem;
use super::GeneratedCode;

/// Symbols used from one rewritten target module.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ShimGroup {
    target: String,
    original: String,
    names: Vec<String>,
    type_only: bool,
}

/// Recovers the original module of a rewritten specifier.
fn invert(specifier: &str, rewrites: &[AliasRewrite]) -> Option<String> {
    rewrites
        .iter()
        .filter(|r| specifier.starts_with(r.to.as_str()))
        .max_by_key(|r| r.to.len())
        .map(|r| format!("{}{}", r.from, &specifier[r.to.len()..]))
}

/// Path after the package name: `@scope/pkg/a/b` and `pkg/a/b` give `a/b`.
pub fn subpath_after_package(specifier: &str) -> &str {
    let skip = if specifier.starts_with('@') { 2 } else { 1 };
    let mut rest = specifier;
    for _ in 0..skip {
        match rest.split_once('/') {
            Some((_, tail)) => rest = tail,
            None => return "",
        }
    }
    rest.trim_matches('/')
}

/// File name of the shim for a target module.
pub fn shim_file(specifier: &str) -> String {
    let subpath = subpath_after_package(specifier);
    if subpath.is_empty() {
        "index.ts".to_string()
    } else {
        format!("{}.ts", subpath)
    }
}

/// Scans written files and builds one shim per rewritten target module.
pub fn generate_reexports(
    fs: &dyn FileSystem,
    frontend: &mut TypeScriptFrontend,
    written_files: &[PathBuf],
    rewrites: &[AliasRewrite],
) -> Result<GeneratedCode, ExtractorError> {
    let mut groups: Vec<ShimGroup> = Vec::new();

    for path in written_files {
        let tree = frontend.parse_file(fs, path)?;
        let module = tree.summarize();

        let mut statements: Vec<(&str, bool, &[ImportSpecifier], Option<&str>)> = Vec::new();
        for import in &module.imports {
            statements.push((
                import.source.as_str(),
                import.type_only,
                import.specifiers.as_slice(),
                import.default.as_deref(),
            ));
        }
        for re_export in &module.re_exports {
            statements.push((re_export.source.as_str(), re_export.type_only, re_export.specifiers.as_slice(), None));
        }

        for (specifier, statement_type_only, specifiers, default) in statements {
            let Some(original) = invert(specifier, rewrites) else { continue };

            let mut names: Vec<String> = specifiers.iter().map(|s| s.name.clone()).collect();
            if default.is_some() {
                names.push("default".to_string());
            }
            if names.is_empty() {
                continue;
            }
            let type_only = statement_type_only
                || (default.is_none() && specifiers.iter().all(|s| s.type_only));

            match groups.iter_mut().find(|g| g.target == specifier) {
                Some(group) => {
                    for name in names {
                        if !group.names.contains(&name) {
                            group.names.push(name);
                        }
                    }
                    group.type_only &= type_only;
                }
                None => groups.push(ShimGroup {
                    target: specifier.to_string(),
                    original,
                    names,
                    type_only,
                }),
            }
        }
    }

    let mut code = GeneratedCode::default();
    for group in &groups {
        let keyword = if group.type_only { "export type" } else { "export" };
        let file = shim_file(&group.target);
        debug!(target = %group.target, file = %file, symbols = group.names.len(), "re-export shim");
        code.append(
            &file,
            &format!("{} {{ {} }} from \"{}\";\n", keyword, group.names.join(", "), group.original),
        );
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_subpath_after_package() {
        assert_eq!(subpath_after_package("@contracts/shared/ids"), "shared/ids");
        assert_eq!(subpath_after_package("@contracts/shared"), "");
        assert_eq!(subpath_after_package("contracts/shared/ids"), "shared/ids");
        assert_eq!(subpath_after_package("contracts"), "");
        assert_eq!(shim_file("@contracts/shared"), "index.ts");
        assert_eq!(shim_file("lib/money"), "money.ts");
    }

    #[test]
    fn test_groups_merge_original_names_and_type_only() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/out/users/a.ts",
                "import type { UserId as Id } from \"@contracts/shared/ids\";\nimport { Money } from \"@contracts/shared/money\";\nimport { z } from \"zod\";\n",
            )
            .with_file(
                "/out/billing/b.ts",
                "import { type TenantId } from \"@contracts/shared/ids\";\nimport type { Currency } from \"@contracts/shared/money\";\n",
            );
        let rewrites = vec![AliasRewrite::new("@shared/", "@contracts/shared/")];
        let mut frontend = TypeScriptFrontend::new().unwrap();

        let code = generate_reexports(
            &fs,
            &mut frontend,
            &[PathBuf::from("/out/users/a.ts"), PathBuf::from("/out/billing/b.ts")],
            &rewrites,
        )
        .unwrap();

        assert_eq!(
            code.files,
            vec![
                (
                    "shared/ids.ts".to_string(),
                    "export type { UserId, TenantId } from \"@shared/ids\";\n".to_string()
                ),
                (
                    "shared/money.ts".to_string(),
                    "export { Money, Currency } from \"@shared/money\";\n".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_no_rewritten_imports_means_no_shims() {
        let fs = MemoryFileSystem::new().with_file("/out/a.ts", "import { z } from \"zod\";\n");
        let mut frontend = TypeScriptFrontend::new().unwrap();
        let code = generate_reexports(
            &fs,
            &mut frontend,
            &[PathBuf::from("/out/a.ts")],
            &[AliasRewrite::new("@shared/", "@contracts/shared/")],
        )
        .unwrap();
        assert!(code.is_empty());
    }
}
