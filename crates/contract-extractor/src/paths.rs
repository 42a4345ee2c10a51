//! Lexical path helpers shared by the resolver and the rewriter.

use std::path::{Component, Path, PathBuf};

/// Source file extensions the extractor understands, in probe order.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Extensions an ESM import may name in place of the `.ts` source.
pub const RUNTIME_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// Resolves `.` and `..` components without touching the disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Joins a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the file is a TypeScript source the extractor should read.
pub fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name.ends_with(".d.ts") {
        return false;
    }
    path.extension()
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_string_lossy().as_ref()))
        .unwrap_or(false)
}

/// Strips a known source extension.
pub fn strip_source_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if SOURCE_EXTENSIONS.contains(&ext.to_string_lossy().as_ref()) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Computes an ESM-style relative module specifier from the directory `from_dir`
/// to the file `to_file`: forward slashes, no extension, always `./` or `../`.
pub fn relative_specifier(from_dir: &Path, to_file: &Path) -> String {
    let target = strip_source_extension(to_file);
    let relative = pathdiff::diff_paths(&target, from_dir).unwrap_or(target);
    let spec = to_slash(&relative);
    if spec.starts_with("../") || spec == ".." {
        spec
    } else {
        format!("./{}", spec)
    }
}

/// The `.js`-style suffix an ESM specifier was written with, if any.
pub fn runtime_extension(specifier: &str) -> Option<&str> {
    let (_, ext) = specifier.rsplit_once('.')?;
    if ext.contains('/') || !RUNTIME_EXTENSIONS.contains(&ext) {
        return None;
    }
    Some(&specifier[specifier.len() - ext.len() - 1..])
}

/// Whether a module specifier is relative to the importing file.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}
