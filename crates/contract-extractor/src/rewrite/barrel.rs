//! Barrel (`index.ts`) generation for a context directory.

use std::path::{Path, PathBuf};

use crate::paths::relative_specifier;

pub const BARREL_FILE: &str = "index.ts";

/// Whether a copied file would occupy the barrel's own location.
pub fn is_root_index(relative_path: &Path) -> bool {
    relative_path == Path::new("index.ts") || relative_path == Path::new("index.tsx")
}

/// Renders `export * from "./x";` for each output file, in the given order.
/// Files at the barrel's own location are skipped.
pub fn render_barrel(context_dir: &Path, outputs: &[PathBuf]) -> String {
    let mut lines = Vec::new();
    for output in outputs {
        let relative = output.strip_prefix(context_dir).unwrap_or(output);
        if is_root_index(relative) {
            continue;
        }
        let line = format!("export * from \"{}\";", relative_specifier(context_dir, output));
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
