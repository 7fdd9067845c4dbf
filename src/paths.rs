//! On-disk layout of intermediate record files:
//! `<output_root>/<category>/<initial>--to--<final>/<capture file>.json`.

use crate::category::Category;
use crate::date::ExportWindow;
use crate::error::Result;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Window directory for one category.
pub fn window_dir(output_root: &Path, category: Category, window: &ExportWindow) -> PathBuf {
    output_root.join(category.as_str()).join(window.name())
}

/// Create the window directory if absent. Not an error when it already exists.
pub fn ensure_window_dir(
    output_root: &Path,
    category: Category,
    window: &ExportWindow,
) -> Result<PathBuf> {
    let dir = window_dir(output_root, category, window);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// List the category's intermediate files inside its window directory,
/// sorted by file name so batches are deterministic.
pub fn list_window_files(
    output_root: &Path,
    category: Category,
    window: &ExportWindow,
) -> Vec<PathBuf> {
    let dir = window_dir(output_root, category, window);
    let re = Regex::new(&format!(r"^{}--.+\.json$", category.as_str())).unwrap();
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        if let Ok(ent) = entry {
            if let Some(name) = ent.file_name().to_str() {
                if re.is_match(name) {
                    files.push(ent.path().to_path_buf());
                }
            }
        }
    }
    files.sort();
    files
}

/// Recursively remove the window directories for the given categories.
/// Only called after a fully successful load; a missing directory is fine.
pub fn remove_window_dirs(
    output_root: &Path,
    categories: &[Category],
    window: &ExportWindow,
) -> Result<()> {
    for &category in categories {
        let dir = window_dir(output_root, category, window);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
