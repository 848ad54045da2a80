// src/env/dotenv.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Read in this order; later files override earlier ones.
pub const DOTENV_FILE_NAMES: [&str; 2] = [".env", "airplane.env"];

/// Directories from `root` down to the entrypoint's directory, inclusive.
///
/// If the entrypoint is not below `root`, only its own directory is used.
pub fn dotenv_dirs(entrypoint: &Path, root: &Path) -> Vec<PathBuf> {
    let Some(start) = entrypoint.parent() else {
        return Vec::new();
    };

    let mut dirs = Vec::new();
    let mut reached_root = false;
    for dir in start.ancestors() {
        dirs.push(dir.to_path_buf());
        if dir == root {
            reached_root = true;
            break;
        }
    }
    if !reached_root {
        dirs.truncate(1);
    }

    dirs.reverse();
    dirs
}

/// Existing dotenv files for an entrypoint: all `.env` files root-first,
/// then all `airplane.env` files root-first.
pub fn dotenv_files(fs: &dyn FileSystem, entrypoint: &Path, root: &Path) -> Vec<PathBuf> {
    let dirs = dotenv_dirs(entrypoint, root);

    let mut files = Vec::new();
    for name in DOTENV_FILE_NAMES {
        for dir in &dirs {
            let path = dir.join(name);
            if fs.is_file(&path) {
                debug!(path = %path.display(), "loading env vars from dotenv file");
                files.push(path);
            }
        }
    }
    files
}

/// Merge every dotenv file that applies to `entrypoint`.
pub fn read_dotenv_files(
    fs: &dyn FileSystem,
    entrypoint: &Path,
    root: &Path,
) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for path in dotenv_files(fs, entrypoint, root) {
        let reader = fs.open_read(&path)?;
        for item in dotenvy::from_read_iter(reader) {
            let (key, value) = item.with_context(|| format!("reading {}", path.display()))?;
            vars.insert(key, value);
        }
    }
    Ok(vars)
}
