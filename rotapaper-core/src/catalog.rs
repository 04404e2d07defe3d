use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, RotapaperError};

pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Default extensions followed by any extra ones, without duplicates.
pub fn extensions_with(extra: &[String]) -> Vec<String> {
    let mut all: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
    for ext in extra {
        let ext = ext.trim_start_matches('.');
        if !ext.is_empty() && !all.iter().any(|e| e == ext) {
            all.push(ext.to_string());
        }
    }
    all
}

/// Candidate wallpapers, scanned once from a set of root directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    images: Vec<PathBuf>,
}

impl Catalog {
    pub fn from_paths(images: Vec<PathBuf>) -> Self {
        Self { images }
    }

    /// Scan every (root, extension) pair. Fails with `EmptyCatalog` when
    /// nothing matched.
    pub fn build(roots: &[PathBuf], extensions: &[String], recursive: bool) -> Result<Self> {
        let mut images = Vec::new();

        for root in roots {
            let root = absolute(root)?;
            if !root.is_dir() {
                warn!(path = %root.display(), "wallpaper directory does not exist");
                continue;
            }
            for ext in extensions {
                collect(&root, ext, recursive, &mut images)?;
            }
        }

        if images.is_empty() {
            return Err(RotapaperError::EmptyCatalog);
        }

        info!(count = images.len(), recursive, "wallpaper catalog built");
        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathBuf> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.images.iter()
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn collect(dir: &Path, ext: &str, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            debug!(path = %dir.display(), "skipping unreadable directory: {e}");
            return Ok(());
        }
    };

    let mut entries: Vec<(PathBuf, std::fs::FileType)> = read_dir
        .flatten()
        .filter_map(|entry| Some((entry.path(), entry.file_type().ok()?)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in entries {
        if file_type.is_dir() {
            if recursive {
                collect(&path, ext, recursive, out)?;
            }
        } else if file_type.is_symlink() && path.is_dir() {
            // linked directories are never descended into
            debug!(path = %path.display(), "skipping symlinked directory");
        } else if path.extension().is_some_and(|e| e == ext) {
            out.push(path);
        }
    }
    Ok(())
}
