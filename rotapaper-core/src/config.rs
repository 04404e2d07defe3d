use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RotapaperError};
use crate::paths::RotapaperPaths;
use crate::rotation::RotationOptions;
use crate::scheduler;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rotation: RotationConfig,
    pub daemon: DaemonConfig,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RotapaperError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load(paths: &RotapaperPaths) -> Result<Self> {
        Self::load_from(&paths.config_file())
    }

    /// Missing file means defaults; a file that fails to parse is an error.
    pub fn load_or_default(paths: &RotapaperPaths) -> Result<Self> {
        if !paths.config_file().exists() {
            return Ok(Self::default());
        }
        Self::load(paths)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rotation.directories.is_empty() {
            return Err(RotapaperError::Config(
                "no wallpaper directories configured".into(),
            ));
        }
        if let Some(period) = self.rotation.period() {
            scheduler::validate_period(period)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub directories: Vec<PathBuf>,
    pub monitors: Vec<String>,
    /// Extra file extensions on top of png, jpg and jpeg.
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub keep_loaded: bool,
    pub consistent: bool,
    pub rescan: bool,
    /// Seconds between rotations; unset means a single rotation.
    pub interval: Option<u64>,
}

impl RotationConfig {
    pub fn period(&self) -> Option<Duration> {
        self.interval.map(Duration::from_secs)
    }

    /// Directories with a leading `~` expanded.
    pub fn expanded_directories(&self) -> Vec<PathBuf> {
        self.directories.iter().map(|d| expand_home(d)).collect()
    }

    pub fn options(&self) -> RotationOptions {
        RotationOptions {
            keep_loaded: self.keep_loaded,
            consistent: self.consistent,
            recursive: self.recursive,
            rescan: self.rescan,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Explicit hyprpaper socket; skips discovery.
    pub socket: Option<PathBuf>,
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
