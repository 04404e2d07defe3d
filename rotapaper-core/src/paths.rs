use std::path::PathBuf;

use crate::error::{Result, RotapaperError};

#[derive(Debug, Clone)]
pub struct RotapaperPaths {
    pub config_dir: PathBuf,
}

impl RotapaperPaths {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RotapaperError::Config("cannot resolve XDG config dir".into()))?
            .join("rotapaper");

        Ok(Self { config_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Per-user runtime directory, derived from the real uid rather than
    /// `$XDG_RUNTIME_DIR`.
    pub fn runtime_dir() -> PathBuf {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/run/user/{uid}"))
    }

    /// Directory holding one subdirectory per Hyprland instance.
    pub fn hypr_dir() -> PathBuf {
        Self::runtime_dir().join("hypr")
    }
}
