use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, RotapaperError};
use crate::paths::RotapaperPaths;

pub const SOCKET_NAME: &str = ".hyprpaper.sock";
pub const LOCK_NAME: &str = "hyprland.lock";

/// Finds the hyprpaper control socket.
///
/// Probing is read-only: nothing here connects to the socket.
#[derive(Debug, Clone)]
pub struct ChannelLocator {
    default_path: Option<PathBuf>,
    instances_dir: PathBuf,
}

impl ChannelLocator {
    pub fn new(default_path: Option<PathBuf>, instances_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_path,
            instances_dir: instances_dir.into(),
        }
    }

    /// Locator rooted at the real user's runtime directory. The default
    /// endpoint is the one belonging to `$HYPRLAND_INSTANCE_SIGNATURE`.
    pub fn from_env() -> Self {
        let instances_dir = RotapaperPaths::hypr_dir();
        let default_path = std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE")
            .filter(|sig| !sig.is_empty())
            .map(|sig| instances_dir.join(sig).join(SOCKET_NAME));
        Self::new(default_path, instances_dir)
    }

    /// Resolve the endpoint. An explicit override is returned unchecked.
    pub fn locate(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path {
            debug!(path = %path.display(), "using socket override");
            return Ok(path.to_path_buf());
        }

        if let Some(path) = self.default_path.as_ref().filter(|p| p.exists()) {
            debug!(path = %path.display(), "using default socket");
            return Ok(path.clone());
        }

        self.scan_instances()?.ok_or_else(|| {
            RotapaperError::DaemonUnavailable(format!(
                "no hyprpaper socket with an active session under {}",
                self.instances_dir.display()
            ))
        })
    }

    fn scan_instances(&self) -> Result<Option<PathBuf>> {
        let read_dir = match std::fs::read_dir(&self.instances_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut instances: Vec<PathBuf> = read_dir
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect();
        instances.sort();

        for dir in instances {
            let socket = dir.join(SOCKET_NAME);
            if socket.exists() && dir.join(LOCK_NAME).exists() {
                debug!(path = %socket.display(), "found socket of active session");
                return Ok(Some(socket));
            }
        }
        Ok(None)
    }
}
