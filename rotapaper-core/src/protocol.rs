//! Client side of the hyprpaper control socket.
//!
//! Every command travels over its own connection: connect, write the command
//! text, read a single reply of at most [`REPLY_BUFFER`] bytes, close.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::{Result, RotapaperError};

pub const REPLY_BUFFER: usize = 1024;

const OK_REPLY: &[u8] = b"ok";
const NO_ACTIVE_REPLY: &str = "no wallpapers active";
const NO_LOADED_REPLY: &str = "no wallpapers loaded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Preload(PathBuf),
    Assign { monitor: String, path: PathBuf },
    Unload(PathBuf),
    ListLoaded,
    ListActive,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preload(_) => "preload",
            Self::Assign { .. } => "wallpaper",
            Self::Unload(_) => "unload",
            Self::ListLoaded => "listloaded",
            Self::ListActive => "listactive",
        }
    }

    /// Wire text, without a trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Self::Preload(path) => format!("preload {}", path.display()),
            Self::Assign { monitor, path } => format!("wallpaper {monitor},{}", path.display()),
            Self::Unload(path) => format!("unload {}", path.display()),
            Self::ListLoaded => "listloaded".into(),
            Self::ListActive => "listactive".into(),
        }
    }
}

/// One monitor's entry from `listactive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWallpaper {
    pub monitor: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Loaded(Vec<PathBuf>),
    Active(Vec<ActiveWallpaper>),
}

/// Interpret a raw reply according to the command that produced it.
pub fn decode(command: &Command, reply: &[u8]) -> Result<Response> {
    match command {
        Command::Preload(_) | Command::Assign { .. } | Command::Unload(_) => {
            if reply == OK_REPLY {
                Ok(Response::Ok)
            } else {
                Err(RotapaperError::protocol(command.name(), reply))
            }
        }
        Command::ListLoaded => parse_loaded(reply)
            .map(Response::Loaded)
            .ok_or_else(|| RotapaperError::protocol(command.name(), reply)),
        Command::ListActive => parse_active(reply)
            .map(Response::Active)
            .ok_or_else(|| RotapaperError::protocol(command.name(), reply)),
    }
}

fn parse_loaded(reply: &[u8]) -> Option<Vec<PathBuf>> {
    let text = std::str::from_utf8(reply).ok()?;
    if text.trim() == NO_LOADED_REPLY {
        return Some(Vec::new());
    }
    Some(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect(),
    )
}

fn parse_active(reply: &[u8]) -> Option<Vec<ActiveWallpaper>> {
    let text = std::str::from_utf8(reply).ok()?;
    if text.trim() == NO_ACTIVE_REPLY {
        return Some(Vec::new());
    }

    let mut active = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        // "<monitor> = <path>"
        let mut tokens = line.split_whitespace();
        let monitor = tokens.next()?;
        if tokens.next()? != "=" {
            return None;
        }
        let path = tokens.next()?;
        active.push(ActiveWallpaper {
            monitor: monitor.to_string(),
            path: PathBuf::from(path),
        });
    }
    Some(active)
}

/// Moves one command's bytes to the daemon and back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, payload: &str) -> Result<Vec<u8>>;
}

pub struct SocketTransport {
    path: PathBuf,
}

impl SocketTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn exchange(&self, payload: &str) -> Result<Vec<u8>> {
        let mut stream = UnixStream::connect(&self.path).await.map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                    RotapaperError::DaemonUnavailable(format!(
                        "cannot connect to {}: {e}",
                        self.path.display()
                    ))
                }
                _ => RotapaperError::Io(e),
            }
        })?;

        stream.write_all(payload.as_bytes()).await?;

        let mut buf = [0u8; REPLY_BUFFER];
        let n = stream.read(&mut buf).await?;
        Ok(buf[..n].to_vec())
    }
}

pub struct ProtocolClient {
    transport: Box<dyn Transport>,
}

impl ProtocolClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn connect_to(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(SocketTransport::new(path)))
    }

    pub async fn send(&self, command: &Command) -> Result<Response> {
        let payload = command.encode();
        debug!(command = command.name(), %payload, "sending to hyprpaper");
        let reply = self.transport.exchange(&payload).await?;
        decode(command, &reply)
    }

    pub async fn preload(&self, path: &Path) -> Result<()> {
        self.send(&Command::Preload(path.to_path_buf())).await?;
        Ok(())
    }

    pub async fn assign(&self, monitor: &str, path: &Path) -> Result<()> {
        self.send(&Command::Assign {
            monitor: monitor.to_string(),
            path: path.to_path_buf(),
        })
        .await?;
        Ok(())
    }

    pub async fn unload(&self, path: &Path) -> Result<()> {
        self.send(&Command::Unload(path.to_path_buf())).await?;
        Ok(())
    }

    pub async fn list_loaded(&self) -> Result<Vec<PathBuf>> {
        match self.send(&Command::ListLoaded).await? {
            Response::Loaded(paths) => Ok(paths),
            _ => Err(RotapaperError::protocol("listloaded", Vec::new())),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<ActiveWallpaper>> {
        match self.send(&Command::ListActive).await? {
            Response::Active(active) => Ok(active),
            _ => Err(RotapaperError::protocol("listactive", Vec::new())),
        }
    }
}
