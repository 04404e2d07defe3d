use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RotapaperError {
    #[error("wallpaper daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("no images found in the configured directories")]
    EmptyCatalog,

    #[error("unexpected reply to {command}: {}", String::from_utf8_lossy(.reply))]
    Protocol { command: &'static str, reply: Vec<u8> },

    #[error("rotation period of {}s is below the 10s minimum", .0.as_secs())]
    InvalidPeriod(Duration),

    #[error("config error: {0}")]
    Config(String),

    #[error("compositor error: {0}")]
    Compositor(String),

    #[error("hyprctl not found, is hyprland installed?")]
    CompositorMissing,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RotapaperError {
    pub fn protocol(command: &'static str, reply: impl Into<Vec<u8>>) -> Self {
        Self::Protocol {
            command,
            reply: reply.into(),
        }
    }

    /// Whether a failed cycle should end a timed rotation instead of being
    /// logged and retried at the next tick.
    pub fn is_fatal_for_schedule(&self) -> bool {
        matches!(self, Self::DaemonUnavailable(_) | Self::InvalidPeriod(_))
    }
}

pub type Result<T> = std::result::Result<T, RotapaperError>;
