use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Result, RotapaperError};

/// Connected monitor names via `hyprctl monitors -j`, in reported order.
pub async fn detect_monitors() -> Result<Vec<String>> {
    let output = Command::new("hyprctl")
        .args(["monitors", "-j"])
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RotapaperError::CompositorMissing,
            _ => RotapaperError::Compositor(format!("failed to run hyprctl: {e}")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RotapaperError::Compositor(format!(
            "hyprctl monitors failed: {stderr}"
        )));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let names = parse_monitors(&json)?;
    if names.is_empty() {
        return Err(RotapaperError::Compositor(
            "no hyprland instance is running".into(),
        ));
    }
    Ok(names)
}

fn parse_monitors(json: &str) -> Result<Vec<String>> {
    let raw: Vec<HyprMonitor> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(|m| m.name).collect())
}

#[derive(Debug, Deserialize)]
struct HyprMonitor {
    name: String,
}
