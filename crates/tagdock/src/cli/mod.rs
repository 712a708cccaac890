//! CLI command implementations.

pub mod caption;
pub mod config;
pub mod edit;
pub mod tokens;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tagdock_core::{Image, OutputFormat, OutputWriter};

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Expand `~` and environment variables in a user-supplied path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Read a session file: a JSON array of `{"path": ..., "tags": [...]}`.
fn load_session(path: &Path) -> anyhow::Result<Vec<Image>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session {}", path.display()))?;
    let images: Vec<Image> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid session file {}", path.display()))?;
    tracing::debug!("Loaded {} images from {}", images.len(), path.display());
    Ok(images)
}

/// Write `images` back as a pretty-printed session file.
fn save_session(path: &Path, images: &[Image]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to write session {}", path.display()))?;
    let mut writer = OutputWriter::new(BufWriter::new(file), OutputFormat::Json, true);
    writer.write_all(images)?;
    writer.flush()?;
    tracing::info!("Saved {} images to {}", images.len(), path.display());
    Ok(())
}
