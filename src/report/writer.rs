//! Atomic report output.

use std::io::Write;
use std::path::Path;
use tempfile::Builder;
use tracing::debug;

/// Write `content` to `path` through a temporary file in the same directory.
///
/// The temporary file is renamed into place only after everything has been
/// written and synced; on any failure it is removed and `path` is untouched.
pub fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = Builder::new()
        .prefix(".edexia-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    debug!("Writing report through {}", temp.path().display());

    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
