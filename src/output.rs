//! Result persistence: pretty-printed JSON, parent directories created on
//! demand.

use std::io;
use std::path::Path;

use serde::Serialize;

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "results saved");
    Ok(())
}
