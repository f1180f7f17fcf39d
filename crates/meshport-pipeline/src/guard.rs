//! Rejects 3MF packages that carry sliced toolpaths instead of geometry.

use std::io::Cursor;

use tracing::debug;

use crate::diagnostics::SharedSink;

/// Scans the archive listing of a 3MF package for G-code entries.
#[derive(Debug, Clone)]
pub struct SliceGuard {
    sink: SharedSink,
}

impl SliceGuard {
    /// Create a guard that reports unreadable archives to `sink`.
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }

    /// Whether the package holds G-code.
    ///
    /// An archive that cannot be opened or listed is reported and treated
    /// as not sliced; the loader then fails on it with a proper error.
    pub fn is_sliced(&self, bytes: &[u8]) -> bool {
        match sliced_entry(bytes) {
            Ok(Some(entry)) => {
                debug!(entry = %entry, "Found toolpath entry in package");
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.sink
                    .report("slice-guard", &format!("Could not inspect 3MF archive: {e}"));
                false
            }
        }
    }
}

/// Whether an entry name denotes a G-code file.
pub fn is_toolpath_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".gcode") || lower.ends_with(".g") || lower.contains("gcode")
}

/// OS metadata entries that never carry model content.
fn is_os_metadata(name: &str) -> bool {
    name.split('/')
        .any(|segment| segment == "__MACOSX" || segment == ".DS_Store")
}

/// First toolpath entry in the archive, if any.
fn sliced_entry(bytes: &[u8]) -> Result<Option<String>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name();
        if is_os_metadata(name) {
            continue;
        }
        if is_toolpath_name(name) {
            return Ok(Some(name.to_string()));
        }
    }
    Ok(None)
}
