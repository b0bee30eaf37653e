use serde::{Deserialize, Serialize};

/// Resumable cursor into one file, in bytes from the start. Held by the
/// client and echoed back on every poll; the engine keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub position: u64,
}

impl FilePosition {
    pub fn new(filename: impl Into<String>, position: u64) -> Self {
        Self {
            filename: Some(filename.into()),
            position,
        }
    }

    /// Position for a single configured file, which carries no filename.
    pub fn anonymous(position: u64) -> Self {
        Self {
            filename: None,
            position,
        }
    }
}

/// Decode the `positions` request parameter. Anything that is not a JSON
/// array of positions means "start every file from the beginning".
pub fn parse_positions(raw: Option<&str>) -> Vec<FilePosition> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(positions) => positions,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed positions parameter, starting from offset 0");
            Vec::new()
        }
    }
}

/// Offset known for `filename`, if any.
pub fn known_offset(positions: &[FilePosition], filename: &str) -> Option<u64> {
    positions
        .iter()
        .find(|p| p.filename.as_deref() == Some(filename))
        .map(|p| p.position)
}
