use crate::source::position::{known_offset, FilePosition};
use crate::source::reader::ReaderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRole {
    #[default]
    Access,
    Error,
}

impl LogRole {
    pub fn from_filename(filename: &str) -> Self {
        if filename.contains("error") {
            LogRole::Error
        } else {
            LogRole::Access
        }
    }

    pub fn alternate(self) -> Self {
        match self {
            LogRole::Access => LogRole::Error,
            LogRole::Error => LogRole::Access,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogRole::Access => "access",
            LogRole::Error => "error",
        }
    }
}

impl fmt::Display for LogRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(LogRole::Access),
            "error" => Ok(LogRole::Error),
            other => Err(format!("unknown log type '{}', expected access or error", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Plain,
    Archived,
}

impl LogKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".log") {
            Some(LogKind::Plain)
        } else if filename.ends_with(".gz") {
            Some(LogKind::Archived)
        } else {
            None
        }
    }
}

/// A log file found by a directory scan. Derived from the name alone and
/// rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileDescriptor {
    pub filename: String,
    pub role: LogRole,
    pub kind: LogKind,
}

impl LogFileDescriptor {
    pub fn from_filename(filename: &str) -> Option<Self> {
        Some(Self {
            filename: filename.to_string(),
            role: LogRole::from_filename(filename),
            kind: LogKind::from_filename(filename)?,
        })
    }
}

/// Keep log files of `role`, archives only when asked, sorted by name.
///
/// The name order is the order files are merged in; it is not a time order.
pub fn filter_log_files<S: AsRef<str>>(
    filenames: &[S],
    role: LogRole,
    include_archived: bool,
) -> Vec<String> {
    let mut selected: Vec<String> = filenames
        .iter()
        .filter_map(|name| LogFileDescriptor::from_filename(name.as_ref()))
        .filter(|file| file.role == role)
        .filter(|file| include_archived || file.kind == LogKind::Plain)
        .map(|file| file.filename)
        .collect();
    selected.sort();
    selected
}

/// List the log files of `role` in `dir`.
pub async fn list_log_files(
    dir: &Path,
    role: LogRole,
    include_archived: bool,
) -> Result<Vec<String>, ReaderError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ReaderError::from_io(dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ReaderError::from_io(dir, e))?
    {
        // Symlinks are kept: containers commonly link access.log to stdout.
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    let selected = filter_log_files(&names, role, include_archived);
    tracing::debug!(
        dir = %dir.display(),
        role = %role,
        found = names.len(),
        selected = selected.len(),
        "Scanned log directory"
    );
    Ok(selected)
}

/// Attach a starting offset to every file: the known one for plain logs
/// (0 when unknown), always 0 for archives since those are read whole.
pub fn reconcile_positions<S: AsRef<str>>(
    filenames: &[S],
    known: &[FilePosition],
) -> Vec<FilePosition> {
    filenames
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let position = match LogKind::from_filename(name) {
                Some(LogKind::Archived) => 0,
                _ => known_offset(known, name).unwrap_or(0),
            };
            FilePosition::new(name, position)
        })
        .collect()
}
