use crate::ingest::LogBatch;
use crate::source::position::FilePosition;
use crate::source::reader::ReaderError;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct ArchiveCacheEntry {
    pub mtime: SystemTime,
    pub result: LogBatch,
}

/// Decompressed contents of rotated `.gz` logs, keyed by path and valid for
/// as long as the file's modification time is unchanged. Entries are never
/// evicted; archives do not grow.
///
/// Two requests racing on an unseen archive both decompress it and the last
/// insert wins. Both results are identical.
#[derive(Debug, Default)]
pub struct ArchiveCache {
    entries: Mutex<HashMap<PathBuf, ArchiveCacheEntry>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read_archive(&self, path: &Path) -> Result<LogBatch, ReaderError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ReaderError::from_io(path, e))?;
        let mtime = metadata
            .modified()
            .map_err(|e| ReaderError::from_io(path, e))?;

        if let Some(hit) = self.lookup(path, mtime) {
            tracing::trace!(path = %path.display(), "Archive cache hit");
            return Ok(hit);
        }

        let owned = path.to_path_buf();
        let lines = tokio::task::spawn_blocking(move || decompress_lines(&owned)).await??;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = LogBatch::new(lines, vec![FilePosition::new(filename, 0)]);

        tracing::debug!(
            path = %path.display(),
            lines = result.logs.len(),
            "Decompressed archive"
        );

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.to_path_buf(),
                ArchiveCacheEntry {
                    mtime,
                    result: result.clone(),
                },
            );

        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, path: &Path, mtime: SystemTime) -> Option<LogBatch> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(path)
            .filter(|entry| entry.mtime == mtime)
            .map(|entry| entry.result.clone())
    }
}

fn decompress_lines(path: &Path) -> Result<Vec<String>, ReaderError> {
    let file = std::fs::File::open(path).map_err(|e| ReaderError::from_io(path, e))?;

    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .map_err(|source| ReaderError::Decompress {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(String::from_utf8_lossy(&bytes)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}
