use crate::source::scanner::LogRole;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decompress {}: {source}", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ReaderError {
    /// Classify an I/O error: a missing path may come back after rotation,
    /// everything else is a read failure.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ReaderError::NotFound(path.to_path_buf())
        } else {
            ReaderError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReaderError::NotFound(_))
    }
}

/// Whole lines read from a file and the offset the next read starts at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadChunk {
    pub lines: Vec<String>,
    pub new_offset: u64,
}

/// Read everything appended to `path` since `offset`.
///
/// Only newline-terminated lines are returned; a trailing partial line stays
/// unconsumed so the next call starts at its first byte. An offset at or past
/// the end of the file is the idle case and returns nothing.
pub async fn read_from(path: &Path, offset: u64, role: LogRole) -> Result<ReadChunk, ReaderError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ReaderError::from_io(path, e))?;
    let size = metadata.len();

    if size == 0 && role == LogRole::Error {
        return read_unsized(path, offset).await;
    }

    if offset >= size {
        return Ok(ReadChunk {
            lines: Vec::new(),
            new_offset: offset,
        });
    }

    let mut file = File::open(path)
        .await
        .map_err(|e| ReaderError::from_io(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| ReaderError::from_io(path, e))?;

    // Bounded by the size seen above so concurrent appends wait for the next poll.
    let mut buf = Vec::with_capacity((size - offset) as usize);
    file.take(size - offset)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| ReaderError::from_io(path, e))?;

    let (lines, partial) = split_complete_lines(&buf);
    let new_offset = offset + (buf.len() - partial) as u64;

    tracing::trace!(
        path = %path.display(),
        offset,
        new_offset,
        lines = lines.len(),
        "Read log chunk"
    );

    Ok(ReadChunk { lines, new_offset })
}

/// Some error logs report a size of 0 while still holding data. Read them as
/// text and use the text length as the offset instead of the byte size.
async fn read_unsized(path: &Path, offset: u64) -> Result<ReadChunk, ReaderError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReaderError::from_io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);

    let tail = usize::try_from(offset)
        .ok()
        .and_then(|start| content.get(start..))
        .unwrap_or("");

    let lines = tail
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ReadChunk {
        lines,
        new_offset: content.len() as u64,
    })
}

/// Split `buf` into complete lines, returning them with the byte length of the
/// trailing unterminated remainder.
fn split_complete_lines(buf: &[u8]) -> (Vec<String>, usize) {
    let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
        return (Vec::new(), buf.len());
    };

    let lines = buf[..last_newline]
        .split(|b| *b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect();

    (lines, buf.len() - last_newline - 1)
}
