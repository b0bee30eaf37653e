use crate::config::{Config, SourcesConfig};
use crate::ingest::remote::RemoteClient;
use crate::ingest::{FileFailure, IngestError, LogBatch, LogRequest};
use crate::source::scanner::{list_log_files, reconcile_positions, LogKind, LogRole};
use crate::source::{read_from, ArchiveCache, FilePosition, ReaderError};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_ACCESS_LOG: &str = "/var/log/nginx/access.log";
pub const DEFAULT_ERROR_LOG: &str = "/var/log/nginx/error.log";

/// Where a request for one role is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    Remote,
    File(PathBuf),
    Directory(PathBuf),
}

/// Serves log requests from a remote delegate, a single file, or a directory
/// scan, in that order of precedence.
///
/// Holds no per-client state: positions arrive with each request and leave
/// with the response.
#[derive(Debug)]
pub struct Ingestor {
    sources: SourcesConfig,
    remote: Option<RemoteClient>,
    archives: Arc<ArchiveCache>,
}

impl Ingestor {
    pub fn new(config: &Config, archives: Arc<ArchiveCache>) -> Result<Self, IngestError> {
        let remote = config
            .remote
            .as_ref()
            .map(RemoteClient::new)
            .transpose()
            .map_err(IngestError::from)?;

        Ok(Self {
            sources: config.sources.clone(),
            remote,
            archives,
        })
    }

    pub fn resolve(&self, role: LogRole) -> ResolvedSource {
        if self.remote.is_some() {
            return ResolvedSource::Remote;
        }

        let own = self.sources.for_role(role);
        if let Some(path) = &own.path {
            return ResolvedSource::File(path.clone());
        }
        if let Some(dir) = &own.dir {
            return ResolvedSource::Directory(dir.clone());
        }
        if let Some(dir) = &self.sources.for_role(role.alternate()).dir {
            return ResolvedSource::Directory(dir.clone());
        }

        ResolvedSource::File(PathBuf::from(match role {
            LogRole::Access => DEFAULT_ACCESS_LOG,
            LogRole::Error => DEFAULT_ERROR_LOG,
        }))
    }

    pub async fn fetch(&self, request: &LogRequest) -> Result<LogBatch, IngestError> {
        let source = self.resolve(request.role);
        debug!(role = %request.role, source = ?source, positions = request.positions.len(), "Serving log request");

        let result = match &source {
            ResolvedSource::Remote => match &self.remote {
                Some(remote) => remote.fetch(request).await.map_err(IngestError::from),
                None => Err(IngestError::RemoteTransport("no remote configured".to_string())),
            },
            ResolvedSource::File(path) => self.read_file(path, request).await,
            ResolvedSource::Directory(dir) => self.read_directory(dir, request).await,
        };

        if let Err(e) = &result {
            warn!(role = %request.role, source = ?source, error = %e, "Log request failed");
        }
        result
    }

    async fn read_file(&self, path: &Path, request: &LogRequest) -> Result<LogBatch, IngestError> {
        if is_archive(path) {
            let batch = self.archives.read_archive(path).await?;
            return Ok(LogBatch::new(batch.logs, vec![FilePosition::anonymous(0)]).completed());
        }

        let offset = request.positions.first().map(|p| p.position).unwrap_or(0);
        let chunk = read_from(path, offset, request.role).await?;
        Ok(LogBatch::new(
            chunk.lines,
            vec![FilePosition::anonymous(chunk.new_offset)],
        ))
    }

    async fn read_directory(&self, dir: &Path, request: &LogRequest) -> Result<LogBatch, IngestError> {
        let filenames = list_log_files(dir, request.role, request.include_archived).await?;
        let positions = reconcile_positions(&filenames, &request.positions);

        let reads = positions.iter().map(|position| {
            let filename = position.filename.clone().unwrap_or_default();
            let path = dir.join(&filename);
            let offset = position.position;
            async move { self.read_entry(&path, offset, request.role).await }
        });
        let results = join_all(reads).await;

        // Merge in file name order. Not chronological across files.
        let mut batch = LogBatch::default();
        for (position, result) in positions.into_iter().zip(results) {
            let filename = position.filename.clone().unwrap_or_default();
            match result {
                Ok(FileRead::Plain { lines, new_offset }) => {
                    batch.logs.extend(lines);
                    batch.positions.push(FilePosition::new(filename, new_offset));
                }
                Ok(FileRead::Archive { lines }) => {
                    batch.logs.extend(lines);
                    batch.positions.push(FilePosition::new(filename, 0));
                }
                Err(e) => {
                    warn!(dir = %dir.display(), file = %filename, error = %e, "Skipping unreadable log file");
                    batch.errors.push(FileFailure {
                        filename,
                        error: e.to_string(),
                    });
                    batch.positions.push(position);
                }
            }
        }

        debug!(
            dir = %dir.display(),
            files = batch.positions.len(),
            lines = batch.logs.len(),
            failed = batch.errors.len(),
            "Directory read complete"
        );
        Ok(batch)
    }

    async fn read_entry(&self, path: &Path, offset: u64, role: LogRole) -> Result<FileRead, ReaderError> {
        if is_archive(path) {
            let batch = self.archives.read_archive(path).await?;
            return Ok(FileRead::Archive { lines: batch.logs });
        }

        let chunk = read_from(path, offset, role).await?;
        Ok(FileRead::Plain {
            lines: chunk.lines,
            new_offset: chunk.new_offset,
        })
    }
}

enum FileRead {
    Plain { lines: Vec<String>, new_offset: u64 },
    Archive { lines: Vec<String> },
}

fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(LogKind::from_filename)
        == Some(LogKind::Archived)
}
