pub mod archive;
pub mod position;
pub mod reader;
pub mod scanner;

pub use archive::ArchiveCache;
pub use position::{parse_positions, FilePosition};
pub use reader::{read_from, ReadChunk, ReaderError};
pub use scanner::{filter_log_files, list_log_files, reconcile_positions, LogKind, LogRole};
