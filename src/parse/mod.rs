pub mod access;
pub mod error;
pub mod export;
pub mod timestamp;

pub use access::{AccessParser, ParsedAccessRecord};
pub use error::{parse_errors, ErrorLineParser, ParsedErrorRecord};
pub use export::to_csv;
