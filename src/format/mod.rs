pub mod compiler;
pub mod variable;

pub use compiler::{compile_format, CompiledFormat, FormatCache, COMBINED_FORMAT};
pub use variable::{Field, TimeEncoding, Variable};
