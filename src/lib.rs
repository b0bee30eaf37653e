pub mod classify;
pub mod cli;
pub mod config;
pub mod format;
pub mod ingest;
pub mod parse;
pub mod source;
pub mod web;
