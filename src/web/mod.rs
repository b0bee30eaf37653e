pub mod api;
pub mod server;

pub use api::{ApiError, AppState};
pub use server::{router, run_server, serve};
