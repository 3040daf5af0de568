//! HTTP API module.
//!
//! The server, its response types, the finished-job store and the
//! broadcast logger shared with the CLI.

pub mod jobs;
pub mod logs;
pub mod server;
pub mod types;

pub use jobs::{Job, JobStore, JOBS, MAX_JOBS};
pub use logs::*;
pub use server::start_server;
pub use types::*;
