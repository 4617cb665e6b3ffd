// ABOUTME: Library crate for readygate exposing the server lifecycle and readiness pipeline

#![allow(missing_docs)]

pub mod compose;
pub mod config;
pub mod error;
pub mod process;
pub mod readiness;
pub mod server;
pub mod session;

pub use error::{HarnessError, HarnessResult};
pub use readiness::ReadinessOutcome;
pub use server::{ServerLifecycle, StartReport};
pub use session::TestSession;
