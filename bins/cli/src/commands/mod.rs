//! CLI command handlers.

pub mod clear;
pub mod logs;
pub mod patterns;
pub mod send;
pub mod status;
pub mod traces;

pub use clear::run_clear;
pub use logs::{LogsCommandInput, run_chains, run_flow, run_logs};
pub use patterns::{run_patterns, run_redact};
pub use send::{SendCommandInput, run_pipe, run_send};
pub use status::run_status;
pub use traces::run_traces;
