//! Test-run output redirection.
//!
//! Everything a test run writes to stdout/stderr goes through a
//! [`StreamInterceptor`], which tags each line with a `level-step [index]`
//! position taken from a [`LevelTracker`], echoes it to the original console
//! and appends it to the session and per-test JSON logs.

pub mod boundary;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod json_log;
pub mod level_tracker;
pub mod log_record;
pub mod logging;
pub mod redirect_state;
pub mod sink_writer;

pub use boundary::is_boundary;
pub use config::{load_config, RedirectConfig, RedirectOptions, ResolvedSettings};
pub use error::{RedirectError, Result};
pub use interceptor::{CaptureStream, StreamInterceptor};
pub use level_tracker::{LevelCounters, LevelTracker};
pub use log_record::LogRecord;
pub use redirect_state::{RedirectContext, RedirectState};
pub use sink_writer::SinkWriter;
