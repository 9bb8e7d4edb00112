//! Structured status log
//!
//! One line per server per run, written by the run coordinator and read back
//! by the notification side. The format is fixed so the log stays greppable and
//! other record types can share the file under a different tag.

pub mod parser;
pub mod record;
pub mod writer;

pub use parser::{parse_log, parse_log_bytes, read_log, MalformedLine, ParseReport, ParseWindow};
pub use record::{RunOutcome, RunStatus};
pub use writer::StatusLogWriter;
