//! Output formatting for `stored`.
//!
//! Human-readable text goes to stdout by default; `--json` switches every
//! command to machine-parseable JSON while diagnostics stay on stderr.

mod context;
mod text;

pub use context::{OutputContext, OutputMode};
pub use text::{format_document, format_document_line, format_health, format_timestamp};
