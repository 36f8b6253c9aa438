//! Output context and mode selection.
//!
//! 1. `--json` → JSON mode
//! 2. `--quiet` → Quiet mode
//! 3. otherwise → Text mode

use crate::error::{ErrorResponse, Result, StoreError};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
    /// Only errors are printed.
    Quiet,
}

/// Where and how command results are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputContext {
    mode: OutputMode,
}

impl OutputContext {
    #[must_use]
    pub const fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Create context from CLI flags; `json` beats `quiet`.
    #[must_use]
    pub const fn from_flags(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Text
        };
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.mode, OutputMode::Json)
    }

    /// Print `value` as pretty JSON in JSON mode, or `text` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized or stdout is closed.
    pub fn emit<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        match self.mode {
            OutputMode::Json => {
                serde_json::to_writer_pretty(&mut stdout, value)
                    .map_err(|source| StoreError::serialization("command output", source))?;
                writeln!(stdout)?;
            }
            OutputMode::Text => {
                let rendered = text();
                if !rendered.is_empty() {
                    writeln!(stdout, "{rendered}")?;
                }
            }
            OutputMode::Quiet => {}
        }
        Ok(())
    }

    /// Render an error as an `ErrorResponse` body (JSON) or a plain line.
    #[must_use]
    pub fn render_error(&self, err: &StoreError) -> String {
        if self.is_json() {
            serde_json::to_string_pretty(&ErrorResponse::from(err))
                .unwrap_or_else(|_| err.to_string())
        } else {
            format!("Error: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_beats_quiet() {
        assert_eq!(OutputContext::from_flags(true, true).mode(), OutputMode::Json);
        assert_eq!(OutputContext::from_flags(false, true).mode(), OutputMode::Quiet);
        assert_eq!(OutputContext::from_flags(false, false).mode(), OutputMode::Text);
    }

    #[test]
    fn store_errors_render_as_error_response() {
        let ctx = OutputContext::new(OutputMode::Json);
        let err = StoreError::NotFound {
            collection: "item".to_string(),
            id: "x".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&ctx.render_error(&err)).unwrap();
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert_eq!(value["error"]["message"], "document 'x' not found in item");
    }

    #[test]
    fn text_errors_are_prefixed() {
        let ctx = OutputContext::new(OutputMode::Text);
        let err = StoreError::Config("boom".to_string());
        assert_eq!(ctx.render_error(&err), "Error: configuration error: boom");
    }
}
