//! Rendered diagnostics.

use crate::ErrorCode;
use std::fmt;

/// How bad a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable: the current top-level evaluation was aborted, the
    /// machine continues.
    Error,
    /// Unrecoverable: the embedding program should report and terminate.
    Fatal,
}

/// A rendered runtime error, ready for the embedding REPL to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error category.
    pub code: ErrorCode,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Additional context lines (heap statistics for overflows, the
    /// offending form for value errors).
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic with no notes.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Attach a context note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}
