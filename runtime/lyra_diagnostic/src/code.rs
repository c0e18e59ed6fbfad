//! Error codes for runtime failures.

use crate::Severity;
use std::fmt;

/// Category of a runtime error.
///
/// The first six codes are recoverable: they unwind to the boundary of the
/// current top-level evaluation and the machine continues. `Overflow` and
/// `Internal` are fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An operand had the wrong type.
    Type,
    /// A procedure was called with the wrong number of arguments.
    Arity,
    /// A symbol has no binding.
    Unbound,
    /// Attempt to rebind a constant or reserved symbol.
    Name,
    /// Malformed special-form structure or an out-of-range value.
    Value,
    /// An error propagated from foreign I/O.
    Io,
    /// Heap or evaluation stack exhausted even after growth.
    Overflow,
    /// An internal invariant was violated.
    Internal,
}

impl ErrorCode {
    /// The stable uppercase name used in rendered diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Type => "TYPE",
            ErrorCode::Arity => "ARITY",
            ErrorCode::Unbound => "UNBOUND",
            ErrorCode::Name => "NAME",
            ErrorCode::Value => "VALUE",
            ErrorCode::Io => "IO",
            ErrorCode::Overflow => "OVERFLOW",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Whether an error of this code can be recovered at the top-level
    /// evaluation boundary.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::Overflow | ErrorCode::Internal)
    }

    /// Severity implied by the code.
    pub fn severity(self) -> Severity {
        if self.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
