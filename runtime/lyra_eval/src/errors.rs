//! Centralized error type and constructors for the evaluator.
//!
//! One constructor per failure shape keeps messages consistent and gives
//! call sites a single import point.

use lyra_diagnostic::{Diagnostic, ErrorCode};

/// A runtime error: taxonomy code plus rendered message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct EvalError {
    /// Error category; decides recoverable vs fatal.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl EvalError {
    /// Create an error from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        EvalError {
            code,
            message: message.into(),
        }
    }

    /// Render into a diagnostic for the embedding program.
    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.code, self.message.clone())
    }
}

/// Result of an evaluation step.
pub type EvalResult<T = lyra_value::Value> = Result<T, EvalError>;

// === TYPE ===

/// An operand had the wrong type.
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::new(
        ErrorCode::Type,
        format!("expected {expected}, got {got}"),
    )
}

/// The operator position did not evaluate to a procedure.
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::new(
        ErrorCode::Type,
        format!("value of type {type_name} is not callable"),
    )
}

/// A type descriptor without a constructor appeared in operator position.
pub fn not_constructible(type_name: &str) -> EvalError {
    EvalError::new(
        ErrorCode::Type,
        format!("type {type_name} has no constructor"),
    )
}

// === ARITY ===

/// A procedure was called with the wrong number of arguments.
pub fn wrong_arg_count(name: &str, want: u8, got: usize, variadic: bool) -> EvalError {
    let expectation = if variadic {
        format!("at least {want}")
    } else {
        format!("{want}")
    };
    EvalError::new(
        ErrorCode::Arity,
        format!("{name} expects {expectation} argument(s), got {got}"),
    )
}

// === UNBOUND ===

/// A symbol has no binding.
pub fn unbound_symbol(name: &str) -> EvalError {
    EvalError::new(
        ErrorCode::Unbound,
        format!("symbol `{name}` has no binding"),
    )
}

// === NAME ===

/// Attempt to rebind a constant or reserved symbol.
pub fn constant_symbol(name: &str) -> EvalError {
    EvalError::new(
        ErrorCode::Name,
        format!("symbol `{name}` is constant and cannot be rebound"),
    )
}

// === VALUE ===

/// Malformed special-form structure.
pub fn malformed_form(form: &str, why: &str) -> EvalError {
    EvalError::new(ErrorCode::Value, format!("malformed `{form}` form: {why}"))
}

/// A spine that had to be a proper list was not.
pub fn improper_list(what: &str) -> EvalError {
    EvalError::new(ErrorCode::Value, format!("{what} must be a proper list"))
}

/// Integer arithmetic left the representable range.
pub fn integer_overflow(op: &str) -> EvalError {
    EvalError::new(ErrorCode::Value, format!("integer overflow in `{op}`"))
}

/// A formal-parameter spec with more names than the arity field can hold.
pub fn too_many_params() -> EvalError {
    EvalError::new(
        ErrorCode::Value,
        "formal-parameter spec exceeds 255 names".to_string(),
    )
}

// === OVERFLOW (fatal) ===

/// The heap cannot hold the live set even after growth.
pub fn heap_exhausted(live: usize, capacity: usize) -> EvalError {
    EvalError::new(
        ErrorCode::Overflow,
        format!("heap exhausted: {live} live slots with capacity {capacity}"),
    )
}

/// The continuation stack reached its configured limit.
pub fn stack_exhausted(depth: usize) -> EvalError {
    EvalError::new(
        ErrorCode::Overflow,
        format!("evaluation stack exhausted at depth {depth}"),
    )
}

/// The type registry reached its hard descriptor maximum.
pub fn registry_overflow(count: usize, max: usize) -> EvalError {
    EvalError::new(
        ErrorCode::Overflow,
        format!("type registry overflow: {count} descriptors, maximum {max}"),
    )
}

// === INTERNAL (fatal) ===

/// A structural invariant was violated.
pub fn internal(message: impl Into<String>) -> EvalError {
    EvalError::new(ErrorCode::Internal, message)
}
