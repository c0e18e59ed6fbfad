//! Diagnostic infrastructure for the Lyra runtime.
//!
//! This crate defines the error taxonomy shared by the heap and the
//! evaluator:
//! - `ErrorCode` — stable, searchable category names
//! - `Severity` — the recoverable/fatal split
//! - `Diagnostic` — a rendered error for the embedding program
//!
//! The runtime core never sees source text, so diagnostics here carry no
//! spans. Recoverable codes abort only the current top-level evaluation;
//! fatal codes mean a structural invariant (heap capacity, internal
//! consistency) can no longer be trusted and the embedding program is
//! expected to report and terminate.

mod code;
mod diagnostic;

pub use code::ErrorCode;
pub use diagnostic::{Diagnostic, Severity};

#[cfg(test)]
mod tests;
