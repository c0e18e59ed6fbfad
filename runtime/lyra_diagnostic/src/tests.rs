use super::*;

#[test]
fn recoverable_codes_are_not_fatal() {
    for code in [
        ErrorCode::Type,
        ErrorCode::Arity,
        ErrorCode::Unbound,
        ErrorCode::Name,
        ErrorCode::Value,
        ErrorCode::Io,
    ] {
        assert!(!code.is_fatal(), "{code} should be recoverable");
        assert_eq!(code.severity(), Severity::Error);
    }
}

#[test]
fn overflow_and_internal_are_fatal() {
    assert!(ErrorCode::Overflow.is_fatal());
    assert!(ErrorCode::Internal.is_fatal());
    assert_eq!(ErrorCode::Overflow.severity(), Severity::Fatal);
}

#[test]
fn diagnostic_renders_code_and_message() {
    let d = Diagnostic::new(ErrorCode::Unbound, "symbol `x` has no binding");
    assert_eq!(d.to_string(), "UNBOUND: symbol `x` has no binding");
}

#[test]
fn diagnostic_renders_notes() {
    let d = Diagnostic::new(ErrorCode::Overflow, "heap region exhausted")
        .with_note("live: 4096 slots, capacity: 4096 slots");
    let rendered = d.to_string();
    assert!(rendered.starts_with("OVERFLOW: heap region exhausted"));
    assert!(rendered.contains("note: live: 4096"));
}
