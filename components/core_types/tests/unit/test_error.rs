//! Unit tests for CompileError, RuntimeError and ErrorKind

use core_types::{CompileError, ErrorKind, RuntimeError, SourcePosition};

#[test]
fn test_syntax_error_carries_position() {
    let err = CompileError::syntax("unterminated string", SourcePosition::new(7, 12, 80));
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.position().map(|p| p.line), Some(7));
    assert!(err.to_string().starts_with("7:12:"));
}

#[test]
fn test_type_error_message() {
    let err = CompileError::type_error("undefined capture group `$3`", SourcePosition::new(2, 5, 20));
    assert_eq!(err.message(), "undefined capture group `$3`");
    assert_eq!(err.kind(), ErrorKind::TypeError);
}

#[test]
fn test_codegen_error_has_no_position() {
    let err = CompileError::codegen("label 3 never bound");
    assert_eq!(err.kind(), ErrorKind::CodeGenError);
    assert_eq!(err.position(), None);
    assert_eq!(err.to_string(), "codegen error: label 3 never bound");
}

#[test]
fn test_runtime_error_variants_render() {
    let errors = vec![
        RuntimeError::DivisionByZero,
        RuntimeError::StackUnderflow { pc: 4 },
        RuntimeError::UnboundCapture { pattern: 0, group: 2 },
        RuntimeError::ArityMismatch {
            metric: "requests".to_string(),
            expected: 2,
            found: 1,
        },
    ];
    for err in errors {
        assert_eq!(err.kind(), ErrorKind::RuntimeError);
        assert!(!err.to_string().is_empty());
    }
}

#[test]
fn test_runtime_error_arity_message() {
    let err = RuntimeError::ArityMismatch {
        metric: "requests".to_string(),
        expected: 2,
        found: 1,
    };
    assert_eq!(
        err.to_string(),
        "metric `requests` has 2 dimensions, addressed with 1"
    );
}
