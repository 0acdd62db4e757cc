use super::*;
use pretty_assertions::assert_eq;

#[test]
fn factory_sets_kind_and_message() {
    let err = undefined_variable("width");
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedVariable {
            name: "width".to_string()
        }
    );
    assert_eq!(err.message, "undefined variable: $width");
    assert_eq!(err.to_string(), err.message);
}

#[test]
fn import_loop_lists_the_chain() {
    let err = import_loop(vec!["b.scss".to_string(), "b.scss".to_string()]);
    assert_eq!(err.message, "import loop: b.scss -> b.scss");
}

#[test]
fn first_backtrace_wins() {
    let inner = EvalBacktrace::new(vec![BacktraceFrame {
        label: "function inner".to_string(),
    }]);
    let outer = EvalBacktrace::new(vec![BacktraceFrame {
        label: "function outer".to_string(),
    }]);
    let err = recursion_limit(8).with_backtrace(inner.clone()).with_backtrace(outer);
    assert_eq!(err.backtrace, Some(inner));
}

#[test]
fn backtrace_display_numbers_frames() {
    let trace = EvalBacktrace::new(vec![
        BacktraceFrame {
            label: "mixin pad".to_string(),
        },
        BacktraceFrame {
            label: "module main.scss".to_string(),
        },
    ]);
    assert_eq!(trace.to_string(), "  0: mixin pad\n  1: module main.scss\n");
    assert_eq!(trace.len(), 2);
}

#[test]
fn custom_errors_keep_their_message() {
    let err = EvalError::new("boom").with_note(EvalNote::new("while testing"));
    assert_eq!(
        err.kind,
        EvalErrorKind::Custom {
            message: "boom".to_string()
        }
    );
    assert_eq!(err.notes.len(), 1);
}
