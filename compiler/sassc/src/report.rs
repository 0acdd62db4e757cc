//! Text rendering of compile results and errors.

use std::fmt::Write;

use sass_eval::{CssDeclaration, EvalError};

/// Render declarations as CSS, merging consecutive declarations that share a
/// selector into one rule.
pub fn render_css(declarations: &[CssDeclaration]) -> String {
    let mut output = String::new();
    let mut open: Option<&str> = None;

    for declaration in declarations {
        if open != Some(declaration.selector.as_str()) {
            if open.is_some() {
                output.push_str("}\n");
            }
            let _ = writeln!(output, "{} {{", declaration.selector);
            open = Some(declaration.selector.as_str());
        }
        let _ = writeln!(
            output,
            "  {}: {};",
            declaration.property, declaration.value
        );
    }
    if open.is_some() {
        output.push_str("}\n");
    }
    output
}

/// Render an error with its notes and backtrace.
pub fn render_error(error: &EvalError) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "error: {}", error.message);
    for note in &error.notes {
        let _ = writeln!(output, "  = note: {}", note.message);
    }
    if let Some(backtrace) = error.backtrace.as_ref().filter(|b| !b.is_empty()) {
        output.push_str("backtrace:\n");
        let _ = write!(output, "{backtrace}");
    }
    output
}
