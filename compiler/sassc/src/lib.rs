//! Sassc - file-system driver for the Sass scope and module engine.
//!
//! Wires the evaluator in `sass_eval` to real files:
//!
//! - [`FsImporter`]: resolves `@use`/`@forward`/`@import` URLs against the
//!   importing file's directory and the configured load paths
//! - [`SourceParser`]: the grammar front end the importer hands source text to
//! - [`Compiler`]: compile entry point with the host variable/function API
//! - [`render_css`] / [`render_error`]: text output for the command line

mod compiler;
mod importer;
mod logging;
mod report;

pub use compiler::{CompileOptions, Compiler};
pub use importer::{FsImporter, ParseError, SourceParser};
pub use logging::init_tracing;
pub use report::{render_css, render_error};

pub use sass_eval::{CompileOutput, CssDeclaration, EvalError, EvalErrorKind, EvalResult};
