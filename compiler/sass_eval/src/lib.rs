//! Sass Eval - scope resolution, runtime environment and module linking.
//!
//! This crate runs the tree produced by `sass_ir` and turns it into CSS
//! declarations.
//!
//! # Architecture
//!
//! - `RuntimeEnvironment`: slot arrays for variables, functions and mixins,
//!   one region per open activation
//! - `ScopedEvaluator`: RAII guard over an activation; dropping it restores
//!   the environment
//! - `Resolver`: dynamic lookup through lexical parents, forwarded modules
//!   and namespaces
//! - `ModuleGraph`: compiled-once modules with their `@forward` tables
//! - `Evaluator`: walks statements and links `@use`, `@forward` and `@import`
//! - `Importer`: maps URLs to canonical paths and parses stylesheets

mod builtins;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod errors;
pub mod evaluator;
pub mod importer;
pub mod modules;
pub mod output;
pub mod resolver;
mod stack;

pub use builtins::{Builtin, BUILTINS};
pub use config::WithConfig;
pub use diagnostics::{CallFrame, CallStack, FrameKind};
pub use environment::{Callable, ContentBlock, FrameContent, RuntimeEnvironment, SlotError};
pub use errors::{EvalBacktrace, EvalError, EvalErrorKind, EvalNote, EvalResult};
pub use evaluator::{
    default_namespace, CompileOutput, EvalOptions, Evaluator, EvaluatorBuilder, ScopedEvaluator,
    DEFAULT_MAX_ACTIVATION_DEPTH,
};
pub use importer::{Importer, ImporterError, MemoryImporter};
pub use modules::{Module, ModuleGraph};
pub use output::CssDeclaration;
pub use resolver::Resolver;
