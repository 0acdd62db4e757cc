//! Compile entry point.

use std::path::PathBuf;

use sass_eval::{CompileOutput, EvalError, EvalOptions, EvalResult, Evaluator};
use sass_ir::Value;

use crate::importer::{FsImporter, SourceParser};

/// What to compile and how.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Entry stylesheet, relative to the working directory or absolute.
    pub entry: PathBuf,
    pub eval: EvalOptions,
}

impl CompileOptions {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        CompileOptions {
            entry: entry.into(),
            eval: EvalOptions::default(),
        }
    }

    /// Add a directory searched after the importing file's own directory.
    #[must_use]
    pub fn load_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.eval.load_paths.push(dir.into());
        self
    }

    #[must_use]
    pub fn max_activation_depth(mut self, depth: usize) -> Self {
        self.eval.max_activation_depth = depth;
        self
    }
}

/// One compilation of an entry stylesheet read from disk.
///
/// Host functions and globals can be set before [`Compiler::compile`]; queued
/// globals are assigned at the entry's root before it runs. Host functions get
/// the evaluator, so `get_variable`/`set_variable` act on the scope the call
/// is made from. After compiling, the accessors see the entry module's final
/// state.
pub struct Compiler {
    evaluator: Evaluator,
    entry: PathBuf,
}

impl Compiler {
    pub fn new<P: SourceParser + 'static>(parser: P, options: CompileOptions) -> Self {
        let CompileOptions { entry, eval } = options;
        let importer = FsImporter::new(parser, eval.load_paths.clone());
        let evaluator = Evaluator::builder().options(eval).importer(importer).build();
        Compiler { evaluator, entry }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(entry = %self.entry.display()))]
    pub fn compile(&mut self) -> Result<CompileOutput, EvalError> {
        let Some(url) = self.entry.to_str() else {
            return Err(EvalError::new(format!(
                "entry path {} is not valid UTF-8",
                self.entry.display()
            )));
        };
        self.evaluator.compile(url)
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn get_global_variable(&self, name: &str) -> Option<Value> {
        self.evaluator.get_global_variable(name)
    }

    pub fn set_global_variable(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        self.evaluator.set_global_variable(name, value)
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.evaluator.get_variable(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        self.evaluator.set_variable(name, value)
    }

    pub fn register_function(
        &mut self,
        name: &str,
        run: impl Fn(&mut Evaluator, &[Value]) -> EvalResult + Send + Sync + 'static,
    ) -> Result<(), EvalError> {
        self.evaluator.register_function(name, run)
    }
}
