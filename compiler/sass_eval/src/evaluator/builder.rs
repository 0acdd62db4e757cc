//! `EvaluatorBuilder` and evaluation options.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use sass_ir::{ScopeArena, SharedInterner};

use super::{Evaluator, DEFAULT_MAX_ACTIVATION_DEPTH};
use crate::builtins;
use crate::diagnostics::CallStack;
use crate::environment::RuntimeEnvironment;
use crate::importer::{Importer, MemoryImporter};
use crate::modules::ModuleGraph;

#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// Nested activations allowed before `RecursionLimit`.
    pub max_activation_depth: usize,
    /// Extra directories searched by file-system importers.
    pub load_paths: Vec<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_activation_depth: DEFAULT_MAX_ACTIVATION_DEPTH,
            load_paths: Vec::new(),
        }
    }
}

/// Builder for [`Evaluator`].
///
/// ```text
/// let mut eval = Evaluator::builder()
///     .importer(MemoryImporter::new().with("main.scss", |b| { ... }))
///     .max_activation_depth(64)
///     .build();
/// let css = eval.compile("main")?;
/// ```
pub struct EvaluatorBuilder {
    interner: Option<SharedInterner>,
    importer: Option<Box<dyn Importer>>,
    options: EvalOptions,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        EvaluatorBuilder {
            interner: None,
            importer: None,
            options: EvalOptions::default(),
        }
    }

    /// Share an interner with the caller (e.g. a parser).
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    #[must_use]
    pub fn importer(mut self, importer: impl Importer + 'static) -> Self {
        self.importer = Some(Box::new(importer));
        self
    }

    #[must_use]
    pub fn options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn max_activation_depth(mut self, depth: usize) -> Self {
        self.options.max_activation_depth = depth;
        self
    }

    /// Build the evaluator with the built-ins installed and sealed.
    pub fn build(self) -> Evaluator {
        let interner = self.interner.unwrap_or_default();
        let mut arena = ScopeArena::new();
        let mut env = RuntimeEnvironment::new(self.options.max_activation_depth);
        builtins::install(&mut arena, &mut env, &interner);

        Evaluator {
            interner,
            arena,
            env,
            modules: ModuleGraph::new(),
            importer: self
                .importer
                .unwrap_or_else(|| Box::new(MemoryImporter::new())),
            options: self.options,
            call_stack: CallStack::new(),
            module_stack: Vec::new(),
            import_cache: FxHashMap::default(),
            selectors: Vec::new(),
            entry: None,
            host_globals: Vec::new(),
        }
    }
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
