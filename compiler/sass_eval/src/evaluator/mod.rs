//! Evaluator: walks the tree, drives activations and links modules.
//!
//! One `Evaluator` owns everything of one compilation: the scope arena (which
//! keeps growing as dependencies are parsed), the runtime environment, the
//! module cache and the importer. Nothing is process-global, so independent
//! compilations can run side by side.

mod builder;
mod expressions;
mod linker;
mod scope_guard;
mod statements;

pub use builder::{EvalOptions, EvaluatorBuilder};
pub use linker::default_namespace;
pub use scope_guard::ScopedEvaluator;

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sass_ir::ast::Stylesheet;
use sass_ir::{ModuleId, ScopeArena, ScopeId, SharedInterner, SlotKind, StringInterner, Value};

use crate::config::WithConfig;
use crate::diagnostics::CallStack;
use crate::environment::{Callable, RuntimeEnvironment};
use crate::errors::{module_not_found, EvalError};
use crate::importer::Importer;
use crate::modules::ModuleGraph;
use crate::output::CssDeclaration;
use crate::resolver::Resolver;
use crate::EvalResult;

/// Default ceiling on nested activations.
pub const DEFAULT_MAX_ACTIVATION_DEPTH: usize = 1024;

/// How a statement sequence finished.
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

/// A module whose root statements are currently executing.
struct ModuleFrame {
    module: ModuleId,
    config: Option<Rc<WithConfig>>,
    output: Vec<CssDeclaration>,
    /// `@import`s in progress inside this module, outermost first.
    imports: Vec<PathBuf>,
}

/// Result of compiling an entry stylesheet.
#[derive(Clone, Debug)]
pub struct CompileOutput {
    pub entry: ModuleId,
    /// Declarations of every module reached from the entry, dependencies first.
    pub declarations: Vec<CssDeclaration>,
}

pub struct Evaluator {
    interner: SharedInterner,
    arena: ScopeArena,
    env: RuntimeEnvironment,
    modules: ModuleGraph,
    importer: Box<dyn Importer>,
    options: EvalOptions,
    call_stack: CallStack,
    module_stack: Vec<ModuleFrame>,
    /// `@import`ed stylesheets, parsed once per importing scope.
    import_cache: FxHashMap<(ScopeId, PathBuf), Arc<Stylesheet>>,
    /// Selectors of the style rules being executed.
    selectors: Vec<String>,
    entry: Option<ModuleId>,
    /// Globals set by the host before any stylesheet was loaded, applied to
    /// the next entry before it runs.
    host_globals: Vec<(String, Value)>,
}

impl Evaluator {
    /// Builder with default options and an empty in-memory importer.
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn arena(&self) -> &ScopeArena {
        &self.arena
    }

    pub fn env(&self) -> &RuntimeEnvironment {
        &self.env
    }

    pub fn modules(&self) -> &ModuleGraph {
        &self.modules
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            arena: &self.arena,
            env: &self.env,
            modules: &self.modules,
            interner: &self.interner,
        }
    }

    /// Compile the stylesheet `url` resolves to, with everything it loads.
    pub fn compile(&mut self, url: &str) -> Result<CompileOutput, EvalError> {
        let path = self
            .importer
            .canonicalize(url, None)
            .ok_or_else(|| module_not_found(url))?;
        tracing::debug!(path = %path.display(), "compiling entry");

        let entry = self.load_module(&path)?;
        self.entry = Some(entry);
        let root = self.modules.get(entry).root();
        for (name, value) in std::mem::take(&mut self.host_globals) {
            self.assign_in(root, &name, value)?;
        }
        self.compile_module(entry, None)?;
        Ok(CompileOutput {
            entry,
            declarations: self.modules.css(entry),
        })
    }

    // Host API

    /// Root of the module being compiled, or of the last compiled entry.
    fn global_scope(&self) -> Option<ScopeId> {
        self.module_stack
            .last()
            .map(|frame| frame.module)
            .or(self.entry)
            .map(|module| self.modules.get(module).root())
    }

    /// Innermost executing scope, or the global scope between compilations.
    fn active_scope(&self) -> Option<ScopeId> {
        self.env.current_scope().or_else(|| self.global_scope())
    }

    fn variable_in(&self, scope: ScopeId, name: &str, pass_through: bool) -> Option<Value> {
        let name = self.interner.intern(name);
        let address = self
            .resolver()
            .resolve(SlotKind::Variable, name, scope, pass_through)?;
        self.env.variable(address).cloned()
    }

    fn assign_in(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<(), EvalError> {
        let name = self.interner.intern(name);
        let address = match self.arena.find(scope, SlotKind::Variable, name, false) {
            Some(address) => address,
            None => {
                let address = self.arena.declare(scope, SlotKind::Variable, name);
                let storage = self.arena.storage_scope(scope);
                self.env.grow_frame(&self.arena, storage)?;
                address
            }
        };
        self.env.set_variable(address, value, false)?;
        Ok(())
    }

    fn queued_global(&self, name: &str) -> Option<Value> {
        let normalized = StringInterner::normalize(name);
        self.host_globals
            .iter()
            .rev()
            .find(|(queued, _)| StringInterner::normalize(queued) == normalized)
            .map(|(_, value)| value.clone())
    }

    /// Value of a variable at the root of the current module.
    ///
    /// Before the first compilation this reads the queued host globals.
    pub fn get_global_variable(&self, name: &str) -> Option<Value> {
        match self.global_scope() {
            Some(scope) => self.variable_in(scope, name, false),
            None => self.queued_global(name),
        }
    }

    /// Assign a variable at the root of the current module.
    ///
    /// Before the first compilation the value is queued and assigned to the
    /// entry's root before its statements run, so a `!default` there keeps it.
    pub fn set_global_variable(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match self.global_scope() {
            Some(scope) => self.assign_in(scope, name, value),
            None => {
                self.host_globals.push((name.to_string(), value));
                Ok(())
            }
        }
    }

    /// Value of a variable visible from the innermost executing scope.
    ///
    /// Called from a host function, that is the scope the call is made from.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        match self.active_scope() {
            Some(scope) => self.variable_in(scope, name, true),
            None => self.queued_global(name),
        }
    }

    /// Assign a variable in the innermost executing scope, declaring it there
    /// when no binding is reachable.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match self.active_scope() {
            Some(scope) => self.assign_in(scope, name, value),
            None => self.set_global_variable(name, value),
        }
    }

    /// Make a host function callable from every stylesheet.
    ///
    /// Registered after the built-ins are sealed, so it may shadow one.
    pub fn register_function(
        &mut self,
        name: &str,
        run: impl Fn(&mut Evaluator, &[Value]) -> EvalResult + Send + Sync + 'static,
    ) -> Result<(), EvalError> {
        let interned = self.interner.intern(name);
        let address = self
            .arena
            .declare(ScopeId::BUILTINS, SlotKind::Function, interned);
        let callable = Callable::Host {
            name: Arc::from(name),
            run: Arc::new(run),
        };
        self.env.set_callable(SlotKind::Function, address, callable)?;
        Ok(())
    }
}
