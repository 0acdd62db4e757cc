//! Module linking: `@use`, `@forward`, `@import` and `with(...)`.
//!
//! Modules are cached by canonical path *before* they compile, so a `@use`
//! cycle sees the partially compiled module instead of recursing. Forwards are
//! merged into the forwarding module's tables only after its own statements
//! ran, so a module never sees what it forwards. `@import` instead splices the
//! imported stylesheet into the importing scope and runs it there; a cycle
//! through imports is an error.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use sass_ir::ast::{Assignment, ConfigArg, ForwardRule, ImportRule, UseNamespace, UseRule};
use sass_ir::{ModuleId, Name, ScopeFlags, ScopeId, Value};

use super::{Evaluator, ModuleFrame};
use crate::config::WithConfig;
use crate::diagnostics::{CallFrame, FrameKind};
use crate::environment::FrameContent;
use crate::errors::{
    already_configured, ambiguous_forward, import_loop, module_already_known, module_not_found,
    unused_config_variable, EvalError,
};
use crate::modules::PendingForward;
use crate::stack::ensure_sufficient_stack;

/// Namespace a `@use` gets without `as`: the URL's last segment, without a
/// leading underscore or extension.
pub fn default_namespace(url: &str) -> &str {
    let file = url.rsplit('/').next().unwrap_or(url);
    let file = file.strip_prefix('_').unwrap_or(file);
    file.split('.').next().unwrap_or(file)
}

impl Evaluator {
    /// Stylesheet relative URLs are resolved against: the innermost import in
    /// progress, else the current module.
    fn current_base(&self) -> Option<PathBuf> {
        let frame = self.module_stack.last()?;
        match frame.imports.last() {
            Some(import) => Some(import.clone()),
            None => Some(self.modules.get(frame.module).path().to_path_buf()),
        }
    }

    fn canonicalize(&self, url: &str) -> Result<PathBuf, EvalError> {
        let base = self.current_base();
        self.importer
            .canonicalize(url, base.as_deref())
            .ok_or_else(|| module_not_found(url))
    }

    /// Cached module for `path`, parsing it into a fresh root on first use.
    pub(crate) fn load_module(&mut self, path: &Path) -> Result<ModuleId, EvalError> {
        if let Some(id) = self.modules.lookup(path) {
            tracing::debug!(path = %path.display(), "module cache hit");
            return Ok(id);
        }
        let root = self.arena.try_alloc_root()?;
        let sheet = self
            .importer
            .load(path, &self.interner, &mut self.arena, root)?;
        let id = self
            .modules
            .insert(path.to_path_buf(), sheet, &mut self.arena)?;
        tracing::debug!(path = %path.display(), ?id, "module loaded");
        Ok(id)
    }

    /// Run a module's root statements once, then merge its forwards and check
    /// its configuration was consumed.
    #[tracing::instrument(level = "debug", skip_all, fields(module = id.index()))]
    pub(crate) fn compile_module(
        &mut self,
        id: ModuleId,
        config: Option<Rc<WithConfig>>,
    ) -> Result<(), EvalError> {
        let module = self.modules.get(id);
        let root = module.root();
        if module.is_compiled() || self.arena.get(root).is_active() {
            return Ok(());
        }
        let sheet = module.sheet();
        let label = module.path().display().to_string();

        self.call_stack.push(CallFrame::new(FrameKind::Module, label));
        self.module_stack.push(ModuleFrame {
            module: id,
            config: config.clone(),
            output: Vec::new(),
            imports: Vec::new(),
        });
        let selectors = std::mem::take(&mut self.selectors);

        let result = ensure_sufficient_stack(|| {
            self.with_activation(root, FrameContent::Barrier, |scoped| {
                scoped.exec_stmts(&sheet.body)
            })
        });

        self.selectors = selectors;
        let frame = self.module_stack.pop();
        let result = result.map_err(|err| self.call_stack.attach_backtrace(err));
        self.call_stack.pop();
        result?;

        let output = frame.map(|frame| frame.output).unwrap_or_default();
        self.modules.get_mut(id).finish(output);

        for forward in self.modules.get_mut(id).take_forwards() {
            self.modules
                .apply_forward(id, &forward, &self.arena, &self.interner)
                .map_err(|name| ambiguous_forward(self.interner.lookup(name)))?;
        }

        if let Some(name) = config.as_deref().and_then(WithConfig::first_unused) {
            return Err(unused_config_variable(self.interner.lookup(name)));
        }
        tracing::debug!("module compiled");
        Ok(())
    }

    /// Value a `!default` assignment takes from the module's configuration.
    ///
    /// Only assignments at the root of the module being compiled (including
    /// ones spliced in by `@import`) are configurable.
    pub(crate) fn configured_value(&self, assignment: &Assignment) -> Option<Value> {
        let frame = self.module_stack.last()?;
        let config = frame.config.as_ref()?;
        let root = self.modules.get(frame.module).root();
        if self.arena.storage_scope(assignment.scope) != root {
            return None;
        }
        config.take(assignment.name, &self.interner)
    }

    fn eval_config(&mut self, config: &[ConfigArg]) -> Result<Vec<(Name, Value, bool)>, EvalError> {
        let mut values = Vec::with_capacity(config.len());
        for arg in config {
            values.push((arg.name, self.eval_expr(&arg.value)?, arg.guarded));
        }
        Ok(values)
    }

    /// Load `url` for a `@use`/`@forward`, rejecting a `with` clause on a
    /// module that already ran.
    fn load_configurable(&mut self, url: &str, configured: bool) -> Result<ModuleId, EvalError> {
        let path = self.canonicalize(url)?;
        let id = self.load_module(&path)?;
        let module = self.modules.get(id);
        if configured && (module.is_compiled() || self.arena.get(module.root()).is_active()) {
            return Err(already_configured(url));
        }
        Ok(id)
    }

    fn note_upstream(&mut self, id: ModuleId) {
        if let Some(frame) = self.module_stack.last() {
            let current = frame.module;
            self.modules.get_mut(current).add_upstream(id);
        }
    }

    /// Whether the current statement comes from an `@import`ed stylesheet.
    fn in_import(&self) -> bool {
        self.module_stack
            .last()
            .is_some_and(|frame| !frame.imports.is_empty())
    }

    fn register_namespace(
        &mut self,
        scope: ScopeId,
        namespace: Name,
        id: ModuleId,
    ) -> Result<(), EvalError> {
        let root = self.modules.get(id).root();
        let in_import = self.in_import();
        match self.arena.get_mut(scope).register_namespace(namespace, root, id) {
            Ok(()) => Ok(()),
            // An imported stylesheet runs once per import, registering its
            // `@use`s on the importing scope again.
            Err(existing) if in_import && existing == (root, id) => Ok(()),
            Err(_) => Err(module_already_known(self.interner.lookup(namespace))),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(url = %rule.url))]
    pub(crate) fn eval_use(&mut self, rule: &UseRule) -> Result<(), EvalError> {
        let values = self.eval_config(&rule.config)?;
        let id = self.load_configurable(&rule.url, !values.is_empty())?;
        let config = (!values.is_empty()).then(|| Rc::new(WithConfig::new(values)));
        self.compile_module(id, config)?;
        self.note_upstream(id);

        let target = self.arena.storage_scope(rule.scope);
        match rule.namespace {
            UseNamespace::Global => {
                let root = self.modules.get(id).root();
                self.arena.get_mut(target).push_forwarded(root);
                Ok(())
            }
            UseNamespace::Named(namespace) => self.register_namespace(target, namespace, id),
            UseNamespace::Default => {
                let namespace = self.interner.intern(default_namespace(&rule.url));
                self.register_namespace(target, namespace, id)
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(url = %rule.url))]
    pub(crate) fn eval_forward(&mut self, rule: &ForwardRule) -> Result<(), EvalError> {
        let values = self.eval_config(&rule.config)?;
        let id = self.load_configurable(&rule.url, !values.is_empty())?;

        let inherited = self
            .module_stack
            .last()
            .and_then(|frame| frame.config.clone());
        let config = match inherited {
            Some(parent) => Some(Rc::new(WithConfig::forwarded(
                values,
                parent,
                rule.filter.clone(),
                rule.prefix.clone(),
            ))),
            None if !values.is_empty() => Some(Rc::new(WithConfig::new(values))),
            None => None,
        };
        self.compile_module(id, config)?;
        self.note_upstream(id);

        let Some(current) = self.module_stack.last().map(|frame| frame.module) else {
            return Ok(());
        };
        let forward = PendingForward {
            source: id,
            filter: rule.filter.clone(),
            prefix: rule.prefix.clone(),
        };
        if self.in_import() {
            // Inlined into the importing module: its forward tables take the
            // members now, so the rest of the importer sees them too.
            self.modules
                .apply_forward(current, &forward, &self.arena, &self.interner)
                .map_err(|name| ambiguous_forward(self.interner.lookup(name)))
        } else {
            self.modules.get_mut(current).push_forward(forward);
            Ok(())
        }
    }

    /// Stylesheets on the current import chain, the module itself first.
    fn import_chain(&self) -> Vec<PathBuf> {
        let Some(frame) = self.module_stack.last() else {
            return Vec::new();
        };
        let mut chain = vec![self.modules.get(frame.module).path().to_path_buf()];
        chain.extend(frame.imports.iter().cloned());
        chain
    }

    #[tracing::instrument(level = "debug", skip_all, fields(url = %rule.url))]
    pub(crate) fn eval_import(&mut self, rule: &ImportRule) -> Result<(), EvalError> {
        let path = self.canonicalize(&rule.url)?;

        let chain = self.import_chain();
        if let Some(start) = chain.iter().position(|active| *active == path) {
            let cycle = chain[start..]
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect();
            return Err(import_loop(cycle));
        }

        let key = (rule.scope, path.clone());
        let sheet = match self.import_cache.get(&key) {
            Some(sheet) => Arc::clone(sheet),
            None => {
                let root = self.arena.try_alloc(Some(rule.scope), ScopeFlags::IMPORT)?;
                let sheet = self
                    .importer
                    .load(&path, &self.interner, &mut self.arena, root)?;
                let sheet = Arc::new(sheet);
                self.import_cache.insert(key, Arc::clone(&sheet));
                sheet
            }
        };

        // The imported declarations landed in the importing frame, which is
        // already executing.
        let storage = self.arena.storage_scope(rule.scope);
        self.env.grow_frame(&self.arena, storage)?;

        let label = path.display().to_string();
        if let Some(frame) = self.module_stack.last_mut() {
            frame.imports.push(path);
        }
        self.call_stack.push(CallFrame::new(FrameKind::Import, label));

        let result = ensure_sufficient_stack(|| {
            self.with_activation(sheet.root, FrameContent::Inherit, |scoped| {
                scoped.exec_stmts(&sheet.body)
            })
        });

        let result = result.map_err(|err| self.call_stack.attach_backtrace(err));
        self.call_stack.pop();
        if let Some(frame) = self.module_stack.last_mut() {
            frame.imports.pop();
        }
        result.map(|_| ())
    }
}
