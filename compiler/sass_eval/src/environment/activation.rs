//! Activation records: entering and leaving a scope's storage.

use std::sync::Arc;

use sass_ir::ast::Block;
use sass_ir::{PerKind, ScopeArena, ScopeId, SlotKind};

use super::{Region, RuntimeEnvironment};
use crate::errors::{recursion_limit, EvalError};

/// How a frame answers `@content` and `content-exists()`.
#[derive(Clone, Debug)]
pub enum FrameContent {
    /// Defer to the enclosing frame.
    Inherit,
    /// Not inside a mixin: functions, and content blocks written outside any
    /// mixin.
    Barrier,
    /// A mixin body, with the content block it was included with.
    Mixin(Option<Arc<ContentBlock>>),
}

/// A `@include ... { ... }` block on its way to the mixin's `@content`.
#[derive(Debug)]
pub struct ContentBlock {
    pub block: Arc<Block>,
    /// What the include site saw, restored while the block runs.
    pub context: FrameContent,
}

/// Entry of the dynamic "currently executing" scope stack.
#[derive(Clone, Debug)]
pub struct DynamicFrame {
    pub scope: ScopeId,
    pub content: FrameContent,
}

/// Saved state of one open activation.
///
/// Must be handed back to [`RuntimeEnvironment::pop_activation`]; the
/// evaluator does that from a drop guard.
#[must_use = "an activation must be popped"]
#[derive(Debug)]
pub struct ActivationRecord {
    scope: ScopeId,
    previous: PerKind<Option<Region>>,
    lengths: PerKind<usize>,
    was_active: bool,
}

impl ActivationRecord {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

impl RuntimeEnvironment {
    fn local_len(&self, kind: SlotKind) -> usize {
        match kind {
            SlotKind::Variable => self.variables.local_len(),
            SlotKind::Function | SlotKind::Mixin => self.callables(kind).local_len(),
        }
    }

    fn open_region(&mut self, kind: SlotKind, frame: ScopeId, count: usize) -> Option<Region> {
        match kind {
            SlotKind::Variable => self.variables.open(frame, count),
            SlotKind::Function | SlotKind::Mixin => self.callables_mut(kind).open(frame, count),
        }
    }

    fn close_region(&mut self, kind: SlotKind, frame: ScopeId, previous: Option<Region>, len: usize) {
        match kind {
            SlotKind::Variable => self.variables.close(frame, previous, len),
            SlotKind::Function | SlotKind::Mixin => {
                self.callables_mut(kind).close(frame, previous, len);
            }
        }
    }

    /// Open an activation of `scope`.
    ///
    /// Appends the descriptor's local slots, pushes the dynamic frame and marks
    /// the descriptor active. Fails with `RecursionLimit` when the configured
    /// nesting depth is reached; nothing is modified in that case.
    pub fn push_activation(
        &mut self,
        arena: &mut ScopeArena,
        scope: ScopeId,
        content: FrameContent,
    ) -> Result<ActivationRecord, EvalError> {
        if self.frames.len() >= self.max_depth {
            return Err(recursion_limit(self.max_depth));
        }

        let descriptor = arena.get(scope);
        let counts = PerKind::from_fn(|kind| descriptor.local_count(kind) as usize);
        let lengths = PerKind::from_fn(|kind| self.local_len(kind));
        let previous = PerKind::from_fn(|kind| self.open_region(kind, scope, *counts.get(kind)));

        let was_active = arena.get_mut(scope).set_active(true);
        self.frames.push(DynamicFrame { scope, content });
        tracing::trace!(?scope, depth = self.frames.len(), "enter scope");

        Ok(ActivationRecord {
            scope,
            previous,
            lengths,
            was_active,
        })
    }

    /// Close an activation, restoring everything `push_activation` changed.
    pub fn pop_activation(&mut self, arena: &mut ScopeArena, record: ActivationRecord) {
        let ActivationRecord {
            scope,
            previous,
            lengths,
            was_active,
        } = record;

        for kind in SlotKind::ALL {
            self.close_region(kind, scope, *previous.get(kind), *lengths.get(kind));
        }
        debug_assert_eq!(
            self.frames.last().map(|frame| frame.scope),
            Some(scope),
            "activations must be popped in LIFO order"
        );
        self.frames.pop();
        arena.get_mut(scope).set_active(was_active);
        tracing::trace!(?scope, depth = self.frames.len(), "exit scope");
    }
}
