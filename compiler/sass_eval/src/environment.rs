//! Runtime storage for variables, functions and mixins.
//!
//! Each slot kind has its own [`SlotStack`]: a permanent array for the
//! `Global` address space and a growable array for `Local` frames. A frame's
//! open activation owns a contiguous region `[base, base + len)` of the local
//! array; `Local { frame, offset }` reads `local[base + offset]` of the most
//! recent activation of `frame`.
//!
//! Activations nest strictly LIFO. Entering one appends the descriptor's local
//! slots and records the previous region; leaving it truncates the array and
//! restores that region, so recursion and loop iterations each get their own
//! storage.

mod activation;

pub use activation::{ActivationRecord, ContentBlock, DynamicFrame, FrameContent};

use std::fmt;
use std::sync::Arc;

use sass_ir::ast::CallableDecl;
use sass_ir::{Address, PerKind, ScopeArena, ScopeId, SlotKind, Value};

use crate::builtins::Builtin;
use crate::evaluator::Evaluator;
use crate::EvalResult;

/// Low-level slot access failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("{} {address} belongs to the built-in region and cannot be overwritten", kind.noun())]
    Private { kind: SlotKind, address: Address },
    #[error("{} {address} has no open activation", kind.noun())]
    Inactive { kind: SlotKind, address: Address },
}

/// Host-provided function registered through the embedding API.
///
/// It runs with the evaluator of the calling stylesheet, so the variable
/// accessors see the scope the call is made from.
pub type HostFn = dyn Fn(&mut Evaluator, &[Value]) -> EvalResult + Send + Sync;

/// Contents of a function or mixin slot.
#[derive(Clone)]
pub enum Callable {
    /// `@function` / `@mixin` declared in a stylesheet.
    User(Arc<CallableDecl>),
    /// Introspection built-in implemented by the evaluator.
    Builtin(Builtin),
    /// Function registered by the embedder.
    Host { name: Arc<str>, run: Arc<HostFn> },
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::User(decl) => f.debug_tuple("User").field(&decl.name).finish(),
            Callable::Builtin(builtin) => f.debug_tuple("Builtin").field(&builtin.name).finish(),
            Callable::Host { name, .. } => f.debug_tuple("Host").field(name).finish(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Region {
    base: usize,
    len: usize,
}

/// Storage for one slot kind.
pub struct SlotStack<T> {
    global: Vec<Option<T>>,
    local: Vec<Option<T>>,
    /// Current region per frame, indexed by `ScopeId`.
    regions: Vec<Option<Region>>,
}

impl<T> Default for SlotStack<T> {
    fn default() -> Self {
        SlotStack {
            global: Vec::new(),
            local: Vec::new(),
            regions: Vec::new(),
        }
    }
}

impl<T> SlotStack<T> {
    #[inline]
    pub fn global_len(&self) -> usize {
        self.global.len()
    }

    #[inline]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    fn region(&self, frame: ScopeId) -> Option<Region> {
        self.regions.get(frame.index()).copied().flatten()
    }

    fn set_region(&mut self, frame: ScopeId, region: Option<Region>) -> Option<Region> {
        let index = frame.index();
        if index >= self.regions.len() {
            self.regions.resize(index + 1, None);
        }
        std::mem::replace(&mut self.regions[index], region)
    }

    /// Value at `address`, or `None` when the slot is unassigned or its frame
    /// has no open activation.
    pub fn get(&self, address: Address) -> Option<&T> {
        match address {
            Address::Global(offset) => self.global.get(offset as usize)?.as_ref(),
            Address::Local { frame, offset } => {
                let region = self.region(frame)?;
                let offset = offset as usize;
                if offset >= region.len {
                    return None;
                }
                self.local.get(region.base + offset)?.as_ref()
            }
        }
    }

    fn slot_mut(&mut self, kind: SlotKind, address: Address) -> Result<&mut Option<T>, SlotError> {
        match address {
            Address::Global(offset) => {
                let offset = offset as usize;
                if offset >= self.global.len() {
                    self.global.resize_with(offset + 1, || None);
                }
                Ok(&mut self.global[offset])
            }
            Address::Local { frame, offset } => {
                let inactive = SlotError::Inactive { kind, address };
                let Some(region) = self.region(frame) else {
                    return Err(inactive);
                };
                let offset = offset as usize;
                if offset >= region.len {
                    return Err(inactive);
                }
                self.local.get_mut(region.base + offset).ok_or(inactive)
            }
        }
    }

    /// Append `count` empty slots as the new region of `frame`.
    fn open(&mut self, frame: ScopeId, count: usize) -> Option<Region> {
        let base = self.local.len();
        self.local.resize_with(base + count, || None);
        self.set_region(frame, Some(Region { base, len: count }))
    }

    fn close(&mut self, frame: ScopeId, previous: Option<Region>, len: usize) {
        self.local.truncate(len);
        self.set_region(frame, previous);
    }

    /// Extend the open region of `frame` to `count` slots.
    ///
    /// Only the innermost region can grow; declarations spliced in by an
    /// `@import` always target the frame executing the import.
    fn grow(&mut self, kind: SlotKind, frame: ScopeId, count: usize) -> Result<(), SlotError> {
        let Some(mut region) = self.region(frame) else {
            return Err(SlotError::Inactive {
                kind,
                address: Address::Local { frame, offset: 0 },
            });
        };
        if count <= region.len {
            return Ok(());
        }
        if region.base + region.len != self.local.len() {
            return Err(SlotError::Inactive {
                kind,
                address: Address::Local {
                    frame,
                    offset: u32::try_from(region.len).unwrap_or(u32::MAX),
                },
            });
        }
        self.local.resize_with(region.base + count, || None);
        region.len = count;
        self.set_region(frame, Some(region));
        Ok(())
    }
}

/// Array lengths of the local address space, per kind, plus the dynamic
/// frame depth. Used to check push/pop symmetry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvLengths {
    pub variables: usize,
    pub functions: usize,
    pub mixins: usize,
    pub frames: usize,
}

/// All runtime storage of one compilation.
pub struct RuntimeEnvironment {
    variables: SlotStack<Value>,
    functions: SlotStack<Callable>,
    mixins: SlotStack<Callable>,
    private_boundary: PerKind<u32>,
    frames: Vec<DynamicFrame>,
    max_depth: usize,
}

impl RuntimeEnvironment {
    /// Create an empty environment allowing `max_depth` nested activations.
    pub fn new(max_depth: usize) -> Self {
        RuntimeEnvironment {
            variables: SlotStack::default(),
            functions: SlotStack::default(),
            mixins: SlotStack::default(),
            private_boundary: PerKind::default(),
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Adopt the arena's built-in boundary; global slots below it become
    /// read-only.
    pub fn seal(&mut self, arena: &ScopeArena) {
        self.private_boundary = PerKind::from_fn(|kind| arena.private_boundary(kind));
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn check_boundary(&self, kind: SlotKind, address: Address) -> Result<(), SlotError> {
        match address {
            Address::Global(offset) if offset < *self.private_boundary.get(kind) => {
                Err(SlotError::Private { kind, address })
            }
            _ => Ok(()),
        }
    }

    // Variables

    pub fn variable(&self, address: Address) -> Option<&Value> {
        self.variables.get(address)
    }

    /// Write a variable. A guarded (`!default`) write only lands when the slot
    /// is unassigned or holds `null`. Returns whether the slot was written.
    pub fn set_variable(
        &mut self,
        address: Address,
        value: Value,
        guarded: bool,
    ) -> Result<bool, SlotError> {
        self.check_boundary(SlotKind::Variable, address)?;
        let slot = self.variables.slot_mut(SlotKind::Variable, address)?;
        if guarded && slot.as_ref().is_some_and(|current| !current.is_null()) {
            return Ok(false);
        }
        *slot = Some(value);
        Ok(true)
    }

    // Functions and mixins

    fn callables(&self, kind: SlotKind) -> &SlotStack<Callable> {
        match kind {
            SlotKind::Mixin => &self.mixins,
            SlotKind::Function | SlotKind::Variable => &self.functions,
        }
    }

    fn callables_mut(&mut self, kind: SlotKind) -> &mut SlotStack<Callable> {
        match kind {
            SlotKind::Mixin => &mut self.mixins,
            SlotKind::Function | SlotKind::Variable => &mut self.functions,
        }
    }

    pub fn callable(&self, kind: SlotKind, address: Address) -> Option<&Callable> {
        self.callables(kind).get(address)
    }

    pub fn set_callable(
        &mut self,
        kind: SlotKind,
        address: Address,
        callable: Callable,
    ) -> Result<(), SlotError> {
        self.check_boundary(kind, address)?;
        *self.callables_mut(kind).slot_mut(kind, address)? = Some(callable);
        Ok(())
    }

    /// Install a built-in function at a global offset, ignoring the private
    /// boundary.
    pub(crate) fn define_builtin(&mut self, offset: u32, callable: Callable) {
        let offset = offset as usize;
        let global = &mut self.functions.global;
        if offset >= global.len() {
            global.resize_with(offset + 1, || None);
        }
        global[offset] = Some(callable);
    }

    /// Whether the slot at `address` currently holds a value.
    pub fn is_bound(&self, kind: SlotKind, address: Address) -> bool {
        match kind {
            SlotKind::Variable => self.variables.get(address).is_some(),
            SlotKind::Function | SlotKind::Mixin => self.callables(kind).get(address).is_some(),
        }
    }

    // Frames

    /// Currently executing scopes, outermost first.
    pub fn frames(&self) -> &[DynamicFrame] {
        &self.frames
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost executing scope.
    pub fn current_scope(&self) -> Option<ScopeId> {
        self.frames.last().map(|frame| frame.scope)
    }

    /// Content passed to the innermost executing mixin.
    ///
    /// `None` when no mixin is executing; `Some(None)` inside a mixin that was
    /// included without a content block.
    pub fn content(&self) -> Option<Option<Arc<ContentBlock>>> {
        for frame in self.frames.iter().rev() {
            match &frame.content {
                FrameContent::Inherit => {}
                FrameContent::Barrier => return None,
                FrameContent::Mixin(content) => return Some(content.clone()),
            }
        }
        None
    }

    /// Local array lengths and frame depth.
    pub fn lengths(&self) -> EnvLengths {
        EnvLengths {
            variables: self.variables.local_len(),
            functions: self.functions.local_len(),
            mixins: self.mixins.local_len(),
            frames: self.frames.len(),
        }
    }

    /// Make room for slots declared in `frame` after its activation opened.
    ///
    /// `@import` splices the imported stylesheet's declarations into the
    /// importing frame while that frame is executing.
    pub fn grow_frame(&mut self, arena: &ScopeArena, frame: ScopeId) -> Result<(), SlotError> {
        let descriptor = arena.get(frame);
        if descriptor.is_root() {
            return Ok(());
        }
        for kind in SlotKind::ALL {
            let count = descriptor.local_count(kind) as usize;
            match kind {
                SlotKind::Variable => self.variables.grow(kind, frame, count)?,
                SlotKind::Function | SlotKind::Mixin => {
                    self.callables_mut(kind).grow(kind, frame, count)?;
                }
            }
        }
        Ok(())
    }
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::new(crate::evaluator::DEFAULT_MAX_ACTIVATION_DEPTH)
    }
}

#[cfg(test)]
mod tests;
