//! Call and module-load tracking for error backtraces.
//!
//! Every callable invocation and every module or import being evaluated
//! pushes a `CallFrame`. When an error escapes, the frames are snapshotted
//! into an `EvalBacktrace` so the report shows how evaluation got there.

use std::fmt;

use crate::errors::{BacktraceFrame, EvalBacktrace, EvalError};

/// What a frame is executing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Function,
    Mixin,
    Module,
    Import,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameKind::Function => "function",
            FrameKind::Mixin => "mixin",
            FrameKind::Module => "module",
            FrameKind::Import => "import",
        })
    }
}

/// A single frame in the live call stack.
#[derive(Clone, Debug)]
pub struct CallFrame {
    pub kind: FrameKind,
    /// Callable name or stylesheet path, already rendered.
    pub name: String,
}

impl CallFrame {
    pub fn new(kind: FrameKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Live call stack of the evaluator.
///
/// Depth limiting is done by the activation machinery, not here; this stack
/// only records what is running.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    /// Pop the most recent call frame.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the stack is empty.
    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Snapshot the stack, most recent frame first.
    pub fn capture(&self) -> EvalBacktrace {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|f| BacktraceFrame {
                label: format!("{} {}", f.kind, f.name),
            })
            .collect();
        EvalBacktrace::new(frames)
    }

    /// Attach a backtrace from this call stack to an error.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if self.frames.is_empty() {
            return err;
        }
        err.with_backtrace(self.capture())
    }
}
