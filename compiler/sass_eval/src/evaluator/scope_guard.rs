//! RAII guard over an open activation.
//!
//! [`ScopedEvaluator`] holds `&mut Evaluator` and the activation record of the
//! scope it opened. Dropping it pops the activation, on normal exit, on an
//! error propagated with `?`, and during panic unwinding alike, so the
//! environment's arrays always return to their pre-entry lengths.
//!
//! The guard derefs to the evaluator, so code inside the scope uses it like
//! the evaluator itself:
//!
//! ```text
//! let mut scoped = evaluator.scoped(block.scope, FrameContent::Inherit)?;
//! scoped.exec_stmts(&block.stmts)?;
//! // activation popped here
//! ```

use std::ops::{Deref, DerefMut};

use sass_ir::ScopeId;

use super::Evaluator;
use crate::environment::{ActivationRecord, FrameContent};
use crate::errors::EvalError;

pub struct ScopedEvaluator<'e> {
    evaluator: &'e mut Evaluator,
    record: Option<ActivationRecord>,
}

impl Drop for ScopedEvaluator<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            let evaluator = &mut *self.evaluator;
            evaluator.env.pop_activation(&mut evaluator.arena, record);
        }
    }
}

impl Deref for ScopedEvaluator<'_> {
    type Target = Evaluator;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl Evaluator {
    /// Open an activation of `scope`, closed when the guard drops.
    pub fn scoped(
        &mut self,
        scope: ScopeId,
        content: FrameContent,
    ) -> Result<ScopedEvaluator<'_>, EvalError> {
        let record = self.env.push_activation(&mut self.arena, scope, content)?;
        Ok(ScopedEvaluator {
            evaluator: self,
            record: Some(record),
        })
    }

    /// Run `f` inside an activation of `scope`.
    pub fn with_activation<T, F>(
        &mut self,
        scope: ScopeId,
        content: FrameContent,
        f: F,
    ) -> Result<T, EvalError>
    where
        F: FnOnce(&mut ScopedEvaluator<'_>) -> Result<T, EvalError>,
    {
        let mut scoped = self.scoped(scope, content)?;
        f(&mut scoped)
    }
}

#[cfg(test)]
mod tests;
