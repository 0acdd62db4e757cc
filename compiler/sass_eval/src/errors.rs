//! Evaluation errors.
//!
//! `EvalErrorKind` is the structured taxonomy callers match on; the `#[cold]`
//! factory functions at the bottom of this module are the construction API and
//! fill in both the kind and the rendered message.
//!
//! Errors are never recovered inside the engine. They unwind through every
//! open activation (whose guards restore the environment) and reach the
//! top-level compile entry point, which formats them with their backtrace.

use std::fmt;

use sass_ir::ScopeOverflow;

use crate::environment::SlotError;
use crate::importer::ImporterError;

/// Result of evaluating an expression.
pub type EvalResult = Result<sass_ir::Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Resolution
    UndefinedVariable { name: String },
    UndefinedFunction { name: String },
    UndefinedMixin { name: String },
    PrivateAccessViolation { name: String },

    // Modules
    UnknownModule { namespace: String },
    ModuleAlreadyKnown { namespace: String },
    ModuleNotFound { url: String },
    AlreadyConfigured { url: String },
    ImportLoop { chain: Vec<String> },
    AmbiguousForward { name: String },
    UnusedConfigVariable { name: String },

    // Activation
    RecursionLimit { depth: usize },

    // Calls and values
    ArityMismatch { name: String, expected: usize, got: usize },
    TypeMismatch { expected: String, got: String },
    ContentOutsideMixin,

    /// Catch-all for failures without a dedicated category.
    Custom { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedVariable { name } => write!(f, "undefined variable: ${name}"),
            Self::UndefinedFunction { name } => write!(f, "undefined function: {name}()"),
            Self::UndefinedMixin { name } => write!(f, "undefined mixin: {name}"),
            Self::PrivateAccessViolation { name } => {
                write!(f, "private member {name} cannot be accessed from outside its module")
            }

            Self::UnknownModule { namespace } => {
                write!(f, "there is no module with the namespace \"{namespace}\"")
            }
            Self::ModuleAlreadyKnown { namespace } => {
                write!(f, "there's already a module with namespace \"{namespace}\"")
            }
            Self::ModuleNotFound { url } => write!(f, "can't find stylesheet to import: {url}"),
            Self::AlreadyConfigured { url } => write!(
                f,
                "{url} was already loaded, so it can't be configured using \"with\""
            ),
            Self::ImportLoop { chain } => write!(f, "import loop: {}", chain.join(" -> ")),
            Self::AmbiguousForward { name } => {
                write!(f, "two forwarded modules both define a member named {name}")
            }
            Self::UnusedConfigVariable { name } => write!(
                f,
                "${name} was not declared with !default in the @used module"
            ),

            Self::RecursionLimit { depth } => {
                write!(f, "maximum nesting depth exceeded (limit: {depth})")
            }

            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let word = if *expected == 1 { "argument" } else { "arguments" };
                write!(f, "{name} takes at most {expected} {word}, but {got} were passed")
            }
            Self::TypeMismatch { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            Self::ContentOutsideMixin => {
                write!(f, "@content is only allowed within mixin declarations")
            }

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Additional context note attached to an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalNote {
    pub message: String,
}

impl EvalNote {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One entry of an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// What was executing: `function double`, `mixin pad`, `module a.scss`.
    pub label: String,
}

/// Snapshot of the call stack at an error site, innermost frame first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {}", frame.label)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Rendered message (`kind.to_string()` for factory-built errors).
    pub message: String,
    /// Call and module-load chain active when the error was raised.
    pub backtrace: Option<EvalBacktrace>,
    pub notes: Vec<EvalNote>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    /// Attach a backtrace unless one is already present.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        if self.backtrace.is_none() {
            self.backtrace = Some(backtrace);
        }
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: EvalNote) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

// Resolution Errors

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_function(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_mixin(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedMixin {
        name: name.to_string(),
    })
}

#[cold]
pub fn private_access(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::PrivateAccessViolation {
        name: name.to_string(),
    })
}

// Module Errors

#[cold]
pub fn unknown_module(namespace: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownModule {
        namespace: namespace.to_string(),
    })
}

#[cold]
pub fn module_already_known(namespace: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuleAlreadyKnown {
        namespace: namespace.to_string(),
    })
}

#[cold]
pub fn module_not_found(url: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuleNotFound {
        url: url.to_string(),
    })
}

#[cold]
pub fn already_configured(url: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AlreadyConfigured {
        url: url.to_string(),
    })
}

/// Cyclic `@import`; `chain` lists the stylesheets from the first occurrence
/// of the repeated one to the repeated import.
#[cold]
pub fn import_loop(chain: Vec<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ImportLoop { chain })
}

#[cold]
pub fn ambiguous_forward(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AmbiguousForward {
        name: name.to_string(),
    })
}

#[cold]
pub fn unused_config_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnusedConfigVariable {
        name: name.to_string(),
    })
}

// Activation Errors

#[cold]
pub fn recursion_limit(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { depth })
}

// Call and Value Errors

#[cold]
pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn content_outside_mixin() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ContentOutsideMixin)
}

impl From<SlotError> for EvalError {
    #[cold]
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::Private { address, .. } => private_access(&address.to_string()),
            SlotError::Inactive { .. } => EvalError::new(err.to_string()),
        }
    }
}

impl From<ScopeOverflow> for EvalError {
    #[cold]
    fn from(err: ScopeOverflow) -> Self {
        EvalError::new(err.to_string())
    }
}

impl From<ImporterError> for EvalError {
    #[cold]
    fn from(err: ImporterError) -> Self {
        EvalError::new(err.to_string())
    }
}

#[cfg(test)]
mod tests;
