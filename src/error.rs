//! Component errors.
//!
//! Only failures that abort an operation are errors. Misuse and configuration
//! problems are development warnings (see [`crate::runtime::Runtime::warn`]).

use thiserror::Error;

use crate::options::LifecycleHook;

/// Errors surfaced by component construction, mounting and method calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// A lifecycle hook callback failed. Later lifecycle phases never run.
    #[error("error in {hook} hook: {message}")]
    Hook {
        hook: LifecycleHook,
        message: String,
    },

    /// `call_method` named a method the instance does not declare.
    #[error("method \"{0}\" is not defined on the instance")]
    UnknownMethod(String),

    /// A declared method returned an error.
    #[error("error in method \"{name}\": {message}")]
    Method { name: String, message: String },

    /// The instance was torn down before the operation.
    #[error("instance {0} has been destroyed")]
    Destroyed(u64),
}

impl ComponentError {
    /// Convenience constructor for hook callbacks.
    pub fn hook(hook: LifecycleHook, message: impl Into<String>) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
        }
    }

    /// Convenience constructor for method bodies.
    pub fn method(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Method {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_error_display() {
        let err = ComponentError::hook(LifecycleHook::Created, "boom");
        assert_eq!(err.to_string(), "error in created hook: boom");
    }

    #[test]
    fn test_unknown_method_display() {
        let err = ComponentError::UnknownMethod("save".into());
        assert_eq!(err.to_string(), "method \"save\" is not defined on the instance");
    }
}
