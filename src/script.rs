//! The contract between the pipeline and user-authored scripts.
//!
//! A compiled script is an [`ExtensionFn`]: it receives the primary record,
//! the context and a [`Done`] handle, and signals completion through `done`.
//! Returning `Err` from `call` is the equivalent of a synchronous throw.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::CompilationError;
use crate::invoke::Done;

/// Number of arguments every compiled script receives: `(user, context, done)`.
pub const ARITY: usize = 3;

/// Name of the domain error raised by pre-user-registration scripts.
pub const PRE_USER_REGISTRATION_ERROR: &str = "PreUserRegistrationError";

/// An error raised by user code, either thrown or passed to `done`.
///
/// Domain errors are deliberate, user-facing failures and are reported in
/// full. Everything else is internal and only its message is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Application-level failure signalled on purpose by the script
    #[error("{name}: {message}")]
    Domain {
        /// Error name, used to recognize the error
        name: String,
        /// Developer-facing message
        message: String,
        /// Optional message safe to show to end users
        friendly_message: Option<String>,
    },
    /// Anything else the script threw or returned
    #[error("{message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl ScriptError {
    /// Creates a domain error with the given name and no friendly message.
    pub fn domain(name: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::Domain {
            name: name.into(),
            message: message.into(),
            friendly_message: None,
        }
    }

    /// Creates the pre-user-registration domain error.
    ///
    /// # Examples
    ///
    /// ```
    /// use extension_core::ScriptError;
    ///
    /// let err = ScriptError::pre_user_registration("message", "friendly message");
    /// assert_eq!(err.name(), Some("PreUserRegistrationError"));
    /// assert_eq!(err.message(), "message");
    /// ```
    pub fn pre_user_registration(
        message: impl Into<String>,
        friendly_message: impl Into<String>,
    ) -> Self {
        Self::domain(PRE_USER_REGISTRATION_ERROR, message).with_friendly_message(friendly_message)
    }

    /// Creates an internal error from anything displayable.
    pub fn internal(message: impl fmt::Display) -> Self {
        ScriptError::Internal {
            message: message.to_string(),
        }
    }

    /// Attaches a friendly message. No effect on internal errors.
    pub fn with_friendly_message(mut self, friendly: impl Into<String>) -> Self {
        if let ScriptError::Domain {
            friendly_message, ..
        } = &mut self
        {
            *friendly_message = Some(friendly.into());
        }
        self
    }

    /// Classifies a raw JSON error value produced by a script.
    ///
    /// An object whose `name` equals `domain_error_name` becomes a domain
    /// error. Anything else is internal: its message is the object's
    /// `message` field, the string itself, or the JSON text.
    ///
    /// # Examples
    ///
    /// ```
    /// use extension_core::ScriptError;
    /// use serde_json::json;
    ///
    /// let err = ScriptError::from_value(
    ///     &json!({ "name": "PreUserRegistrationError", "message": "m", "friendlyMessage": "f" }),
    ///     "PreUserRegistrationError",
    /// );
    /// assert_eq!(err.friendly_message(), Some("f"));
    ///
    /// let err = ScriptError::from_value(&json!("boom"), "PreUserRegistrationError");
    /// assert_eq!(err, ScriptError::internal("boom"));
    /// ```
    pub fn from_value(value: &Value, domain_error_name: &str) -> Self {
        let Some(object) = value.as_object() else {
            return match value {
                Value::String(message) => Self::internal(message),
                other => Self::internal(other),
            };
        };

        let message = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| value.to_string());

        match object.get("name").and_then(Value::as_str) {
            Some(name) if name == domain_error_name => ScriptError::Domain {
                name: name.to_owned(),
                message,
                friendly_message: object
                    .get("friendlyMessage")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            _ => ScriptError::Internal { message },
        }
    }

    /// Downgrades domain errors whose name is not `domain_error_name`.
    pub(crate) fn recognize(self, domain_error_name: &str) -> Self {
        match self {
            ScriptError::Domain { name, message, .. } if name != domain_error_name => {
                ScriptError::Internal { message }
            }
            other => other,
        }
    }

    /// The error name, for domain errors.
    pub fn name(&self) -> Option<&str> {
        match self {
            ScriptError::Domain { name, .. } => Some(name),
            ScriptError::Internal { .. } => None,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            ScriptError::Domain { message, .. } | ScriptError::Internal { message } => message,
        }
    }

    /// The friendly message, if one was supplied.
    pub fn friendly_message(&self) -> Option<&str> {
        match self {
            ScriptError::Domain {
                friendly_message, ..
            } => friendly_message.as_deref(),
            ScriptError::Internal { .. } => None,
        }
    }

    /// Returns true for domain errors.
    pub fn is_domain(&self) -> bool {
        matches!(self, ScriptError::Domain { .. })
    }
}

/// A compiled, callback-style user script.
///
/// Implemented for every `Fn(Value, Value, Done) -> Result<(), ScriptError>`
/// closure that is `Send + Sync`.
///
/// # Examples
///
/// ```
/// use extension_core::{Done, ExtensionFn, ScriptError};
/// use serde_json::Value;
///
/// fn accepts(_: &dyn ExtensionFn) {}
///
/// accepts(&|user: Value, _context: Value, done: Done| -> Result<(), ScriptError> {
///     done.success(serde_json::json!({ "user": user }));
///     Ok(())
/// });
/// ```
pub trait ExtensionFn: Send + Sync {
    /// Runs the script once.
    ///
    /// # Errors
    ///
    /// Returning `Err` is a synchronous throw; it settles the invocation
    /// unless `done` was already called.
    fn call(&self, user: Value, context: Value, done: Done) -> Result<(), ScriptError>;
}

impl<F> ExtensionFn for F
where
    F: Fn(Value, Value, Done) -> Result<(), ScriptError> + Send + Sync,
{
    fn call(&self, user: Value, context: Value, done: Done) -> Result<(), ScriptError> {
        self(user, context, done)
    }
}

/// Turns script source text into an [`ExtensionFn`].
///
/// The actual compiler lives outside this crate; the pipeline only relies on
/// this contract.
pub trait ScriptCompiler {
    /// Compiles `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CompilationError`] when the source cannot be compiled.
    fn compile(&self, source: &str) -> Result<Arc<dyn ExtensionFn>, CompilationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pre_user_registration_error_carries_all_fields() {
        let err = ScriptError::pre_user_registration("message", "friendly message");

        assert!(err.is_domain());
        assert_eq!(err.name(), Some(PRE_USER_REGISTRATION_ERROR));
        assert_eq!(err.message(), "message");
        assert_eq!(err.friendly_message(), Some("friendly message"));
    }

    #[test]
    fn friendly_message_ignored_for_internal() {
        let err = ScriptError::internal("boom").with_friendly_message("nope");
        assert_eq!(err.friendly_message(), None);
    }

    #[test]
    fn from_value_recognizes_domain_name() {
        let err = ScriptError::from_value(
            &json!({ "name": PRE_USER_REGISTRATION_ERROR, "message": "denied" }),
            PRE_USER_REGISTRATION_ERROR,
        );

        assert!(err.is_domain());
        assert_eq!(err.friendly_message(), None);
    }

    #[test]
    fn from_value_treats_unknown_names_as_internal() {
        let err = ScriptError::from_value(
            &json!({ "name": "TypeError", "message": "x is undefined" }),
            PRE_USER_REGISTRATION_ERROR,
        );

        assert_eq!(err, ScriptError::internal("x is undefined"));
    }

    #[test]
    fn from_value_without_message_uses_json_text() {
        let err = ScriptError::from_value(&json!({ "code": 7 }), PRE_USER_REGISTRATION_ERROR);
        assert_eq!(err.message(), r#"{"code":7}"#);

        let err = ScriptError::from_value(&json!(42), PRE_USER_REGISTRATION_ERROR);
        assert_eq!(err.message(), "42");
    }

    #[test]
    fn recognize_downgrades_foreign_domain_errors() {
        let err = ScriptError::domain("SomethingElse", "leaky").recognize(PRE_USER_REGISTRATION_ERROR);
        assert_eq!(err, ScriptError::internal("leaky"));

        let err = ScriptError::pre_user_registration("m", "f").recognize(PRE_USER_REGISTRATION_ERROR);
        assert!(err.is_domain());
    }

    #[test]
    fn closures_are_extension_fns() {
        let f = |_: Value, _: Value, _: Done| -> Result<(), ScriptError> {
            Err(ScriptError::internal("thrown"))
        };
        let (done, _rx) = Done::channel();

        let result = ExtensionFn::call(&f, json!({}), json!({}), done);
        assert_eq!(result, Err(ScriptError::internal("thrown")));
    }
}
