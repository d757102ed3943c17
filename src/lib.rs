//! Invocation pipeline for callback-style extensibility point scripts.
//!
//! A user script of the shape `(user, context, done)` is wrapped into a
//! [`Pipeline`] that, for every request:
//! - **Validates** the body shape (`body`, `body.user`, `body.context`,
//!   `body.context.connection` must be objects when present)
//! - **Authorizes** the caller against a shared secret (`Bearer <token>`)
//! - **Invokes** the script, honoring only its first completion
//! - **Normalizes** whatever happened into a `{status, data}` [`Envelope`]
//!
//! The first failing stage short-circuits the rest, and the pipeline never
//! fails across its public boundary: every run yields exactly one envelope.
//!
//! # Core Types
//!
//! - [`Pipeline`]: The compiled script plus its configuration
//! - [`InvocationRequest`]: Inbound `{ body, headers, secrets?, method }`
//! - [`Done`]: Settle-once completion handle given to scripts
//! - [`ScriptError`]: Domain vs internal errors raised by scripts
//! - [`Envelope`]: Canonical output
//! - [`Invocation`]: Type-state view of a single run, stage by stage
//!
//! # Examples
//!
//! ```
//! use extension_core::{Done, InvocationRequest, Pipeline, PipelineConfig, ScriptError};
//! use serde_json::{json, Value};
//!
//! let pipeline = Pipeline::new(
//!     |_user: Value, _context: Value, done: Done| -> Result<(), ScriptError> {
//!         done.fail(ScriptError::pre_user_registration("message", "friendly message"));
//!         Ok(())
//!     },
//!     PipelineConfig::default(),
//! );
//!
//! let request = InvocationRequest::new(json!({ "user": {}, "context": { "connection": {} } }));
//! let envelope = tokio::runtime::Builder::new_current_thread()
//!     .build()
//!     .unwrap()
//!     .block_on(pipeline.run(request));
//!
//! assert_eq!(envelope.data["name"], "PreUserRegistrationError");
//! assert_eq!(envelope.data["friendlyMessage"], "friendly message");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod authorize;
mod config;
mod error;
mod extension;
mod invocation;
mod invoke;
mod logging;
mod normalize;
mod pipeline;
mod request;
mod script;
mod secret;
pub mod state;
mod tainted;
mod validate;

#[cfg(test)]
mod test_utils;

pub use authorize::{authorize, Authorizer, AUTHORIZATION_HEADER, UNAUTHORIZED};
pub use config::PipelineConfig;
pub use error::{CompilationError, Error, Rejection, RejectionKind};
pub use extension::{ExtensionPoint, EXTENSION_SECRET_NAME};
pub use invocation::Invocation;
pub use invoke::{invoke, Done, Outcome, NO_COMPLETION};
pub use logging::InvocationLog;
pub use normalize::{normalize, Envelope, Normalizer, Status, RESULT_NOT_OBJECT};
pub use pipeline::{run_script, Pipeline};
pub use request::{HttpMethod, InvocationRequest, REQUEST_ID_HEADER};
pub use script::{ExtensionFn, ScriptCompiler, ScriptError, ARITY, PRE_USER_REGISTRATION_ERROR};
pub use secret::Secret;
pub use tainted::Tainted;
pub use validate::{
    validate, ValidatedBody, BODY_NOT_OBJECT, CONNECTION_NOT_OBJECT, CONTEXT_NOT_OBJECT,
    USER_NOT_OBJECT,
};
