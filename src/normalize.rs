//! Marshalling invocation outcomes into the canonical `{status, data}` envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Rejection;
use crate::extension::ExtensionPoint;
use crate::invoke::Outcome;
use crate::script::ScriptError;

/// Reported when a script succeeds with something other than an object.
pub const RESULT_NOT_OBJECT: &str = "Extensibility point result is not an object";

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The script completed without an error
    Success,
    /// A stage rejected the request or the script failed
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// The canonical output of every pipeline run.
///
/// `data` is always a JSON object.
///
/// # Examples
///
/// ```
/// use extension_core::{Envelope, Status};
/// use serde_json::json;
///
/// let envelope = Envelope::success(json!({ "user": { "app_metadata": { "foo": 1 } } }));
/// assert_eq!(envelope.status, Status::Success);
/// assert_eq!(
///     serde_json::to_string(&envelope).unwrap(),
///     r#"{"status":"success","data":{"user":{"app_metadata":{"foo":1}}}}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the run succeeded
    pub status: Status,
    /// Result object or error description
    pub data: Value,
}

impl Envelope {
    /// A success envelope. `null` becomes an empty object.
    pub fn success(data: Value) -> Self {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            status: Status::Success,
            data,
        }
    }

    /// An error envelope carrying only a message.
    pub fn error_message(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("message".to_owned(), Value::String(message.into()));
        Self {
            status: Status::Error,
            data: Value::Object(data),
        }
    }

    /// An error envelope for a script failure.
    ///
    /// Domain errors report `name`, `message` and `friendlyMessage` (when
    /// supplied); internal errors report only `message`.
    pub fn script_error(error: &ScriptError) -> Self {
        match error {
            ScriptError::Domain {
                name,
                message,
                friendly_message,
            } => {
                let mut data = Map::new();
                data.insert("name".to_owned(), Value::String(name.clone()));
                data.insert("message".to_owned(), Value::String(message.clone()));
                if let Some(friendly) = friendly_message {
                    data.insert("friendlyMessage".to_owned(), Value::String(friendly.clone()));
                }
                Self {
                    status: Status::Error,
                    data: Value::Object(data),
                }
            }
            ScriptError::Internal { message } => Self::error_message(message.as_str()),
        }
    }

    /// Whether the status is `success`.
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// `data.message`, if present.
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

impl From<&Rejection> for Envelope {
    fn from(rejection: &Rejection) -> Self {
        Envelope::error_message(rejection.message.as_str())
    }
}

impl From<Rejection> for Envelope {
    fn from(rejection: Rejection) -> Self {
        Envelope::error_message(rejection.message)
    }
}

/// Turns outcomes into envelopes for one extension point.
///
/// Domain errors only count as such when their name matches the extension
/// point's domain error; other names are reported as internal errors.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    extension_point: ExtensionPoint,
}

impl Normalizer {
    /// Creates a normalizer for `extension_point`.
    pub fn new(extension_point: ExtensionPoint) -> Self {
        Self { extension_point }
    }

    /// Builds the envelope for `outcome`.
    pub fn normalize(&self, outcome: Outcome) -> Envelope {
        match outcome {
            Outcome::NoResult => Envelope::success(Value::Null),
            Outcome::Success(result @ (Value::Object(_) | Value::Null)) => Envelope::success(result),
            Outcome::Success(_) => Envelope::error_message(RESULT_NOT_OBJECT),
            Outcome::Failed(error) => {
                let error = error.recognize(self.extension_point.domain_error_name());
                Envelope::script_error(&error)
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(ExtensionPoint::PRE_USER_REGISTRATION)
    }
}

/// Normalizes `outcome` for the pre-user-registration extension point.
///
/// # Examples
///
/// ```
/// use extension_core::{normalize, Outcome, ScriptError};
///
/// let envelope = normalize(Outcome::Failed(ScriptError::internal("boom")));
/// assert_eq!(envelope.message(), Some("boom"));
/// assert!(envelope.data.get("name").is_none());
/// ```
pub fn normalize(outcome: Outcome) -> Envelope {
    Normalizer::default().normalize(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RejectionKind;
    use serde_json::json;

    #[test]
    fn no_result_is_empty_success() {
        let envelope = normalize(Outcome::NoResult);
        assert_eq!(envelope.status, Status::Success);
        assert_eq!(envelope.data, json!({}));
    }

    #[test]
    fn null_result_defaults_to_empty_object() {
        assert_eq!(normalize(Outcome::Success(Value::Null)).data, json!({}));
    }

    #[test]
    fn user_metadata_passes_through() {
        let result = json!({
            "user": { "app_metadata": { "foo": 1 }, "user_metadata": { "bar": 2 } }
        });
        let envelope = normalize(Outcome::Success(result.clone()));

        assert!(envelope.is_success());
        assert_eq!(envelope.data, result);
        assert_eq!(envelope.data["user"]["app_metadata"]["foo"], 1);
        assert_eq!(envelope.data["user"]["user_metadata"]["bar"], 2);
    }

    #[test]
    fn scalar_result_is_an_error() {
        let envelope = normalize(Outcome::Success(json!("not an object")));
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.message(), Some(RESULT_NOT_OBJECT));
    }

    #[test]
    fn domain_error_reports_all_fields() {
        let envelope = normalize(Outcome::Failed(ScriptError::pre_user_registration(
            "message",
            "friendly message",
        )));

        assert_eq!(envelope.status, Status::Error);
        assert_eq!(
            envelope.data,
            json!({
                "name": "PreUserRegistrationError",
                "message": "message",
                "friendlyMessage": "friendly message"
            })
        );
    }

    #[test]
    fn domain_error_without_friendly_message_omits_it() {
        let envelope = normalize(Outcome::Failed(ScriptError::domain(
            "PreUserRegistrationError",
            "message",
        )));
        assert!(envelope.data.get("friendlyMessage").is_none());
    }

    #[test]
    fn internal_error_reports_only_message() {
        let envelope = normalize(Outcome::Failed(ScriptError::internal("db down")));
        assert_eq!(envelope.data, json!({ "message": "db down" }));
    }

    #[test]
    fn foreign_domain_error_is_internal() {
        let envelope = normalize(Outcome::Failed(ScriptError::domain("RangeError", "oops")));
        assert_eq!(envelope.data, json!({ "message": "oops" }));
    }

    #[test]
    fn rejection_becomes_message_envelope() {
        let envelope = Envelope::from(Rejection::new(RejectionKind::Validation, "bad"));
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.data, json!({ "message": "bad" }));
    }

    #[test]
    fn host_parses_wire_envelope() {
        let wire = r#"{"status":"error","data":{"name":"PreUserRegistrationError","message":"message","friendlyMessage":"friendly message"}}"#;
        let parsed: Envelope = serde_json::from_str(wire).unwrap();
        let produced = normalize(Outcome::Failed(ScriptError::pre_user_registration(
            "message",
            "friendly message",
        )));

        assert_eq!(parsed, produced);
        assert_eq!(parsed.message(), Some("message"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let wire = r#"{"status":"pending","data":{}}"#;
        assert!(serde_json::from_str::<Envelope>(wire).is_err());
    }

    #[test]
    fn serializes_lowercase_status() {
        let json = serde_json::to_string(&Envelope::error_message("x")).unwrap();
        assert_eq!(json, r#"{"status":"error","data":{"message":"x"}}"#);
    }
}
