//! Structural validation of inbound request bodies.
//!
//! The checks run in a fixed order and the first failure wins. The four
//! messages are part of the external contract; callers match on them.

use serde_json::{Map, Value};

use crate::error::Rejection;
use crate::tainted::Tainted;

/// Message for a body that is not a JSON object.
pub const BODY_NOT_OBJECT: &str = "Body received by extensibility point is not an object";
/// Message for a `body.user` that is present but not an object.
pub const USER_NOT_OBJECT: &str = "Body.user received by extensibility point is not an object";
/// Message for a `body.context` that is present but not an object.
pub const CONTEXT_NOT_OBJECT: &str =
    "Body.context received by extensibility point is not an object";
/// Message for a `body.context.connection` that is present but not an object.
pub const CONNECTION_NOT_OBJECT: &str =
    "Body.context.connection received by extensibility point is not an object";

/// A request body that passed structural validation.
///
/// Can only be produced by [`validate`]. Absent fields have already been
/// replaced with empty objects, and `context.connection` is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBody {
    user: Map<String, Value>,
    context: Map<String, Value>,
}

impl ValidatedBody {
    /// The primary record.
    pub fn user(&self) -> &Map<String, Value> {
        &self.user
    }

    /// The invocation context, including `connection`.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Splits into owned `(user, context)` values for the invoker.
    pub fn into_parts(self) -> (Value, Value) {
        (Value::Object(self.user), Value::Object(self.context))
    }
}

/// Checks the shape of a request body.
///
/// # Errors
///
/// Returns a validation [`Rejection`] carrying one of [`BODY_NOT_OBJECT`],
/// [`USER_NOT_OBJECT`], [`CONTEXT_NOT_OBJECT`] or [`CONNECTION_NOT_OBJECT`].
///
/// # Examples
///
/// ```
/// use extension_core::{validate, Tainted};
/// use serde_json::json;
///
/// let body = validate(Tainted::new(json!({ "user": { "email": "a@b.c" } }))).unwrap();
/// assert_eq!(body.user()["email"], "a@b.c");
/// assert!(body.context()["connection"].is_object());
///
/// let err = validate(Tainted::new(json!("no good"))).unwrap_err();
/// assert_eq!(err.message, "Body received by extensibility point is not an object");
/// ```
pub fn validate(body: Tainted<Value>) -> Result<ValidatedBody, Rejection> {
    check_shape(body.peek())?;

    // Shape is known-good from here on.
    let mut body = match body.into_inner() {
        Value::Object(map) => map,
        _ => return Err(Rejection::validation(BODY_NOT_OBJECT)),
    };

    let user = take_object(&mut body, "user");
    let mut context = take_object(&mut body, "context");
    context
        .entry("connection")
        .or_insert_with(|| Value::Object(Map::new()));

    Ok(ValidatedBody { user, context })
}

fn check_shape(body: &Value) -> Result<(), Rejection> {
    let body = body
        .as_object()
        .ok_or_else(|| Rejection::validation(BODY_NOT_OBJECT))?;

    if !optional_object(body.get("user")) {
        return Err(Rejection::validation(USER_NOT_OBJECT));
    }

    let Some(context) = body.get("context") else {
        return Ok(());
    };
    let context = context
        .as_object()
        .ok_or_else(|| Rejection::validation(CONTEXT_NOT_OBJECT))?;

    if !optional_object(context.get("connection")) {
        return Err(Rejection::validation(CONNECTION_NOT_OBJECT));
    }

    Ok(())
}

fn optional_object(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_object)
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(body: Value) -> String {
        validate(Tainted::new(body)).unwrap_err().message
    }

    #[test]
    fn accepts_full_body() {
        let body = validate(Tainted::new(json!({
            "user": { "email": "jane@example.com" },
            "context": { "connection": { "name": "db" }, "ip": "10.0.0.1" }
        })))
        .unwrap();

        assert_eq!(body.user()["email"], "jane@example.com");
        assert_eq!(body.context()["connection"]["name"], "db");
        assert_eq!(body.context()["ip"], "10.0.0.1");
    }

    #[test]
    fn defaults_absent_fields_to_empty_objects() {
        let (user, context) = validate(Tainted::new(json!({}))).unwrap().into_parts();

        assert_eq!(user, json!({}));
        assert_eq!(context, json!({ "connection": {} }));
    }

    #[test]
    fn rejects_non_object_bodies() {
        for body in [json!("no good"), json!(null), json!(42), json!([]), json!(true)] {
            assert_eq!(message(body), BODY_NOT_OBJECT);
        }
    }

    #[test]
    fn rejects_bad_user() {
        assert_eq!(
            message(json!({ "user": "bad user", "context": { "connection": {} } })),
            USER_NOT_OBJECT
        );
        assert_eq!(message(json!({ "user": null })), USER_NOT_OBJECT);
    }

    #[test]
    fn rejects_bad_context() {
        assert_eq!(
            message(json!({ "user": {}, "context": "bad context" })),
            CONTEXT_NOT_OBJECT
        );
    }

    #[test]
    fn rejects_bad_connection() {
        assert_eq!(
            message(json!({ "user": {}, "context": { "connection": "bad connection" } })),
            CONNECTION_NOT_OBJECT
        );
    }

    #[test]
    fn first_failure_wins() {
        assert_eq!(
            message(json!({ "user": 1, "context": { "connection": 2 } })),
            USER_NOT_OBJECT
        );
        assert_eq!(
            message(json!({ "user": {}, "context": [] })),
            CONTEXT_NOT_OBJECT
        );
    }

    #[test]
    fn rejection_kind_is_validation() {
        let err = validate(Tainted::new(json!(1))).unwrap_err();
        assert_eq!(err.kind, crate::RejectionKind::Validation);
    }

    mod proptests {
        use super::*;
        use crate::test_utils::{arb_json_leaf, arb_object};
        use proptest::prelude::*;

        proptest! {
            /// Property: any scalar body is rejected with the body message
            #[test]
            fn proptest_scalar_body_rejected(body in arb_json_leaf()) {
                prop_assert_eq!(message(body), BODY_NOT_OBJECT);
            }

            /// Property: user fields survive validation untouched
            #[test]
            fn proptest_user_passes_through(user in arb_object()) {
                let body = validate(Tainted::new(json!({ "user": user.clone() }))).unwrap();
                prop_assert_eq!(Value::Object(body.user().clone()), user);
            }
        }
    }
}
