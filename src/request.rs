use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::secret::Secret;

/// Header used to correlate log lines with the caller's request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP method the extension point was invoked with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    #[default]
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// Any other method, kept verbatim
    Other(String),
}

impl HttpMethod {
    /// Parses a method name case-insensitively.
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            _ => HttpMethod::Other(method.to_owned()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Other(method) => f.write_str(method),
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let method = String::deserialize(deserializer)?;
        Ok(HttpMethod::parse(&method))
    }
}

/// An inbound invocation: `{ body, headers, secrets?, method }`.
///
/// Everything in here is caller-controlled. The body stays raw until the
/// validator has looked at it, and secrets are redacted in `Debug` output.
///
/// A missing `body` is treated as an empty object; an explicit `null` body
/// is kept so the validator can reject it.
///
/// # Examples
///
/// ```
/// use extension_core::InvocationRequest;
/// use serde_json::json;
///
/// let request = InvocationRequest::new(json!({ "user": {} }))
///     .with_header("authorization", "Bearer foo")
///     .with_secret("auth0-extension-secret", "foo");
/// assert!(format!("{:?}", request).contains("[REDACTED]"));
///
/// let request = InvocationRequest::from_value(json!({
///     "body": { "user": {}, "context": { "connection": {} } },
///     "headers": {},
///     "method": "POST"
/// }))
/// .unwrap();
/// assert_eq!(request.method().to_string(), "POST");
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct InvocationRequest {
    #[serde(default, deserialize_with = "present")]
    body: Option<Value>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    secrets: HashMap<String, Secret<String>>,
    #[serde(default)]
    method: HttpMethod,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl InvocationRequest {
    /// Creates a `POST` request with the given body and no headers or secrets.
    pub fn new(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    /// Parses a raw request value.
    ///
    /// # Errors
    ///
    /// Fails when `headers` or `secrets` are not string maps or `method` is
    /// not a string. The body itself is never rejected here.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds a secret delivered alongside the request.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), Secret::new(value.into()));
        self
    }

    /// Sets the method.
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// The raw body, `None` when it was absent.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Request headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The invocation method.
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// The caller-supplied request id, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(REQUEST_ID_HEADER).map(String::as_str)
    }

    /// Removes and returns the secret stored under `name`.
    pub(crate) fn take_secret(&mut self, name: &str) -> Option<Secret<String>> {
        self.secrets.remove(name)
    }

    /// Splits into the raw body (absent becomes `{}`) and the headers.
    pub(crate) fn into_body_and_headers(self) -> (Value, HashMap<String, String>) {
        let body = self
            .body
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        (body, self.headers)
    }
}
