use std::collections::HashMap;

use crate::error::Rejection;
use crate::secret::Secret;

/// Message for every authorization failure.
pub const UNAUTHORIZED: &str = "Unauthorized extensibility point";

/// Header carrying the bearer credential. Lookup is case-sensitive.
pub const AUTHORIZATION_HEADER: &str = "authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// Shared-secret check for an extension point.
///
/// With no secret configured every request is allowed unless
/// [`require_secret`](Self::require_secret) was called. With a secret, the
/// request must carry `authorization: Bearer <token>` where `<token>` equals
/// the secret exactly.
///
/// # Examples
///
/// ```
/// use extension_core::{Authorizer, Secret};
/// use std::collections::HashMap;
///
/// let secret = Secret::new("foo".to_string());
/// let mut headers = HashMap::new();
/// headers.insert("authorization".to_string(), "Bearer foo".to_string());
///
/// assert!(Authorizer::new(Some(&secret)).check(&headers).is_ok());
/// assert!(Authorizer::new(Some(&secret)).check(&HashMap::new()).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Authorizer<'a> {
    secret: Option<&'a Secret<String>>,
    require_secret: bool,
}

impl<'a> Authorizer<'a> {
    /// Creates an authorizer for the configured secret, if any.
    pub fn new(secret: Option<&'a Secret<String>>) -> Self {
        Self {
            secret,
            require_secret: false,
        }
    }

    /// Denies every request when no secret is configured.
    pub fn require_secret(mut self, required: bool) -> Self {
        self.require_secret = required;
        self
    }

    /// Decides whether the request may reach the user script.
    ///
    /// # Errors
    ///
    /// Returns an authorization [`Rejection`] with [`UNAUTHORIZED`] when the
    /// credential is missing, malformed or wrong, or when a secret is
    /// required but none is configured.
    pub fn check(&self, headers: &HashMap<String, String>) -> Result<(), Rejection> {
        let Some(secret) = self.secret else {
            if self.require_secret {
                return Err(Rejection::authorization(UNAUTHORIZED));
            }
            return Ok(());
        };

        let token = headers
            .get(AUTHORIZATION_HEADER)
            .map(String::as_str)
            .and_then(bearer_token)
            .ok_or_else(|| Rejection::authorization(UNAUTHORIZED))?;

        if secret.matches(token) {
            Ok(())
        } else {
            Err(Rejection::authorization(UNAUTHORIZED))
        }
    }
}

/// Checks `headers` against `secret` with the default (bypass when unset) policy.
///
/// # Errors
///
/// See [`Authorizer::check`].
pub fn authorize(
    headers: &HashMap<String, String>,
    secret: Option<&Secret<String>>,
) -> Result<(), Rejection> {
    Authorizer::new(secret).check(headers)
}

fn bearer_token(value: &str) -> Option<&str> {
    value.strip_prefix(BEARER_PREFIX)
}
