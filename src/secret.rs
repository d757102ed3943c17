use std::fmt;

use serde::{Deserialize, Deserializer};

/// A shared secret that never shows up in formatted output.
///
/// The extension point secret is compared against bearer credentials on every
/// invocation, which puts it right next to request data that gets logged.
/// `Secret<T>` keeps it out of `Debug`/`Display` output; the value is only
/// reachable through [`expose_secret`](Self::expose_secret) or compared in
/// place through [`matches`](Secret::matches).
///
/// # Examples
///
/// ```
/// use extension_core::Secret;
///
/// let secret = Secret::new("shh".to_string());
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert!(secret.matches("shh"));
/// ```
// Do NOT derive Clone, Copy, Serialize or Default.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// Callers must not log or display the returned reference.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: AsRef<str>> Secret<T> {
    /// Exact string comparison against a presented credential.
    ///
    /// Equal-length inputs are compared over every byte, so the time taken
    /// does not depend on where the first difference is.
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq(self.inner.as_ref().as_bytes(), presented.as_bytes())
    }
}

fn constant_time_eq(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }

    let diff = expected
        .iter()
        .zip(presented)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b));
    diff == 0
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Secret::new)
    }
}
