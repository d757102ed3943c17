use std::fmt;

/// A value that arrived from outside and has not been shape-checked yet.
///
/// Request bodies enter the pipeline as `Tainted<Value>`. Only the envelope
/// validator can look inside and turn one into a
/// [`ValidatedBody`](crate::ValidatedBody), so user code never receives a body
/// that skipped validation.
///
/// # Examples
///
/// ```
/// use extension_core::Tainted;
/// use serde_json::json;
///
/// let body = Tainted::new(json!({ "user": {} }));
/// assert!(format!("{:?}", body).contains("Tainted"));
/// ```
#[derive(Clone)]
pub struct Tainted<T> {
    // Must stay private: the validator is the only way in.
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Borrows the raw value for inspection by the validator.
    pub(crate) fn peek(&self) -> &T {
        &self.inner
    }

    /// Releases the raw value once validation has passed.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
