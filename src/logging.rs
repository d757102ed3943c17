use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::extension::ExtensionPoint;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a process-unique request id of the form `ext-<n>`.
pub(crate) fn next_request_id() -> String {
    format!("ext-{}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
}

/// Structured logger scoped to one pipeline run.
///
/// Every event carries `request_id` and `extension_point` fields. Never pass
/// secret material here unwrapped; `Secret` values redact themselves.
#[derive(Debug, Clone)]
pub struct InvocationLog {
    request_id: String,
    extension_point: ExtensionPoint,
}

impl InvocationLog {
    pub(crate) fn new(request_id: String, extension_point: ExtensionPoint) -> Self {
        Self {
            request_id,
            extension_point,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Logs an info-level message.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(
            request_id = %self.request_id,
            extension_point = %self.extension_point,
            "{}",
            args
        );
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(
            request_id = %self.request_id,
            extension_point = %self.extension_point,
            "{}",
            args
        );
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(
            request_id = %self.request_id,
            extension_point = %self.extension_point,
            "{}",
            args
        );
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(
            request_id = %self.request_id,
            extension_point = %self.extension_point,
            "{}",
            args
        );
    }
}
