//! Pipeline configuration.

use serde::Deserialize;

use crate::error::Error;
use crate::extension::ExtensionPoint;
use crate::secret::Secret;

/// Builder-style configuration for a [`Pipeline`](crate::Pipeline).
///
/// By default the pipeline serves the pre-user-registration extension point,
/// reads its secret from the request's `secrets` map, and lets requests
/// through when no secret is configured at all.
///
/// # Examples
///
/// ```
/// use extension_core::{PipelineConfig, Secret};
///
/// let config = PipelineConfig::default()
///     .with_secret(Secret::new("foo".to_string()))
///     .with_require_secret(true);
/// assert!(config.require_secret());
///
/// let config = PipelineConfig::from_json(r#"{ "require_secret": true }"#).unwrap();
/// assert!(config.require_secret());
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    extension_point: ExtensionPoint,
    secret: Option<Secret<String>>,
    require_secret: bool,
}

impl PipelineConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed, names an
    /// unknown extension point, or carries unknown fields.
    pub fn from_json(document: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(document)?)
    }

    /// Serve a different extension point.
    #[must_use]
    pub fn with_extension_point(mut self, extension_point: ExtensionPoint) -> Self {
        self.extension_point = extension_point;
        self
    }

    /// Use an explicit secret instead of the one delivered with each request.
    #[must_use]
    pub fn with_secret(mut self, secret: Secret<String>) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Deny requests when no secret is configured anywhere.
    #[must_use]
    pub fn with_require_secret(mut self, required: bool) -> Self {
        self.require_secret = required;
        self
    }

    /// The extension point served.
    pub fn extension_point(&self) -> ExtensionPoint {
        self.extension_point
    }

    /// The explicit secret, if any.
    pub fn secret(&self) -> Option<&Secret<String>> {
        self.secret.as_ref()
    }

    /// Whether a missing secret denies requests.
    pub fn require_secret(&self) -> bool {
        self.require_secret
    }
}
