use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::script::PRE_USER_REGISTRATION_ERROR;

/// Secret name the pre-user-registration extension point reads from `secrets`.
pub const EXTENSION_SECRET_NAME: &str = "auth0-extension-secret";

/// Identity of an extensibility point.
///
/// Ties together the public name, the key under which the shared secret is
/// delivered, and the name of the domain error its scripts may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionPoint {
    name: &'static str,
    secret_name: &'static str,
    domain_error_name: &'static str,
}

impl ExtensionPoint {
    /// Runs before a user record is created.
    pub const PRE_USER_REGISTRATION: ExtensionPoint = ExtensionPoint {
        name: "pre-user-registration",
        secret_name: EXTENSION_SECRET_NAME,
        domain_error_name: PRE_USER_REGISTRATION_ERROR,
    };

    const KNOWN: &'static [ExtensionPoint] = &[ExtensionPoint::PRE_USER_REGISTRATION];

    /// Looks an extension point up by its public name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN.iter().copied().find(|point| point.name == name)
    }

    /// Public name, e.g. `pre-user-registration`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Key of the shared secret in the request's `secrets` map.
    pub fn secret_name(&self) -> &'static str {
        self.secret_name
    }

    /// Name carried by this extension point's domain errors.
    pub fn domain_error_name(&self) -> &'static str {
        self.domain_error_name
    }
}

impl Default for ExtensionPoint {
    fn default() -> Self {
        Self::PRE_USER_REGISTRATION
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl<'de> Deserialize<'de> for ExtensionPoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        ExtensionPoint::from_name(&name).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown extension point '{name}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_by_name() {
        assert_eq!(
            ExtensionPoint::from_name("pre-user-registration"),
            Some(ExtensionPoint::PRE_USER_REGISTRATION)
        );
        assert_eq!(ExtensionPoint::from_name("post-login"), None);
    }

    #[test]
    fn pre_user_registration_identity() {
        let point = ExtensionPoint::default();
        assert_eq!(point.secret_name(), "auth0-extension-secret");
        assert_eq!(point.domain_error_name(), "PreUserRegistrationError");
        assert_eq!(point.to_string(), "pre-user-registration");
    }

    #[test]
    fn rejects_unknown_names_when_deserializing() {
        let err = serde_json::from_str::<ExtensionPoint>("\"nope\"").unwrap_err();
        assert!(err.to_string().contains("unknown extension point"));
    }
}
