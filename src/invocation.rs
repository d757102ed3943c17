use crate::authorize::Authorizer;
use crate::error::Rejection;
use crate::invoke::{invoke, Outcome};
use crate::logging::{next_request_id, InvocationLog};
use crate::request::InvocationRequest;
use crate::script::ExtensionFn;
use crate::state::{Authorized, Received, Validated};
use crate::tainted::Tainted;
use crate::validate::{validate, ValidatedBody};
use crate::{ExtensionPoint, PipelineConfig};

/// One pipeline run, tracked through its stages at compile time.
///
/// ```text
/// Invocation<Received> --validate--> Invocation<Validated>
///     --authorize--> Invocation<Authorized> --invoke--> Outcome
/// ```
///
/// Each transition either advances the state or returns the [`Rejection`]
/// that ends the run. No stage can be skipped or revisited.
///
/// # Examples
///
/// ```
/// use extension_core::{Invocation, InvocationRequest, PipelineConfig};
/// use serde_json::json;
///
/// let config = PipelineConfig::default();
/// let request = InvocationRequest::new(json!({ "user": "bad user" }));
///
/// let err = Invocation::receive(request, &config).validate().unwrap_err();
/// assert_eq!(err.message, "Body.user received by extensibility point is not an object");
/// ```
#[derive(Debug)]
pub struct Invocation<S = Received> {
    log: InvocationLog,
    state: S,
}

impl<S> Invocation<S> {
    /// The logger for this run.
    pub fn log(&self) -> &InvocationLog {
        &self.log
    }

    /// The request id for this run.
    pub fn request_id(&self) -> &str {
        self.log.request_id()
    }
}

impl Invocation<Received> {
    /// Starts a run for `request`.
    ///
    /// The secret delivered with the request under the extension point's
    /// secret name is moved out of the request here.
    pub fn receive(mut request: InvocationRequest, config: &PipelineConfig) -> Self {
        let extension_point = config.extension_point();
        let request_id = request
            .request_id()
            .map_or_else(next_request_id, str::to_owned);
        let log = InvocationLog::new(request_id, extension_point);

        log.debug(format_args!("received {} invocation", request.method()));

        let request_secret = request.take_secret(extension_point.secret_name());
        let (body, headers) = request.into_body_and_headers();

        Self {
            log,
            state: Received {
                body: Tainted::new(body),
                headers,
                request_secret,
            },
        }
    }

    /// Checks the body shape.
    ///
    /// # Errors
    ///
    /// Returns a validation [`Rejection`]; see [`validate`].
    pub fn validate(self) -> Result<Invocation<Validated>, Rejection> {
        let Received {
            body,
            headers,
            request_secret,
        } = self.state;

        let body = validate(body).inspect_err(|rejection| {
            self.log.warn(format_args!("{rejection}"));
        })?;
        self.log.debug(format_args!("request body validated"));

        Ok(Invocation {
            log: self.log,
            state: Validated {
                body,
                headers,
                request_secret,
            },
        })
    }
}

impl Invocation<Validated> {
    /// The validated body.
    pub fn body(&self) -> &ValidatedBody {
        &self.state.body
    }

    /// Checks the bearer credential.
    ///
    /// An explicit secret in `config` takes precedence over the one delivered
    /// with the request.
    ///
    /// # Errors
    ///
    /// Returns an authorization [`Rejection`]; see [`Authorizer::check`].
    pub fn authorize(self, config: &PipelineConfig) -> Result<Invocation<Authorized>, Rejection> {
        let Validated {
            body,
            headers,
            request_secret,
        } = self.state;

        let secret = config.secret().or(request_secret.as_ref());
        Authorizer::new(secret)
            .require_secret(config.require_secret())
            .check(&headers)
            .inspect_err(|rejection| {
                if secret.is_none() {
                    self.log.warn(format_args!(
                        "{rejection} (no extension secret configured but one is required)"
                    ));
                } else {
                    self.log.warn(format_args!("{rejection}"));
                }
            })?;
        self.log.debug(format_args!(
            "invocation authorized (secret configured: {})",
            secret.is_some()
        ));

        Ok(Invocation {
            log: self.log,
            state: Authorized { body },
        })
    }
}

impl Invocation<Authorized> {
    /// The validated body about to be handed to user code.
    pub fn body(&self) -> &ValidatedBody {
        &self.state.body
    }

    /// Runs the user script and waits for its single outcome.
    pub async fn invoke(self, func: &dyn ExtensionFn, extension_point: ExtensionPoint) -> Outcome {
        let (user, context) = self.state.body.into_parts();
        let outcome = invoke(func, user, context).await;

        match &outcome {
            Outcome::NoResult | Outcome::Success(_) => {
                self.log.debug(format_args!("extensibility point completed"));
            }
            Outcome::Failed(error) if error.name() == Some(extension_point.domain_error_name()) => {
                self.log
                    .info(format_args!("extensibility point raised {error}"));
            }
            Outcome::Failed(error) => {
                self.log
                    .error(format_args!("extensibility point failed: {error}"));
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CapturedLogs;
    use crate::{Done, RejectionKind, ScriptError, Secret};
    use serde_json::{json, Value};

    fn valid_request() -> InvocationRequest {
        InvocationRequest::new(json!({ "user": {}, "context": { "connection": {} } }))
    }

    #[test]
    fn request_id_from_header_is_used() {
        let request = valid_request().with_header("x-request-id", "req-abc");
        let invocation = Invocation::receive(request, &PipelineConfig::default());
        assert_eq!(invocation.request_id(), "req-abc");
    }

    #[test]
    fn request_id_is_generated_when_absent() {
        let invocation = Invocation::receive(valid_request(), &PipelineConfig::default());
        assert!(invocation.request_id().starts_with("ext-"));
    }

    #[test]
    fn full_state_progression() {
        let config = PipelineConfig::default();
        let authorized = Invocation::receive(valid_request(), &config)
            .validate()
            .unwrap()
            .authorize(&config)
            .unwrap();

        assert!(authorized.body().context()["connection"].is_object());
    }

    #[test]
    fn request_secret_is_enforced() {
        let config = PipelineConfig::default();
        let request = valid_request().with_secret("auth0-extension-secret", "foo");

        let err = Invocation::receive(request, &config)
            .validate()
            .unwrap()
            .authorize(&config)
            .unwrap_err();

        assert_eq!(err.kind, RejectionKind::Authorization);
    }

    #[test]
    fn required_secret_denial_is_logged_once_with_run_fields() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let config = PipelineConfig::default().with_require_secret(true);
        let request = valid_request().with_header("x-request-id", "req-denied");
        let err = Invocation::receive(request, &config)
            .validate()
            .unwrap()
            .authorize(&config)
            .unwrap_err();
        assert_eq!(err.kind, RejectionKind::Authorization);

        let warnings: Vec<String> = logs
            .lines()
            .into_iter()
            .filter(|line| line.contains("WARN"))
            .collect();
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("no extension secret configured"));
        assert!(warnings[0].contains("request_id=req-denied"));
        assert!(warnings[0].contains("extension_point="));
    }

    #[test]
    fn config_secret_wins_over_request_secret() {
        let config = PipelineConfig::default().with_secret(Secret::new("config".to_string()));
        let request = valid_request()
            .with_secret("auth0-extension-secret", "request")
            .with_header("authorization", "Bearer config");

        let result = Invocation::receive(request, &config)
            .validate()
            .unwrap()
            .authorize(&config);

        assert!(result.is_ok());
    }

    #[test]
    fn validation_runs_before_authorization() {
        let config = PipelineConfig::default();
        let request = InvocationRequest::new(json!("no good"))
            .with_secret("auth0-extension-secret", "foo");

        let err = Invocation::receive(request, &config).validate().unwrap_err();
        assert_eq!(err.kind, RejectionKind::Validation);
    }

    #[tokio::test]
    async fn invoke_passes_validated_parts() {
        let config = PipelineConfig::default();
        let request = InvocationRequest::new(json!({ "user": { "id": 7 } }));
        let authorized = Invocation::receive(request, &config)
            .validate()
            .unwrap()
            .authorize(&config)
            .unwrap();

        let script = |user: Value, context: Value, done: Done| -> Result<(), ScriptError> {
            done.success(json!({ "seen": [user, context] }));
            Ok(())
        };
        let outcome = authorized.invoke(&script, config.extension_point()).await;

        assert_eq!(
            outcome,
            Outcome::Success(json!({ "seen": [{ "id": 7 }, { "connection": {} }] }))
        );
    }
}
