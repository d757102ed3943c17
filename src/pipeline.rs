//! The externally observable unit: one request in, one envelope out.

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{CompilationError, Rejection};
use crate::invocation::Invocation;
use crate::normalize::{Envelope, Normalizer};
use crate::request::InvocationRequest;
use crate::script::{ExtensionFn, ScriptCompiler, ARITY};
use crate::state::Authorized;

/// A compiled script wrapped as a uniform request handler.
///
/// `run` sequences validation, authorization, invocation and normalization
/// and always produces exactly one [`Envelope`]. It never returns an error
/// and never panics because of user code. A pipeline is `Send + Sync` and
/// may serve any number of concurrent runs; runs share no mutable state.
///
/// # Examples
///
/// ```
/// use extension_core::{Done, InvocationRequest, Pipeline, PipelineConfig, ScriptError, Status};
/// use serde_json::{json, Value};
///
/// let pipeline = Pipeline::new(
///     |_user: Value, _context: Value, done: Done| -> Result<(), ScriptError> {
///         done.ok();
///         Ok(())
///     },
///     PipelineConfig::default(),
/// );
///
/// let request = InvocationRequest::new(json!({ "user": {}, "context": { "connection": {} } }));
/// let envelope = tokio::runtime::Builder::new_current_thread()
///     .build()
///     .unwrap()
///     .block_on(pipeline.run(request));
///
/// assert_eq!(envelope.status, Status::Success);
/// assert_eq!(envelope.data, json!({}));
/// ```
#[derive(Clone)]
pub struct Pipeline {
    func: Arc<dyn ExtensionFn>,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    /// Wraps a script function.
    pub fn new(func: impl ExtensionFn + 'static, config: PipelineConfig) -> Self {
        Self::from_arc(Arc::new(func), config)
    }

    /// Wraps an already shared script function.
    pub fn from_arc(func: Arc<dyn ExtensionFn>, config: PipelineConfig) -> Self {
        Self {
            func,
            config: Arc::new(config),
        }
    }

    /// Compiles `source` with `compiler` and wraps the result.
    ///
    /// # Errors
    ///
    /// Returns the compiler's [`CompilationError`]; no pipeline is built.
    pub fn compile<C>(
        compiler: &C,
        source: &str,
        config: PipelineConfig,
    ) -> Result<Self, CompilationError>
    where
        C: ScriptCompiler + ?Sized,
    {
        let func = compiler.compile(source).inspect_err(|err| {
            tracing::warn!(
                extension_point = %config.extension_point(),
                "script compilation failed: {}",
                err.message
            );
        })?;
        Ok(Self::from_arc(func, config))
    }

    /// Number of arguments the wrapped function receives.
    pub fn arity(&self) -> usize {
        ARITY
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one invocation to completion.
    pub async fn run(&self, request: InvocationRequest) -> Envelope {
        let extension_point = self.config.extension_point();
        let normalizer = Normalizer::new(extension_point);

        match self.authorize(request) {
            Ok(invocation) => {
                let outcome = invocation.invoke(self.func.as_ref(), extension_point).await;
                normalizer.normalize(outcome)
            }
            Err(rejection) => Envelope::from(rejection),
        }
    }

    fn authorize(&self, request: InvocationRequest) -> Result<Invocation<Authorized>, Rejection> {
        Invocation::receive(request, &self.config)
            .validate()?
            .authorize(&self.config)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Compiles `source` and runs one request, reporting compile failures as an
/// error envelope.
///
/// # Examples
///
/// ```
/// use extension_core::{run_script, CompilationError, ExtensionFn, InvocationRequest,
///     PipelineConfig, ScriptCompiler};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// struct Broken;
/// impl ScriptCompiler for Broken {
///     fn compile(&self, _: &str) -> Result<Arc<dyn ExtensionFn>, CompilationError> {
///         Err(CompilationError::new("Unexpected token"))
///     }
/// }
///
/// let envelope = tokio::runtime::Builder::new_current_thread()
///     .build()
///     .unwrap()
///     .block_on(run_script(&Broken, "}{", PipelineConfig::default(), InvocationRequest::new(json!({}))));
/// assert_eq!(envelope.message(), Some("Unexpected token"));
/// ```
pub async fn run_script<C>(
    compiler: &C,
    source: &str,
    config: PipelineConfig,
    request: InvocationRequest,
) -> Envelope
where
    C: ScriptCompiler + ?Sized,
{
    match Pipeline::compile(compiler, source, config) {
        Ok(pipeline) => pipeline.run(request).await,
        Err(err) => Envelope::from(Rejection::from(err)),
    }
}
