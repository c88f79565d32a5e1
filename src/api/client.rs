use crate::api::http::HttpBackend;
use crate::config::Config;
use crate::error::ServiceError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// One call to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub instruction: String,
    pub model: String,
    pub temperature: f32,
}

/// Transport seam behind [`GenerationClient`]; the HTTP backend and the scripted mock implement it.
pub trait GenerationBackend: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, ServiceError>>;
}

/// Immutable view of one configuration snapshot. Rebuild to change settings.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Option<Arc<dyn GenerationBackend>>,
    model: String,
    temperature: f32,
}

impl fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationClient")
            .field("ready", &self.is_ready())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GenerationClient {
    /// Never fails; a bad key or a failed transport init yields a client that is not ready.
    pub fn new(config: &Config) -> Self {
        if !config.has_usable_key() {
            tracing::warn!("generation client not configured: missing or placeholder API key");
            return Self::unconfigured(config);
        }

        match HttpBackend::new(config) {
            Ok(backend) => {
                tracing::info!(
                    model = config.effective_model(),
                    protocol = ?backend.protocol(),
                    "generation client initialized"
                );
                Self::ready(config, Arc::new(backend))
            }
            Err(error) => {
                tracing::error!(%error, "failed to initialize generation client");
                Self::unconfigured(config)
            }
        }
    }

    /// Uses `backend` as the transport; readiness still requires a usable key.
    pub fn with_backend(config: &Config, backend: Arc<dyn GenerationBackend>) -> Self {
        if config.has_usable_key() {
            Self::ready(config, backend)
        } else {
            Self::unconfigured(config)
        }
    }

    fn ready(config: &Config, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
            model: config.effective_model().to_string(),
            temperature: config.effective_temperature(),
        }
    }

    fn unconfigured(config: &Config) -> Self {
        Self {
            backend: None,
            model: config.effective_model().to_string(),
            temperature: config.effective_temperature(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Runs one round trip. Callers run this off the control context.
    pub async fn generate(&self, instruction: &str) -> Result<String, ServiceError> {
        let Some(backend) = &self.backend else {
            return Err(ServiceError::new("generation client is not configured"));
        };

        let request = GenerationRequest {
            instruction: instruction.to_string(),
            model: self.model.clone(),
            temperature: self.temperature,
        };
        backend.generate(request).await
    }
}
