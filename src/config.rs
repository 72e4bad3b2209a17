//! Configuration for the streaming analysis client.
//!
//! All client behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across calls and to diff two runs to understand
//! why their outputs differ.
//!
//! The API key is the one secret: it can be injected explicitly or resolved
//! from `GEMINI_API_KEY` / `API_KEY` at call time, and the custom `Debug`
//! implementation redacts it so configs are safe to log.

use crate::error::AnalyzeError;
use std::fmt;

/// Default model, the vision-capable flash tier.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Default API endpoint base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Configuration for one analysis call.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfscribe::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-3-flash-preview")
///     .max_output_tokens(8192)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API endpoint base URL. Default: [`DEFAULT_API_BASE`].
    ///
    /// Overridable so tests and proxies can point the client at a local
    /// server without touching the environment.
    pub api_base: String,

    /// Explicit API key. When `None`, resolved from `GEMINI_API_KEY` then
    /// `API_KEY` at call time, so a rotated credential takes effect on the
    /// next submission without restarting the process.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what is on the page,
    /// which is exactly what a transcription wants.
    pub temperature: f32,

    /// Nucleus sampling parameter. Default: 0.95.
    pub top_p: f32,

    /// Cap on generated tokens. `None` leaves the service default in place.
    pub max_output_tokens: Option<u32>,

    /// Custom transcription instruction. `None` uses
    /// [`crate::prompts::DEFAULT_INSTRUCTION`].
    pub instruction: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            temperature: 0.1,
            top_p: 0.95,
            max_output_tokens: None,
            instruction: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("instruction", &self.instruction.as_deref().map(|_| "<custom>"))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the API key: explicit config first, then environment.
    pub(crate) fn resolve_api_key(&self) -> Result<String, AnalyzeError> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        for var in ["GEMINI_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }
        Err(AnalyzeError::MissingApiKey)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzeError> {
        let c = &self.config;
        if c.model.is_empty() {
            return Err(AnalyzeError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_base.is_empty() {
            return Err(AnalyzeError::InvalidConfig(
                "api_base must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deterministic_generation() {
        let config = AnalysisConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.top_p, 0.95);
        assert!(config.max_output_tokens.is_none());
    }

    #[test]
    fn builder_clamps_sampling_parameters() {
        let config = AnalysisConfig::builder()
            .temperature(5.0)
            .top_p(2.0)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.top_p, 1.0);
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = AnalysisConfig::builder().model("").build().unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidConfig(_)));
    }

    #[test]
    fn explicit_api_key_wins() {
        let config = AnalysisConfig::builder().api_key("sk-test").build().unwrap();
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AnalysisConfig::builder().api_key("sk-secret").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
