//! Configuration types for business-card extraction.
//!
//! Every knob lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The config carries the client credentials
//! indirectly (a pre-built provider or a provider name resolved from the
//! environment) so the batch itself never reads ambient state.

use crate::error::Card2CsvError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for a business-card extraction batch.
///
/// # Example
/// ```rust
/// use edgequake_card2csv::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.retries, 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier. Default: `gpt-4o-mini`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per card. Default: 1024.
    pub max_tokens: usize,

    /// Extra round trips after the first failed one. Default: 1 (two attempts total).
    ///
    /// A retry repeats the whole request, not just the parse. There is no
    /// delay between attempts.
    pub retries: u32,

    /// JPEG quality used by the image normaliser. Range: 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Custom system prompt. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Receives per-file events while the batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            retries: 1,
            jpeg_quality: 95,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retries", &self.retries)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("system_prompt", &self.system_prompt.is_some())
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Total round trips allowed per card.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retries(mut self, n: u32) -> Self {
        self.config.retries = n;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Card2CsvError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(Card2CsvError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if !c.temperature.is_finite() {
            return Err(Card2CsvError::InvalidConfig(
                "Temperature must be a finite number".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Card2CsvError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(Card2CsvError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_retry_deterministic_setup() {
        let c = ExtractionConfig::default();
        assert_eq!(c.model, "gpt-4o-mini");
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.retries, 1);
        assert_eq!(c.max_attempts(), 2);
        assert_eq!(c.jpeg_quality, 95);
    }

    #[test]
    fn builder_rejects_zero_quality() {
        let err = ExtractionConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(err.to_string().contains("JPEG quality"), "got: {err}");
    }

    #[test]
    fn builder_rejects_quality_above_100() {
        assert!(ExtractionConfig::builder().jpeg_quality(101).build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ExtractionConfig::builder().temperature(7.5).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_blank_model() {
        assert!(ExtractionConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn max_attempts_saturates() {
        let c = ExtractionConfig::builder().retries(u32::MAX).build().unwrap();
        assert_eq!(c.max_attempts(), u32::MAX);
    }

    #[test]
    fn debug_hides_prompt_text() {
        let c = ExtractionConfig::builder()
            .system_prompt("secret persona")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret persona"));
    }
}
