//! VLM interaction: one business card in, one raw reply out.
//!
//! [`CardReader`] is the seam between the batch and the network. The
//! production implementation, [`VisionClient`], sends a single chat request
//! per call; it neither retries nor parses. Both live in
//! [`crate::pipeline::retry`] and [`crate::pipeline::parse`].
//!
//! ## Message Layout
//!
//! 1. **System message** — the extraction persona (or a user-supplied override)
//! 2. **User message** — the field-list instruction plus the card as a
//!    base64 JPEG attachment

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::pipeline::normalize::NormalizedImage;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, USER_INSTRUCTION};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sends a normalised card image to a model and returns its raw text reply.
pub trait CardReader: Send + Sync {
    fn read_card(
        &self,
        image: &NormalizedImage,
    ) -> impl Future<Output = Result<String, ExtractionError>> + Send;
}

/// [`CardReader`] backed by an `edgequake_llm` provider.
pub struct VisionClient {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
}

impl VisionClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_messages(&self, image: &NormalizedImage) -> Vec<ChatMessage> {
        // `detail: high` keeps the small print on cards legible to GPT-4-class models.
        let attachment =
            ImageData::new(image.to_base64(), NormalizedImage::MIME_TYPE).with_detail("high");

        vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images(USER_INSTRUCTION.as_str(), vec![attachment]),
        ]
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl CardReader for VisionClient {
    async fn read_card(&self, image: &NormalizedImage) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let messages = self.build_messages(image);
        let options = self.build_options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractionError::Provider {
                message: e.to_string(),
            })?;

        debug!(
            "Card reply: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::ProviderFactory;

    fn tiny_image() -> NormalizedImage {
        NormalizedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
        }
    }

    fn client(config: &ExtractionConfig) -> Option<VisionClient> {
        // Constructing a provider needs no network; skip when the factory refuses.
        let provider = ProviderFactory::create_llm_provider("ollama", "llava").ok()?;
        Some(VisionClient::new(provider, config))
    }

    #[test]
    fn options_are_deterministic_by_default() {
        let Some(c) = client(&ExtractionConfig::default()) else {
            return;
        };
        let opts = c.build_options();
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn request_has_system_and_user_turns() {
        let Some(c) = client(&ExtractionConfig::default()) else {
            return;
        };
        assert_eq!(c.build_messages(&tiny_image()).len(), 2);
    }

    #[test]
    fn system_prompt_override_is_used() {
        let config = ExtractionConfig::builder()
            .system_prompt("Read cards carefully.")
            .build()
            .unwrap();
        let Some(c) = client(&config) else {
            return;
        };
        assert_eq!(c.system_prompt, "Read cards carefully.");
    }
}
