//! Single-stage strategy: image and instructions in one vision request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::camera::CaptureArtifact;
use crate::config::ConfigSource;

use super::client::{image_data_url, ChatClient, GenerationError, PoemGenerator};
use super::prompt::PromptBuilder;

/// Canonical generator: one round trip per press.
pub struct VisionGenerator {
    client: ChatClient,
    config: Arc<dyn ConfigSource>,
}

impl VisionGenerator {
    pub fn new(client: ChatClient, config: Arc<dyn ConfigSource>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PoemGenerator for VisionGenerator {
    async fn generate(&self, image: &CaptureArtifact) -> Result<String, GenerationError> {
        let config = self.config.snapshot();
        let prompt = PromptBuilder::new(&config.prompts).single_stage();
        let image_url = image_data_url(image)?;

        let messages = serde_json::json!([
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }
        ]);

        log::debug!(
            "generate: single-stage request (model={}, {} image bytes)",
            config.generation.model,
            image.bytes.len()
        );
        self.client.complete(&config.generation, messages).await
    }
}
