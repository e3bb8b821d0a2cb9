//! Legacy two-stage strategy: caption the frame, then write from the caption.
//!
//! Kept behind the same [`PoemGenerator`] contract as the vision strategy and
//! selected with `generation.strategy = "two_stage"`.  The second call sends
//! text only.  Each call gets the full configured timeout.

use std::sync::Arc;

use async_trait::async_trait;

use crate::camera::CaptureArtifact;
use crate::config::ConfigSource;

use super::client::{image_data_url, ChatClient, GenerationError, PoemGenerator};
use super::prompt::PromptBuilder;

pub struct CaptionThenPoemGenerator {
    client: ChatClient,
    config: Arc<dyn ConfigSource>,
}

impl CaptionThenPoemGenerator {
    pub fn new(client: ChatClient, config: Arc<dyn ConfigSource>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PoemGenerator for CaptionThenPoemGenerator {
    async fn generate(&self, image: &CaptureArtifact) -> Result<String, GenerationError> {
        let config = self.config.snapshot();
        let builder = PromptBuilder::new(&config.prompts);

        // ── 1. Scene description ────────────────────────────────────────
        let (caption_system, caption_user) = builder.caption();
        let image_url = image_data_url(image)?;
        let caption_messages = serde_json::json!([
            { "role": "system", "content": caption_system },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": caption_user },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }
        ]);
        let description = self
            .client
            .complete(&config.generation, caption_messages)
            .await?;
        log::debug!("generate: scene description = {description:?}");

        // ── 2. Poem from description ────────────────────────────────────
        let (poem_system, poem_user) = builder.poem(&description);
        let poem_messages = serde_json::json!([
            { "role": "system", "content": poem_system },
            { "role": "user",   "content": poem_user   }
        ]);
        self.client.complete(&config.generation, poem_messages).await
    }
}
