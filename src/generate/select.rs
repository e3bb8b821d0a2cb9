//! Strategy selection, re-evaluated on every press so a dashboard change to
//! `generation.strategy` applies to the next photo.

use std::sync::Arc;

use async_trait::async_trait;

use crate::camera::CaptureArtifact;
use crate::config::{ConfigSource, GenerationStrategy};

use super::client::{ChatClient, GenerationError, PoemGenerator};
use super::two_stage::CaptionThenPoemGenerator;
use super::vision::VisionGenerator;

pub struct ConfiguredGenerator {
    config: Arc<dyn ConfigSource>,
    single_stage: Box<dyn PoemGenerator>,
    two_stage: Box<dyn PoemGenerator>,
}

impl ConfiguredGenerator {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        let client = ChatClient::new();
        Self::with_strategies(
            Arc::clone(&config),
            Box::new(VisionGenerator::new(client.clone(), Arc::clone(&config))),
            Box::new(CaptionThenPoemGenerator::new(client, config)),
        )
    }

    pub fn with_strategies(
        config: Arc<dyn ConfigSource>,
        single_stage: Box<dyn PoemGenerator>,
        two_stage: Box<dyn PoemGenerator>,
    ) -> Self {
        Self {
            config,
            single_stage,
            two_stage,
        }
    }
}

#[async_trait]
impl PoemGenerator for ConfiguredGenerator {
    async fn generate(&self, image: &CaptureArtifact) -> Result<String, GenerationError> {
        match self.config.snapshot().generation.strategy {
            GenerationStrategy::SingleStage => self.single_stage.generate(image).await,
            GenerationStrategy::TwoStage => self.two_stage.generate(image).await,
        }
    }
}
