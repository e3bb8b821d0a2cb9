//! Prompt builder for image-to-poem generation.
//!
//! [`PromptBuilder`] interpolates the configured templates into the
//! instruction text for each request shape:
//! * **Single stage** (`single_stage`) — one user text sent alongside the image.
//! * **Caption** (`caption`) — `(system_msg, user_msg)` for the scene description.
//! * **Poem** (`poem`) — `(system_msg, user_msg)` written from that description.

use crate::config::PromptConfig;

/// Fixed lines appended to the single-stage prompt.  They keep vision models
/// from describing the photo instead of writing about it.
const BREVITY_RULES: &str = "\
IMPORTANT: Write a POEM, not a description.
Keep it short (max 8 lines).
Do not mention the date or time. Focus on the visual mood.";

/// Builds instruction text from a [`PromptConfig`] snapshot.
///
/// # Example
/// ```rust
/// use poetry_camera::config::PromptConfig;
/// use poetry_camera::generate::PromptBuilder;
///
/// let prompts = PromptConfig { poem_format: "haiku".into(), ..PromptConfig::default() };
/// let text = PromptBuilder::new(&prompts).single_stage();
/// assert!(text.contains("Style: haiku"));
/// ```
pub struct PromptBuilder<'a> {
    prompts: &'a PromptConfig,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(prompts: &'a PromptConfig) -> Self {
        Self { prompts }
    }

    /// User text for the one-shot vision request.
    ///
    /// Structure (in order):
    /// 1. Base poem prompt
    /// 2. `Style: <format>`
    /// 3. Brevity rules
    pub fn single_stage(&self) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(self.prompts.poem_prompt.trim());
        prompt.push_str(&format!("\nStyle: {}\n", self.prompts.poem_format.trim()));
        prompt.push_str(BREVITY_RULES);
        prompt
    }

    /// `(system_msg, user_msg)` for the scene-description request.
    pub fn caption(&self) -> (String, String) {
        (
            self.prompts.caption_system_prompt.trim().to_string(),
            self.prompts.caption_prompt.trim().to_string(),
        )
    }

    /// `(system_msg, user_msg)` for the poem request of the two-stage flow.
    pub fn poem(&self, description: &str) -> (String, String) {
        let system_msg = self.prompts.poem_system_prompt.trim().to_string();

        let mut user_msg = String::with_capacity(1024);
        user_msg.push_str(self.prompts.poem_prompt.trim());
        user_msg.push_str(&format!(
            "\nPoem format: {}\n\nScene description:\n{}\n",
            self.prompts.poem_format.trim(),
            description.trim()
        ));

        (system_msg, user_msg)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
