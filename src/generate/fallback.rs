//! Fallback text — what gets printed when the normal path fails.
//!
//! Every failure site (generation error, camera fault) goes through
//! [`failure_text`], so the printed notice always has the same shape: a
//! short verse, a truncated diagnostic, and fixed recovery steps.
//!
//! [`FallbackGenerator`] wraps any [`PoemGenerator`] and never fails: on
//! error it returns a [`ComposedResult`] with [`Origin::Fallback`].

use crate::camera::CaptureArtifact;

use super::client::PoemGenerator;

// ---------------------------------------------------------------------------
// ComposedResult
// ---------------------------------------------------------------------------

/// Where the printed text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Generated,
    Fallback,
}

/// Final text of one run, consumed once by the print dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedResult {
    pub text: String,
    pub origin: Origin,
}

impl ComposedResult {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::Generated,
        }
    }

    pub fn fallback(kind: FailureKind, diagnostic: &str, max_chars: usize) -> Self {
        Self {
            text: failure_text(kind, diagnostic, max_chars),
            origin: Origin::Fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure text
// ---------------------------------------------------------------------------

/// Which stage failed; selects the verse and the first recovery step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Generation,
    Camera,
}

const GENERATION_VERSE: &str = "Alas, the muses are silent.";
const CAMERA_VERSE: &str = "The lens saw only darkness,\nno picture came to be.";

/// Cut `diagnostic` to at most `max_chars` characters (not bytes).
///
/// Returns the kept prefix and whether anything was cut.
pub fn truncate_diagnostic(diagnostic: &str, max_chars: usize) -> (String, bool) {
    let diagnostic = diagnostic.trim();
    match diagnostic.char_indices().nth(max_chars) {
        Some((idx, _)) => (diagnostic[..idx].to_string(), true),
        None => (diagnostic.to_string(), false),
    }
}

/// Build the printed notice for a failed run.
pub fn failure_text(kind: FailureKind, diagnostic: &str, max_chars: usize) -> String {
    let (diag, cut) = truncate_diagnostic(diagnostic, max_chars);
    let ellipsis = if cut { "..." } else { "" };

    let (verse, first_step) = match kind {
        FailureKind::Generation => (GENERATION_VERSE, "- Check the network connection."),
        FailureKind::Camera => (CAMERA_VERSE, "- Check that the camera cable is seated."),
    };

    format!(
        "{verse}\n(Error: {diag}{ellipsis})\n\n\
         Troubleshooting:\n\
         {first_step}\n\
         - Power-cycle the camera: unplug it, wait 10 seconds, plug it back in.\n\
         - Try again shortly."
    )
}

// ---------------------------------------------------------------------------
// FallbackGenerator
// ---------------------------------------------------------------------------

/// A wrapper around any [`PoemGenerator`] that always yields printable text.
pub struct FallbackGenerator<G: PoemGenerator + ?Sized> {
    max_chars: usize,
    inner: std::sync::Arc<G>,
}

impl<G: PoemGenerator + ?Sized> FallbackGenerator<G> {
    /// `max_chars` bounds the diagnostic embedded in fallback text.
    pub fn new(inner: std::sync::Arc<G>, max_chars: usize) -> Self {
        Self { max_chars, inner }
    }

    /// Generate; on any error return fallback text instead.
    pub async fn compose(&self, image: &CaptureArtifact) -> ComposedResult {
        match self.inner.generate(image).await {
            Ok(text) => ComposedResult::generated(text),
            Err(err) => {
                log::warn!("generate: falling back to notice text ({err})");
                ComposedResult::fallback(FailureKind::Generation, &err.to_string(), self.max_chars)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
