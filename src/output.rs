//! Result types returned by the conversion functions.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete result of converting one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The full HTML document, ready to open in a browser and paste.
    pub html: String,
    /// Title used for `<title>`: the first `# heading`, or the default.
    pub title: String,
    /// One entry per `![Image](…)` placeholder, in document order.
    pub images: Vec<ImageOutcome>,
    pub stats: ConversionStats,
}

/// What happened to one image placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    /// 1-indexed position among the placeholders.
    pub index: usize,
    /// Description as written by the author.
    pub description: String,
    /// Prompt actually sent to the image model, if generation was attempted.
    pub prompt: Option<String>,
    /// Where the generated file was saved, if it was kept.
    pub asset_path: Option<PathBuf>,
    pub mime_type: Option<String>,
    /// Size of the generated image in bytes; 0 for a fallback.
    pub bytes: usize,
    /// Why the placeholder fell back to a placeholder-image URL.
    pub error: Option<GenerationError>,
}

impl ImageOutcome {
    /// True when a real illustration was embedded.
    pub fn is_generated(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// `![Image](…)` markers found in the source.
    pub placeholders: usize,
    /// Placeholders that received a generated illustration.
    pub generated_images: usize,
    /// Placeholders that fell back to a placeholder-image URL.
    pub fallback_images: usize,
    /// Local image files embedded as data URIs.
    pub embedded_local_images: usize,
    /// Local image references whose file could not be read.
    pub missing_local_images: usize,
    /// Elements that received an inline `style` attribute.
    pub styled_elements: usize,
    /// Empty paragraphs dropped during calibration.
    pub removed_empty_paragraphs: usize,
    /// Wall-clock time for the whole conversion.
    pub total_duration_ms: u64,
}
