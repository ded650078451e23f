//! Error types for the md2wechat library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ArticleError`]: **Fatal**: the conversion cannot proceed at all
//!   (input file missing, output not writable, bad configuration). Returned as
//!   `Err(ArticleError)` from the top-level `convert*` functions.
//!
//! * [`GenerationError`]: **Non-fatal**: a single image placeholder could not
//!   be turned into a generated illustration. It is logged, replaced by a
//!   placeholder-image URL, and recorded in [`crate::output::ImageOutcome`]
//!   so callers can see which illustrations fell back.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2wechat library.
///
/// Per-image failures use [`GenerationError`] and never surface here.
#[derive(Debug, Error)]
pub enum ArticleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input Markdown file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The input exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image placeholder.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum GenerationError {
    /// No credential configured, or generation switched off.
    #[error("image generation is disabled (no API key configured)")]
    Unavailable,

    /// The text model could not expand the description.
    #[error("prompt expansion failed: {detail}")]
    PromptExpansion { detail: String },

    /// The HTTP request never produced a response.
    #[error("request to '{model}' failed: {detail}")]
    Request { model: String, detail: String },

    /// The API answered with a non-success status.
    #[error("'{model}' returned HTTP {status}: {body}")]
    Api {
        model: String,
        status: u16,
        body: String,
    },

    /// The response parsed, but carried no inline image part.
    #[error("'{model}' response contained no image data")]
    NoImageData { model: String },

    /// The inline image payload was not valid base64.
    #[error("could not decode image payload: {detail}")]
    Decode { detail: String },

    /// The generated bytes could not be persisted.
    #[error("failed to write asset '{path}': {detail}")]
    AssetWrite { path: PathBuf, detail: String },
}
