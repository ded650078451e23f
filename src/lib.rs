//! # md2wechat
//!
//! Convert a Markdown article into a single self-contained HTML page styled
//! for the WeChat official-account editor.
//!
//! ## Why this crate?
//!
//! The WeChat editor throws away `<style>` blocks, external images and most
//! classes when an article is pasted in. What survives is inline `style=""`
//! attributes and `data:` images. This crate renders Markdown, writes the
//! theme into every element, embeds every picture, and can draw missing
//! illustrations with Gemini from a one-line description.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Scan      find ![Image](description) placeholders
//!  ├─ 2. Generate  expand prompt + draw image via Gemini, or placehold.co
//!  ├─ 3. Embed     local image files → data URIs
//!  ├─ 4. Render    pulldown-cmark (tables, footnotes, heading ids, [TOC])
//!  ├─ 5. Inline    per-tag style table, lead paragraph, inline vs. block code
//!  ├─ 6. Assemble  page shell, bundled CSS, copy-to-clipboard button
//!  └─ 7. Calibrate drop empty paragraphs
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2wechat::{convert, ArticleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GOOGLE_API_KEY enables illustration; without it placeholders fall back.
//!     let config = ArticleConfig::from_env()?;
//!     let output = convert("article.md", &config).await?;
//!     std::fs::write("article.html", &output.html)?;
//!     eprintln!("{} of {} illustrations generated",
//!         output.stats.generated_images,
//!         output.stats.placeholders);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2wechat` binary (clap, anyhow, tracing-subscriber, indicatif, webbrowser) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2wechat = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod styles;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArticleConfig, ArticleConfigBuilder, ImageResolution};
pub use convert::{
    convert, convert_sync, convert_to_file, convert_with_backend, default_output_path,
    extract_title, render_article,
};
pub use error::{ArticleError, GenerationError};
pub use output::{ConversionOutput, ConversionStats, ImageOutcome};
pub use pipeline::generate::{GeminiBackend, GeneratedImage, ImageBackend};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use styles::StyledTag;
