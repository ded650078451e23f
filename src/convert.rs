//! Conversion entry points.
//!
//! [`convert`] is the one-call API: read the article, run every pipeline
//! stage in order, return the finished document. [`convert_to_file`] adds an
//! atomic write, [`convert_sync`] hides the runtime, and
//! [`convert_with_backend`] lets tests and embedders supply their own image
//! service.

use crate::config::ArticleConfig;
use crate::error::ArticleError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::generate::{acquire_images, GeminiBackend, ImageBackend};
use crate::pipeline::{assemble, calibrate, embed, inline, render};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").unwrap());

/// Convert a Markdown article to a WeChat-ready HTML document.
///
/// Image placeholders are illustrated with Gemini when `config` carries an
/// API key, and fall back to placeholder images otherwise.
///
/// # Errors
/// Returns `Err(ArticleError)` only for fatal errors: missing or unreadable
/// input. Failed illustrations and missing local images are recorded in the
/// output instead.
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ArticleConfig,
) -> Result<ConversionOutput, ArticleError> {
    let backend = GeminiBackend::from_config(config)?;
    convert_with_backend(input, config, backend.as_ref()).await
}

/// Like [`convert`], with an explicit image backend.
///
/// Passing `None`, or a config with `generate_images` off, disables
/// generation.
pub async fn convert_with_backend<B: ImageBackend>(
    input: impl AsRef<Path>,
    config: &ArticleConfig,
    backend: Option<&B>,
) -> Result<ConversionOutput, ArticleError> {
    let total_start = Instant::now();
    let path = input.as_ref();
    info!("Starting conversion: {}", path.display());

    // ── Step 1: Read input ───────────────────────────────────────────────
    if !path.is_file() {
        error!("Input file does not exist: {}", path.display());
        return Err(ArticleError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ArticleError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let base_dir = article_dir(path);
    let mut output = render_article(&content, &base_dir, config, backend).await;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {}/{} images generated, {}ms total",
        output.stats.generated_images, output.stats.placeholders, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run every stage on Markdown already in memory.
///
/// `base_dir` resolves relative image paths and receives the assets
/// directory. The backend is ignored when `config.generate_images` is off.
pub async fn render_article<B: ImageBackend>(
    markdown: &str,
    base_dir: &Path,
    config: &ArticleConfig,
    backend: Option<&B>,
) -> ConversionOutput {
    let mut stats = ConversionStats::default();
    let title = extract_title(markdown, &config.default_title);
    info!("Title: {}", title);

    // ── Step 2: Placeholders → generated images ──────────────────────────
    let assets_dir = base_dir.join(&config.assets_dir_name);
    let backend = backend.filter(|_| config.generate_images);
    let acquired = acquire_images(markdown, &assets_dir, backend, config).await;
    stats.placeholders = acquired.outcomes.len();
    stats.generated_images = acquired.outcomes.iter().filter(|o| o.is_generated()).count();
    stats.fallback_images = stats.placeholders - stats.generated_images;

    // ── Step 3: Local images → data URIs ─────────────────────────────────
    let (content, report) = embed::embed_local_images(&acquired.content, base_dir).await;
    stats.embedded_local_images = report.embedded;
    stats.missing_local_images = report.missing.len();

    // ── Step 4: Markdown → HTML ──────────────────────────────────────────
    let body = render::render_markdown(&content);

    // ── Step 5: Inline styles ────────────────────────────────────────────
    let (styled, styled_elements) = inline::inline_styles(&body);
    stats.styled_elements = styled_elements;

    // ── Step 6: Page shell ───────────────────────────────────────────────
    let css = assemble::load_css(config).await;
    let document = assemble::build_document(&styled, &title, &css);

    // ── Step 7: Calibration ──────────────────────────────────────────────
    let (html, removed) = calibrate::calibrate(&document);
    stats.removed_empty_paragraphs = removed;

    ConversionOutput {
        html,
        title,
        images: acquired.outcomes,
        stats,
    }
}

/// Convert an article and write the HTML directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ArticleConfig,
) -> Result<ConversionOutput, ArticleError> {
    let output = convert(input, config).await?;
    write_atomic(output_path.as_ref(), &output.html).await?;
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ArticleConfig,
) -> Result<ConversionOutput, ArticleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ArticleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Default output path: the input with its extension replaced by `html`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("html")
}

/// The first `# heading` of the article, or `default` if there is none.
pub fn extract_title(markdown: &str, default: &str) -> String {
    RE_TITLE
        .captures(markdown)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), ArticleError> {
    let to_err = |e| ArticleError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(to_err)?;
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(to_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(to_err)?;
    info!("HTML written: {}", path.display());
    Ok(())
}

fn article_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
