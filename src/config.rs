//! Configuration types for Markdown-to-WeChat conversion.
//!
//! Every knob lives in one immutable [`ArticleConfig`], built once at startup
//! (usually via [`ArticleConfig::from_env`] or [`ArticleConfig::builder`]) and
//! passed by reference into each pipeline stage. Nothing downstream reads the
//! process environment on its own.

use crate::error::ArticleError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default Gemini model used to draw illustrations.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

/// Default Gemini model used to expand short descriptions into prompts.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-pro-preview";

/// Title used when the article has no top-level `# heading`.
pub const DEFAULT_TITLE: &str = "科技速食科普";

/// Base URL of the Gemini REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a single article conversion.
///
/// # Example
/// ```rust
/// use md2wechat::{ArticleConfig, ImageResolution};
///
/// let config = ArticleConfig::builder()
///     .resolution(ImageResolution::High)
///     .enable_search(true)
///     .build()
///     .unwrap();
/// assert!(config.api_key.is_none());
/// ```
#[derive(Clone)]
pub struct ArticleConfig {
    /// Credential for the generative-model service.
    ///
    /// `None` silently disables remote image generation: every placeholder
    /// falls back to a placeholder-image URL.
    pub api_key: Option<String>,

    /// Model that draws the illustration. Default: [`DEFAULT_IMAGE_MODEL`].
    pub image_model: String,

    /// Model that expands a short description into a full prompt.
    /// Default: [`DEFAULT_TEXT_MODEL`].
    pub text_model: String,

    /// Output size requested from the image model. Default: medium (2K).
    pub resolution: ImageResolution,

    /// Attach the search-grounding tool to image requests. Default: false.
    pub enable_search: bool,

    /// Master switch for remote generation, independent of the key. Default: true.
    pub generate_images: bool,

    /// Keep `assets/gen_*.png` files on disk after embedding them. Default: true.
    pub keep_generated_assets: bool,

    /// Name of the directory, beside the input file, that receives generated
    /// images. Default: `assets`.
    pub assets_dir_name: String,

    /// CSS template override. If None, the bundled template is used.
    pub css_path: Option<PathBuf>,

    /// Document title when the article has no `# heading`.
    pub default_title: String,

    /// Gemini REST base URL (overridable for proxies and tests).
    pub api_base_url: String,

    /// Pre-constructed text provider for prompt expansion. Takes precedence
    /// over building one from `text_model` + `api_key`.
    pub text_provider: Option<Arc<dyn LLMProvider>>,

    /// Receives per-placeholder progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            resolution: ImageResolution::default(),
            enable_search: false,
            generate_images: true,
            keep_generated_assets: true,
            assets_dir_name: "assets".to_string(),
            css_path: None,
            default_title: DEFAULT_TITLE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            text_provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ArticleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .field("resolution", &self.resolution)
            .field("enable_search", &self.enable_search)
            .field("generate_images", &self.generate_images)
            .field("keep_generated_assets", &self.keep_generated_assets)
            .field("assets_dir_name", &self.assets_dir_name)
            .field("css_path", &self.css_path)
            .field("default_title", &self.default_title)
            .field("api_base_url", &self.api_base_url)
            .field(
                "text_provider",
                &self.text_provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .finish()
    }
}

impl ArticleConfig {
    /// Create a new builder for `ArticleConfig`.
    pub fn builder() -> ArticleConfigBuilder {
        ArticleConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `GOOGLE_API_KEY` (or `GEMINI_API_KEY`) | `api_key` |
    /// | `IMG_MODEL_NAME` | `image_model` |
    /// | `TEXT_MODEL_NAME` | `text_model` |
    /// | `IMAGE_RESOLUTION` | `resolution` (`low/medium/high`, `1k/2k/4k`) |
    /// | `ENABLE_SEARCH` | `enable_search` (see [`env_flag`]) |
    pub fn from_env() -> Result<Self, ArticleError> {
        Self::builder().apply_env(|name| std::env::var(name).ok())?.build()
    }

    /// Whether remote generation can be attempted at all.
    pub fn generation_enabled(&self) -> bool {
        self.generate_images && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Builder for [`ArticleConfig`].
#[derive(Debug)]
pub struct ArticleConfigBuilder {
    config: ArticleConfig,
}

impl ArticleConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn resolution(mut self, resolution: ImageResolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    pub fn enable_search(mut self, v: bool) -> Self {
        self.config.enable_search = v;
        self
    }

    pub fn generate_images(mut self, v: bool) -> Self {
        self.config.generate_images = v;
        self
    }

    pub fn keep_generated_assets(mut self, v: bool) -> Self {
        self.config.keep_generated_assets = v;
        self
    }

    pub fn assets_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.assets_dir_name = name.into();
        self
    }

    pub fn css_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.css_path = Some(path.into());
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn text_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.text_provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Overlay values from an environment lookup.
    ///
    /// Unset or empty variables leave the current value untouched. The lookup
    /// is injected so tests never touch the real process environment.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ArticleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY")) {
            self.config.api_key = Some(key);
        }
        if let Some(model) = get("IMG_MODEL_NAME") {
            self.config.image_model = model;
        }
        if let Some(model) = get("TEXT_MODEL_NAME") {
            self.config.text_model = model;
        }
        if let Some(res) = get("IMAGE_RESOLUTION") {
            self.config.resolution = res.parse()?;
        }
        if let Some(flag) = get("ENABLE_SEARCH") {
            self.config.enable_search = env_flag(&flag);
        }
        Ok(self)
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ArticleConfig, ArticleError> {
        let c = &self.config;
        if c.image_model.trim().is_empty() {
            return Err(ArticleError::InvalidConfig(
                "image model name must not be empty".into(),
            ));
        }
        if c.text_model.trim().is_empty() {
            return Err(ArticleError::InvalidConfig(
                "text model name must not be empty".into(),
            ));
        }
        if c.assets_dir_name.trim().is_empty() || c.assets_dir_name.contains(['/', '\\']) {
            return Err(ArticleError::InvalidConfig(format!(
                "assets directory must be a plain directory name, got '{}'",
                c.assets_dir_name
            )));
        }
        Ok(self.config)
    }
}

/// Boolean reading of an environment value, the same rule clap applies to
/// `env`-backed flags: `0`, `n`, `no`, `f`, `false`, `off` and the empty
/// string are false, anything else is true.
pub fn env_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "n" | "no" | "f" | "false" | "off"
    )
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output size requested from the image model.
///
/// The `1k/2k/4k` spellings are accepted as aliases so existing `.env` files
/// keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageResolution {
    /// ~1K pixels on the long edge.
    Low,
    /// ~2K pixels on the long edge. (default)
    #[default]
    Medium,
    /// ~4K pixels on the long edge.
    High,
}

impl ImageResolution {
    /// Value of `imageConfig.imageSize` in a Gemini request.
    pub fn image_size(self) -> &'static str {
        match self {
            ImageResolution::Low => "1K",
            ImageResolution::Medium => "2K",
            ImageResolution::High => "4K",
        }
    }
}

impl FromStr for ImageResolution {
    type Err = ArticleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "1k" => Ok(ImageResolution::Low),
            "medium" | "2k" => Ok(ImageResolution::Medium),
            "high" | "4k" => Ok(ImageResolution::High),
            other => Err(ArticleError::InvalidConfig(format!(
                "unknown image resolution '{other}' (expected low, medium, high, 1k, 2k or 4k)"
            ))),
        }
    }
}

impl fmt::Display for ImageResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageResolution::Low => "low",
            ImageResolution::Medium => "medium",
            ImageResolution::High => "high",
        };
        f.write_str(s)
    }
}
