//! Image acquisition: turn `![Image](description)` markers into pictures.
//!
//! For each placeholder, in document order:
//!
//! 1. **Expand** the short description into a detailed English prompt with a
//!    text model. Any failure here falls back to the raw description.
//! 2. **Generate** image bytes with an image model.
//! 3. **Persist** the bytes under `assets/` and substitute a data URI, keeping
//!    the description as alt text.
//!
//! If step 2 or 3 fails, or no backend is configured, the marker becomes a
//! `placehold.co` image carrying the description as its text. One failed
//! placeholder never stops the others, and nothing is retried.
//!
//! The remote service sits behind [`ImageBackend`] so the stage can run
//! against [`GeminiBackend`] in production and a stub in tests.

use crate::config::{ArticleConfig, ImageResolution};
use crate::error::{ArticleError, GenerationError};
use crate::output::ImageOutcome;
use crate::pipeline::encode::{extension_for_mime, mime_for_bytes, to_data_uri};
use crate::pipeline::placeholder::{apply_replacements, escape_alt, find_placeholders};
use crate::prompts::{expansion_request, image_request, EXPANSION_SYSTEM_PROMPT};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, GeminiProvider, LLMProvider};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Base of the fallback image URL; the description goes in `?text=`.
pub const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/800x400/FFF9E6/FF9E66.png";

/// Image bytes returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// A generative-model service able to illustrate a description.
pub trait ImageBackend {
    /// Expand a short description into a full generation prompt.
    fn expand_prompt(
        &self,
        description: &str,
    ) -> impl Future<Output = Result<String, GenerationError>>;

    /// Produce one image for the prompt.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<GeneratedImage, GenerationError>>;
}

/// Result of running the acquisition stage over a document.
#[derive(Debug, Clone)]
pub struct AcquiredImages {
    /// The article with every placeholder substituted.
    pub content: String,
    /// One entry per placeholder, in document order.
    pub outcomes: Vec<ImageOutcome>,
}

/// Replace every placeholder in `content`.
///
/// `backend = None` means generation is disabled: each placeholder goes
/// straight to the fallback URL without any remote call.
pub async fn acquire_images<B: ImageBackend>(
    content: &str,
    assets_dir: &Path,
    backend: Option<&B>,
    config: &ArticleConfig,
) -> AcquiredImages {
    let placeholders = find_placeholders(content);
    let total = placeholders.len();
    let cb = config.progress_callback.as_ref();

    if total == 0 {
        return AcquiredImages {
            content: content.to_string(),
            outcomes: Vec::new(),
        };
    }

    info!(
        "Found {} image placeholder(s) (model: {}, resolution: {}, search: {})",
        total, config.image_model, config.resolution, config.enable_search
    );
    if let Some(cb) = cb {
        cb.on_conversion_start(total);
    }

    let mut replacements = Vec::with_capacity(total);
    let mut outcomes = Vec::with_capacity(total);

    for (i, placeholder) in placeholders.into_iter().enumerate() {
        let index = i + 1;
        let description = placeholder.description;
        info!("Image {}/{}: {}", index, total, description);
        if let Some(cb) = cb {
            cb.on_image_start(index, total, &description);
        }

        let attempt = match backend {
            Some(backend) => {
                illustrate(backend, &description, assets_dir, config.keep_generated_assets).await
            }
            None => Err((None, GenerationError::Unavailable)),
        };

        let alt = escape_alt(&description);
        let (replacement, outcome) = match attempt {
            Ok(done) => {
                if let Some(cb) = cb {
                    cb.on_image_complete(index, total, done.bytes);
                }
                info!("Image {}/{} embedded ({} bytes)", index, total, done.bytes);
                (
                    format!("![{alt}]({})", done.data_uri),
                    ImageOutcome {
                        index,
                        description,
                        prompt: Some(done.prompt),
                        asset_path: done.asset_path,
                        mime_type: Some(done.mime_type),
                        bytes: done.bytes,
                        error: None,
                    },
                )
            }
            Err((prompt, err)) => {
                if matches!(err, GenerationError::Unavailable) {
                    debug!("Image {}/{}: {}", index, total, err);
                } else {
                    warn!("Image {}/{} skipped: {}", index, total, err);
                }
                if let Some(cb) = cb {
                    cb.on_image_fallback(index, total, &err.to_string());
                }
                (
                    format!("![{alt}]({})", placeholder_url(&description)),
                    ImageOutcome {
                        index,
                        description,
                        prompt,
                        asset_path: None,
                        mime_type: None,
                        bytes: 0,
                        error: Some(err),
                    },
                )
            }
        };

        replacements.push((placeholder.span, replacement));
        outcomes.push(outcome);
    }

    let generated = outcomes.iter().filter(|o| o.error.is_none()).count();
    if let Some(cb) = cb {
        cb.on_conversion_complete(total, generated);
    }

    AcquiredImages {
        content: apply_replacements(content, replacements),
        outcomes,
    }
}

/// Fallback image URL with the description as URL-encoded query text.
pub fn placeholder_url(description: &str) -> String {
    match reqwest::Url::parse_with_params(PLACEHOLDER_IMAGE_BASE, &[("text", description)]) {
        Ok(url) => url.to_string(),
        Err(_) => PLACEHOLDER_IMAGE_BASE.to_string(),
    }
}

struct Illustration {
    prompt: String,
    data_uri: String,
    mime_type: String,
    bytes: usize,
    asset_path: Option<PathBuf>,
}

/// Expand, generate, persist and encode a single placeholder.
///
/// On failure returns the prompt that was used (if expansion got that far).
async fn illustrate<B: ImageBackend>(
    backend: &B,
    description: &str,
    assets_dir: &Path,
    keep_asset: bool,
) -> Result<Illustration, (Option<String>, GenerationError)> {
    let prompt = match backend.expand_prompt(description).await {
        Ok(expanded) if !expanded.trim().is_empty() => {
            let preview: String = expanded.chars().take(50).collect();
            info!("Prompt expanded: '{}' → '{}…'", description, preview);
            expanded
        }
        Ok(_) => description.to_string(),
        Err(e) => {
            warn!("Prompt expansion failed, using raw description: {}", e);
            description.to_string()
        }
    };

    let image = match backend.generate_image(&prompt).await {
        Ok(image) => image,
        Err(e) => return Err((Some(prompt), e)),
    };

    let path = match write_asset(assets_dir, &image).await {
        Ok(path) => path,
        Err(e) => return Err((Some(prompt), e)),
    };
    info!("Image saved: {}", path.display());

    let data_uri = to_data_uri(&image.bytes, &image.mime_type);
    let asset_path = if keep_asset {
        Some(path)
    } else {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Could not remove generated asset {}: {}", path.display(), e);
        }
        None
    };

    Ok(Illustration {
        prompt,
        data_uri,
        mime_type: image.mime_type,
        bytes: image.bytes.len(),
        asset_path,
    })
}

/// Write bytes to `assets_dir/gen_<millis>.<ext>`, never overwriting.
async fn write_asset(assets_dir: &Path, image: &GeneratedImage) -> Result<PathBuf, GenerationError> {
    let to_err = |path: &Path, e: std::io::Error| GenerationError::AssetWrite {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    tokio::fs::create_dir_all(assets_dir)
        .await
        .map_err(|e| to_err(assets_dir, e))?;

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let ext = extension_for_mime(&image.mime_type);

    let mut path = assets_dir.join(format!("gen_{millis}.{ext}"));
    let mut n = 1;
    while tokio::fs::try_exists(&path).await.unwrap_or(false) {
        path = assets_dir.join(format!("gen_{millis}_{n}.{ext}"));
        n += 1;
    }

    tokio::fs::write(&path, &image.bytes)
        .await
        .map_err(|e| to_err(&path, e))?;
    Ok(path)
}

// ── Gemini backend ───────────────────────────────────────────────────────

/// [`ImageBackend`] backed by Google's Gemini models.
///
/// Prompt expansion goes through an `edgequake-llm` provider; image
/// generation calls the `generateContent` REST endpoint directly, since that
/// is where inline image parts come back.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    image_model: String,
    base_url: String,
    resolution: ImageResolution,
    enable_search: bool,
    text: Arc<dyn LLMProvider>,
}

impl GeminiBackend {
    /// Build a backend from the configuration.
    ///
    /// Returns `Ok(None)` when generation is disabled (no key, or switched
    /// off). Prompt expansion uses `config.text_provider` when set, otherwise
    /// a Gemini provider built from the same key.
    pub fn from_config(config: &ArticleConfig) -> Result<Option<Self>, ArticleError> {
        if !config.generate_images {
            info!("Image generation switched off; placeholders will use placeholder images");
            return Ok(None);
        }
        if !config.generation_enabled() {
            warn!("No GOOGLE_API_KEY configured; placeholders will use placeholder images");
            return Ok(None);
        }
        let api_key = config.api_key.clone().unwrap_or_default();
        let text = resolve_text_provider(config, &api_key);

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ArticleError::Internal(format!("HTTP client: {e}")))?;

        Ok(Some(Self {
            http,
            api_key,
            image_model: config.image_model.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            resolution: config.resolution,
            enable_search: config.enable_search,
            text,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.image_model)
    }
}

/// Pick the prompt-expansion provider: an injected one first, otherwise a
/// Gemini provider for `text_model` using the configured key.
fn resolve_text_provider(config: &ArticleConfig, api_key: &str) -> Arc<dyn LLMProvider> {
    if let Some(ref provider) = config.text_provider {
        return Arc::clone(provider);
    }
    debug!("Prompt expansion via Gemini model {}", config.text_model);
    Arc::new(GeminiProvider::new(api_key).with_model(&config.text_model))
}

impl ImageBackend for GeminiBackend {
    async fn expand_prompt(&self, description: &str) -> Result<String, GenerationError> {
        let messages = vec![
            ChatMessage::system(EXPANSION_SYSTEM_PROMPT),
            ChatMessage::user(expansion_request(description)),
        ];
        let options = CompletionOptions {
            temperature: Some(0.7),
            ..Default::default()
        };

        let response = self
            .text
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| GenerationError::PromptExpansion {
                detail: e.to_string(),
            })?;

        Ok(response.content.trim().to_string())
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        info!(
            "Calling {} (resolution: {}, search: {})",
            self.image_model, self.resolution, self.enable_search
        );
        let body = build_request(prompt, self.resolution, self.enable_search);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request {
                model: self.image_model.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                model: self.image_model.clone(),
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| GenerationError::Request {
                model: self.image_model.clone(),
                detail: format!("invalid response body: {e}"),
            })?;

        extract_image(parsed, &self.image_model)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    image_size: &'static str,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

fn build_request(prompt: &str, resolution: ImageResolution, enable_search: bool) -> GenerateContentRequest {
    let tools = if enable_search {
        vec![Tool {
            google_search: serde_json::Map::new(),
        }]
    } else {
        Vec::new()
    };
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![TextPart {
                text: image_request(prompt),
            }],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
            image_config: ImageConfig {
                image_size: resolution.image_size(),
            },
        },
        tools,
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
struct InlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}

/// Take the first inline image of the first candidate.
fn extract_image(response: GenerateContentResponse, model: &str) -> Result<GeneratedImage, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .filter(|d| !d.data.is_empty())
        .ok_or_else(|| GenerationError::NoImageData {
            model: model.to_string(),
        })?;

    let bytes = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| GenerationError::Decode {
            detail: e.to_string(),
        })?;

    let mime_type = if inline.mime_type.starts_with("image/") {
        inline.mime_type
    } else {
        mime_for_bytes(&bytes).to_string()
    };

    Ok(GeneratedImage { bytes, mime_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Backend that replays canned answers and records prompts.
    struct StubBackend {
        expand: Result<String, GenerationError>,
        image: Result<GeneratedImage, GenerationError>,
        prompts: RefCell<Vec<String>>,
    }

    impl StubBackend {
        fn ok() -> Self {
            Self {
                expand: Ok("a detailed prompt".into()),
                image: Ok(GeneratedImage {
                    bytes: vec![1, 2, 3],
                    mime_type: "image/png".into(),
                }),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl ImageBackend for StubBackend {
        async fn expand_prompt(&self, _description: &str) -> Result<String, GenerationError> {
            self.expand.clone()
        }

        async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.image.clone()
        }
    }

    #[tokio::test]
    async fn no_backend_uses_placeholder_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArticleConfig::default();
        let out = acquire_images::<StubBackend>("![Image](a cat) and ![Image](b)", dir.path(), None, &config).await;

        assert_eq!(out.outcomes.len(), 2);
        assert!(out.outcomes.iter().all(|o| matches!(o.error, Some(GenerationError::Unavailable))));
        assert_eq!(
            out.content,
            format!("![a cat]({}) and ![b]({})", placeholder_url("a cat"), placeholder_url("b"))
        );
        assert!(!dir.path().join("assets").exists());
    }

    #[tokio::test]
    async fn success_embeds_data_uri_and_writes_asset() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        let backend = StubBackend::ok();
        let config = ArticleConfig::default();

        let out = acquire_images("x ![Image](a cat) y", &assets, Some(&backend), &config).await;

        assert_eq!(out.content, "x ![a cat](data:image/png;base64,AQID) y");
        let outcome = &out.outcomes[0];
        assert!(outcome.error.is_none());
        assert_eq!(outcome.prompt.as_deref(), Some("a detailed prompt"));
        let path = outcome.asset_path.as_ref().expect("asset kept");
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
        assert_eq!(backend.prompts.borrow().as_slice(), ["a detailed prompt"]);
    }

    #[tokio::test]
    async fn expansion_failure_falls_back_to_description() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = StubBackend::ok();
        backend.expand = Err(GenerationError::PromptExpansion {
            detail: "boom".into(),
        });
        let config = ArticleConfig::default();

        let out = acquire_images("![Image](raw words)", dir.path(), Some(&backend), &config).await;

        assert!(out.outcomes[0].error.is_none());
        assert_eq!(backend.prompts.borrow().as_slice(), ["raw words"]);
    }

    #[tokio::test]
    async fn generation_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = StubBackend::ok();
        backend.image = Err(GenerationError::NoImageData { model: "m".into() });
        let config = ArticleConfig::default();

        let out = acquire_images("![Image](one) ![Image](two)", dir.path(), Some(&backend), &config).await;

        assert_eq!(backend.prompts.borrow().len(), 2, "each placeholder attempted once");
        assert!(out.content.contains(&placeholder_url("one")));
        assert!(out.content.contains(&placeholder_url("two")));
        assert!(!out.content.contains("![Image]("));
    }

    #[tokio::test]
    async fn discarded_assets_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::ok();
        let config = ArticleConfig::builder()
            .keep_generated_assets(false)
            .build()
            .unwrap();

        let out = acquire_images("![Image](a)", dir.path(), Some(&backend), &config).await;

        assert!(out.outcomes[0].asset_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(out.content.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn asset_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage {
            bytes: vec![0],
            mime_type: "image/jpeg".into(),
        };
        let a = write_asset(dir.path(), &image).await.unwrap();
        let b = write_asset(dir.path(), &image).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "jpg");
    }

    #[test]
    fn placeholder_url_encodes_description() {
        let url = placeholder_url("a cat & 狗");
        assert!(url.starts_with(PLACEHOLDER_IMAGE_BASE));
        assert!(url.contains("?text=a+cat+%26+%E7%8B%97"), "got {url}");
        assert!(!url.contains(' '));
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(build_request("a cat", ImageResolution::High, true)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Generate an image of: a cat");
        assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "4K");
        assert_eq!(body["generationConfig"]["responseModalities"][1], "IMAGE");
        assert!(body["tools"][0]["google_search"].is_object());

        let plain = serde_json::to_value(build_request("x", ImageResolution::Low, false)).unwrap();
        assert!(plain.get("tools").is_none());
    }

    #[test]
    fn extracts_first_inline_image() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"text":"here you go"},
            {"inlineData":{"mimeType":"image/png","data":"AQID"}}
        ]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let image = extract_image(parsed, "m").unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn text_only_response_has_no_image() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image(parsed, "m"),
            Err(GenerationError::NoImageData { .. })
        ));
        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_image(empty, "m").is_err());
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let json = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"@@@"}}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(extract_image(parsed, "m"), Err(GenerationError::Decode { .. })));
    }

    #[test]
    fn disabled_config_builds_no_backend() {
        let config = ArticleConfig::default();
        assert!(GeminiBackend::from_config(&config).unwrap().is_none());

        let off = ArticleConfig::builder()
            .api_key("k")
            .generate_images(false)
            .build()
            .unwrap();
        assert!(GeminiBackend::from_config(&off).unwrap().is_none());
    }

    #[test]
    fn builder_key_enables_prompt_expansion() {
        let config = ArticleConfig::builder()
            .api_key("key-from-builder")
            .text_model("txt-model")
            .build()
            .unwrap();
        let backend = GeminiBackend::from_config(&config).unwrap().expect("backend");
        assert_eq!(backend.text.name(), "gemini");
        assert_eq!(backend.text.model(), "txt-model");
    }

    #[test]
    fn injected_text_provider_wins() {
        let injected: Arc<dyn LLMProvider> =
            Arc::new(GeminiProvider::new("other").with_model("injected-model"));
        let config = ArticleConfig::builder()
            .api_key("k")
            .text_provider(injected)
            .build()
            .unwrap();
        let backend = GeminiBackend::from_config(&config).unwrap().expect("backend");
        assert_eq!(backend.text.model(), "injected-model");
    }
}
