//! Integration tests for the full Markdown → WeChat HTML pipeline.
//!
//! Every test runs offline: remote generation is either disabled or served
//! by `MockBackend`, and articles live in a fresh temp directory.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use md2wechat::pipeline::generate::placeholder_url;
use md2wechat::pipeline::calibrate::calibrate;
use md2wechat::styles::{StyledTag, INLINE_CODE_STYLE, LEAD_PARAGRAPH_STYLE};
use md2wechat::{
    convert_sync, convert_to_file, convert_with_backend, ArticleConfig, ArticleError,
    ConversionProgressCallback, GeneratedImage, GenerationError, ImageBackend,
};
use scraper::{Html, Selector};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Image service stand-in. Descriptions containing "fail" get an error.
#[derive(Default)]
struct MockBackend {
    prompts: Mutex<Vec<String>>,
}

impl ImageBackend for MockBackend {
    async fn expand_prompt(&self, description: &str) -> Result<String, GenerationError> {
        Ok(format!("flat illustration of {description}"))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("fail") {
            return Err(GenerationError::NoImageData {
                model: "mock".into(),
            });
        }
        Ok(GeneratedImage {
            bytes: PNG_BYTES.to_vec(),
            mime_type: "image/png".into(),
        })
    }
}

fn write_article(dir: &Path, markdown: &str) -> PathBuf {
    let path = dir.join("article.md");
    std::fs::write(&path, markdown).unwrap();
    path
}

fn offline_config() -> ArticleConfig {
    ArticleConfig::builder().generate_images(false).build().unwrap()
}

/// Collects formatted log lines so tests can assert on them.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route WARN and above on this thread into the buffer until the guard drops.
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn select_all<'a>(html: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
    let sel = Selector::parse(css).unwrap();
    html.select(&sel).collect()
}

fn img_sources(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    select_all(&doc, "img")
        .into_iter()
        .filter_map(|img| img.value().attr("src").map(str::to_string))
        .collect()
}

// ── Placeholders ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_placeholders_fall_back_without_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(
        dir.path(),
        "# T\n\nintro\n\n![Image](a robot reading)\n\nmiddle\n\n![image](一只猫)\n",
    );

    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();

    assert!(!output.html.contains("![Image]("));
    assert_eq!(
        img_sources(&output.html),
        vec![placeholder_url("a robot reading"), placeholder_url("一只猫")]
    );
    assert_eq!(output.stats.placeholders, 2);
    assert_eq!(output.stats.fallback_images, 2);
    assert!(output
        .images
        .iter()
        .all(|o| matches!(o.error, Some(GenerationError::Unavailable))));
    assert!(!dir.path().join("assets").exists(), "no assets without generation");
}

#[tokio::test]
async fn test_generated_images_are_embedded_and_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "intro\n\n![Image](a cat on a desk)\n");
    let backend = MockBackend::default();

    let output = convert_with_backend(&path, &ArticleConfig::default(), Some(&backend))
        .await
        .unwrap();

    let srcs = img_sources(&output.html);
    assert_eq!(srcs.len(), 1);
    assert!(srcs[0].starts_with("data:image/png;base64,"));
    assert_eq!(
        backend.prompts.lock().unwrap().as_slice(),
        ["flat illustration of a cat on a desk"]
    );

    let asset = output.images[0].asset_path.clone().expect("asset kept by default");
    assert!(asset.starts_with(dir.path().join("assets")));
    assert_eq!(std::fs::read(&asset).unwrap(), PNG_BYTES);

    let doc = Html::parse_document(&output.html);
    let img = select_all(&doc, "img")[0];
    assert_eq!(img.value().attr("alt"), Some("a cat on a desk"));
}

#[tokio::test]
async fn test_switched_off_generation_ignores_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "![Image](not drawn)\n");
    let backend = MockBackend::default();

    let output = convert_with_backend(&path, &offline_config(), Some(&backend))
        .await
        .unwrap();

    assert!(backend.prompts.lock().unwrap().is_empty());
    assert_eq!(img_sources(&output.html), vec![placeholder_url("not drawn")]);
    assert!(!dir.path().join("assets").exists());
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(
        dir.path(),
        "![Image](first ok)\n\n![Image](please fail)\n\n![Image](third ok)\n",
    );
    let backend = MockBackend::default();

    let output = convert_with_backend(&path, &ArticleConfig::default(), Some(&backend))
        .await
        .unwrap();

    let srcs = img_sources(&output.html);
    assert_eq!(srcs.len(), 3);
    assert!(srcs[0].starts_with("data:"));
    assert_eq!(srcs[1], placeholder_url("please fail"));
    assert!(srcs[2].starts_with("data:"));
    assert_eq!(output.stats.generated_images, 2);
    assert_eq!(output.stats.fallback_images, 1);
    assert_eq!(backend.prompts.lock().unwrap().len(), 3, "no retries");
}

#[tokio::test]
async fn test_discarded_assets_leave_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "![Image](x)\n");
    let config = ArticleConfig::builder()
        .keep_generated_assets(false)
        .build()
        .unwrap();

    let output = convert_with_backend(&path, &config, Some(&MockBackend::default()))
        .await
        .unwrap();

    assert!(output.images[0].asset_path.is_none());
    let leftover = std::fs::read_dir(dir.path().join("assets"))
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

// ── Local images ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_local_image_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ok.png"), PNG_BYTES).unwrap();
    let path = write_article(
        dir.path(),
        "![gone](missing.png)\n\n![ok](ok.png)\n\n![web](https://example.com/a.png)\n",
    );

    let logs = LogCapture::default();
    let _guard = logs.install();

    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();

    let logged = logs.contents();
    assert!(logged.contains("WARN"), "{logged}");
    assert!(logged.contains("Local image not found"), "{logged}");
    assert!(logged.contains("missing.png"), "{logged}");

    let srcs = img_sources(&output.html);
    assert_eq!(srcs[0], "missing.png");
    assert!(srcs[1].starts_with("data:image/png;base64,"));
    assert_eq!(srcs[2], "https://example.com/a.png");
    assert_eq!(output.stats.embedded_local_images, 1);
    assert_eq!(output.stats.missing_local_images, 1);
}

// ── Document shape ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_title_from_heading_or_default() {
    let dir = tempfile::tempdir().unwrap();
    let with_title = write_article(dir.path(), "# 深度学习 101\n\ntext\n");
    let output = convert_with_backend::<MockBackend>(&with_title, &offline_config(), None)
        .await
        .unwrap();
    assert_eq!(output.title, "深度学习 101");
    assert!(output.html.contains("<title>深度学习 101</title>"));

    let untitled = write_article(dir.path(), "## not a title\n\ntext\n");
    let output = convert_with_backend::<MockBackend>(&untitled, &offline_config(), None)
        .await
        .unwrap();
    assert_eq!(output.title, "科技速食科普");
}

#[tokio::test]
async fn test_styles_are_inlined() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(
        dir.path(),
        "# Title\n\nLead with `inline`.\n\nSecond.\n\n```rust\nlet x = 1;\n```\n\n> quote\n",
    );

    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();
    let doc = Html::parse_document(&output.html);

    let leads: Vec<_> = select_all(&doc, "p")
        .into_iter()
        .filter(|p| p.value().attr("style").is_some_and(|s| s.contains(LEAD_PARAGRAPH_STYLE)))
        .collect();
    assert_eq!(leads.len(), 1, "exactly one lead paragraph");
    assert!(leads[0].text().collect::<String>().starts_with("Lead with"));

    let inline = select_all(&doc, "p code")[0].value().attr("style").unwrap();
    let block = select_all(&doc, "pre code")[0].value().attr("style").unwrap();
    assert_eq!(inline, INLINE_CODE_STYLE);
    assert_eq!(block, StyledTag::Code.style());

    let h1 = select_all(&doc, "h1")[0].value().attr("style").unwrap();
    assert_eq!(h1, StyledTag::H1.style());

    let wrapper = select_all(&doc, "section#wechat-wrapper");
    assert_eq!(wrapper.len(), 1);
    assert_eq!(select_all(&doc, ".article-content blockquote").len(), 1);
}

#[tokio::test]
async fn test_lead_paragraph_keeps_author_style_last() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(
        dir.path(),
        "<p style=\"color: #333\">hand-written lead</p>\n\nsecond paragraph\n",
    );

    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();
    let doc = Html::parse_document(&output.html);
    let paragraphs = select_all(&doc, ".article-content p");

    let lead = paragraphs[0].value().attr("style").unwrap();
    let tag_at = lead.find(StyledTag::P.style()).expect("tag style");
    let lead_at = lead.find(LEAD_PARAGRAPH_STYLE).expect("lead style");
    let author_at = lead.find("color: #333").expect("author style");
    assert!(tag_at < lead_at && lead_at < author_at, "{lead}");

    assert_eq!(paragraphs[1].value().attr("style"), Some(StyledTag::P.style()));
}

#[tokio::test]
async fn test_output_is_self_contained_and_calibrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "text\n\n<p>   </p>\n\nmore\n");

    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();

    assert!(output.html.starts_with("<!DOCTYPE html>"));
    assert!(!output.html.contains("<link"));
    assert!(output.stats.removed_empty_paragraphs >= 1);

    let (again, removed) = calibrate(&output.html);
    assert_eq!(again, output.html, "calibration is idempotent");
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_output_serialises_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "![Image](json check)\n");
    let output = convert_with_backend::<MockBackend>(&path, &offline_config(), None)
        .await
        .unwrap();

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["stats"]["placeholders"], 1);
    assert_eq!(json["images"][0]["description"], "json check");
}

// ── Errors and entry points ──────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("nope.md");
    let out = dir.path().join("nope.html");
    let logs = LogCapture::default();
    let _guard = logs.install();

    let err = convert_to_file(&input, &out, &ArticleConfig::default())
        .await
        .unwrap_err();

    let logged = logs.contents();
    assert!(logged.contains("ERROR"), "{logged}");
    assert!(logged.contains("Input file does not exist"), "{logged}");

    assert!(matches!(err, ArticleError::InputNotFound { .. }));
    assert!(!out.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_convert_sync_without_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "# Sync\n\n![Image](offline)\n");

    let output = convert_sync(&path, &ArticleConfig::default()).unwrap();

    assert_eq!(output.title, "Sync");
    assert!(output.html.contains("placehold.co"));
}

#[test]
fn test_progress_events_in_order() {
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn on_image_complete(&self, index: usize, _total: usize, _bytes: usize) {
            self.events.lock().unwrap().push(format!("ok {index}"));
        }
        fn on_image_fallback(&self, index: usize, _total: usize, _reason: &str) {
            self.events.lock().unwrap().push(format!("fallback {index}"));
        }
        fn on_conversion_complete(&self, total: usize, generated: usize) {
            self.events.lock().unwrap().push(format!("done {generated}/{total}"));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = write_article(dir.path(), "![Image](one)\n\n![Image](do fail)\n");
    let recorder = Arc::new(Recorder {
        events: Mutex::new(Vec::new()),
    });
    let config = ArticleConfig::builder()
        .progress_callback(Arc::clone(&recorder) as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();
    let backend = MockBackend::default();

    tokio_test::block_on(convert_with_backend(&path, &config, Some(&backend))).unwrap();

    assert_eq!(
        recorder.events.lock().unwrap().as_slice(),
        ["start 2", "ok 1", "fallback 2", "done 1/2"]
    );
}
