//! CLI binary for md2wechat.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ArticleConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2wechat::{
    convert_to_file, default_output_path, ArticleConfig, ConversionOutput,
    ConversionProgressCallback, ImageResolution, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across all placeholders, one log line
/// per illustration.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the image currently being generated.
    started: Mutex<Option<Instant>>,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Illustrating");

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_images: usize) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total_images as u64);
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_images} image placeholder(s)…"))
        ));
    }

    fn on_image_start(&self, _index: usize, _total: usize, description: &str) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        let short: String = description.chars().take(30).collect();
        self.bar.set_message(short);
    }

    fn on_image_complete(&self, index: usize, total: usize, bytes: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {:<10}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{:>6} KB", bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_fallback(&self, index: usize, total: usize, reason: &str) {
        let secs = self.elapsed_secs();
        self.fallbacks.fetch_add(1, Ordering::SeqCst);

        let msg: String = if reason.chars().count() > 80 {
            reason.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}  {}",
            yellow("↺"),
            index,
            total,
            yellow(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_images: usize, generated: usize) {
        self.bar.finish_and_clear();
        let fallback = total_images.saturating_sub(generated);
        if fallback == 0 {
            eprintln!("{} {} image(s) generated", green("✔"), bold(&generated.to_string()));
        } else {
            eprintln!(
                "{} {}/{} image(s) generated  ({} placeholder)",
                cyan("⚠"),
                bold(&generated.to_string()),
                total_images,
                yellow(&fallback.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the source (article.html)
  md2wechat article.md

  # Choose the output file and open it in the browser
  md2wechat article.md -o out/wechat.html --preview

  # Highest resolution, with search grounding
  md2wechat --resolution high --enable-search article.md

  # Offline: skip Gemini, use placeholder images
  md2wechat --no-generate article.md

  # Machine-readable summary
  md2wechat --json article.md > summary.json

IMAGE PLACEHOLDERS:
  Write ![Image](a short description) anywhere in the article. Each one is
  expanded into a detailed prompt, drawn by the image model, saved under
  assets/ beside the article and embedded as a data URI. Without an API key
  it becomes a placehold.co image showing the description.

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (GEMINI_API_KEY also accepted)
  IMG_MODEL_NAME      Image model       (default gemini-3-pro-image-preview)
  TEXT_MODEL_NAME     Prompt model      (default gemini-3-pro-preview)
  IMAGE_RESOLUTION    low|medium|high or 1k|2k|4k (default medium)
  ENABLE_SEARCH       true to ground image generation in Google Search
  RUST_LOG            Override log filter (e.g. md2wechat=debug)
"#;

/// Convert a Markdown article into WeChat-ready HTML.
#[derive(Parser, Debug)]
#[command(
    name = "md2wechat",
    version,
    about = "Convert Markdown articles into styled, self-contained HTML for WeChat",
    long_about = "Convert a Markdown article into a single HTML page whose styles are inlined \
so they survive pasting into the WeChat official-account editor. Image placeholders are \
illustrated with Google Gemini; local images are embedded as data URIs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    input: PathBuf,

    /// Write HTML to this file (default: INPUT with an .html extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open the result in the default browser.
    #[arg(long)]
    preview: bool,

    /// Gemini model used to draw illustrations.
    #[arg(long, env = "IMG_MODEL_NAME")]
    image_model: Option<String>,

    /// Gemini model used to expand descriptions into prompts.
    #[arg(long, env = "TEXT_MODEL_NAME")]
    text_model: Option<String>,

    /// Illustration size: low, medium, high (or 1k, 2k, 4k).
    #[arg(long, env = "IMAGE_RESOLUTION", value_parser = parse_resolution)]
    resolution: Option<ImageResolution>,

    /// Ground image generation in Google Search results.
    ///
    /// From the environment, `0/n/no/f/false/off` mean off, anything else on.
    #[arg(long, env = "ENABLE_SEARCH", value_parser = clap::builder::FalseyValueParser::new())]
    enable_search: bool,

    /// Never call Gemini; every placeholder becomes a placeholder image.
    #[arg(long)]
    no_generate: bool,

    /// Delete generated files under assets/ once they are embedded.
    #[arg(long)]
    discard_assets: bool,

    /// CSS template to use instead of the bundled one.
    #[arg(long)]
    css: Option<PathBuf>,

    /// Print the conversion summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_resolution(s: &str) -> std::result::Result<ImageResolution, String> {
    s.parse().map_err(|e: md2wechat::ArticleError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let output = convert_to_file(&cli.input, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&Summary::new(&output, &output_path))
            .context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, &output_path);
    }

    if cli.preview {
        open_preview(&output_path);
    }
    Ok(())
}

/// Map CLI args to `ArticleConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ArticleConfig> {
    let mut builder = ArticleConfig::builder()
        .apply_env(|name| std::env::var(name).ok())
        .context("Invalid environment configuration")?
        .enable_search(cli.enable_search)
        .generate_images(!cli.no_generate)
        .keep_generated_assets(!cli.discard_assets);

    if let Some(ref model) = cli.image_model {
        builder = builder.image_model(model);
    }
    if let Some(ref model) = cli.text_model {
        builder = builder.text_model(model);
    }
    if let Some(resolution) = cli.resolution {
        builder = builder.resolution(resolution);
    }
    if let Some(ref css) = cli.css {
        builder = builder.css_path(css);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// JSON summary: everything in the output except the HTML itself.
#[derive(serde::Serialize)]
struct Summary<'a> {
    output: &'a Path,
    title: &'a str,
    images: &'a [md2wechat::ImageOutcome],
    stats: &'a md2wechat::ConversionStats,
}

impl<'a> Summary<'a> {
    fn new(output: &'a ConversionOutput, path: &'a Path) -> Self {
        Self {
            output: path,
            title: &output.title,
            images: &output.images,
            stats: &output.stats,
        }
    }
}

fn print_summary(output: &ConversionOutput, path: &Path) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}  {}ms  →  {}",
        if stats.fallback_images == 0 && stats.missing_local_images == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(&output.title),
        stats.total_duration_ms,
        bold(&path.display().to_string()),
    );
    eprintln!(
        "   {} generated  /  {} placeholder  /  {} local embedded  /  {} missing",
        dim(&stats.generated_images.to_string()),
        dim(&stats.fallback_images.to_string()),
        dim(&stats.embedded_local_images.to_string()),
        dim(&stats.missing_local_images.to_string()),
    );
}

fn open_preview(path: &Path) {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if let Err(e) = webbrowser::open(&target.to_string_lossy()) {
        tracing::warn!("Could not open browser preview: {}", e);
    }
}
