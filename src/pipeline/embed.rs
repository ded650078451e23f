//! Local image embedding.
//!
//! Rewrites `![alt](relative/or/absolute/path)` so the target becomes a data
//! URI. Targets that are already `data:` URIs or `http(s)://` URLs are left
//! alone, as are paths that do not exist (with a warning). Running the pass
//! twice changes nothing the second time.

use crate::pipeline::encode::file_to_data_uri;
use crate::pipeline::placeholder::apply_replacements;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// What the embedding pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedReport {
    /// Images replaced by a data URI.
    pub embedded: usize,
    /// Local targets that could not be read.
    pub missing: Vec<PathBuf>,
}

/// Embed every local image reference of `content`, resolving relative paths
/// against `base_dir`.
pub async fn embed_local_images(content: &str, base_dir: &Path) -> (String, EmbedReport) {
    let mut report = EmbedReport::default();
    let mut replacements = Vec::new();

    for caps in RE_IMAGE.captures_iter(content) {
        let (Some(whole), Some(alt), Some(target)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some((raw_path, title)) = local_target(target.as_str()) else {
            continue;
        };

        let path = base_dir.join(raw_path);
        match file_to_data_uri(&path).await {
            Ok(uri) => {
                debug!("Embedded local image {}", path.display());
                replacements.push((whole.range(), format!("![{}]({uri}{title})", alt.as_str())));
                report.embedded += 1;
            }
            Err(e) => {
                warn!("Local image not found: {} ({})", path.display(), e);
                report.missing.push(path);
            }
        }
    }

    (apply_replacements(content, replacements), report)
}

/// Split an image target into its filesystem path and the trailing title
/// part (kept verbatim, leading space included). `None` for remote and
/// inline targets.
///
/// Accepts `<path with spaces>`.
fn local_target(target: &str) -> Option<(&str, &str)> {
    let target = target.trim();
    if target.is_empty() || is_remote(target) {
        return None;
    }
    if let Some(inner) = target.strip_prefix('<') {
        let (path, rest) = inner.split_once('>')?;
        return (!path.is_empty()).then_some((path, rest));
    }
    match target.find(char::is_whitespace) {
        Some(at) if target[at..].trim_start().starts_with(['"', '\'']) => {
            Some((&target[..at], &target[at..]))
        }
        _ => Some((target, "")),
    }
}

fn is_remote(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("data:") || lower.starts_with("http://") || lower.starts_with("https://")
}
