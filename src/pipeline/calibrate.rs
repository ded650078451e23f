//! Final cleanup of the assembled document.
//!
//! Markdown rendering and raw HTML in articles leave behind paragraphs with
//! nothing in them, which the WeChat editor renders as tall blank gaps. This
//! pass drops every `<p>` that has neither visible text nor an image.
//! Running it on its own output changes nothing.

use crate::pipeline::dom::{apply_edits, serialize_document, Edit, Edits};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Remove vacuous paragraphs from a full HTML document.
///
/// Returns the cleaned document and how many paragraphs were removed.
pub fn calibrate(document: &str) -> (String, usize) {
    let mut html = Html::parse_document(document);
    let edits: Edits = html
        .select(&P)
        .filter(is_vacuous)
        .map(|p| (p.id(), Edit::Remove))
        .collect();

    let removed = edits.len();
    if removed > 0 {
        debug!("Calibration removed {} empty paragraph(s)", removed);
    }
    apply_edits(&mut html, &edits);
    (serialize_document(&mut html), removed)
}

fn is_vacuous(p: &ElementRef<'_>) -> bool {
    p.text().all(|t| t.trim().is_empty()) && p.select(&IMG).next().is_none()
}
