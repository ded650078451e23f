//! Syntax highlighting for fenced code blocks.
//!
//! The WeChat editor strips stylesheets and class names on paste, so tokens
//! are coloured with inline `style` attributes on `<span>`s rather than with
//! CSS classes.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Light theme matching the article's code block background.
const THEME: &str = "InspiredGitHub";

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Highlight `code` written in `lang` as escaped HTML made of styled spans.
///
/// Returns `None` for an unknown language or when highlighting fails; the
/// block is then rendered plain.
pub fn highlight_code(lang: &str, code: &str) -> Option<String> {
    let lang = lang.trim();
    if lang.is_empty() {
        return None;
    }
    let syntax = SYNTAXES.find_syntax_by_token(lang)?;
    let theme = THEMES.themes.get(THEME)?;

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = String::with_capacity(code.len() * 4);
    for line in LinesWithEndings::from(code) {
        let regions = match highlighter.highlight_line(line, &SYNTAXES) {
            Ok(regions) => regions,
            Err(e) => {
                debug!("Highlighting '{}' failed, rendering plain: {}", lang, e);
                return None;
            }
        };
        out.push_str(&styled_line_to_highlighted_html(&regions, IncludeBackground::No).ok()?);
    }
    Some(out)
}
