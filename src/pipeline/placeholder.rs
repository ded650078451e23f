//! Placeholder scanning and span replacement.
//!
//! Authors mark "draw a picture here" with an image whose alt text is the
//! reserved word `Image` and whose target is a free-text description:
//!
//! ```text
//! ![Image](a robot reading a newspaper at breakfast)
//! ```
//!
//! The label is matched case-insensitively. The description runs to the first
//! closing parenthesis.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)!\[Image\]\((.*?)\)").unwrap());

/// One `![Image](…)` marker found in the article source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlaceholder {
    /// Byte range of the whole marker in the scanned text.
    pub span: Range<usize>,
    /// Text between the parentheses, as written.
    pub description: String,
}

/// Find every placeholder, in document order.
pub fn find_placeholders(content: &str) -> Vec<ImagePlaceholder> {
    RE_PLACEHOLDER
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let desc = caps.get(1)?;
            Some(ImagePlaceholder {
                span: whole.range(),
                description: desc.as_str().to_string(),
            })
        })
        .collect()
}

/// Apply non-overlapping span replacements.
///
/// Replacements are applied back-to-front so each earlier span still points
/// at the text it was computed against. Order of `replacements` on input does
/// not matter.
pub fn apply_replacements(content: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by_key(|(span, _)| span.start);
    let mut out = content.to_string();
    for (span, text) in replacements.into_iter().rev() {
        out.replace_range(span, &text);
    }
    out
}

/// Escape characters that would end a Markdown image's alt text early.
pub fn escape_alt(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_markers_in_order() {
        let src = "intro\n![Image](a cat)\ntext ![image](一只狗) end";
        let found = find_placeholders(src);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].description, "a cat");
        assert_eq!(&src[found[0].span.clone()], "![Image](a cat)");
        assert_eq!(found[1].description, "一只狗");
        assert_eq!(&src[found[1].span.clone()], "![image](一只狗)");
    }

    #[test]
    fn ordinary_images_are_not_placeholders() {
        let src = "![diagram](img/a.png) ![Images](x) ![](y)";
        assert!(find_placeholders(src).is_empty());
    }

    #[test]
    fn description_stops_at_first_paren() {
        let found = find_placeholders("![Image](a (big) cat)");
        assert_eq!(found[0].description, "a (big");
    }

    #[test]
    fn empty_description_is_still_a_placeholder() {
        let found = find_placeholders("![Image]()");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "");
    }

    #[test]
    fn replacements_keep_offsets_valid() {
        let src = "A ![Image](x) B ![Image](yy) C";
        let reps: Vec<_> = find_placeholders(src)
            .into_iter()
            .map(|p| (p.span, format!("<{}>", p.description.to_uppercase())))
            .collect();
        assert_eq!(apply_replacements(src, reps), "A <X> B <YY> C");
    }

    #[test]
    fn replacement_order_on_input_is_irrelevant() {
        let src = "0123456789";
        let reps = vec![(7..9, "b".to_string()), (1..3, "a".to_string())];
        assert_eq!(apply_replacements(src, reps), "0a3456b9");
    }

    #[test]
    fn multibyte_spans_are_respected() {
        let src = "前 ![Image](猫) 后";
        let reps: Vec<_> = find_placeholders(src)
            .into_iter()
            .map(|p| (p.span, "X".to_string()))
            .collect();
        assert_eq!(apply_replacements(src, reps), "前 X 后");
    }

    #[test]
    fn escape_alt_brackets() {
        assert_eq!(escape_alt("a [b] c"), r"a \[b\] c");
        assert_eq!(escape_alt("plain"), "plain");
    }
}
