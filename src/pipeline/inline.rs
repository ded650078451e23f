//! Style inlining for the rendered article body.
//!
//! Runs in two passes over a parsed fragment:
//!
//! 1. [`plan_styles`] walks the tree and records, for each element that the
//!    style table covers, which style layers it gets and in what order;
//! 2. [`apply_styles`] writes those layers into each element's `style`,
//!    ahead of any style the author already put there.
//!
//! Two rules are not a plain tag lookup. `code` inside `pre` is a code block
//! and takes the table's `code` entry, any other `code` is inline and takes
//! [`INLINE_CODE_STYLE`]. The first `p` of the fragment is the lead paragraph
//! and gets [`LEAD_PARAGRAPH_STYLE`] on top of its tag style.
//!
//! Page wrappers (`body`, `section#wechat-wrapper`, the article containers)
//! have no table entry and are styled by [`crate::pipeline::assemble`].

use crate::pipeline::dom::{apply_edits, serialize_fragment, Edit, Edits};
use crate::styles::{StyledTag, INLINE_CODE_STYLE, LEAD_PARAGRAPH_STYLE};
use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use tracing::debug;

/// One source of declarations for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleLayer {
    Tag(StyledTag),
    InlineCode,
    LeadParagraph,
}

impl StyleLayer {
    pub fn css(self) -> &'static str {
        match self {
            StyleLayer::Tag(tag) => tag.style(),
            StyleLayer::InlineCode => INLINE_CODE_STYLE,
            StyleLayer::LeadParagraph => LEAD_PARAGRAPH_STYLE,
        }
    }
}

/// Styles planned for one element, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDecision {
    pub node: NodeId,
    pub layers: Vec<StyleLayer>,
}

impl StyleDecision {
    fn declarations(&self) -> String {
        self.layers
            .iter()
            .map(|layer| layer.css())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decide the style layers of every element, in document order.
pub fn plan_styles(html: &Html) -> Vec<StyleDecision> {
    let mut plan = Vec::new();
    let mut lead_taken = false;

    for el in html.root_element().descendants().filter_map(ElementRef::wrap) {
        let name = el.value().name();
        let layers = match name {
            "code" if in_pre(&el) => vec![StyleLayer::Tag(StyledTag::Code)],
            "code" => vec![StyleLayer::InlineCode],
            "p" if !lead_taken => {
                lead_taken = true;
                vec![StyleLayer::Tag(StyledTag::P), StyleLayer::LeadParagraph]
            }
            _ => match StyledTag::from_name(name) {
                Some(tag) => vec![StyleLayer::Tag(tag)],
                None => continue,
            },
        };
        plan.push(StyleDecision {
            node: el.id(),
            layers,
        });
    }
    plan
}

fn in_pre(el: &ElementRef<'_>) -> bool {
    el.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "pre")
}

/// Write the planned styles into the tree.
pub fn apply_styles(html: &mut Html, plan: &[StyleDecision]) {
    let edits: Edits = plan
        .iter()
        .map(|d| (d.node, Edit::PrependStyle(d.declarations())))
        .collect();
    apply_edits(html, &edits);
}

/// Inline styles into an HTML fragment.
///
/// Returns the styled fragment and the number of elements styled.
pub fn inline_styles(fragment: &str) -> (String, usize) {
    let mut html = Html::parse_fragment(fragment);
    let plan = plan_styles(&html);
    debug!("Inlining styles on {} element(s)", plan.len());
    apply_styles(&mut html, &plan);
    (serialize_fragment(&mut html), plan.len())
}
