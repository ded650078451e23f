//! In-place edits on a parsed [`scraper::Html`] tree.
//!
//! The transforming stages decide what should change, keyed by [`NodeId`],
//! then [`apply_edits`] rewrites the tree and [`serialize_fragment`] /
//! [`serialize_document`] write it out through html5ever's serialiser.

use ego_tree::NodeId;
use html5ever::{LocalName, Namespace, QualName};
use pulldown_cmark_escape::escape_html;
use scraper::node::{Element, Node};
use scraper::Html;
use std::collections::HashMap;

/// A change to apply to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Put these declarations in front of the element's existing `style`.
    PrependStyle(String),
    /// Drop the element and everything under it.
    Remove,
}

pub type Edits = HashMap<NodeId, Edit>;

/// Elements whose first newline is eaten by the parser.
const LEADING_NEWLINE: &[&str] = &["pre", "textarea", "listing"];

/// Rewrite the tree according to `edits`.
pub fn apply_edits(html: &mut Html, edits: &Edits) {
    for (&id, edit) in edits {
        let Some(mut node) = html.tree.get_mut(id) else {
            continue;
        };
        match edit {
            Edit::Remove => node.detach(),
            Edit::PrependStyle(css) => {
                if let Node::Element(element) = node.value() {
                    prepend_style(element, css);
                }
            }
        }
    }
}

/// Serialise the content of a tree built with [`Html::parse_fragment`].
pub fn serialize_fragment(html: &mut Html) -> String {
    keep_leading_newlines(html);
    html.root_element().inner_html()
}

/// Serialise a tree built with [`Html::parse_document`], doctype included.
pub fn serialize_document(html: &mut Html) -> String {
    keep_leading_newlines(html);
    html.html()
}

fn prepend_style(element: &mut Element, css: &str) {
    let key = QualName::new(None, Namespace::from(""), LocalName::from("style"));
    // scraper keeps attributes sorted by name
    match element.attrs.binary_search_by(|(name, _)| name.cmp(&key)) {
        Ok(i) => {
            let merged = merge_style(css, &element.attrs[i].1);
            element.attrs[i].1 = merged.into();
        }
        Err(i) => element.attrs.insert(i, (key, css.to_string().into())),
    }
}

/// Mapped declarations first, then whatever the author wrote, so the author's
/// values win for repeated properties.
fn merge_style(prefix: &str, existing: &str) -> String {
    let existing = existing.trim();
    if existing.is_empty() {
        return prefix.to_string();
    }
    let mut merged = prefix.trim_end().to_string();
    if !merged.ends_with(';') {
        merged.push(';');
    }
    merged.push(' ');
    merged.push_str(existing);
    merged
}

/// The parser drops one newline right after `<pre>`, the serialiser never
/// writes it back. Doubling a leading newline in the tree makes a
/// parse/serialise round trip lossless.
fn keep_leading_newlines(html: &mut Html) {
    let ids: Vec<NodeId> = html
        .tree
        .nodes()
        .filter(|n| {
            n.value()
                .as_element()
                .is_some_and(|e| LEADING_NEWLINE.contains(&e.name()))
        })
        .filter_map(|n| n.first_child())
        .filter(|c| c.value().as_text().is_some_and(|t| t.starts_with('\n')))
        .map(|c| c.id())
        .collect();

    for id in ids {
        if let Some(mut node) = html.tree.get_mut(id) {
            if let Node::Text(text) = node.value() {
                text.text = format!("\n{}", &*text.text).into();
            }
        }
    }
}

/// Escape text for an HTML body or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let _ = escape_html(&mut out, text);
    out
}
