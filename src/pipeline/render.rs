//! Markdown → HTML fragment.
//!
//! Thin layer over `pulldown-cmark` with GitHub-style extensions switched on,
//! plus what the stock renderer lacks:
//!
//! - every heading gets a unique, slug-style `id` (explicit `{#id}` wins);
//! - a paragraph containing only `[TOC]` becomes a nested list of links to
//!   those headings, wrapped in `<div class="toc">`;
//! - fenced code in a known language is syntax highlighted.

use crate::pipeline::dom::escape;
use crate::pipeline::highlight::highlight_code;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;

const TOC_MARKER: &str = "[TOC]";

#[derive(Debug, Clone, PartialEq, Eq)]
struct TocEntry {
    level: u8,
    id: String,
    text: String,
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render Markdown to an HTML fragment.
pub fn render_markdown(markdown: &str) -> String {
    let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, options()).collect();
    let headings = assign_heading_ids(&mut events);
    replace_toc_markers(&mut events, &headings);
    let events = highlight_code_blocks(events);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Swap each fenced block in a known language for highlighted raw HTML,
/// keeping the `language-<lang>` class the stock renderer would emit.
fn highlight_code_blocks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        let lang = match &event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                info.split_whitespace().next().map(str::to_string)
            }
            _ => None,
        };
        let Some(lang) = lang else {
            out.push(event);
            continue;
        };

        let mut inner = Vec::new();
        let mut end = None;
        for e in iter.by_ref() {
            if matches!(e, Event::End(TagEnd::CodeBlock)) {
                end = Some(e);
                break;
            }
            inner.push(e);
        }
        let code: String = inner
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) => Some(&**t),
                _ => None,
            })
            .collect();

        match highlight_code(&lang, &code) {
            Some(spans) => out.push(Event::Html(CowStr::from(format!(
                "<pre><code class=\"language-{}\">{spans}</code></pre>\n",
                escape(&lang)
            )))),
            None => {
                out.push(event);
                out.extend(inner);
                out.extend(end);
            }
        }
    }
    out
}

fn assign_heading_ids(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    let mut entries = Vec::new();
    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { level, id, .. }) = &events[i] else {
            i += 1;
            continue;
        };
        let level = *level as u8;
        let explicit = id.as_ref().map(|id| id.to_string());

        let end = events[i..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
            .map_or(events.len(), |p| i + p);
        let text: String = events[i + 1..end]
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(&**t),
                _ => None,
            })
            .collect();

        let id = match explicit {
            Some(id) => id,
            None => {
                let slug = unique_slug(&text, &mut used);
                if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
                    *slot = Some(CowStr::from(slug.clone()));
                }
                slug
            }
        };

        entries.push(TocEntry {
            level,
            id,
            text: text.trim().to_string(),
        });
        i = end;
    }
    entries
}

fn unique_slug(text: &str, used: &mut HashSet<String>) -> String {
    let base = slugify(text);
    let mut slug = base.clone();
    let mut n = 1;
    while used.contains(&slug) {
        slug = format!("{base}-{n}");
        n += 1;
    }
    used.insert(slug.clone());
    slug
}

/// Lowercase, keep letters and digits of any script, join words with `-`.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn replace_toc_markers(events: &mut Vec<Event<'_>>, headings: &[TocEntry]) {
    let mut markers = Vec::new();
    let mut i = 0;
    while i < events.len() {
        if !matches!(events[i], Event::Start(Tag::Paragraph)) {
            i += 1;
            continue;
        }
        let Some(len) = events[i + 1..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Paragraph)))
        else {
            break;
        };
        let end = i + 1 + len;
        let inner = &events[i + 1..end];
        if inner.iter().all(|e| matches!(e, Event::Text(_))) {
            let text: String = inner
                .iter()
                .filter_map(|e| match e {
                    Event::Text(t) => Some(&**t),
                    _ => None,
                })
                .collect();
            if text.trim() == TOC_MARKER {
                markers.push(i..=end);
            }
        }
        i = end + 1;
    }

    if markers.is_empty() {
        return;
    }
    let toc = build_toc(headings);
    for range in markers.into_iter().rev() {
        events.splice(range, [Event::Html(CowStr::from(toc.clone()))]);
    }
}

/// Nested `<ul>` of heading links. A jump of several levels nests only once.
fn build_toc(headings: &[TocEntry]) -> String {
    let mut out = String::from("<div class=\"toc\">\n");
    let mut stack: Vec<u8> = Vec::new();

    for h in headings {
        match stack.last().copied() {
            None => {
                out.push_str("<ul>\n");
                stack.push(h.level);
            }
            Some(top) if h.level > top => {
                out.push_str("\n<ul>\n");
                stack.push(h.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                while stack.len() > 1 && stack[stack.len() - 2] >= h.level {
                    stack.pop();
                    out.push_str("</ul>\n</li>\n");
                }
                if let Some(top) = stack.last_mut() {
                    *top = (*top).min(h.level);
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape(&h.id),
            escape(&h.text)
        ));
    }

    if !stack.is_empty() {
        out.push_str("</li>\n");
        while stack.pop().is_some() {
            out.push_str("</ul>\n");
            if !stack.is_empty() {
                out.push_str("</li>\n");
            }
        }
    }
    out.push_str("</div>\n");
    out
}
