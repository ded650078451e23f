//! Pipeline stages for Markdown-to-WeChat conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! placeholder ──▶ generate ──▶ embed ──▶ render ──▶ inline ──▶ assemble ──▶ calibrate
//!  (scan)        (Gemini)     (local)   (cmark)    (styles)   (shell)      (cleanup)
//! ```
//!
//! 1. [`placeholder`]: find `![Image](description)` markers and splice
//!    replacements back in
//! 2. [`generate`]: expand each description, generate an image, embed it or
//!    fall back to a placeholder URL; the only stage with network I/O
//! 3. [`embed`]: inline local image files as data URIs
//! 4. [`render`]: Markdown to an HTML fragment, with heading ids, `[TOC]`
//!    and code blocks coloured by [`highlight`]
//! 5. [`inline`]: write the style table into `style` attributes
//! 6. [`assemble`]: wrap the body in the page shell with the copy button
//! 7. [`calibrate`]: drop paragraphs with no text and no image
//!
//! [`encode`] and [`dom`] are shared helpers: data-URI encoding, and in-place
//! tree edits plus serialisation over `scraper`.

pub mod assemble;
pub mod calibrate;
pub mod dom;
pub mod embed;
pub mod encode;
pub mod generate;
pub mod highlight;
pub mod inline;
pub mod placeholder;
pub mod render;
