//! Prompts sent to the generative models.
//!
//! Kept in one place so prompt wording can be tuned, and inspected by tests,
//! without touching the request plumbing in [`crate::pipeline::generate`].

/// System prompt for expanding a short (usually Chinese) description into a
/// detailed English illustration prompt.
pub const EXPANSION_SYSTEM_PROMPT: &str = r#"You are an expert prompt writer for AI illustration. Expand the short scene description you are given into one detailed English image-generation prompt.

Requirements:
1. STYLE: modern minimalist flat illustration, soft warm Morandi palette, suitable as an inline picture in a WeChat official-account article.
2. COMPOSITION: simple and uncluttered, generous negative space, no overly intricate detail.
3. OUTPUT: the English prompt only. No explanations, no quotes, no Markdown."#;

/// Build the user message carrying the original description.
pub fn expansion_request(description: &str) -> String {
    format!("Original description: {description}")
}

/// Build the text part of an image-generation request.
pub fn image_request(prompt: &str) -> String {
    format!("Generate an image of: {prompt}")
}
