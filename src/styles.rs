//! The fixed inline-style table for WeChat output.
//!
//! The WeChat editor strips `<style>` blocks on paste, so every visual rule of
//! the bundled stylesheet that matters has to be repeated in a `style=""`
//! attribute. [`StyledTag`] enumerates the tags that get one; anything not
//! listed is simply left alone. Page-level containers live in [`Container`]
//! and are applied by the document assembler, never per element.

/// A tag that receives an inline style from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyledTag {
    H1,
    H2,
    H3,
    P,
    Strong,
    Blockquote,
    Ul,
    Ol,
    Li,
    Pre,
    /// Code inside a `<pre>` block. Inline code uses [`INLINE_CODE_STYLE`].
    Code,
    Img,
    Hr,
}

impl StyledTag {
    /// Every styled tag, in table order.
    pub const ALL: [StyledTag; 13] = [
        StyledTag::H1,
        StyledTag::H2,
        StyledTag::H3,
        StyledTag::P,
        StyledTag::Strong,
        StyledTag::Blockquote,
        StyledTag::Ul,
        StyledTag::Ol,
        StyledTag::Li,
        StyledTag::Pre,
        StyledTag::Code,
        StyledTag::Img,
        StyledTag::Hr,
    ];

    /// Look up a lowercase HTML tag name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            StyledTag::H1 => "h1",
            StyledTag::H2 => "h2",
            StyledTag::H3 => "h3",
            StyledTag::P => "p",
            StyledTag::Strong => "strong",
            StyledTag::Blockquote => "blockquote",
            StyledTag::Ul => "ul",
            StyledTag::Ol => "ol",
            StyledTag::Li => "li",
            StyledTag::Pre => "pre",
            StyledTag::Code => "code",
            StyledTag::Img => "img",
            StyledTag::Hr => "hr",
        }
    }

    pub const fn style(self) -> &'static str {
        match self {
            StyledTag::H1 => "font-size: 1.6rem; font-weight: 700; color: #222; margin-bottom: 24px; line-height: 1.4;",
            StyledTag::H2 => "display: inline-block; background: #E9C4B1; color: #222; font-size: 1.15rem; padding: 4px 16px; border-radius: 20px; margin: 40px 0 20px; font-weight: 600; box-shadow: 2px 2px 0px rgba(0, 0, 0, 0.05);",
            StyledTag::H3 => "font-size: 1.05rem; font-weight: 600; color: #333333; margin: 28px 0 12px; border-left: 4px solid #FF9E66; padding-left: 10px; line-height: 1.2;",
            StyledTag::P => "margin-bottom: 20px; text-align: justify; letter-spacing: 0.03em; font-size: 1rem;",
            StyledTag::Strong => "color: #D35400; background: linear-gradient(180deg, transparent 65%, rgba(255, 158, 102, 0.2) 65%); padding: 0 2px;",
            StyledTag::Blockquote => "background: #FFF9E6; border-left: 4px solid #FF9E66; border-radius: 12px; padding: 16px 20px; margin: 24px 0; color: #5F5F5F; font-size: 0.95rem;",
            StyledTag::Ul | StyledTag::Ol => "padding-left: 20px; margin-bottom: 24px; color: #5F5F5F;",
            StyledTag::Li => "margin-bottom: 8px;",
            StyledTag::Pre => "background: #282C34; border-radius: 12px; padding: 40px 20px 20px; position: relative; overflow-x: auto; margin: 24px 0; color: #ABB2BF; font-size: 0.85rem; line-height: 1.6;",
            StyledTag::Code => "font-family: 'Fira Code', Consolas, monospace;",
            StyledTag::Img => "display: block; max-width: 100%; border-radius: 12px; margin: 24px auto; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.08);",
            StyledTag::Hr => "border: 0; height: 1px; background: #E0E0E0; margin: 40px 60px;",
        }
    }
}

/// Style for `<code>` outside a `<pre>` block.
pub const INLINE_CODE_STYLE: &str =
    "background: #F0EEE6; color: #C04848; padding: 2px 6px; border-radius: 4px; font-size: 0.9em;";

/// Extra style for the lead paragraph. The top border stands in for the
/// stylesheet's `::before` accent bar, which cannot be inlined.
pub const LEAD_PARAGRAPH_STYLE: &str = "background: #FFF; border: 1px solid #EAEAEA; padding: 24px; border-radius: 12px; font-size: 1.05rem; color: #444; box-shadow: 0 8px 16px rgba(0, 0, 0, 0.04); position: relative; overflow: hidden; border-top: 4px solid #FF9E66;";

/// Page-level wrappers styled by the assembler instead of the inliner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// The outermost `section#wechat-wrapper`, standing in for `<body>`.
    Body,
    /// `div.article-container`.
    ArticleContainer,
    /// `div.article-content`.
    ArticleContent,
}

impl Container {
    pub const fn style(self) -> &'static str {
        match self {
            Container::Body => "background-color: #FAF9F5; min-height: 100vh; font-family: -apple-system, BlinkMacSystemFont, 'PingFang SC', 'Hiragino Sans GB', 'Microsoft YaHei', sans-serif; color: #333333; line-height: 1.75;",
            Container::ArticleContainer => "max-width: 680px; margin: 0 auto; background: #FAF9F5;",
            Container::ArticleContent => "padding: 24px 20px 60px; background: #FAF9F5;",
        }
    }
}
