//! Document assembly: wrap the styled body in the WeChat page shell.
//!
//! The shell carries the stylesheet for the browser preview, a floating
//! "一键复制" button that selects the article and copies it as rich text, and
//! three nested wrappers whose inline styles survive the paste into the
//! WeChat editor.

use crate::config::ArticleConfig;
use crate::pipeline::dom::escape;
use crate::styles::Container;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stylesheet compiled into the binary, used when no template file is found.
pub const BUNDLED_CSS: &str = include_str!("../../templates/wechat_style.css");

/// Template path relative to the executable's directory.
const TEMPLATE_RELATIVE: &str = "templates/wechat_style.css";

const GENERATOR: &str = "md2wechat";

const COPY_BUTTON_CSS: &str = r#"
.copy-btn {
  position: fixed;
  top: 20px;
  right: 20px;
  padding: 12px 24px;
  background: linear-gradient(135deg, #FF9E66, #E9C4B1);
  color: #fff;
  border: none;
  border-radius: 25px;
  font-size: 14px;
  font-weight: 600;
  cursor: pointer;
  box-shadow: 0 4px 15px rgba(255, 158, 102, 0.4);
  transition: all 0.3s ease;
  z-index: 9999;
  display: flex;
  align-items: center;
  gap: 8px;
}
.copy-btn:hover {
  transform: translateY(-2px);
  box-shadow: 0 6px 20px rgba(255, 158, 102, 0.5);
}
.copy-btn:active { transform: translateY(0); }
.copy-btn.success { background: linear-gradient(135deg, #27C93F, #52D668); }
.copy-btn svg { width: 18px; height: 18px; fill: currentColor; }
.copy-toast {
  position: fixed;
  top: 80px;
  right: 20px;
  padding: 12px 20px;
  background: rgba(0, 0, 0, 0.8);
  color: #fff;
  border-radius: 8px;
  font-size: 14px;
  opacity: 0;
  transform: translateY(-10px);
  transition: all 0.3s ease;
  z-index: 9999;
}
.copy-toast.show { opacity: 1; transform: translateY(0); }
@media print {
  .copy-btn, .copy-toast { display: none !important; }
}
"#;

const COPY_BUTTON_HTML: &str = r#"<button class="copy-btn" onclick="copyArticleContent()">
  <svg viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg">
    <path d="M16 1H4c-1.1 0-2 .9-2 2v14h2V3h12V1zm3 4H8c-1.1 0-2 .9-2 2v14c0 1.1.9 2 2 2h11c1.1 0 2-.9 2-2V7c0-1.1-.9-2-2-2zm0 16H8V7h11v14z"/>
  </svg>
  <span>一键复制</span>
</button>
<div class="copy-toast" id="copyToast">复制成功！可直接粘贴到微信公众号</div>"#;

const COPY_SCRIPT: &str = r#"<script>
function copyArticleContent() {
  const container = document.querySelector('.article-container');
  const btn = document.querySelector('.copy-btn');
  const toast = document.getElementById('copyToast');
  const okText = '复制成功！可直接粘贴到微信公众号';

  const range = document.createRange();
  range.selectNodeContents(container);
  const selection = window.getSelection();
  selection.removeAllRanges();
  selection.addRange(range);

  try {
    if (!document.execCommand('copy')) {
      throw new Error('copy rejected');
    }
    btn.classList.add('success');
    btn.querySelector('span').textContent = '复制成功！';
    toast.classList.add('show');
    setTimeout(() => {
      btn.classList.remove('success');
      btn.querySelector('span').textContent = '一键复制';
      toast.classList.remove('show');
    }, 2000);
  } catch (err) {
    toast.textContent = '复制失败，请手动选择复制';
    toast.classList.add('show');
    setTimeout(() => {
      toast.classList.remove('show');
      toast.textContent = okText;
    }, 2000);
  }

  selection.removeAllRanges();
}
</script>"#;

/// Build the complete HTML document around a styled body fragment.
pub fn build_document(body: &str, title: &str, css: &str) -> String {
    let title = escape(title);
    let body_style = Container::Body.style();
    let container_style = Container::ArticleContainer.style();
    let content_style = Container::ArticleContent.style();

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="{GENERATOR}">
    <title>{title}</title>
    <style>
{css}
{COPY_BUTTON_CSS}
    </style>
</head>
<body>
{COPY_BUTTON_HTML}
{COPY_SCRIPT}
    <section id="wechat-wrapper" style="{body_style}">
        <div class="article-container" style="{container_style}">
            <div class="article-content" style="{content_style}">
{body}
            </div>
        </div>
    </section>
</body>
</html>"#
    )
}

/// Load the stylesheet template.
///
/// Lookup order: `config.css_path`, then `templates/wechat_style.css` beside
/// the executable, then [`BUNDLED_CSS`]. An explicit path that cannot be read
/// yields an empty stylesheet.
pub async fn load_css(config: &ArticleConfig) -> String {
    if let Some(ref path) = config.css_path {
        return match tokio::fs::read_to_string(path).await {
            Ok(css) => {
                debug!("Loaded CSS template {}", path.display());
                css
            }
            Err(e) => {
                warn!("CSS template {} unreadable, continuing without it: {}", path.display(), e);
                String::new()
            }
        };
    }

    if let Some(path) = exe_template_path() {
        if let Ok(css) = tokio::fs::read_to_string(&path).await {
            debug!("Loaded CSS template {}", path.display());
            return css;
        }
    }
    BUNDLED_CSS.to_string()
}

fn exe_template_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|dir: &Path| dir.join(TEMPLATE_RELATIVE))
}
