//! Outbound content rewriting.
//!
//! Generated HTML that references uploads not present on this machine is pointed
//! at the remote origin instead. Two passes run over the content: `<img>` tags
//! (optionally gaining responsive `srcset`/`sizes` attributes) and CSS
//! `background`/`background-image` URLs. Content that needs no rewrite comes
//! back byte-identical.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use stageproxy_core::constants::{ASSUMED_ORIGINAL_WIDTH, DEFAULT_SIZES_ATTR};
use stageproxy_core::{AppError, PathCodec};
use stageproxy_storage::AssetStorage;

/// Buckets advertised in a synthesized `srcset`: (width, height, crop).
const SRCSET_BUCKETS: [(u32, u32, bool); 4] = [
    (150, 150, true),
    (300, 300, false),
    (768, 768, false),
    (1024, 1024, false),
];

const IMAGE_BLOCK: &str = "core/image";

/// Where the content is going to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderContext {
    #[default]
    Front,
    Admin,
}

/// Which responsive attributes a rewritten `<img>` gains.
#[derive(Debug, Clone, Copy)]
enum ResponsiveAttrs {
    /// `srcset` when absent, `sizes` when neither is present.
    Content,
    /// `srcset` and `sizes` together when `srcset` is absent.
    Block,
}

/// HTML attribute escaping for generated values.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Remote equivalent of `url` when it lies under the local uploads base and
/// storage does not hold its file.
pub(crate) async fn remote_if_missing(
    codec: &PathCodec,
    storage: &dyn AssetStorage,
    url: &str,
) -> Option<String> {
    if !codec.is_local_asset_url(url) {
        return None;
    }
    if storage.exists(&codec.local_path_for_url(url)).await {
        return None;
    }
    let rewritten = codec.rewrite_local_to_remote(url);
    (rewritten != url).then_some(rewritten)
}

/// URL token of a CSS `url(...)` match, without HTML-escaped quotes.
fn css_url_token(caps: &Captures) -> String {
    let token = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or_default();
    token.replace("&#039;", "").replace("&#39;", "").trim().to_string()
}

/// Append `attrs` to the attribute text after `src`, keeping a self-closing `/` last.
fn append_attrs(after_src: &str, attrs: &str) -> String {
    match after_src.trim_end().strip_suffix('/') {
        Some(body) => {
            let body = body.trim_end();
            let tail = &after_src[body.len()..];
            format!("{}{}{}", body, attrs, tail)
        }
        None => format!("{}{}", after_src, attrs),
    }
}

pub struct ContentRewriter {
    codec: Arc<PathCodec>,
    storage: Arc<dyn AssetStorage>,
    synthesize_srcset: bool,
    img_tag: Regex,
    css_background: Regex,
}

impl ContentRewriter {
    pub fn new(
        codec: Arc<PathCodec>,
        storage: Arc<dyn AssetStorage>,
        synthesize_srcset: bool,
    ) -> Result<Self, AppError> {
        let img_tag = Regex::new(r#"(?i)<img([^>]*?)src=["']([^"']+)["']([^>]*?)>"#)
            .map_err(|e| AppError::Configuration(format!("img tag pattern: {}", e)))?;
        let css_background = Regex::new(
            r#"(?i)\bbackground(?:-image)?\s*:\s*url\(\s*(?:"([^"')]+)"|'([^"')]+)'|([^"')]+))\s*\)"#,
        )
        .map_err(|e| AppError::Configuration(format!("css background pattern: {}", e)))?;

        Ok(Self {
            codec,
            storage,
            synthesize_srcset,
            img_tag,
            css_background,
        })
    }

    /// Remote URL for a local uploads URL whose file is missing, `None` otherwise.
    pub async fn rewrite_url_if_missing(&self, url: &str) -> Option<String> {
        remote_if_missing(&self.codec, self.storage.as_ref(), url).await
    }

    /// Remote rewrites for the distinct URLs in `urls` whose local file is missing.
    ///
    /// Existence is checked before any regex replacement runs, so the
    /// replacement closures only do lookups.
    async fn missing_remote_urls(&self, urls: &[String]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let mut rewrites = HashMap::new();
        for url in urls {
            if !seen.insert(url.as_str()) {
                continue;
            }
            if let Some(remote) = self.rewrite_url_if_missing(url).await {
                rewrites.insert(url.clone(), remote);
            }
        }
        rewrites
    }

    /// Rewrite rendered front-end content. Administrative output is returned as-is.
    pub async fn rewrite(&self, content: &str, context: RenderContext) -> String {
        if context == RenderContext::Admin || content.is_empty() {
            return content.to_string();
        }

        let with_images = self.rewrite_img_tags(content, ResponsiveAttrs::Content).await;
        self.rewrite_css_backgrounds(&with_images).await
    }

    /// Rewrite the rendered output of a single block. Only image blocks are touched.
    pub async fn rewrite_block(&self, content: &str, block_name: &str) -> String {
        if block_name != IMAGE_BLOCK || content.is_empty() {
            return content.to_string();
        }
        self.rewrite_img_tags(content, ResponsiveAttrs::Block).await
    }

    /// Candidate list for a `srcset`: one sibling per bucket, then the URL itself at 1200w.
    pub fn srcset_from_url(url: &str) -> Vec<String> {
        let split = url.find(['?', '#']).unwrap_or(url.len());
        let path = &url[..split];
        let (dir, file_name) = match path.rsplit_once('/') {
            Some(parts) => parts,
            None => ("", path),
        };

        let mut candidates = Vec::with_capacity(SRCSET_BUCKETS.len() + 1);
        if let Some((name, ext)) = file_name.rsplit_once('.') {
            for (width, height, crop) in SRCSET_BUCKETS {
                let crop_flag = if crop { "c" } else { "" };
                let sized = if dir.is_empty() {
                    format!("{}-{}x{}{}.{}", name, width, height, crop_flag, ext)
                } else {
                    format!("{}/{}-{}x{}{}.{}", dir, name, width, height, crop_flag, ext)
                };
                candidates.push(format!("{} {}w", sized, width));
            }
        }
        candidates.push(format!("{} {}w", url, ASSUMED_ORIGINAL_WIDTH));
        candidates
    }

    async fn rewrite_img_tags(&self, content: &str, attrs: ResponsiveAttrs) -> String {
        let srcs: Vec<String> = self
            .img_tag
            .captures_iter(content)
            .map(|caps| caps[2].to_string())
            .collect();
        let rewrites = self.missing_remote_urls(&srcs).await;
        if rewrites.is_empty() {
            return content.to_string();
        }

        self.img_tag
            .replace_all(content, |caps: &Captures| {
                let before_src = &caps[1];
                let src = &caps[2];
                let after_src = &caps[3];

                let new_src = match rewrites.get(src) {
                    Some(url) => url.clone(),
                    None => return caps[0].to_string(),
                };

                let mut extra = String::new();
                if self.synthesize_srcset {
                    let existing = format!("{}{}", before_src, after_src).to_lowercase();
                    let has_srcset = existing.contains("srcset");
                    let has_sizes = existing.contains("sizes");

                    if !has_srcset {
                        let srcset = Self::srcset_from_url(&new_src).join(", ");
                        extra.push_str(&format!(" srcset=\"{}\"", escape_attr(&srcset)));
                    }
                    let add_sizes = match attrs {
                        ResponsiveAttrs::Content => !has_srcset && !has_sizes,
                        ResponsiveAttrs::Block => !has_srcset,
                    };
                    if add_sizes {
                        extra.push_str(&format!(" sizes=\"{}\"", DEFAULT_SIZES_ATTR));
                    }
                }

                tracing::debug!(src = %src, rewritten = %new_src, "Rewrote img src");
                format!(
                    "<img{}src=\"{}\"{}>",
                    before_src,
                    new_src,
                    append_attrs(after_src, &extra)
                )
            })
            .into_owned()
    }

    async fn rewrite_css_backgrounds(&self, content: &str) -> String {
        let urls: Vec<String> = self
            .css_background
            .captures_iter(content)
            .map(|caps| css_url_token(&caps))
            .collect();
        let rewrites = self.missing_remote_urls(&urls).await;
        if rewrites.is_empty() {
            return content.to_string();
        }

        self.css_background
            .replace_all(content, |caps: &Captures| {
                let full = &caps[0];
                let src = css_url_token(caps);
                match rewrites.get(&src) {
                    Some(new_src) => full.replace(&src, new_src),
                    None => full.to_string(),
                }
            })
            .into_owned()
    }
}
