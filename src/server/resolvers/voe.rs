use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use scraper::{Html, Selector};
use tracing::debug;

use crate::server::dtos::source_dto::{MediaKind, StreamSource};
use crate::server::resolvers::{ExtractionError, SourceResolver};

const RESOLVER_NAME: &str = "voe";

static DIRECT_PLAYLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?://[^\s'"]+\.m3u8[^\s'"]*)"#)
        .expect("Direct playlist pattern should compile")
});

static SOURCES_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)sources\s*:\s*\[\s*\{[^}]*file\s*:\s*['"]([^'"]+)['"]"#)
        .expect("Sources pattern should compile")
});

static HLS_KEY_SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)'hls'\s*:\s*['"]([^'"]+)['"]"#).expect("Hls key pattern should compile")
});

static HLS_KEY_DOUBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"hls"\s*:\s*"([^"]+)""#).expect("Hls key pattern should compile")
});

static ATOB_BLOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"atob\s*\(\s*['"]([A-Za-z0-9+/=]+)['"]\s*\)"#)
        .expect("Atob pattern should compile")
});

static DIRECT_VIDEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?://[^\s'"]+\.mp4[^\s'"]*)"#)
        .expect("Direct video pattern should compile")
});

static WINDOW_SOURCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)window\.sources\s*=\s*['"]([^'"]+)['"]"#)
        .expect("Window sources pattern should compile")
});

static VAR_SOURCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)var\s+sources\s*=\s*['"]([^'"]+)['"]"#)
        .expect("Var sources pattern should compile")
});

static PROTOCOL_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)['"]//[^\s'"]+\.m3u8[^\s'"]*['"]"#)
        .expect("Protocol relative pattern should compile")
});

pub struct VoeResolver {
    http: reqwest::Client,
}

impl VoeResolver {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    // voe rotates mirror domains, the canonical host serves the same page for their ids
    fn normalize_url(page_url: &str) -> String {
        page_url
            .replace("vocancellario.com", "voe.sx")
            .replace("ralphysuccessfull.org", "voe.sx")
    }

    fn kind_for(media_url: &str) -> MediaKind {
        if media_url.contains(".mp4") || media_url.contains(".mkv") {
            MediaKind::Mp4
        } else {
            MediaKind::Hls
        }
    }

    fn media_tag_source(html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("video[src], source[src]").ok()?;

        document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("src"))
            .map(|src| src.to_string())
    }

    /// the page embeds its player setup in one of several shapes depending on the mirror and
    /// their current obfuscation round, probe each in a fixed order
    fn find_media_url(html: &str) -> Option<(String, MediaKind)> {
        if let Some(caps) = DIRECT_PLAYLIST.captures(html) {
            return Some((caps[1].to_string(), MediaKind::Hls));
        }

        if let Some(caps) = SOURCES_FILE.captures(html) {
            let found = caps[1].to_string();
            let kind = Self::kind_for(&found);
            return Some((found, kind));
        }

        if let Some(caps) = HLS_KEY_SINGLE
            .captures(html)
            .or_else(|| HLS_KEY_DOUBLE.captures(html))
        {
            return Some((caps[1].to_string(), MediaKind::Hls));
        }

        if let Some(caps) = ATOB_BLOB.captures(html) {
            if let Ok(decoded) = STANDARD.decode(&caps[1]) {
                let decoded_text = String::from_utf8_lossy(&decoded);
                if let Some(inner) = DIRECT_PLAYLIST.captures(&decoded_text) {
                    return Some((inner[1].to_string(), MediaKind::Hls));
                }
            }
        }

        if let Some(caps) = DIRECT_VIDEO.captures(html) {
            return Some((caps[1].to_string(), MediaKind::Mp4));
        }

        if let Some(src) = Self::media_tag_source(html) {
            let kind = Self::kind_for(&src);
            return Some((src, kind));
        }

        if let Some(caps) = WINDOW_SOURCES
            .captures(html)
            .or_else(|| VAR_SOURCES.captures(html))
        {
            let found = caps[1].to_string();
            let kind = Self::kind_for(&found);
            return Some((found, kind));
        }

        if let Some(found) = PROTOCOL_RELATIVE.find(html) {
            let trimmed = found.as_str().trim_matches(|c| c == '\'' || c == '"');
            return Some((format!("https:{}", trimmed), MediaKind::Hls));
        }

        None
    }
}

#[async_trait]
impl SourceResolver for VoeResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError> {
        let normalized = Self::normalize_url(page_url);

        let response = self
            .http
            .get(&normalized)
            .header(
                header::USER_AGENT,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
            )
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::REFERER, referer.unwrap_or("https://voe.sx/"))
            .send()
            .await
            .map_err(|e| ExtractionError::fetch_failed(RESOLVER_NAME, e))?;

        if !response.status().is_success() {
            return Err(ExtractionError::fetch_failed(
                RESOLVER_NAME,
                format!("status {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractionError::fetch_failed(RESOLVER_NAME, e))?;

        let (media_url, kind) = Self::find_media_url(&html).ok_or_else(|| {
            ExtractionError::pattern_not_found(
                RESOLVER_NAME,
                "no media url in embed page, the video may be protected or the page layout changed",
            )
        })?;

        debug!("voe resolved {:?} source: {}", kind, media_url);

        Ok(StreamSource::new(media_url, kind, RESOLVER_NAME))
    }
}
