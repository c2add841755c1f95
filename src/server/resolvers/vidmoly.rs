use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use tracing::debug;

use crate::server::dtos::source_dto::{MediaKind, StreamSource};
use crate::server::resolvers::{ExtractionError, SourceResolver};

const RESOLVER_NAME: &str = "vidmoly";

// mp4/mkv files take priority over playlists, then the jwplayer sources array as fallback
static FILE_VIDEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)file\s*:\s*["']([^"']+\.(?:mp4|mkv)[^"']*)["']"#)
        .expect("File video pattern should compile")
});

static FILE_PLAYLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)file\s*:\s*["']([^"']+\.m3u8[^"']*)["']"#)
        .expect("File playlist pattern should compile")
});

static SOURCES_VIDEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)sources\s*:\s*\[\s*\{\s*file\s*:\s*["']([^"']+\.(?:mp4|mkv)[^"']*)["']"#)
        .expect("Sources video pattern should compile")
});

static SOURCES_ANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)sources\s*:\s*\[\s*\{\s*file\s*:\s*["']([^"']+)["']"#)
        .expect("Sources pattern should compile")
});

pub struct VidmolyResolver {
    http: reqwest::Client,
}

impl VidmolyResolver {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceResolver for VidmolyResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError> {
        let referer = referer.unwrap_or("https://vidmoly.to/");

        let response = self
            .http
            .get(page_url)
            .header(
                header::USER_AGENT,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .header(header::REFERER, referer)
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

        let (media_url, kind) = if let Some(caps) = FILE_VIDEO.captures(&html) {
            (caps[1].to_string(), MediaKind::Mp4)
        } else if let Some(caps) = FILE_PLAYLIST.captures(&html) {
            (caps[1].to_string(), MediaKind::Hls)
        } else if let Some(caps) = SOURCES_VIDEO.captures(&html) {
            (caps[1].to_string(), MediaKind::Mp4)
        } else if let Some(caps) = SOURCES_ANY.captures(&html) {
            let found = caps[1].to_string();
            let kind = if found.contains(".mp4") || found.contains(".mkv") {
                MediaKind::Mp4
            } else {
                MediaKind::Hls
            };
            (found, kind)
        } else {
            return Err(ExtractionError::pattern_not_found(
                RESOLVER_NAME,
                "no file or sources entry in embed page",
            ));
        };

        debug!("vidmoly resolved {:?} source: {}", kind, media_url);

        // their cdn rejects segment requests that arrive without the embed referer
        Ok(StreamSource::new(media_url, kind, RESOLVER_NAME).with_referer(referer))
    }
}
