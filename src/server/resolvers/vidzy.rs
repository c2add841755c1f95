use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use tracing::debug;

use crate::server::dtos::source_dto::{MediaKind, StreamSource};
use crate::server::resolvers::{packer, ExtractionError, SourceResolver};

const RESOLVER_NAME: &str = "vidzy";

static PACKED_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<script[^>]*>.*?eval\(function\(p,a,c,k,e,d\)\{.*?return p\}.*?\).*?</script>")
        .expect("Packed script pattern should compile")
});

static PLAYLIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"](https?://[^'"]*\.m3u8[^'"]*)['"]"#)
        .expect("Playlist url pattern should compile")
});

pub struct VidzyResolver {
    http: reqwest::Client,
}

impl VidzyResolver {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceResolver for VidzyResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError> {
        let response = self
            .http
            .get(page_url)
            .header(
                header::USER_AGENT,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            )
            .header(header::REFERER, referer.unwrap_or("https://vidzy.org/"))
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

        let script_block = PACKED_SCRIPT
            .find(&html)
            .map(|found| found.as_str())
            .ok_or_else(|| {
                ExtractionError::pattern_not_found(RESOLVER_NAME, "no packed script on page")
            })?;

        let unpacked = packer::unpack(script_block).ok_or_else(|| {
            ExtractionError::unpack_failed(RESOLVER_NAME, "packed arguments did not parse")
        })?;

        let playlist_url = PLAYLIST_URL
            .captures(&unpacked)
            .and_then(|caps| caps.get(1))
            .map(|found| found.as_str().to_string())
            .ok_or_else(|| {
                ExtractionError::pattern_not_found(
                    RESOLVER_NAME,
                    "no playlist url in unpacked script",
                )
            })?;

        debug!("vidzy resolved playlist: {}", playlist_url);

        Ok(StreamSource::new(playlist_url, MediaKind::Hls, RESOLVER_NAME))
    }
}
