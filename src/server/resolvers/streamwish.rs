use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use tracing::debug;

use crate::server::dtos::source_dto::{MediaKind, StreamSource};
use crate::server::resolvers::{packer, ExtractionError, SourceResolver};

const RESOLVER_NAME: &str = "streamwish";

static PACKED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)eval\(function(.*?)split.*\)\)\)").expect("Packed block pattern should compile")
});

// newer pages stash the playlist in a links object, older ones in a jwplayer sources array
static HLS2_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"links=.*hls2":"(.*?)"};"#).expect("Hls2 pattern should compile"));

static SOURCES_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"sources\s*:\s*\[\s*\{\s*file\s*:\s*"([^"]+)""#)
        .expect("Sources pattern should compile")
});

static ESCAPED_TRAILER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(.*?)\\",\\"hls[34]"#).expect("Escaped trailer pattern should compile")
});

pub struct StreamwishResolver {
    http: reqwest::Client,
}

impl StreamwishResolver {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceResolver for StreamwishResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError> {
        let mut request = self.http.get(page_url).header(
            header::USER_AGENT,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        );
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }

        let response = request
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

        let packed_block = PACKED_BLOCK
            .find(&html)
            .map(|found| found.as_str())
            .ok_or_else(|| {
                ExtractionError::pattern_not_found(
                    RESOLVER_NAME,
                    "no packed player script in embed page",
                )
            })?;

        if !packer::is_packed(packed_block) {
            return Err(ExtractionError::unpack_failed(
                RESOLVER_NAME,
                "script block is not in the expected packed shape",
            ));
        }

        let unpacked = packer::unpack(packed_block).ok_or_else(|| {
            ExtractionError::unpack_failed(RESOLVER_NAME, "packed arguments did not parse")
        })?;

        let matched = if unpacked.contains(r#""hls2":"https"#) {
            HLS2_LINK.captures(&unpacked)
        } else {
            SOURCES_FILE.captures(&unpacked)
        };

        let mut playlist_url = matched
            .and_then(|caps| caps.get(1))
            .map(|found| found.as_str().to_string())
            .ok_or_else(|| {
                ExtractionError::pattern_not_found(
                    RESOLVER_NAME,
                    "no playlist url in unpacked player setup",
                )
            })?;

        // the links object sometimes runs hls2 and hls4 together, keep only the first entry
        if let Some((head, _)) = playlist_url.split_once(r#"","hls"#) {
            playlist_url = head.to_string();
        }
        if let Some(caps) = ESCAPED_TRAILER.captures(&playlist_url) {
            playlist_url = caps[1].to_string();
        }

        debug!("streamwish resolved playlist: {}", playlist_url);

        Ok(StreamSource::new(playlist_url, MediaKind::Hls, RESOLVER_NAME))
    }
}
