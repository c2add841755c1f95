use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header;
use tracing::{debug, error};

use crate::{
    config::AppConfig,
    server::{
        error::{AppResult, Error},
        utils::{
            playlist_utils::{self, ProxyRoutes},
            url_utils,
        },
    },
};

pub const PLAYLIST_ROUTE: &str = "/api/v1/playlist";
pub const SEGMENT_ROUTE: &str = "/api/v1/segment";

pub type DynRelayService = Arc<dyn RelayServiceTrait + Send + Sync>;

/// a playlist fetch comes back as hls text rewritten onto our own routes, or as a dash
/// manifest passed through untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistDocument {
    Hls(String),
    Dash(String),
}

#[automock]
#[async_trait]
pub trait RelayServiceTrait {
    /// fetch an upstream playlist and re-point every media line at our playlist and segment
    /// routes. refuses hosts outside the allow list before anything leaves the process.
    async fn fetch_playlist(&self, target_url: &str) -> AppResult<PlaylistDocument>;

    /// open an upstream segment request and hand the response back for streaming, with the
    /// client's Range forwarded as-is.
    async fn fetch_segment<'a>(
        &self,
        target_url: &str,
        range: Option<&'a str>,
    ) -> AppResult<reqwest::Response>;
}

pub struct RelayService {
    http: reqwest::Client,
    config: Arc<AppConfig>,
}

impl RelayService {
    pub fn new(http: reqwest::Client, config: Arc<AppConfig>) -> Self {
        Self { http, config }
    }

    // upstream checks origin and referer on every hop, so each request introduces itself as
    // the embed player
    fn browser_request(&self, target_url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(target_url)
            .header(header::ORIGIN, self.config.embed_origin.clone())
            .header(header::REFERER, format!("{}/", self.config.embed_origin))
            .header(
                header::ACCEPT,
                "application/vnd.apple.mpegurl, application/x-mpegURL, */*",
            )
            .header(header::ACCEPT_LANGUAGE, "fr-FR,fr;q=0.7,en;q=0.6")
            .header(header::CONNECTION, "keep-alive")
    }

    fn ensure_allowed(&self, target_url: &str) -> AppResult<()> {
        if !url_utils::is_allowed_url(target_url, &self.config.allowed_hosts) {
            error!("refusing to relay url outside the allow list: {}", target_url);
            return Err(Error::Forbidden("url host not allowed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayServiceTrait for RelayService {
    async fn fetch_playlist(&self, target_url: &str) -> AppResult<PlaylistDocument> {
        self.ensure_allowed(target_url)?;

        debug!("fetching playlist: {}", target_url);

        let response = self.browser_request(target_url).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            error!("upstream playlist fetch returned {}: {}", status, target_url);
            return Err(Error::UpstreamStatus(status));
        }

        // relative references resolve against the url after redirects, not the requested one
        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        if playlist_utils::is_mpd_url(target_url) {
            let manifest = String::from_utf8(body.to_vec()).map_err(|_| {
                Error::BadUpstreamContent("dash manifest is not valid utf-8".to_string())
            })?;
            return Ok(PlaylistDocument::Dash(manifest));
        }

        let text = String::from_utf8(body.to_vec()).map_err(|_| {
            error!("upstream playlist body is not text: {}", target_url);
            Error::BadUpstreamContent("upstream playlist is not text".to_string())
        })?;

        let routes = ProxyRoutes {
            playlist: PLAYLIST_ROUTE,
            segment: SEGMENT_ROUTE,
        };

        Ok(PlaylistDocument::Hls(playlist_utils::rewrite_playlist(
            &text, &final_url, &routes,
        )))
    }

    async fn fetch_segment<'a>(
        &self,
        target_url: &str,
        range: Option<&'a str>,
    ) -> AppResult<reqwest::Response> {
        self.ensure_allowed(target_url)?;

        debug!("relaying segment: {} (range: {:?})", target_url, range);

        let mut request = self.browser_request(target_url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            error!("upstream segment fetch returned {}: {}", status, target_url);
            return Err(Error::UpstreamStatus(status));
        }

        Ok(response)
    }
}
