use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header;
use tracing::{debug, error, info};

use crate::{
    config::AppConfig,
    server::{
        error::{AppResult, Error},
        services::BROWSER_USER_AGENT,
        utils::url_utils,
    },
};

pub type DynAuthResolver = Arc<dyn AuthResolverTrait + Send + Sync>;

/// how a channel master url answered the probe. either upstream redirected us into its
/// tokened auth endpoint, or it skipped the indirection and served the playlist body directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResolution {
    Redirected(String),
    DirectPlaylist(String),
}

#[automock]
#[async_trait]
pub trait AuthResolverTrait {
    /// probe the master url without following redirects. a relative Location comes back
    /// made absolute against the master url.
    async fn resolve(&self, master_url: &str) -> AppResult<AuthResolution>;

    /// fetch the live playlist text from a resolved auth url, following redirects normally.
    async fn fetch_playlist(&self, auth_url: &str) -> AppResult<String>;
}

pub struct AuthResolver {
    // probing must see the 3xx itself, so this client never follows redirects
    probe: reqwest::Client,
    http: reqwest::Client,
    config: Arc<AppConfig>,
}

impl AuthResolver {
    pub fn new(http: reqwest::Client, config: Arc<AppConfig>) -> Self {
        let probe = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            probe,
            http,
            config,
        }
    }

    fn browser_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(header::ORIGIN, self.config.embed_origin.clone())
            .header(header::REFERER, format!("{}/", self.config.embed_origin))
            .header(
                header::ACCEPT,
                "application/vnd.apple.mpegurl, application/x-mpegURL, */*",
            )
            .header(header::ACCEPT_LANGUAGE, "fr-FR,fr;q=0.7,en;q=0.6")
            .header(header::CONNECTION, "keep-alive")
    }
}

#[async_trait]
impl AuthResolverTrait for AuthResolver {
    async fn resolve(&self, master_url: &str) -> AppResult<AuthResolution> {
        debug!("resolving auth url for {}", master_url);

        let response = self.browser_headers(self.probe.get(master_url)).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    error!("master url redirected without a location header");
                    Error::ResolutionFailure("redirect without a location header".to_string())
                })?;

            let auth_url = url_utils::to_absolute(master_url, location);
            info!("master url redirected to auth endpoint: {}", auth_url);
            return Ok(AuthResolution::Redirected(auth_url));
        }

        if status.is_success() {
            let body = response.text().await?;
            if body.trim_start().starts_with("#EXTM3U") {
                info!("master url served the playlist directly");
                return Ok(AuthResolution::DirectPlaylist(body));
            }
            return Err(Error::ResolutionFailure(format!(
                "master url answered {} without a playlist body",
                status
            )));
        }

        error!("master url probe answered {}", status);
        Err(Error::ResolutionFailure(format!(
            "master url answered {}",
            status
        )))
    }

    async fn fetch_playlist(&self, auth_url: &str) -> AppResult<String> {
        debug!("fetching live playlist from {}", auth_url);

        let response = self.browser_headers(self.http.get(auth_url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("live playlist fetch returned {}", status);
            return Err(Error::ResolutionFailure(format!(
                "playlist fetch returned {}",
                status
            )));
        }

        Ok(response.text().await?)
    }
}
