use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mockall::automock;
use reqwest::header;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
    config::AppConfig,
    server::{
        error::{AppResult, Error},
        services::auth_services::{AuthResolution, DynAuthResolver},
        utils::playlist_utils,
    },
};

// upstream rotates segment tokens quickly, anything older than this is retried on demand
const PLAYLIST_MAX_AGE_SECS: u64 = 8;

pub type DynChannelService = Arc<dyn ChannelServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait ChannelServiceTrait {
    /// current live playlist for a channel, with every media line pointed at our channel
    /// segment route. refreshes from upstream when the cached copy is older than the token
    /// rotation window.
    async fn channel_playlist(&self, channel_id: &str) -> AppResult<String>;

    /// relay one segment of a channel, looking its rotating token up in the cached playlist.
    /// only works for channels somebody already started, unknown ids are a not-found.
    async fn relay_segment<'a>(
        &self,
        channel_id: &str,
        segment_name: &str,
        range: Option<&'a str>,
    ) -> AppResult<reqwest::Response>;
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    auth_url: Option<String>,
    playlist_text: Option<String>,
    fetched_at: Option<Instant>,
}

struct ChannelSession {
    master_url: String,
    state: Mutex<SessionState>,
}

enum ResolveOutcome {
    AuthUrl(String),
    Playlist(String),
}

pub struct ChannelService {
    auth: DynAuthResolver,
    http: reqwest::Client,
    config: Arc<AppConfig>,
    sessions: Mutex<HashMap<String, Arc<ChannelSession>>>,
}

impl ChannelService {
    pub fn new(auth: DynAuthResolver, http: reqwest::Client, config: Arc<AppConfig>) -> Self {
        Self {
            auth,
            http,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn session_for(&self, channel_id: &str) -> Arc<ChannelSession> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                Arc::new(ChannelSession {
                    master_url: format!(
                        "{}/live/{}/{}.m3u8",
                        self.config.upstream_origin, self.config.live_path_token, channel_id
                    ),
                    state: Mutex::new(SessionState::default()),
                })
            })
            .clone()
    }

    fn store_playlist(&self, session: &ChannelSession, text: &str) {
        let mut state = session.state.lock().unwrap();
        state.playlist_text = Some(text.to_string());
        state.fetched_at = Some(Instant::now());
    }

    async fn resolve_auth(&self, session: &ChannelSession) -> AppResult<ResolveOutcome> {
        match self.auth.resolve(&session.master_url).await? {
            AuthResolution::Redirected(auth_url) => {
                session.state.lock().unwrap().auth_url = Some(auth_url.clone());
                Ok(ResolveOutcome::AuthUrl(auth_url))
            }
            AuthResolution::DirectPlaylist(body) => {
                let mut state = session.state.lock().unwrap();
                state.auth_url = Some(session.master_url.clone());
                state.playlist_text = Some(body.clone());
                state.fetched_at = Some(Instant::now());
                Ok(ResolveOutcome::Playlist(body))
            }
        }
    }

    /// fetch the playlist through the cached auth url. when that fetch fails on an auth url
    /// we didn't just resolve, the token has likely rotated, so resolve again and retry once
    async fn refresh_playlist(&self, session: &ChannelSession) -> AppResult<String> {
        let cached_auth = session.state.lock().unwrap().auth_url.clone();

        let (auth_url, just_resolved) = match cached_auth {
            Some(existing) => (existing, false),
            None => match self.resolve_auth(session).await? {
                ResolveOutcome::AuthUrl(auth_url) => (auth_url, true),
                ResolveOutcome::Playlist(body) => return Ok(body),
            },
        };

        match self.auth.fetch_playlist(&auth_url).await {
            Ok(text) => {
                self.store_playlist(session, &text);
                Ok(text)
            }
            Err(e) if !just_resolved => {
                warn!("cached auth url went stale, re-resolving: {}", e);
                session.state.lock().unwrap().auth_url = None;

                match self.resolve_auth(session).await? {
                    ResolveOutcome::AuthUrl(auth_url) => {
                        let text = self.auth.fetch_playlist(&auth_url).await?;
                        self.store_playlist(session, &text);
                        Ok(text)
                    }
                    ResolveOutcome::Playlist(body) => Ok(body),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// find the rotating token for a base name, refreshing the playlist once when it's
    /// missing. a second miss means the segment goes out tokenless rather than failing
    async fn lookup_token(
        &self,
        session: &ChannelSession,
        base_name: &str,
    ) -> AppResult<Option<String>> {
        let cached = session.state.lock().unwrap().playlist_text.clone();

        let playlist = match cached {
            Some(text) => text,
            None => self.refresh_playlist(session).await?,
        };

        if let Some(token) = playlist_utils::find_segment_token(&playlist, base_name) {
            return Ok(Some(token));
        }

        debug!("token for {} not in cached playlist, refreshing once", base_name);
        let refreshed = self.refresh_playlist(session).await?;
        Ok(playlist_utils::find_segment_token(&refreshed, base_name))
    }

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
}

#[async_trait]
impl ChannelServiceTrait for ChannelService {
    async fn channel_playlist(&self, channel_id: &str) -> AppResult<String> {
        let session = self.session_for(channel_id);

        let fresh = {
            let state = session.state.lock().unwrap();
            match (&state.playlist_text, state.fetched_at) {
                (Some(text), Some(at))
                    if at.elapsed() <= Duration::from_secs(PLAYLIST_MAX_AGE_SECS) =>
                {
                    Some(text.clone())
                }
                _ => None,
            }
        };

        let playlist = match fresh {
            Some(text) => text,
            None => self.refresh_playlist(&session).await?,
        };

        let segment_route = format!("/api/v1/channel/{}/seg", channel_id);
        Ok(playlist_utils::localize_channel_playlist(
            &playlist,
            &segment_route,
        ))
    }

    async fn relay_segment<'a>(
        &self,
        channel_id: &str,
        segment_name: &str,
        range: Option<&'a str>,
    ) -> AppResult<reqwest::Response> {
        if segment_name.is_empty() {
            return Err(Error::BadRequest("missing segment name".to_string()));
        }

        // lookup only, a segment request for a channel nobody started makes no sense
        let session = {
            let sessions = self.sessions.lock().unwrap();
            sessions.get(channel_id).cloned()
        }
        .ok_or_else(|| Error::NotFound(format!("unknown channel: {}", channel_id)))?;

        // names straight out of a localized playlist carry their token already, skip the lookup
        let (base_name, token) = match segment_name.split_once("?token=") {
            Some((base, token)) => (base.to_string(), Some(token.to_string())),
            None => {
                let base = segment_name
                    .split_once('?')
                    .map(|(base, _)| base)
                    .unwrap_or(segment_name)
                    .to_string();
                let token = self.lookup_token(&session, &base).await?;
                (base, token)
            }
        };

        let remote_base = {
            let state = session.state.lock().unwrap();
            state.auth_url.clone()
        }
        .and_then(|auth_url| {
            Url::parse(&auth_url)
                .ok()
                .map(|parsed| parsed.origin().ascii_serialization())
        })
        .unwrap_or_else(|| self.config.upstream_origin.clone());

        let remote_url = match &token {
            Some(token) => format!("{}/hls/{}?token={}", remote_base, base_name, token),
            None => format!("{}/hls/{}", remote_base, base_name),
        };

        debug!("relaying channel {} segment from {}", channel_id, remote_url);

        let mut request = self.browser_request(&remote_url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            error!(
                "upstream segment fetch returned {} for channel {}",
                status, channel_id
            );
            return Err(Error::UpstreamStatus(status));
        }

        Ok(response)
    }
}
