use once_cell::sync::Lazy;
use regex::Regex;

use crate::server::utils::url_utils::to_absolute;

/// local routes the rewritten playlist lines point back at
pub struct ProxyRoutes<'a> {
    pub playlist: &'a str,
    pub segment: &'a str,
}

static PLAYLIST_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.m3u8(\?|$)").expect("Playlist suffix pattern should compile")
});

static TOKENED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.ts\?").expect("Tokened segment pattern should compile"));

/// nested playlists keep their query string, so the check is a suffix match on the path part
pub fn is_playlist_url(url: &str) -> bool {
    PLAYLIST_SUFFIX.is_match(url)
}

/// dash manifests ride through untouched, they reference segments by template rather than url
pub fn is_mpd_url(url: &str) -> bool {
    url.contains(".mpd")
}

/// walk an hls playlist line by line and point every media reference back at our own routes.
/// comments and blank lines ride through untouched, nested playlists go to the playlist route
/// and everything else to the segment route, always as an absolute upstream url
pub fn rewrite_playlist(playlist_text: &str, base_url: &str, routes: &ProxyRoutes) -> String {
    playlist_text
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return line.to_string();
            }

            let absolute = to_absolute(base_url, trimmed);
            let route = if is_playlist_url(&absolute) {
                routes.playlist
            } else {
                routes.segment
            };

            format!("{}?url={}", route, urlencoding::encode(&absolute))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// look up the rotating token for a segment in the latest playlist text. the upstream lists
/// its media as `<name>?token=<value>`, so the probe is the literal base name followed by an
/// optional token capture. a name that is missing entirely also comes back as None, the
/// caller refreshes once and retries before giving up on the token
pub fn find_segment_token(playlist_text: &str, segment_name: &str) -> Option<String> {
    let base_name = segment_name
        .split_once('?')
        .map(|(base, _)| base)
        .unwrap_or(segment_name);

    let pattern = format!(r"{}(?:\?token=([^\s]+))?", regex::escape(base_name));
    let matcher = Regex::new(&pattern).ok()?;
    let captures = matcher.captures(playlist_text)?;

    captures.get(1).map(|token| token.as_str().to_string())
}

/// point every media line of an upstream live playlist at the given channel segment route.
/// the token query stays glued to the name so the relay can replay it without another
/// playlist lookup
pub fn localize_channel_playlist(playlist_text: &str, segment_route: &str) -> String {
    playlist_text
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if !trimmed.starts_with("/hls/") && !TOKENED_SEGMENT.is_match(trimmed) {
                return line.to_string();
            }

            let name = trimmed
                .rsplit_once('/')
                .map(|(_, name)| name)
                .unwrap_or(trimmed);

            format!("{}/{}", segment_route, urlencoding::encode(name))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
