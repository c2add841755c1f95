use relay::server::utils::playlist_utils::{
    ProxyRoutes, find_segment_token, is_mpd_url, is_playlist_url, localize_channel_playlist,
    rewrite_playlist,
};

const ROUTES: ProxyRoutes = ProxyRoutes {
    playlist: "/api/v1/playlist",
    segment: "/api/v1/segment",
};

#[test]
fn test_classifies_playlist_urls() {
    assert!(is_playlist_url("https://h.example/low/index.m3u8"));
    assert!(is_playlist_url("https://h.example/low/index.M3U8"));
    assert!(is_playlist_url("https://h.example/auth/playlist.m3u8?token=abc"));

    assert!(!is_playlist_url("https://h.example/seg_001.ts"));
    assert!(!is_playlist_url("https://h.example/seg_001.ts?token=abc"));
    assert!(!is_playlist_url("https://h.example/audio.aac"));
    // the suffix must sit at the end of the path, not anywhere in the url
    assert!(!is_playlist_url("https://h.example/x.m3u8.bak"));
}

#[test]
fn test_classifies_dash_manifests() {
    assert!(is_mpd_url("https://h.example/stream/manifest.mpd"));
    assert!(is_mpd_url("https://h.example/stream/manifest.mpd?session=1"));
    assert!(!is_mpd_url("https://h.example/stream/master.m3u8"));
}

#[test]
fn test_rewrites_media_lines_onto_local_routes() {
    let playlist = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:4.0,\nchunk_001.ts\n#EXTINF:4.0,\nhttps://cdn.fremtv.lol/live/chunk_002.ts\nlow/index.m3u8";
    let rewritten = rewrite_playlist(playlist, "https://fremtv.lol/live/master.m3u8", &ROUTES);

    let lines: Vec<&str> = rewritten.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[1], "#EXT-X-VERSION:3");
    assert_eq!(lines[2], "#EXTINF:4.0,");
    assert_eq!(
        lines[3],
        "/api/v1/segment?url=https%3A%2F%2Ffremtv.lol%2Flive%2Fchunk_001.ts"
    );
    assert_eq!(
        lines[5],
        "/api/v1/segment?url=https%3A%2F%2Fcdn.fremtv.lol%2Flive%2Fchunk_002.ts"
    );
    assert_eq!(
        lines[6],
        "/api/v1/playlist?url=https%3A%2F%2Ffremtv.lol%2Flive%2Flow%2Findex.m3u8"
    );
}

#[test]
fn test_rewritten_urls_decode_back_to_upstream() {
    let playlist = "#EXTM3U\nchunk_001.ts";
    let rewritten = rewrite_playlist(playlist, "https://fremtv.lol/live/master.m3u8", &ROUTES);

    let line = rewritten.lines().nth(1).unwrap();
    let encoded = line.strip_prefix("/api/v1/segment?url=").unwrap();
    let decoded = urlencoding::decode(encoded).unwrap();

    assert_eq!(decoded, "https://fremtv.lol/live/chunk_001.ts");
}

#[test]
fn test_leaves_comments_and_blanks_alone() {
    let playlist = "#EXTM3U\n\n#EXT-X-ENDLIST";
    let rewritten = rewrite_playlist(playlist, "https://fremtv.lol/live/master.m3u8", &ROUTES);

    assert_eq!(rewritten, playlist);
}

#[test]
fn test_finds_rotating_token() {
    let playlist = "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=ABC123\n#EXTINF:4.0,\n/hls/seg_002.ts?token=DEF456";

    assert_eq!(
        find_segment_token(playlist, "seg_001.ts"),
        Some("ABC123".to_string())
    );
    assert_eq!(
        find_segment_token(playlist, "seg_002.ts"),
        Some("DEF456".to_string())
    );
}

#[test]
fn test_token_lookup_ignores_stale_query() {
    let playlist = "#EXTM3U\n/hls/seg_001.ts?token=FRESH";

    // the name a player replays can carry an old token, lookup keys on the base name
    assert_eq!(
        find_segment_token(playlist, "seg_001.ts?token=STALE"),
        Some("FRESH".to_string())
    );
}

#[test]
fn test_token_lookup_misses() {
    let playlist = "#EXTM3U\n/hls/seg_001.ts?token=ABC123\n/hls/plain_002.ts";

    // name not in the playlist at all
    assert_eq!(find_segment_token(playlist, "seg_999.ts"), None);
    // name listed without a token
    assert_eq!(find_segment_token(playlist, "plain_002.ts"), None);
}

#[test]
fn test_localizes_channel_media_lines() {
    let playlist = "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=ABC123\n#EXTINF:4.0,\nhttps://cdn.fremtv.lol/hls/seg_002.ts?token=DEF456";
    let localized = localize_channel_playlist(playlist, "/api/v1/channel/tf1/seg");

    let lines: Vec<&str> = localized.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[1], "#EXTINF:4.0,");
    assert_eq!(
        lines[2],
        "/api/v1/channel/tf1/seg/seg_001.ts%3Ftoken%3DABC123"
    );
    assert_eq!(
        lines[4],
        "/api/v1/channel/tf1/seg/seg_002.ts%3Ftoken%3DDEF456"
    );
}

#[test]
fn test_localize_skips_non_media_lines() {
    let playlist = "#EXTM3U\n#EXT-X-TARGETDURATION:4";
    assert_eq!(
        localize_channel_playlist(playlist, "/api/v1/channel/tf1/seg"),
        playlist
    );
}
