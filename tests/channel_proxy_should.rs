use std::sync::Arc;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relay::config::AppConfig;
use relay::server::error::Error;
use relay::server::services::auth_services::{
    AuthResolution, AuthResolver, AuthResolverTrait, DynAuthResolver, MockAuthResolverTrait,
};
use relay::server::services::channel_services::{ChannelService, ChannelServiceTrait};

fn auth_resolver() -> AuthResolver {
    AuthResolver::new(reqwest::Client::new(), Arc::new(AppConfig::default()))
}

fn channel_service(upstream: &str) -> ChannelService {
    let config = Arc::new(AppConfig {
        upstream_origin: upstream.to_string(),
        live_path_token: "tok".to_string(),
        ..AppConfig::default()
    });
    let http = reqwest::Client::new();
    let auth: DynAuthResolver = Arc::new(AuthResolver::new(http.clone(), config.clone()));

    ChannelService::new(auth, http, config)
}

#[tokio::test]
async fn test_makes_relative_redirects_absolute() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/42.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/auth/stream.m3u8?token=XYZ"),
        )
        .mount(&mock_server)
        .await;

    let resolution = auth_resolver()
        .resolve(&format!("{}/live/tok/42.m3u8", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(
        resolution,
        AuthResolution::Redirected(format!(
            "{}/auth/stream.m3u8?token=XYZ",
            mock_server.uri()
        ))
    );
}

#[tokio::test]
async fn test_accepts_playlists_served_without_redirect() {
    let body = "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=T1";
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/42.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let resolution = auth_resolver()
        .resolve(&format!("{}/live/tok/42.m3u8", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(resolution, AuthResolution::DirectPlaylist(body.to_string()));
}

#[tokio::test]
async fn test_rejects_success_without_playlist_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/42.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&mock_server)
        .await;

    let resolution = auth_resolver()
        .resolve(&format!("{}/live/tok/42.m3u8", mock_server.uri()))
        .await;

    assert!(matches!(resolution, Err(Error::ResolutionFailure(_))));
}

#[tokio::test]
async fn test_serves_localized_channel_playlist() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/tf1.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/hls/live.m3u8?token=SESSION"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/live.m3u8"))
        .and(query_param("token", "SESSION"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=ABC123",
        ))
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    let playlist = service.channel_playlist("tf1").await.unwrap();

    let lines: Vec<&str> = playlist.lines().collect();
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[2], "/api/v1/channel/tf1/seg/seg_001.ts%3Ftoken%3DABC123");
}

#[tokio::test]
async fn test_localizes_direct_playlist_channels() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/d1.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("#EXTM3U\n/hls/a.ts?token=T1"),
        )
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    let playlist = service.channel_playlist("d1").await.unwrap();

    assert_eq!(
        playlist,
        "#EXTM3U\n/api/v1/channel/d1/seg/a.ts%3Ftoken%3DT1"
    );
}

#[tokio::test]
async fn test_direct_playlists_skip_the_auth_url_fetch() {
    let mut auth = MockAuthResolverTrait::new();
    auth.expect_resolve().times(1).returning(|_| {
        Ok(AuthResolution::DirectPlaylist(
            "#EXTM3U\nseg_001.ts?token=ABC".to_string(),
        ))
    });
    // no fetch_playlist expectation, a directly served playlist must never trigger one

    let config = Arc::new(AppConfig {
        live_path_token: "tok".to_string(),
        ..AppConfig::default()
    });
    let service = ChannelService::new(Arc::new(auth), reqwest::Client::new(), config);

    let playlist = service.channel_playlist("tf1").await.unwrap();

    assert_eq!(
        playlist,
        "#EXTM3U\n/api/v1/channel/tf1/seg/seg_001.ts%3Ftoken%3DABC"
    );
}

#[tokio::test]
async fn test_reuses_fresh_playlist() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/tf1.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/hls/live.m3u8?token=SESSION"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/live.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n/hls/a.ts?token=T1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    service.channel_playlist("tf1").await.unwrap();
    // second request inside the rotation window rides on the cached copy
    service.channel_playlist("tf1").await.unwrap();

    mock_server.verify().await;
}

#[tokio::test]
async fn test_recovers_rotating_token_for_segments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/tf1.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/hls/live.m3u8?token=SESSION"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/live.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=ABC123",
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/seg_001.ts"))
        .and(query_param("token", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x47u8; 188]))
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    service.channel_playlist("tf1").await.unwrap();

    // the player asks by bare name, the token comes out of the cached playlist
    let response = service.relay_segment("tf1", "seg_001.ts", None).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.bytes().await.unwrap().len(), 188);
}

#[tokio::test]
async fn test_refetches_once_then_relays_tokenless() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/tf1.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/hls/live.m3u8?token=SESSION"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    // one fetch for the playlist request, exactly one more for the token retry
    Mock::given(method("GET"))
        .and(path("/hls/live.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n#EXTINF:4.0,\n/hls/seg_001.ts?token=ABC123",
        ))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/mystery.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    service.channel_playlist("tf1").await.unwrap();

    let response = service.relay_segment("tf1", "mystery.ts", None).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_requires_known_channel() {
    let service = channel_service("http://127.0.0.1:9");

    let result = service.relay_segment("nobody", "seg_001.ts", None).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_requires_segment_name() {
    let service = channel_service("http://127.0.0.1:9");

    let result = service.relay_segment("tf1", "", None).await;
    assert!(matches!(result, Err(Error::BadRequest(_))));
}

#[tokio::test]
async fn test_forwards_range_on_channel_segments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/tok/tf1.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/hls/live.m3u8?token=SESSION"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/live.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "#EXTM3U\n/hls/seg_001.ts?token=ABC123",
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/seg_001.ts"))
        .and(query_param("token", "ABC123"))
        .and(header("Range", "bytes=100-199"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 100-199/1000")
                .set_body_bytes(vec![0u8; 100]),
        )
        .mount(&mock_server)
        .await;

    let service = channel_service(&mock_server.uri());
    service.channel_playlist("tf1").await.unwrap();

    // a name straight out of the localized playlist carries its token already
    let response = service
        .relay_segment("tf1", "seg_001.ts?token=ABC123", Some("bytes=100-199"))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 206);
    assert_eq!(
        response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok()),
        Some("bytes 100-199/1000")
    );
}
