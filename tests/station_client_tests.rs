use mockito::Server;
use serde_json::json;
use station_playlist_sync as lib;
use lib::config::Config;
use lib::error::Error;
use lib::models::NowPlaying;
use lib::station::{NowPlayingSource, StationClient};
use std::time::{Duration, Instant};

#[tokio::test]
async fn fetches_and_decodes_now_playing() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/chdi/widget/now_playing")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "song_title": "Heat Waves",
                "started_at": "2024-05-01 10:02:11",
                "length": "3:58",
                "spotify": "02MWAaffLxlfxAUY7c5dvx"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let station = StationClient::new(
        reqwest::Client::new(),
        format!("{}/chdi/widget/now_playing", server.url()),
    );
    let np = station.fetch_now_playing().await.unwrap();
    assert_eq!(np.title, "Heat Waves");
    assert_eq!(np.length, "3:58");
    assert_eq!(np.streaming_track_id, "02MWAaffLxlfxAUY7c5dvx");
}

#[tokio::test]
async fn server_error_is_a_fetch_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/now_playing")
        .with_status(503)
        .create_async()
        .await;

    let station = StationClient::new(reqwest::Client::new(), format!("{}/now_playing", server.url()));
    let err = station.fetch_now_playing().await.unwrap_err();
    assert!(matches!(err, Error::Fetch(_)));
}

#[tokio::test]
async fn unreachable_feed_is_a_fetch_error() {
    // port 9 (discard) is not expected to run an HTTP server
    let station = StationClient::new(reqwest::Client::new(), "http://127.0.0.1:9/now_playing");
    assert!(matches!(station.fetch_now_playing().await, Err(Error::Fetch(_))));
}

#[tokio::test]
async fn malformed_body_is_an_empty_reading() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/now_playing")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let station = StationClient::new(reqwest::Client::new(), format!("{}/now_playing", server.url()));
    let np = station.fetch_now_playing().await.unwrap();
    assert_eq!(np, NowPlaying::default());
    assert!(!np.is_resolvable());
}

#[tokio::test]
async fn stalled_feed_fails_after_configured_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // accept and hold connections without ever answering
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let mut cfg = Config::default();
    cfg.station_url = format!("http://{}/now_playing", addr);
    cfg.http_timeout_secs = 1;
    let station = StationClient::from_config(&cfg).unwrap();

    let started = Instant::now();
    let res = station.fetch_now_playing().await;
    let elapsed = started.elapsed();
    assert!(matches!(res, Err(Error::Fetch(_))));
    assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "timeout not applied: {:?}", elapsed);
}
