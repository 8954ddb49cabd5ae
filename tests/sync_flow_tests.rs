use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use station_playlist_sync as lib;
use lib::api::auth::StaticToken;
use lib::api::spotify::SpotifyClient;
use lib::engine::{SyncEngine, TickOutcome};
use lib::session::start_session;
use lib::station::StationClient;
use std::sync::Arc;

async fn mock_me(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "mock_user" }).to_string())
        .create_async()
        .await
}

fn playlists_page(offset: usize, count: usize, total: usize, managed_at: Option<usize>) -> String {
    let items: Vec<serde_json::Value> = (offset..offset + count)
        .map(|i| {
            let name = if Some(i) == managed_at {
                "SONiC On Demand".to_string()
            } else {
                format!("Mix {}", i)
            };
            json!({ "id": format!("p{}", i), "name": name, "owner": { "id": "mock_user" } })
        })
        .collect();
    json!({ "items": items, "limit": 50, "offset": offset, "total": total }).to_string()
}

fn tracks_page(offset: usize, count: usize, total: usize) -> String {
    let items: Vec<serde_json::Value> = (offset..offset + count)
        .map(|i| json!({ "track": { "id": format!("t{}", i), "name": format!("Track {}", i) } }))
        .collect();
    json!({ "items": items, "total": total }).to_string()
}

fn paged(path: &str, offset: &str) -> (Matcher, Matcher) {
    (
        Matcher::Regex(format!(r"^{}(\?.*)?$", path)),
        Matcher::UrlEncoded("offset".into(), offset.into()),
    )
}

#[tokio::test]
async fn seeds_150_tracks_over_two_pages() {
    let mut server = Server::new_async().await;
    let _me = mock_me(&mut server).await;

    let (path, q) = paged("/me/playlists", "0");
    let _lists = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playlists_page(0, 3, 3, Some(1)))
        .create_async()
        .await;

    let (path, q) = paged("/playlists/p1/tracks", "0");
    let first = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracks_page(0, 100, 150))
        .expect(1)
        .create_async()
        .await;
    let (path, q) = paged("/playlists/p1/tracks", "100");
    let second = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracks_page(100, 50, 150))
        .expect(1)
        .create_async()
        .await;

    let spotify = SpotifyClient::new(reqwest::Client::new(), server.url(), Arc::new(StaticToken::new("tok")));
    let (session, index) = start_session(&spotify).await.unwrap();
    assert_eq!(session.playlist.id, "p1");
    assert_eq!(index.len(), 150);
    assert!(index.contains("t0") && index.contains("t149"));
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn creates_playlist_once_when_no_page_matches() {
    let mut server = Server::new_async().await;
    let _me = mock_me(&mut server).await;

    let (path, q) = paged("/me/playlists", "0");
    let _p0 = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playlists_page(0, 50, 70, None))
        .create_async()
        .await;
    let (path, q) = paged("/me/playlists", "50");
    let _p1 = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playlists_page(50, 20, 70, None))
        .create_async()
        .await;
    let create = server
        .mock("POST", "/users/mock_user/playlists")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "new_pl", "owner": { "id": "mock_user" } }).to_string())
        .expect(1)
        .create_async()
        .await;
    let (path, q) = paged("/playlists/new_pl/tracks", "0");
    let _t = server
        .mock("GET", path)
        .match_query(q)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tracks_page(0, 0, 0))
        .create_async()
        .await;

    let spotify = SpotifyClient::new(reqwest::Client::new(), server.url(), Arc::new(StaticToken::new("tok")));
    let (session, index) = start_session(&spotify).await.unwrap();
    assert_eq!(session.playlist.id, "new_pl");
    assert!(index.is_empty());
    create.assert_async().await;
}

#[tokio::test]
async fn tick_appends_unseen_track_then_skips_it() {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/now_playing")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "song_title": "New One", "started_at": "", "length": "", "spotify": "fresh" }).to_string())
        .create_async()
        .await;
    let append = server
        .mock("POST", "/playlists/pl1/tracks")
        .match_body(Matcher::Json(json!({ "uris": ["spotify:track:fresh"] })))
        .with_status(201)
        .with_body(json!({ "snapshot_id": "s2" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let spotify = Arc::new(SpotifyClient::new(
        reqwest::Client::new(),
        server.url(),
        Arc::new(StaticToken::new("tok")),
    ));
    let station = Arc::new(StationClient::new(reqwest::Client::new(), format!("{}/now_playing", server.url())));
    let session = lib::session::SessionInfo {
        user_id: "mock_user".into(),
        playlist: lib::models::PlaylistHandle {
            id: "pl1".into(),
            owner_id: "mock_user".into(),
        },
    };
    let mut engine = SyncEngine::new(session, lib::index::TrackIndex::new(), station, spotify);

    assert_eq!(engine.tick().await, TickOutcome::Appended("fresh".into()));
    assert_eq!(engine.tick().await, TickOutcome::AlreadyPresent("fresh".into()));
    append.assert_async().await;
}
