use super::StreamingService;
use crate::error::{Error, Result};
use crate::models::{PlaylistHandle, PlaylistPage, PlaylistSummary, TrackPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

#[derive(Default)]
struct State {
    playlists: Vec<PlaylistSummary>,
    tracks: HashMap<String, Vec<String>>,
    next_id: u32,
    pending_append_failures: u32,
    fail_listing: bool,
    create_calls: u32,
    append_calls: Vec<(String, String)>,
    list_calls: Vec<(u32, u32)>,
    track_list_calls: Vec<(u32, u32)>,
}

/// In-memory streaming service used in tests.
/// Playlists and their tracks live in a map; every call is recorded so tests
/// can assert on what the sync logic asked for.
pub struct MockService {
    user_id: String,
    state: Mutex<State>,
}

impl MockService {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test thread must not hide the recorded calls from others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an existing playlist owned by this user. Ids are assigned as pl-1, pl-2, ...
    pub fn with_playlist(self, name: &str, track_ids: &[&str]) -> Self {
        {
            let mut st = self.state();
            st.next_id += 1;
            let id = format!("pl-{}", st.next_id);
            st.playlists.push(PlaylistSummary {
                id: id.clone(),
                name: name.to_string(),
                owner_id: self.user_id.clone(),
            });
            st.tracks
                .insert(id, track_ids.iter().map(|s| s.to_string()).collect());
        }
        self
    }

    /// Make the next `n` append calls fail with a 502.
    pub fn fail_next_appends(&self, n: u32) {
        self.state().pending_append_failures = n;
    }

    pub fn fail_listing(&self) {
        self.state().fail_listing = true;
    }

    pub fn create_calls(&self) -> u32 {
        self.state().create_calls
    }

    /// (playlist_id, track_id) for every append attempt, failed ones included.
    pub fn append_calls(&self) -> Vec<(String, String)> {
        self.state().append_calls.clone()
    }

    /// (offset, limit) for every playlist listing call.
    pub fn list_calls(&self) -> Vec<(u32, u32)> {
        self.state().list_calls.clone()
    }

    /// (offset, limit) for every playlist track listing call.
    pub fn track_list_calls(&self) -> Vec<(u32, u32)> {
        self.state().track_list_calls.clone()
    }

    pub fn playlist_tracks(&self, playlist_id: &str) -> Vec<String> {
        self.state().tracks.get(playlist_id).cloned().unwrap_or_default()
    }

    pub fn playlists(&self) -> Vec<PlaylistSummary> {
        self.state().playlists.clone()
    }
}

#[async_trait]
impl StreamingService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn current_user_id(&self) -> Result<String> {
        Ok(self.user_id.clone())
    }

    async fn list_playlists(&self, offset: u32, limit: u32) -> Result<PlaylistPage> {
        let mut st = self.state();
        st.list_calls.push((offset, limit));
        if st.fail_listing {
            return Err(Error::Api { status: 500, body: "listing unavailable".into() });
        }
        let items = st
            .playlists
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(PlaylistPage {
            items,
            limit,
            offset,
            total: Some(st.playlists.len() as u32),
        })
    }

    async fn create_playlist(&self, user_id: &str, name: &str, _description: &str) -> Result<PlaylistHandle> {
        info!("MockService: create_playlist {}", name);
        let mut st = self.state();
        st.create_calls += 1;
        st.next_id += 1;
        let id = format!("pl-{}", st.next_id);
        st.playlists.push(PlaylistSummary {
            id: id.clone(),
            name: name.to_string(),
            owner_id: user_id.to_string(),
        });
        st.tracks.insert(id.clone(), Vec::new());
        Ok(PlaylistHandle {
            id,
            owner_id: user_id.to_string(),
        })
    }

    async fn list_playlist_tracks(&self, playlist_id: &str, offset: u32, limit: u32) -> Result<TrackPage> {
        let mut st = self.state();
        st.track_list_calls.push((offset, limit));
        let all = st
            .tracks
            .get(playlist_id)
            .ok_or_else(|| Error::Api { status: 404, body: "no such playlist".into() })?;
        let ids: Vec<String> = all.iter().skip(offset as usize).take(limit as usize).cloned().collect();
        Ok(TrackPage {
            returned: ids.len() as u32,
            ids,
            total: all.len() as u32,
        })
    }

    async fn append_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        info!("MockService: append_track {} -> {}", playlist_id, track_id);
        let mut st = self.state();
        st.append_calls.push((playlist_id.to_string(), track_id.to_string()));
        if st.pending_append_failures > 0 {
            st.pending_append_failures -= 1;
            return Err(Error::Api { status: 502, body: "bad gateway".into() });
        }
        st.tracks
            .entry(playlist_id.to_string())
            .or_default()
            .push(track_id.to_string());
        Ok(())
    }
}
