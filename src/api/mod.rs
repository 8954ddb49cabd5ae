pub mod auth;
pub mod mock;
pub mod pkce;
pub mod spotify;
pub mod spotify_auth;

use crate::error::Result;
use crate::models::{PlaylistHandle, PlaylistPage, TrackPage};

/// Streaming-service operations the resolver, the index loader and the sync
/// engine depend on. Implementations: spotify::SpotifyClient, mock::MockService.
#[async_trait::async_trait]
pub trait StreamingService: Send + Sync {
    /// Id of the user the bearer token belongs to.
    async fn current_user_id(&self) -> Result<String>;

    /// One page of the authenticated user's playlists.
    async fn list_playlists(&self, offset: u32, limit: u32) -> Result<PlaylistPage>;

    async fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<PlaylistHandle>;

    /// One page of a playlist's track ids together with the playlist's total track count.
    async fn list_playlist_tracks(&self, playlist_id: &str, offset: u32, limit: u32) -> Result<TrackPage>;

    /// Append a single track (bare id, not URI) to the end of the playlist.
    async fn append_track(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    /// Return the service's name (for logging)
    fn name(&self) -> &str;
}
