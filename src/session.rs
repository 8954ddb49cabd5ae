use crate::api::StreamingService;
use crate::error::Result;
use crate::index::TrackIndex;
use crate::models::PlaylistHandle;
use crate::resolver::resolve_managed_playlist;
use tracing::info;

/// Immutable per-session facts, fixed once startup resolution completes and
/// passed explicitly to everything downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: String,
    pub playlist: PlaylistHandle,
}

/// Startup sequence run once after authorization: look up the user, find or
/// create the managed playlist, then index its current tracks. Any failure
/// aborts the session and is returned to the caller.
pub async fn start_session(service: &dyn StreamingService) -> Result<(SessionInfo, TrackIndex)> {
    let user_id = service.current_user_id().await?;
    info!("Authorized as {} on {}", user_id, service.name());

    let playlist = resolve_managed_playlist(service, &user_id).await?;
    let index = TrackIndex::load(service, &playlist.id).await?;
    info!("Playlist {} holds {} known tracks", playlist.id, index.len());

    Ok((SessionInfo { user_id, playlist }, index))
}
