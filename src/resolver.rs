use crate::api::StreamingService;
use crate::error::{Error, Result};
use crate::models::PlaylistHandle;
use tracing::{debug, info};

/// Name of the playlist this tool creates and keeps in sync.
pub const MANAGED_PLAYLIST_NAME: &str = "SONiC On Demand";
pub const MANAGED_PLAYLIST_DESCRIPTION: &str = "Playlist made from SONiC 102.9";

/// Page size for the user's playlist listing (the API maximum).
pub const PLAYLIST_PAGE_SIZE: u32 = 50;

/// Find the managed playlist in the user's library, creating it if absent.
///
/// The library is scanned page by page; the first playlist whose name matches
/// exactly wins, duplicates are left alone. Only when every page has been seen
/// without a match is a playlist created. Any failure is a `Resolution` error.
pub async fn resolve_managed_playlist(service: &dyn StreamingService, user_id: &str) -> Result<PlaylistHandle> {
    if let Some(found) = find_managed_playlist(service).await.map_err(resolution)? {
        info!("Using existing playlist {:?} ({})", MANAGED_PLAYLIST_NAME, found.id);
        return Ok(found);
    }

    info!("Making playlist {:?}", MANAGED_PLAYLIST_NAME);
    let created = service
        .create_playlist(user_id, MANAGED_PLAYLIST_NAME, MANAGED_PLAYLIST_DESCRIPTION)
        .await
        .map_err(resolution)?;
    info!("Created playlist {:?} ({})", MANAGED_PLAYLIST_NAME, created.id);
    Ok(created)
}

async fn find_managed_playlist(service: &dyn StreamingService) -> Result<Option<PlaylistHandle>> {
    let mut offset: u32 = 0;
    loop {
        let page = service.list_playlists(offset, PLAYLIST_PAGE_SIZE).await?;
        if let Some(p) = page.items.iter().find(|p| p.name == MANAGED_PLAYLIST_NAME) {
            return Ok(Some(PlaylistHandle {
                id: p.id.clone(),
                owner_id: p.owner_id.clone(),
            }));
        }

        let returned = page.items.len() as u32;
        offset += returned;
        let exhausted = returned == 0
            || returned < PLAYLIST_PAGE_SIZE
            || page.total.map_or(false, |total| offset >= total);
        if exhausted {
            debug!("scanned {} playlists without finding {:?}", offset, MANAGED_PLAYLIST_NAME);
            return Ok(None);
        }
    }
}

fn resolution(e: Error) -> Error {
    Error::Resolution(Box::new(e))
}
