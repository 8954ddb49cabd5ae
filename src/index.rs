use crate::api::StreamingService;
use crate::error::Result;
use std::collections::HashSet;
use tracing::debug;

/// Page size for playlist track enumeration (the API maximum).
pub const TRACK_PAGE_SIZE: u32 = 100;

/// Track ids known to be in the managed playlist.
///
/// An id is a member iff it was seen in the playlist when the session started
/// or was appended successfully since. Members are never removed.
#[derive(Debug, Default, Clone)]
pub struct TrackIndex {
    ids: HashSet<String>,
}

impl TrackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Insert an id; returns false if it was already present. Empty ids are ignored.
    pub fn add(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn seed<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids
            .extend(ids.into_iter().map(|s| -> String { s.into() }).filter(|id| !id.is_empty()));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Build the index from the playlist's current contents, 100 tracks per
    /// page, looping while the reported total exceeds the accumulated offset.
    pub async fn load(service: &dyn StreamingService, playlist_id: &str) -> Result<Self> {
        let mut index = TrackIndex::new();
        let mut offset: u32 = 0;
        let mut total: u32 = 1;
        while offset < total {
            let page = service
                .list_playlist_tracks(playlist_id, offset, TRACK_PAGE_SIZE)
                .await?;
            total = page.total;
            index.seed(page.ids);
            if page.returned == 0 {
                if offset < total {
                    debug!(
                        "empty track page for {} at offset {} (reported total {}); stopping",
                        playlist_id, offset, total
                    );
                }
                break;
            }
            offset += page.returned;
        }
        debug!("indexed {} tracks of playlist {}", index.len(), playlist_id);
        Ok(index)
    }
}
