use serde::{Deserialize, Deserializer, Serialize};

/// Prefix turning a bare Spotify track id into the URI form the playlist API expects.
pub const TRACK_URI_PREFIX: &str = "spotify:track:";

pub fn track_uri(track_id: &str) -> String {
    format!("{}{}", TRACK_URI_PREFIX, track_id)
}

/// One reading of the station's now-playing feed.
///
/// Every field is optional on the wire. Missing or null values decode to an
/// empty string and scalar values of other JSON types are stringified, since
/// the feed's schema is not under our control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    #[serde(rename = "song_title", default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub started_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub length: String,
    /// Spotify track id; empty when the station could not match the song.
    #[serde(rename = "spotify", default, deserialize_with = "lenient_string")]
    pub streaming_track_id: String,
}

impl NowPlaying {
    /// Decode a feed body, falling back to an empty reading on malformed input.
    pub fn from_feed_body(body: &str) -> Self {
        match serde_json::from_str::<NowPlaying>(body) {
            Ok(np) => np,
            Err(e) => {
                tracing::debug!("now-playing body not decodable ({}); treating as no current track", e);
                NowPlaying::default()
            }
        }
    }

    pub fn is_resolvable(&self) -> bool {
        !self.streaming_track_id.trim().is_empty()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        // nested structures carry nothing we can use
        _ => String::new(),
    })
}

/// The managed playlist, found or created once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistHandle {
    pub id: String,
    pub owner_id: String,
}

/// A playlist entry as returned by the user's playlist listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

/// One page of the user's playlists.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistSummary>,
    pub limit: u32,
    pub offset: u32,
    /// Total number of playlists, when the service reports it.
    pub total: Option<u32>,
}

/// One page of a playlist's tracks. Entries without a catalog id are dropped
/// from `ids` but still counted in `returned`.
#[derive(Debug, Clone, Default)]
pub struct TrackPage {
    pub ids: Vec<String>,
    pub returned: u32,
    pub total: u32,
}
