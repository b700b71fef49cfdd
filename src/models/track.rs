use serde::{Deserialize, Serialize};

/// A playable track as stored alongside a song drop.
///
/// `id` is the full playback URI (`spotify:track:<id>`), which is what the
/// queue endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
}

impl Track {
    pub fn from_catalog_id(catalog_id: &str, name: String, artist: String) -> Self {
        Self {
            id: format!("spotify:track:{}", catalog_id),
            name,
            artist,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artist: String,
}

impl From<Track> for TrackInfo {
    fn from(track: Track) -> Self {
        TrackInfo {
            id: track.id,
            title: track.name,
            artist: track.artist,
        }
    }
}
