use serde::{Deserialize, Serialize};

/// A song as tagged in the media library. Artist records are projected from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub album: String,
    pub artist: String,
    pub title: String,
    pub track: u32,
    pub year: u32,
}
