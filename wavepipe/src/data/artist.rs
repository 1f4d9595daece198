use serde::{Deserialize, Serialize};

use super::{ArtistStore, DataError, Song};

/// An artist known to the library: a unique id and a name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub title: String,
}

impl Artist {
    /// Project the artist out of a song's tags. The id is assigned on save.
    pub fn from_song(song: &Song) -> Self {
        Self {
            id: 0,
            title: song.artist.clone(),
        }
    }

    /// Create this artist in the store, picking up the assigned id.
    pub async fn save(&mut self, store: &dyn ArtistStore) -> Result<(), DataError> {
        self.id = store.save_artist(self).await?;
        Ok(())
    }

    /// Replace this record with the stored one, matched by id or title.
    pub async fn load(&mut self, store: &dyn ArtistStore) -> Result<(), DataError> {
        *self = store.load_artist(self).await?;
        Ok(())
    }

    pub async fn delete(&self, store: &dyn ArtistStore) -> Result<(), DataError> {
        store.delete_artist(self).await
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DataError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(input: &[u8]) -> Result<Self, DataError> {
        Ok(serde_json::from_slice(input)?)
    }
}
