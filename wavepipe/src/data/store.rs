use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::Artist;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("artist not found: {0}")]
    NotFound(String),
    #[error("artist must have an id or a title")]
    MissingKey,
    #[error("invalid artist json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence for [`Artist`] records.
#[async_trait]
pub trait ArtistStore: Send + Sync {
    /// Persist a new artist and return its id. Saving a title that already exists
    /// returns the existing id.
    async fn save_artist(&self, artist: &Artist) -> Result<i64, DataError>;

    /// Look up by id when set, otherwise by title.
    async fn load_artist(&self, artist: &Artist) -> Result<Artist, DataError>;

    async fn delete_artist(&self, artist: &Artist) -> Result<(), DataError>;
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    artists: HashMap<i64, Artist>,
}

impl Inner {
    fn find(&self, artist: &Artist) -> Option<&Artist> {
        if artist.id != 0 {
            return self.artists.get(&artist.id);
        }
        self.artists.values().find(|a| a.title == artist.title)
    }
}

/// In-process [`ArtistStore`]; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub async fn len(&self) -> usize {
        self.inner.read().await.artists.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn key_of(artist: &Artist) -> Result<String, DataError> {
    match (artist.id, artist.title.is_empty()) {
        (0, true) => Err(DataError::MissingKey),
        (0, false) => Ok(artist.title.clone()),
        (id, _) => Ok(id.to_string()),
    }
}

#[async_trait]
impl ArtistStore for MemoryStore {
    async fn save_artist(&self, artist: &Artist) -> Result<i64, DataError> {
        if artist.title.is_empty() {
            return Err(DataError::MissingKey);
        }
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.artists.values().find(|a| a.title == artist.title) {
            return Ok(existing.id);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.artists.insert(
            id,
            Artist {
                id,
                title: artist.title.clone(),
            },
        );
        Ok(id)
    }

    async fn load_artist(&self, artist: &Artist) -> Result<Artist, DataError> {
        let key = key_of(artist)?;
        let inner = self.inner.read().await;
        inner.find(artist).cloned().ok_or(DataError::NotFound(key))
    }

    async fn delete_artist(&self, artist: &Artist) -> Result<(), DataError> {
        let key = key_of(artist)?;
        let mut inner = self.inner.write().await;
        let id = inner
            .find(artist)
            .map(|a| a.id)
            .ok_or(DataError::NotFound(key))?;
        inner.artists.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist(id: i64, title: &str) -> Artist {
        Artist {
            id,
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn save_assigns_sequential_ids() {
        let store = MemoryStore::default();
        assert_eq!(store.save_artist(&artist(0, "Boards of Canada")).await.unwrap(), 1);
        assert_eq!(store.save_artist(&artist(0, "Autechre")).await.unwrap(), 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn save_is_idempotent_per_title() {
        let store = MemoryStore::default();
        let first = store.save_artist(&artist(0, "Burial")).await.unwrap();
        let again = store.save_artist(&artist(0, "Burial")).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn load_by_id_or_title() {
        let store = MemoryStore::default();
        let id = store.save_artist(&artist(0, "Bonobo")).await.unwrap();

        assert_eq!(
            store.load_artist(&artist(id, "")).await.unwrap(),
            artist(id, "Bonobo")
        );
        assert_eq!(
            store.load_artist(&artist(0, "Bonobo")).await.unwrap(),
            artist(id, "Bonobo")
        );
    }

    #[tokio::test]
    async fn missing_artist_is_not_found() {
        let store = MemoryStore::default();
        let err = store.load_artist(&artist(9, "")).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(key) if key == "9"));
        let err = store.delete_artist(&artist(0, "Nobody")).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(key) if key == "Nobody"));
    }

    #[tokio::test]
    async fn keyless_artist_is_rejected() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.save_artist(&Artist::default()).await,
            Err(DataError::MissingKey)
        ));
        assert!(matches!(
            store.load_artist(&Artist::default()).await,
            Err(DataError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = MemoryStore::default();
        let id = store.save_artist(&artist(0, "Floating Points")).await.unwrap();
        store.delete_artist(&artist(id, "")).await.unwrap();
        assert!(store.is_empty().await);
    }
}
