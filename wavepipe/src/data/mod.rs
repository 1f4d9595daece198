//! Media library records and the storage interface they are persisted through.

mod artist;
mod song;
mod store;

pub use artist::Artist;
pub use song::Song;
pub use store::{ArtistStore, DataError, MemoryStore};
