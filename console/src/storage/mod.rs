//! Settings, storage layout and cache persistence

pub mod blob_store;
pub mod layout;
pub mod settings;

pub use blob_store::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use layout::StorageLayout;
pub use settings::Settings;
