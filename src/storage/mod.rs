//! Blob persistence and vector store collaborators.

mod blob;
mod documents;
mod error;
mod settings;
mod vector_store;

pub use blob::{BlobStore, Container, FsBlobStore, MemoryBlobStore};
pub use documents::DocumentStore;
pub use error::StoreError;
pub use settings::{CollectionPair, CollectionSettings};
pub use vector_store::{insert_batched, MemoryVectorStore, VectorStore};
