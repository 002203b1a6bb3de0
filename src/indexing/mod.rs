//! Global vector ID assignment and reverse lookup.

mod global_index;

pub use global_index::{
    build_global_index, ChunkLocation, DocumentIndexEntry, GlobalId, GlobalIndex, IndexError,
    IndexedVectors,
};
