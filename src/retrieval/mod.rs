//! Query-time retrieval: neighbor expansion and chunk resolution.

mod neighbors;
mod query;

pub use neighbors::{expand_neighbors, expand_neighbors_below, ExpandedHit, SearchHit};
pub use query::{resolve_hits, QueryResult};
