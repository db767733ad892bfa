//! ragguard-vector
//!
//! Exact inner-product vector index over L2-normalized embeddings, persisted
//! as immutable generations behind an atomically replaced `CURRENT` pointer.
//!
//! Typical flow:
//! 1) [`Retriever::build`] chunks and embeds a document tree under the build lock
//! 2) the new generation is staged, renamed into place and `CURRENT` is flipped
//! 3) [`Retriever::search`] / [`Retriever::open_snapshot`] read the active generation

pub mod flat;
pub mod layout;
pub mod retriever;
pub mod schema;
pub mod store;
pub mod writer;

pub use flat::{l2_normalize, FlatIpIndex};
pub use layout::{BuildLock, IndexLocation};
pub use retriever::{IndexSnapshot, Retriever, RetrieverConfig};
pub use schema::IndexManifest;
pub use store::{ChunkRecord, IndexedCorpus};
