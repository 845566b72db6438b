pub mod memory;
pub mod similarity;

pub use memory::MemoryStore;
pub use similarity::{embedding_similarity, token_overlap_similarity, ScoredChunk};
