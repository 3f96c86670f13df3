//! Stream chunk model exposed to chat consumers.

pub mod chunk;
pub mod utils;
pub mod wire;

pub use chunk::{ChatStreamChunk, ChunkEvent, ChunkMeta, Phase};
pub use utils::error_chunk;
pub use wire::WireChunk;
