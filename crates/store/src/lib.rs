pub mod dataset;
pub mod fixtures;
pub mod memory;
pub mod vectors;

pub use dataset::{Dataset, StoreError};
pub use memory::{InMemoryCatalog, InMemoryProfileStore};
pub use vectors::{JsonVectorStore, MemoryVectorStore};
