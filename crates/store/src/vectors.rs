//! Vector-store loaders.
//!
//! Files hold one JSON object mapping item ids to equal-length float arrays:
//! `{"r-001": [0.12, 0.98, 0.0], ...}`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use curate_core::catalog::VectorStoreLoader;
use curate_core::errors::CollaboratorError;
use curate_core::ItemId;
use tracing::info;

use crate::dataset::StoreError;

/// Treats the location as a filesystem path.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonVectorStore;

impl JsonVectorStore {
    pub fn parse(raw: &str, origin: &str) -> Result<HashMap<ItemId, Vec<f32>>, StoreError> {
        serde_json::from_str(raw)
            .map_err(|source| StoreError::Parse { origin: origin.to_string(), source })
    }

    pub fn read(path: &Path) -> Result<HashMap<ItemId, Vec<f32>>, StoreError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| StoreError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&raw, &path.display().to_string())
    }
}

impl VectorStoreLoader for JsonVectorStore {
    fn load(&self, location: &str) -> Result<HashMap<ItemId, Vec<f32>>, CollaboratorError> {
        let vectors = Self::read(Path::new(location))?;
        info!(
            event_name = "store.vectors_loaded",
            location,
            vectors = vectors.len(),
            "vector store loaded"
        );
        Ok(vectors)
    }
}

/// Vector sets registered under arbitrary location names.
#[derive(Clone, Debug, Default)]
pub struct MemoryVectorStore {
    sets: HashMap<String, HashMap<ItemId, Vec<f32>>>,
}

impl MemoryVectorStore {
    pub fn with_set(
        mut self,
        location: impl Into<String>,
        vectors: HashMap<ItemId, Vec<f32>>,
    ) -> Self {
        self.sets.insert(location.into(), vectors);
        self
    }
}

impl VectorStoreLoader for MemoryVectorStore {
    fn load(&self, location: &str) -> Result<HashMap<ItemId, Vec<f32>>, CollaboratorError> {
        self.sets.get(location).cloned().ok_or_else(|| {
            CollaboratorError::Unavailable(format!("no vector set is registered at `{location}`"))
        })
    }
}
