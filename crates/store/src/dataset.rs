//! JSON dataset of items and profiles.
//!
//! ```json
//! {
//!   "items": [{ "id": "r-001", "label": "...", "brand": "...", "country": "...",
//!               "style": "...", "rating": "4.75", "price": "2.87" }],
//!   "profiles": [{ "id": "eater-1", "liked_items": ["r-001"] }]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use curate_core::errors::CollaboratorError;
use curate_core::{Item, Profile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::memory::{InMemoryCatalog, InMemoryProfileStore};

pub const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse `{origin}`: {source}")]
    Parse { origin: String, source: serde_json::Error },
    #[error("could not encode JSON: {0}")]
    Encode(serde_json::Error),
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid dataset: {0}")]
    Invalid(String),
}

impl From<StoreError> for CollaboratorError {
    fn from(error: StoreError) -> Self {
        CollaboratorError::Unavailable(error.to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub items: Vec<Item>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| StoreError::Read { path: path.to_path_buf(), source })?;
        let dataset = Self::from_json_str(&raw, &path.display().to_string())?;

        info!(
            event_name = "store.dataset_loaded",
            path = %path.display(),
            items = dataset.items.len(),
            profiles = dataset.profiles.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, StoreError> {
        let dataset: Self = serde_json::from_str(raw)
            .map_err(|source| StoreError::Parse { origin: origin.to_string(), source })?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn to_json_pretty(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(StoreError::Encode)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let mut item_ids = HashSet::new();
        for item in &self.items {
            if item.id.as_str().trim().is_empty() {
                return Err(StoreError::Invalid("item ids must not be empty".to_string()));
            }
            if !item_ids.insert(&item.id) {
                return Err(StoreError::Invalid(format!("item `{}` appears more than once", item.id)));
            }
            if item.price < Decimal::ZERO {
                return Err(StoreError::Invalid(format!(
                    "item `{}` has negative price {}",
                    item.id, item.price
                )));
            }
            if item.rating < Decimal::ZERO || item.rating > MAX_RATING {
                return Err(StoreError::Invalid(format!(
                    "item `{}` has rating {} outside 0..={MAX_RATING}",
                    item.id, item.rating
                )));
            }
        }

        let mut profile_ids = HashSet::new();
        for profile in &self.profiles {
            if !profile_ids.insert(&profile.id) {
                return Err(StoreError::Invalid(format!(
                    "profile `{}` appears more than once",
                    profile.id
                )));
            }
            for liked in profile.liked_items.iter().filter(|id| !item_ids.contains(id)) {
                warn!(
                    event_name = "store.unknown_liked_item",
                    correlation_id = %profile.id,
                    item_id = %liked,
                    "profile likes an item the catalog does not contain"
                );
            }
        }

        Ok(())
    }

    pub fn into_collaborators(self) -> Result<(InMemoryCatalog, InMemoryProfileStore), StoreError> {
        let catalog = InMemoryCatalog::new(self.items)?;
        let profiles = InMemoryProfileStore::new(self.profiles)?;
        Ok((catalog, profiles))
    }
}
