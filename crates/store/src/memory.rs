use std::collections::HashMap;

use curate_core::catalog::{CatalogQueryService, ProfileQueryService};
use curate_core::errors::{CollaboratorError, RecordKind};
use curate_core::{Item, ItemId, Profile, ProfileId};

use crate::dataset::StoreError;

/// Read-only catalog snapshot. Enumeration order is insertion order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    items: Vec<Item>,
    positions: HashMap<ItemId, usize>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<Item>) -> Result<Self, StoreError> {
        let mut positions = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if positions.insert(item.id.clone(), position).is_some() {
                return Err(StoreError::Invalid(format!(
                    "item `{}` appears more than once",
                    item.id
                )));
            }
        }
        Ok(Self { items, positions })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

impl CatalogQueryService for InMemoryCatalog {
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError> {
        Ok(self.items.clone())
    }

    fn item_by_id(&self, id: &ItemId) -> Result<Item, CollaboratorError> {
        self.positions
            .get(id)
            .map(|position| self.items[*position].clone())
            .ok_or_else(|| CollaboratorError::NotFound { kind: RecordKind::Item, id: id.to_string() })
    }
}

/// Read-only profile snapshot, fixed once loaded.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: HashMap<ProfileId, Profile>,
}

impl InMemoryProfileStore {
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> Result<Self, StoreError> {
        let mut by_id = HashMap::new();
        for profile in profiles {
            if by_id.contains_key(&profile.id) {
                return Err(StoreError::Invalid(format!(
                    "profile `{}` appears more than once",
                    profile.id
                )));
            }
            by_id.insert(profile.id.clone(), profile);
        }
        Ok(Self { profiles: by_id })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileQueryService for InMemoryProfileStore {
    fn profile_by_id(&self, id: &ProfileId) -> Result<Profile, CollaboratorError> {
        self.profiles.get(id).cloned().ok_or_else(|| CollaboratorError::NotFound {
            kind: RecordKind::Profile,
            id: id.to_string(),
        })
    }
}
