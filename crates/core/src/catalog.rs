//! Interfaces of the external collaborators the core consumes.
//!
//! Storage, querying, and vector loading live outside the core; these traits
//! are the only shape the ranking and solving code depends on.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Item, ItemId, Profile, ProfileId};
use crate::errors::CollaboratorError;

pub trait CatalogQueryService: Send + Sync {
    /// Every visible item, in the catalog's stable enumeration order.
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError>;

    fn item_by_id(&self, id: &ItemId) -> Result<Item, CollaboratorError>;
}

pub trait ProfileQueryService: Send + Sync {
    fn profile_by_id(&self, id: &ProfileId) -> Result<Profile, CollaboratorError>;
}

/// Loads the `{item id -> vector}` mapping behind a Vector Index. The
/// location format is owned by the implementation.
pub trait VectorStoreLoader {
    fn load(&self, location: &str) -> Result<HashMap<ItemId, Vec<f32>>, CollaboratorError>;
}

impl<T: CatalogQueryService + ?Sized> CatalogQueryService for Arc<T> {
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError> {
        (**self).all_items()
    }

    fn item_by_id(&self, id: &ItemId) -> Result<Item, CollaboratorError> {
        (**self).item_by_id(id)
    }
}

impl<T: CatalogQueryService + ?Sized> CatalogQueryService for &T {
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError> {
        (**self).all_items()
    }

    fn item_by_id(&self, id: &ItemId) -> Result<Item, CollaboratorError> {
        (**self).item_by_id(id)
    }
}

impl<T: ProfileQueryService + ?Sized> ProfileQueryService for Arc<T> {
    fn profile_by_id(&self, id: &ProfileId) -> Result<Profile, CollaboratorError> {
        (**self).profile_by_id(id)
    }
}

impl<T: ProfileQueryService + ?Sized> ProfileQueryService for &T {
    fn profile_by_id(&self, id: &ProfileId) -> Result<Profile, CollaboratorError> {
        (**self).profile_by_id(id)
    }
}
