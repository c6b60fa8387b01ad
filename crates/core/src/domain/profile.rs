use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::item::ItemId;

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static preferences of one consumer. Sets are ordered so that every
/// derived computation (such as averaging liked-item similarity) visits
/// members in the same order on every run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub liked_items: BTreeSet<ItemId>,
    #[serde(default)]
    pub liked_brands: BTreeSet<String>,
    #[serde(default)]
    pub liked_countries: BTreeSet<String>,
    #[serde(default)]
    pub prohibited_countries: BTreeSet<String>,
    #[serde(default)]
    pub liked_styles: BTreeSet<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: ProfileId::new(id), ..Self::default() }
    }

    pub fn with_liked_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.liked_items.extend(items.into_iter().map(|id| ItemId(id.into())));
        self
    }

    pub fn with_liked_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.liked_brands.extend(brands.into_iter().map(Into::into));
        self
    }

    pub fn with_liked_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.liked_countries.extend(countries.into_iter().map(Into::into));
        self
    }

    pub fn with_prohibited_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prohibited_countries.extend(countries.into_iter().map(Into::into));
        self
    }

    pub fn with_liked_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.liked_styles.extend(styles.into_iter().map(Into::into));
        self
    }

    pub fn likes_item(&self, id: &ItemId) -> bool {
        self.liked_items.contains(id)
    }
}
