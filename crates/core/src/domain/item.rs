use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog entry. Ratings are bounded (0-5 in the bundled datasets) and
/// prices are never negative; the store layer rejects records that break
/// either rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub label: String,
    pub brand: String,
    pub country: String,
    pub style: String,
    pub rating: Decimal,
    pub price: Decimal,
}

impl Item {
    pub fn attribute(&self, attribute: Attribute) -> Decimal {
        match attribute {
            Attribute::Price => self.price,
            Attribute::Rating => self.rating,
            Attribute::Count => Decimal::ONE,
        }
    }
}

/// Numeric item attributes that aggregate constraints can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Price,
    Rating,
    /// Every item contributes exactly one.
    Count,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Price, Attribute::Rating, Attribute::Count];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rating => "rating",
            Self::Count => "count",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Price => 0,
            Self::Rating => 1,
            Self::Count => 2,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
