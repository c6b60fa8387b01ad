pub mod candidate;
pub mod item;
pub mod profile;

pub use candidate::{Dimension, DimensionScore, Explanation, ScoredCandidate};
pub use item::{Attribute, Item, ItemId};
pub use profile::{Profile, ProfileId};
