use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::item::Item;

/// Named scoring dimension. The six built-in dimensions cover the default
/// policy; `Custom` names a dimension contributed by an appended rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Similarity,
    CountryExclusion,
    Rating,
    BrandAffinity,
    StyleAffinity,
    CountryAffinity,
    Custom(String),
}

impl Dimension {
    pub fn name(&self) -> &str {
        match self {
            Self::Similarity => "similarity",
            Self::CountryExclusion => "country_exclusion",
            Self::Rating => "rating",
            Self::BrandAffinity => "brand_affinity",
            Self::StyleAffinity => "style_affinity",
            Self::CountryAffinity => "country_affinity",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Explanation(pub String);

impl Explanation {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One dimension's contribution. The explanation is present exactly when the
/// dimension's policy condition was met.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub value: f64,
    pub explanation: Option<Explanation>,
}

impl DimensionScore {
    pub fn triggered(dimension: Dimension, value: f64, explanation: impl Into<String>) -> Self {
        Self { dimension, value, explanation: Some(Explanation::new(explanation)) }
    }

    pub fn silent(dimension: Dimension, value: f64) -> Self {
        Self { dimension, value, explanation: None }
    }

    pub fn is_triggered(&self) -> bool {
        self.explanation.is_some()
    }
}

/// An item paired with its dimension scores for one profile.
///
/// `total_score` is computed once from `applied_scores` at construction and
/// the fields are private, so the sum can never drift from its parts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
    item: Arc<Item>,
    applied_scores: Vec<DimensionScore>,
    total_score: f64,
}

impl ScoredCandidate {
    pub fn new(item: Arc<Item>, applied_scores: Vec<DimensionScore>) -> Self {
        let total_score = applied_scores.iter().map(|score| score.value).sum();
        Self { item, applied_scores, total_score }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn shared_item(&self) -> Arc<Item> {
        Arc::clone(&self.item)
    }

    pub fn applied_scores(&self) -> &[DimensionScore] {
        &self.applied_scores
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn explanations(&self) -> impl Iterator<Item = &Explanation> {
        self.applied_scores.iter().filter_map(|score| score.explanation.as_ref())
    }

    pub fn score_for(&self, dimension: &Dimension) -> Option<&DimensionScore> {
        self.applied_scores.iter().find(|score| &score.dimension == dimension)
    }

    /// True when the profile prohibits this item's country of origin.
    pub fn is_excluded(&self) -> bool {
        self.score_for(&Dimension::CountryExclusion).is_some_and(DimensionScore::is_triggered)
    }
}
