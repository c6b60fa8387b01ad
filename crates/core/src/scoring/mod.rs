//! Explainable multi-criteria scoring.
//!
//! A [`Scorer`] is an ordered list of independent [`ScoringRule`]s. Each rule
//! maps one (profile, item) pair to a single [`DimensionScore`]; the
//! candidate's total is the sum of those values. Adding a dimension means
//! appending a rule.

mod policy;
mod rules;

pub use policy::{EmptyLikesPolicy, ExclusionMode, ScoringPolicy};
pub use rules::{
    BrandAffinityRule, CountryAffinityRule, CountryExclusionRule, RatingRule, ScoringRule,
    SimilarityRule, StyleAffinityRule,
};

use std::sync::Arc;

use crate::domain::{Item, Profile, ScoredCandidate};
use crate::errors::RecommendError;
use crate::vectors::{EmbeddingVector, VectorIndex};

/// Default policy constants.
pub const DEFAULT_POLICY: ScoringPolicy = ScoringPolicy {
    similarity_weight: 1.0,
    similarity_threshold: 0.75,
    prohibited_country_penalty: 100.0,
    exclusion_mode: ExclusionMode::Penalize,
    rating_divisor: 5.0,
    rating_weight: 1.0,
    high_rating_cutoff: 4.0,
    brand_bonus: 1.1,
    style_bonus: 1.1,
    country_bonus: 1.1,
    empty_likes: EmptyLikesPolicy::Fail,
};

/// Immutable per-request inputs shared by every rule invocation.
pub struct ScoringContext<'a> {
    pub profile: &'a Profile,
    pub vectors: &'a VectorIndex,
    liked_vectors: Vec<&'a EmbeddingVector>,
}

impl<'a> ScoringContext<'a> {
    /// Vectors of the profile's liked items that exist in the index, in the
    /// profile's (ordered) liked-item order.
    pub fn liked_vectors(&self) -> &[&'a EmbeddingVector] {
        &self.liked_vectors
    }
}

pub struct Scorer {
    rules: Vec<Box<dyn ScoringRule>>,
    empty_likes: EmptyLikesPolicy,
    exclusion_mode: ExclusionMode,
}

impl Scorer {
    pub fn new() -> Self {
        Self::from_policy(&DEFAULT_POLICY)
    }

    /// The six built-in dimensions, in their fixed evaluation order.
    pub fn from_policy(policy: &ScoringPolicy) -> Self {
        let rules: Vec<Box<dyn ScoringRule>> = vec![
            Box::new(SimilarityRule {
                weight: policy.similarity_weight,
                threshold: policy.similarity_threshold,
            }),
            Box::new(CountryExclusionRule { penalty: policy.prohibited_country_penalty }),
            Box::new(RatingRule {
                divisor: policy.rating_divisor,
                weight: policy.rating_weight,
                high_rating_cutoff: policy.high_rating_cutoff,
            }),
            Box::new(BrandAffinityRule { bonus: policy.brand_bonus }),
            Box::new(StyleAffinityRule { bonus: policy.style_bonus }),
            Box::new(CountryAffinityRule { bonus: policy.country_bonus }),
        ];

        Self { rules, empty_likes: policy.empty_likes, exclusion_mode: policy.exclusion_mode }
    }

    pub fn with_rule(mut self, rule: impl ScoringRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn exclusion_mode(&self) -> ExclusionMode {
        self.exclusion_mode
    }

    /// Resolves the liked-item vectors once per request. Liked items without
    /// a stored vector are ignored; if none remain, the empty-likes policy
    /// decides between `ProfileIncomplete` and zero similarity.
    pub fn context<'a>(
        &self,
        profile: &'a Profile,
        vectors: &'a VectorIndex,
    ) -> Result<ScoringContext<'a>, RecommendError> {
        let mut liked_vectors = Vec::with_capacity(profile.liked_items.len());
        for liked in &profile.liked_items {
            match vectors.vector_for(liked) {
                Ok(vector) => liked_vectors.push(vector),
                Err(_) => tracing::warn!(
                    event_name = "scoring.liked_item_without_vector",
                    correlation_id = %profile.id,
                    item_id = %liked,
                    "liked item has no stored vector; ignoring it for similarity"
                ),
            }
        }

        if liked_vectors.is_empty() && self.empty_likes == EmptyLikesPolicy::Fail {
            return Err(RecommendError::ProfileIncomplete(profile.id.clone()));
        }

        Ok(ScoringContext { profile, vectors, liked_vectors })
    }

    pub fn score(
        &self,
        context: &ScoringContext<'_>,
        item: Arc<Item>,
    ) -> Result<ScoredCandidate, RecommendError> {
        let applied_scores = self
            .rules
            .iter()
            .map(|rule| rule.score(context, &item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ScoredCandidate::new(item, applied_scores))
    }

    /// One-shot scoring of a single pair.
    pub fn score_item(
        &self,
        profile: &Profile,
        vectors: &VectorIndex,
        item: Item,
    ) -> Result<ScoredCandidate, RecommendError> {
        let context = self.context(profile, vectors)?;
        self.score(&context, Arc::new(item))
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}
