use rust_decimal::prelude::ToPrimitive;

use super::ScoringContext;
use crate::domain::{Dimension, DimensionScore, Item};
use crate::errors::RecommendError;

/// A pure `(profile, item) -> DimensionScore` function. Rules see only the
/// shared read-only context and must not keep state between calls.
pub trait ScoringRule: Send + Sync {
    fn dimension(&self) -> Dimension;

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError>;
}

/// Mean similarity between the candidate and the profile's liked items.
#[derive(Clone, Copy, Debug)]
pub struct SimilarityRule {
    pub weight: f64,
    pub threshold: f64,
}

impl ScoringRule for SimilarityRule {
    fn dimension(&self) -> Dimension {
        Dimension::Similarity
    }

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        let liked = context.liked_vectors();
        if liked.is_empty() {
            return Ok(DimensionScore::silent(self.dimension(), 0.0));
        }

        let candidate = context.vectors.vector_for(&item.id)?;
        let metric = context.vectors.metric();
        let total: f64 = liked.iter().map(|vector| metric.compare(candidate, vector)).sum();
        let mean = total / liked.len() as f64;
        let value = mean * self.weight;

        if mean >= self.threshold {
            Ok(DimensionScore::triggered(
                self.dimension(),
                value,
                "This item is similar to the profile's favorite items.",
            ))
        } else {
            Ok(DimensionScore::silent(self.dimension(), value))
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CountryExclusionRule {
    pub penalty: f64,
}

impl ScoringRule for CountryExclusionRule {
    fn dimension(&self) -> Dimension {
        Dimension::CountryExclusion
    }

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        if context.profile.prohibited_countries.contains(&item.country) {
            Ok(DimensionScore::triggered(
                self.dimension(),
                -self.penalty,
                format!("This item is from {}, a country the profile prohibits.", item.country),
            ))
        } else {
            Ok(DimensionScore::silent(self.dimension(), 0.0))
        }
    }
}

/// `rating / divisor * weight`, explained at or above the high-rating cutoff.
#[derive(Clone, Copy, Debug)]
pub struct RatingRule {
    pub divisor: f64,
    pub weight: f64,
    pub high_rating_cutoff: f64,
}

impl ScoringRule for RatingRule {
    fn dimension(&self) -> Dimension {
        Dimension::Rating
    }

    fn score(
        &self,
        _context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        let rating = rating_as_f64(item);
        let value = rating / self.divisor * self.weight;

        if rating >= self.high_rating_cutoff {
            Ok(DimensionScore::triggered(
                self.dimension(),
                value,
                "This item has a high rating score.",
            ))
        } else {
            Ok(DimensionScore::silent(self.dimension(), value))
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BrandAffinityRule {
    pub bonus: f64,
}

impl ScoringRule for BrandAffinityRule {
    fn dimension(&self) -> Dimension {
        Dimension::BrandAffinity
    }

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        Ok(bonus_if(
            context.profile.liked_brands.contains(&item.brand),
            self.dimension(),
            self.bonus,
            "This item is from a brand the profile likes.",
        ))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StyleAffinityRule {
    pub bonus: f64,
}

impl ScoringRule for StyleAffinityRule {
    fn dimension(&self) -> Dimension {
        Dimension::StyleAffinity
    }

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        Ok(bonus_if(
            context.profile.liked_styles.contains(&item.style),
            self.dimension(),
            self.bonus,
            "This item is a style the profile likes.",
        ))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CountryAffinityRule {
    pub bonus: f64,
}

impl ScoringRule for CountryAffinityRule {
    fn dimension(&self) -> Dimension {
        Dimension::CountryAffinity
    }

    fn score(
        &self,
        context: &ScoringContext<'_>,
        item: &Item,
    ) -> Result<DimensionScore, RecommendError> {
        Ok(bonus_if(
            context.profile.liked_countries.contains(&item.country),
            self.dimension(),
            self.bonus,
            "This item is from a country the profile likes.",
        ))
    }
}

fn bonus_if(condition: bool, dimension: Dimension, bonus: f64, explanation: &str) -> DimensionScore {
    if condition {
        DimensionScore::triggered(dimension, bonus, explanation)
    } else {
        DimensionScore::silent(dimension, 0.0)
    }
}

fn rating_as_f64(item: &Item) -> f64 {
    match item.rating.to_f64() {
        Some(rating) => rating,
        None => {
            debug_assert!(false, "rating {} of `{}` has no f64 form", item.rating, item.id);
            tracing::warn!(
                event_name = "scoring.rating_unconvertible",
                item_id = %item.id,
                rating = %item.rating,
                "rating has no floating-point form; scoring it as zero"
            );
            0.0
        }
    }
}
