use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tunable numbers behind the six built-in dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Multiplier applied to the mean similarity against liked items.
    pub similarity_weight: f64,
    /// Mean similarity at or above which the similarity dimension explains itself.
    pub similarity_threshold: f64,
    pub prohibited_country_penalty: f64,
    pub exclusion_mode: ExclusionMode,
    pub rating_divisor: f64,
    pub rating_weight: f64,
    pub high_rating_cutoff: f64,
    pub brand_bonus: f64,
    pub style_bonus: f64,
    pub country_bonus: f64,
    pub empty_likes: EmptyLikesPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        super::DEFAULT_POLICY
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("similarity_weight", self.similarity_weight),
            ("similarity_threshold", self.similarity_threshold),
            ("prohibited_country_penalty", self.prohibited_country_penalty),
            ("rating_divisor", self.rating_divisor),
            ("rating_weight", self.rating_weight),
            ("high_rating_cutoff", self.high_rating_cutoff),
            ("brand_bonus", self.brand_bonus),
            ("style_bonus", self.style_bonus),
            ("country_bonus", self.country_bonus),
        ];
        if let Some((name, _)) = weights.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("scoring.{name} must be a finite number"));
        }
        if self.rating_divisor <= 0.0 {
            return Err("scoring.rating_divisor must be greater than zero".to_string());
        }
        if self.prohibited_country_penalty < 0.0 {
            return Err(
                "scoring.prohibited_country_penalty is a magnitude and must not be negative"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// How a prohibited country of origin is enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionMode {
    /// Keep the item and subtract the penalty.
    #[default]
    Penalize,
    /// Drop the item from ranking output, recording a skip.
    Filter,
}

impl FromStr for ExclusionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "penalize" => Ok(Self::Penalize),
            "filter" => Ok(Self::Filter),
            other => Err(format!("unsupported exclusion mode `{other}` (expected penalize|filter)")),
        }
    }
}

/// What similarity means for a profile with no usable liked items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyLikesPolicy {
    /// Fail the request with `ProfileIncomplete`.
    #[default]
    Fail,
    /// Score similarity as zero, without explanation.
    ZeroSimilarity,
}

impl FromStr for EmptyLikesPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "zero_similarity" => Ok(Self::ZeroSimilarity),
            other => Err(format!(
                "unsupported empty likes policy `{other}` (expected fail|zero_similarity)"
            )),
        }
    }
}
