//! Ranking pipeline: catalog enumeration -> scoring -> stable sort.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogQueryService, ProfileQueryService, VectorStoreLoader};
use crate::domain::{Item, ItemId, Profile, ProfileId, ScoredCandidate};
use crate::errors::RecommendError;
use crate::scoring::{ExclusionMode, Scorer};
use crate::vectors::{SimilarityMetric, VectorIndex};

/// What to do when one item cannot be scored because its vector is missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingVectorPolicy {
    #[default]
    Skip,
    Abort,
}

impl FromStr for MissingVectorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => {
                Err(format!("unsupported missing vector policy `{other}` (expected skip|abort)"))
            }
        }
    }
}

/// Which items enter scoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CandidateSource {
    /// Every item the catalog enumerates.
    #[default]
    All,
    /// Items that are among the `top_n` most similar to every liked item.
    SimilarToLiked { top_n: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingOptions {
    pub missing_vector: MissingVectorPolicy,
    pub source: CandidateSource,
    /// Leave the profile's own liked items out of the output.
    pub exclude_liked: bool,
    /// Score across the rayon pool. Output order is identical either way.
    pub parallel: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    VectorMissing,
    Prohibited,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub item_id: ItemId,
    pub reason: SkipReason,
}

/// Scored candidates in rank order. Iterating never touches a collaborator;
/// it re-traverses the already-scored results, so every pass yields the same
/// sequence.
#[derive(Clone, Debug, Serialize)]
pub struct RankedCandidates {
    profile_id: ProfileId,
    candidates: Arc<[ScoredCandidate]>,
    skipped: Vec<SkipRecord>,
}

impl RankedCandidates {
    pub fn profile_id(&self) -> &ProfileId {
        &self.profile_id
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredCandidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[ScoredCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn top(&self, n: usize) -> &[ScoredCandidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    pub fn skipped(&self) -> &[SkipRecord] {
        &self.skipped
    }
}

impl<'a> IntoIterator for &'a RankedCandidates {
    type Item = &'a ScoredCandidate;
    type IntoIter = std::slice::Iter<'a, ScoredCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct RankingPipeline<C> {
    vectors: Arc<VectorIndex>,
    catalog: C,
    scorer: Scorer,
    options: RankingOptions,
}

impl<C> RankingPipeline<C>
where
    C: CatalogQueryService,
{
    pub fn new(vectors: Arc<VectorIndex>, catalog: C) -> Self {
        Self { vectors, catalog, scorer: Scorer::default(), options: RankingOptions::default() }
    }

    /// Builds the Vector Index through `loader` before wiring the pipeline.
    pub fn from_vector_source<L>(
        loader: &L,
        location: &str,
        metric: SimilarityMetric,
        catalog: C,
    ) -> Result<Self, RecommendError>
    where
        L: VectorStoreLoader + ?Sized,
    {
        let vectors = VectorIndex::load(loader, location, metric)?;
        Ok(Self::new(Arc::new(vectors), catalog))
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_options(mut self, options: RankingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn options(&self) -> &RankingOptions {
        &self.options
    }

    pub fn recommend_for<P>(
        &self,
        profiles: &P,
        profile_id: &ProfileId,
    ) -> Result<RankedCandidates, RecommendError>
    where
        P: ProfileQueryService + ?Sized,
    {
        let profile = profiles.profile_by_id(profile_id)?;
        self.rank(&profile)
    }

    pub fn rank(&self, profile: &Profile) -> Result<RankedCandidates, RecommendError> {
        let context = self.scorer.context(profile, &self.vectors)?;
        let items: Vec<Arc<Item>> = self
            .candidate_items(profile)?
            .into_iter()
            .filter(|item| !(self.options.exclude_liked && profile.likes_item(&item.id)))
            .map(Arc::new)
            .collect();
        let enumerated = items.len();

        let results: Vec<Result<ScoredCandidate, RecommendError>> = if self.options.parallel {
            items.par_iter().map(|item| self.scorer.score(&context, Arc::clone(item))).collect()
        } else {
            items.iter().map(|item| self.scorer.score(&context, Arc::clone(item))).collect()
        };

        let filter_prohibited = self.scorer.exclusion_mode() == ExclusionMode::Filter;
        let mut candidates = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();

        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(candidate) if filter_prohibited && candidate.is_excluded() => {
                    skipped.push(SkipRecord {
                        item_id: item.id.clone(),
                        reason: SkipReason::Prohibited,
                    });
                }
                Ok(candidate) => candidates.push(candidate),
                Err(error)
                    if error.is_item_recoverable()
                        && self.options.missing_vector == MissingVectorPolicy::Skip =>
                {
                    tracing::warn!(
                        event_name = "ranking.item_skipped",
                        correlation_id = %profile.id,
                        item_id = %item.id,
                        error = %error,
                        "item excluded from ranking"
                    );
                    skipped.push(SkipRecord {
                        item_id: item.id.clone(),
                        reason: SkipReason::VectorMissing,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        // Stable: equal totals keep catalog enumeration order.
        candidates.sort_by(|left, right| right.total_score().total_cmp(&left.total_score()));

        tracing::info!(
            event_name = "ranking.completed",
            correlation_id = %profile.id,
            enumerated,
            ranked = candidates.len(),
            skipped = skipped.len(),
            "ranking completed"
        );

        Ok(RankedCandidates {
            profile_id: profile.id.clone(),
            candidates: candidates.into(),
            skipped,
        })
    }

    fn candidate_items(&self, profile: &Profile) -> Result<Vec<Item>, RecommendError> {
        match self.options.source {
            CandidateSource::All => Ok(self.catalog.all_items()?),
            CandidateSource::SimilarToLiked { top_n } => {
                let shared = self.similar_to_all_liked(profile, top_n)?;
                // Identifier order keeps ties reproducible.
                let mut items = Vec::with_capacity(shared.len());
                for id in &shared {
                    items.push(self.catalog.item_by_id(id)?);
                }
                Ok(items)
            }
        }
    }

    fn similar_to_all_liked(
        &self,
        profile: &Profile,
        top_n: usize,
    ) -> Result<BTreeSet<ItemId>, RecommendError> {
        let mut shared: Option<BTreeSet<ItemId>> = None;
        for liked in &profile.liked_items {
            if !self.vectors.contains(liked) {
                continue;
            }
            let nearest: BTreeSet<ItemId> = self
                .vectors
                .most_similar(liked, top_n)?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            shared = Some(match shared {
                None => nearest,
                Some(current) => current.intersection(&nearest).cloned().collect(),
            });
        }
        Ok(shared.unwrap_or_default())
    }
}
