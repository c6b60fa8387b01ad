//! Ranking followed by section solving, for a single profile.

use serde::Serialize;

use crate::catalog::{CatalogQueryService, ProfileQueryService, VectorStoreLoader};
use crate::domain::{Profile, ProfileId};
use crate::errors::RecommendError;
use crate::ranking::{RankingPipeline, SkipRecord};
use crate::solver::{SectionSolver, SolveReport, SolverConfig};
use crate::vectors::SimilarityMetric;

#[derive(Clone, Debug, Serialize)]
pub struct MealPlan {
    pub profile_id: ProfileId,
    /// Items the ranking stage left out, carried through for reporting.
    pub skipped: Vec<SkipRecord>,
    pub report: SolveReport,
}

pub struct MealPlanPipeline<C> {
    ranking: RankingPipeline<C>,
    solver: SectionSolver,
}

impl<C> MealPlanPipeline<C>
where
    C: CatalogQueryService,
{
    pub fn new(ranking: RankingPipeline<C>, config: SolverConfig) -> Result<Self, RecommendError> {
        Ok(Self { ranking, solver: SectionSolver::new(config)? })
    }

    pub fn from_vector_source<L>(
        loader: &L,
        location: &str,
        metric: SimilarityMetric,
        catalog: C,
        config: SolverConfig,
    ) -> Result<Self, RecommendError>
    where
        L: VectorStoreLoader + ?Sized,
    {
        let ranking = RankingPipeline::from_vector_source(loader, location, metric, catalog)?;
        Self::new(ranking, config)
    }

    pub fn ranking(&self) -> &RankingPipeline<C> {
        &self.ranking
    }

    pub fn solver(&self) -> &SectionSolver {
        &self.solver
    }

    pub fn plan(&self, profile: &Profile) -> Result<MealPlan, RecommendError> {
        let _span = tracing::info_span!("meal_plan", correlation_id = %profile.id).entered();
        let ranked = self.ranking.rank(profile)?;
        let report = self.solver.solve(&ranked)?;
        Ok(MealPlan {
            profile_id: profile.id.clone(),
            skipped: ranked.skipped().to_vec(),
            report,
        })
    }

    pub fn plan_for<P>(&self, profiles: &P, profile_id: &ProfileId) -> Result<MealPlan, RecommendError>
    where
        P: ProfileQueryService + ?Sized,
    {
        let profile = profiles.profile_by_id(profile_id)?;
        self.plan(&profile)
    }
}
