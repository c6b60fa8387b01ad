pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod planning;
pub mod ranking;
pub mod scoring;
pub mod solver;
pub mod vectors;

pub use catalog::{CatalogQueryService, ProfileQueryService, VectorStoreLoader};
pub use domain::{
    Attribute, Dimension, DimensionScore, Explanation, Item, ItemId, Profile, ProfileId,
    ScoredCandidate,
};
pub use errors::{CollaboratorError, RecommendError, RecordKind};
pub use planning::{MealPlan, MealPlanPipeline};
pub use ranking::{
    CandidateSource, MissingVectorPolicy, RankedCandidates, RankingOptions, RankingPipeline,
    SkipReason, SkipRecord,
};
pub use scoring::{Scorer, ScoringPolicy, ScoringRule, DEFAULT_POLICY};
pub use solver::{
    Constraint, ConstraintScope, SearchBudget, SectionSolver, SolutionSet, SolveOutcome,
    SolveReport, SolverConfig, SolverPhase,
};
pub use vectors::{SimilarityMetric, VectorIndex};
