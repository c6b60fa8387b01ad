//! Constrained section solver.
//!
//! Picks `num_sections` disjoint groups of `items_per_section` candidates that
//! maximize the summed candidate score while every [`Constraint`] holds. The
//! search is an exact branch-and-bound over the (optionally truncated)
//! candidate pool, bounded by a [`SearchBudget`].

mod constraints;
mod search;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Attribute, ItemId, ScoredCandidate};
use crate::errors::RecommendError;

pub use constraints::{Comparison, Constraint, ConstraintScope, ConstraintViolation};

use search::BranchAndBound;

pub const DEFAULT_MAX_NODES: u64 = 2_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchBudget {
    pub max_nodes: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self { max_nodes: None, max_duration: None }
    }

    pub fn nodes(max_nodes: u64) -> Self {
        Self { max_nodes: Some(max_nodes), max_duration: None }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self { max_nodes: Some(DEFAULT_MAX_NODES), max_duration: None }
    }
}

/// Pins an item into a specific zero-based section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredAssignment {
    pub item_id: ItemId,
    pub section: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    pub num_sections: usize,
    pub items_per_section: usize,
    pub constraints: Vec<Constraint>,
    /// Restricts the search to the K best candidates. `None` searches the
    /// whole pool and keeps the result exact.
    pub top_k: Option<usize>,
    pub budget: SearchBudget,
    pub allow_reuse: bool,
    pub required: Vec<RequiredAssignment>,
}

impl SolverConfig {
    pub fn new(num_sections: usize, items_per_section: usize) -> Self {
        Self {
            num_sections,
            items_per_section,
            constraints: Vec::new(),
            top_k: None,
            budget: SearchBudget::default(),
            allow_reuse: false,
            required: Vec::new(),
        }
    }

    /// Sections with a minimum rating sum, a maximum price sum, and a cap on
    /// the price of the whole plan.
    pub fn meal_plan(
        num_sections: usize,
        items_per_section: usize,
        min_section_rating: Decimal,
        max_section_price: Decimal,
        max_total_price: Decimal,
    ) -> Self {
        Self::new(num_sections, items_per_section)
            .with_constraint(Constraint::section_at_least(
                "min_section_rating",
                Attribute::Rating,
                min_section_rating,
            ))
            .with_constraint(Constraint::section_at_most(
                "max_section_price",
                Attribute::Price,
                max_section_price,
            ))
            .with_constraint(Constraint::global_at_most(
                "max_total_price",
                Attribute::Price,
                max_total_price,
            ))
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_reuse(mut self, allow_reuse: bool) -> Self {
        self.allow_reuse = allow_reuse;
        self
    }

    pub fn with_required(mut self, item_id: ItemId, section: usize) -> Self {
        self.required.push(RequiredAssignment { item_id, section });
        self
    }

    /// Distinct candidates a complete solution consumes.
    pub fn distinct_items_needed(&self) -> usize {
        if self.allow_reuse {
            self.items_per_section
        } else {
            self.num_sections * self.items_per_section
        }
    }

    pub fn validate(&self) -> Result<(), RecommendError> {
        if self.num_sections == 0 {
            return Err(invalid("num_sections must be positive"));
        }
        if self.items_per_section == 0 {
            return Err(invalid("items_per_section must be positive"));
        }

        for constraint in &self.constraints {
            if constraint.name.trim().is_empty() {
                return Err(invalid("constraint names must not be empty"));
            }
            if constraint.threshold <= Decimal::ZERO {
                return Err(invalid(format!(
                    "{} must be positive (got {})",
                    constraint.name, constraint.threshold
                )));
            }
            if let ConstraintScope::Section(section) = constraint.scope {
                if section >= self.num_sections {
                    return Err(invalid(format!(
                        "{} targets section {} but only {} sections are planned",
                        constraint.name,
                        section + 1,
                        self.num_sections
                    )));
                }
            }
        }

        if let Some(top_k) = self.top_k {
            let needed = self.distinct_items_needed();
            if top_k < needed {
                return Err(invalid(format!(
                    "top_k {top_k} is smaller than the {needed} distinct items a plan needs"
                )));
            }
        }
        if self.budget.max_nodes == Some(0) {
            return Err(invalid("max_nodes must be positive when set"));
        }

        let mut pinned = HashSet::new();
        let mut pinned_per_section = vec![0usize; self.num_sections];
        for requirement in &self.required {
            if requirement.section >= self.num_sections {
                return Err(invalid(format!(
                    "item `{}` is pinned to section {} but only {} sections are planned",
                    requirement.item_id,
                    requirement.section + 1,
                    self.num_sections
                )));
            }
            if !pinned.insert(&requirement.item_id) {
                return Err(invalid(format!(
                    "item `{}` is pinned more than once",
                    requirement.item_id
                )));
            }
            pinned_per_section[requirement.section] += 1;
            if pinned_per_section[requirement.section] > self.items_per_section {
                return Err(invalid(format!(
                    "section {} has more pinned items than its {} slots",
                    requirement.section + 1,
                    self.items_per_section
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> RecommendError {
    RecommendError::InvalidConfiguration(message.into())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverPhase {
    Initialized,
    Searching,
    Solved,
    Infeasible,
    BudgetExhausted,
}

impl SolverPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Searching => "searching",
            Self::Solved => "solved",
            Self::Infeasible => "infeasible",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Solved | Self::Infeasible | Self::BudgetExhausted)
    }

    pub fn can_advance_to(&self, next: SolverPhase) -> bool {
        matches!(
            (self, next),
            (Self::Initialized, Self::Searching)
                | (Self::Searching, Self::Solved)
                | (Self::Searching, Self::Infeasible)
                | (Self::Searching, Self::BudgetExhausted)
        )
    }
}

#[derive(Debug)]
struct PhaseTracker {
    current: SolverPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self { current: SolverPhase::Initialized }
    }

    fn advance(&mut self, next: SolverPhase) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal solver transition {:?} -> {:?}",
            self.current,
            next
        );
        debug!(
            event_name = "solver.phase_changed",
            from = self.current.as_str(),
            to = next.as_str(),
            "solver phase changed"
        );
        self.current = next;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub index: usize,
    pub candidates: Vec<ScoredCandidate>,
    pub score: f64,
    pub attribute_totals: BTreeMap<Attribute, Decimal>,
}

impl Section {
    fn new(index: usize, candidates: Vec<ScoredCandidate>) -> Self {
        let score = candidates.iter().map(ScoredCandidate::total_score).sum();
        let attribute_totals = totals_of(candidates.iter());
        Self { index, candidates, score, attribute_totals }
    }

    pub fn total(&self, attribute: Attribute) -> Decimal {
        self.attribute_totals.get(&attribute).copied().unwrap_or_default()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.candidates.iter().map(|candidate| &candidate.item().id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolutionSet {
    pub sections: Vec<Section>,
    pub overall_score: f64,
    pub attribute_totals: BTreeMap<Attribute, Decimal>,
}

impl SolutionSet {
    fn new(sections: Vec<Section>) -> Self {
        let overall_score = sections.iter().map(|section| section.score).sum();
        let attribute_totals =
            totals_of(sections.iter().flat_map(|section| section.candidates.iter()));
        Self { sections, overall_score, attribute_totals }
    }

    pub fn total(&self, attribute: Attribute) -> Decimal {
        self.attribute_totals.get(&attribute).copied().unwrap_or_default()
    }

    /// Names of the constraints this solution breaks.
    pub fn violations(&self, constraints: &[Constraint]) -> Vec<String> {
        let mut broken = Vec::new();
        for constraint in constraints {
            let holds = if constraint.is_global() {
                constraint.is_satisfied_by(self.total(constraint.attribute))
            } else {
                self.sections
                    .iter()
                    .filter(|section| constraint.applies_to_section(section.index))
                    .all(|section| constraint.is_satisfied_by(section.total(constraint.attribute)))
            };
            if !holds {
                broken.push(constraint.name.clone());
            }
        }
        broken
    }

    pub fn reuses_items(&self) -> bool {
        let mut seen = HashSet::new();
        self.sections
            .iter()
            .flat_map(Section::item_ids)
            .any(|item_id| !seen.insert(item_id))
    }
}

fn totals_of<'a>(
    candidates: impl Iterator<Item = &'a ScoredCandidate>,
) -> BTreeMap<Attribute, Decimal> {
    let mut totals: BTreeMap<Attribute, Decimal> =
        Attribute::ALL.iter().map(|attribute| (*attribute, Decimal::ZERO)).collect();
    for candidate in candidates {
        for (attribute, total) in totals.iter_mut() {
            *total += candidate.item().attribute(*attribute);
        }
    }
    totals
}

/// Which candidates an infeasibility verdict covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "k")]
pub enum PoolScope {
    FullCatalog,
    TopK(usize),
}

impl std::fmt::Display for PoolScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullCatalog => f.write_str("the full candidate set"),
            Self::TopK(k) => write!(f, "the current top-{k} candidates"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Infeasibility {
    pub violations: Vec<ConstraintViolation>,
    pub pool: PoolScope,
}

impl Infeasibility {
    pub fn constraint_names(&self) -> Vec<&str> {
        self.violations.iter().map(|violation| violation.constraint.as_str()).collect()
    }

    pub fn summary(&self) -> String {
        let names = self.constraint_names();
        if names.is_empty() {
            return format!("no assignment honors the pinned items given {}", self.pool);
        }
        format!("no combination meets {} given {}", names.join(" and "), self.pool)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SolveOutcome {
    Solved(SolutionSet),
    Infeasible(Infeasibility),
    /// The budget ran out before the search finished. The best solution seen
    /// so far, if any, satisfies every constraint but is not proven optimal.
    BudgetExhausted { best: Option<SolutionSet> },
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&SolutionSet> {
        match self {
            Self::Solved(solution) => Some(solution),
            Self::BudgetExhausted { best } => best.as_ref(),
            Self::Infeasible(_) => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Solved(_) => "solved",
            Self::Infeasible(_) => "infeasible",
            Self::BudgetExhausted { .. } => "budget_exhausted",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub candidates_considered: usize,
    pub nodes_explored: u64,
    /// Set when the search ran on a top-K slice, which makes the result a
    /// heuristic rather than an exact optimum.
    pub truncated_to_top_k: bool,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub stats: SearchStats,
    pub phase: SolverPhase,
}

#[derive(Clone, Debug)]
pub struct SectionSolver {
    config: SolverConfig,
}

impl SectionSolver {
    pub fn new(config: SolverConfig) -> Result<Self, RecommendError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves over ranked candidates. Candidates flagged by the country
    /// exclusion rule are dropped, duplicates keep their first occurrence, and
    /// the remainder is stably re-sorted by score.
    pub fn solve<'c, I>(&self, candidates: I) -> Result<SolveReport, RecommendError>
    where
        I: IntoIterator<Item = &'c ScoredCandidate>,
    {
        let started = Instant::now();
        let mut phase = PhaseTracker::new();

        let mut seen = HashSet::new();
        let mut pool: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|candidate| !candidate.is_excluded())
            .filter(|candidate| seen.insert(candidate.item().id.clone()))
            .cloned()
            .collect();
        pool.sort_by(|left, right| right.total_score().total_cmp(&left.total_score()));

        if let Some(candidate) = pool.iter().find(|candidate| {
            Attribute::ALL
                .iter()
                .any(|attribute| candidate.item().attribute(*attribute) < Decimal::ZERO)
        }) {
            return Err(invalid(format!(
                "item `{}` has a negative price or rating",
                candidate.item().id
            )));
        }

        let needed = self.config.distinct_items_needed();
        if pool.len() < needed {
            return Err(invalid(format!(
                "{} sections of {} items need {needed} distinct candidates but only {} remain after exclusion filtering",
                self.config.num_sections,
                self.config.items_per_section,
                pool.len()
            )));
        }

        let pinned_ids = self.pinned_ids(&pool)?;
        let candidates_considered = pool.len();
        let (pool, scope) = self.truncate(pool, &pinned_ids);
        let pinned_to: Vec<Option<usize>> = pool
            .iter()
            .map(|candidate| pinned_ids.get(&candidate.item().id).copied())
            .collect();

        phase.advance(SolverPhase::Searching);

        let isolated = self.unreachable_in_isolation(&pool);
        let (outcome, nodes_explored) = if !isolated.is_empty() {
            (SolveOutcome::Infeasible(Infeasibility { violations: isolated, pool: scope }), 0)
        } else {
            let result = BranchAndBound::new(&pool, &self.config, pinned_to, started).run();
            let best = result.assignment.and_then(|assignment| self.materialize(&pool, assignment));
            let outcome = match (result.exhausted_budget, best) {
                (true, best) => SolveOutcome::BudgetExhausted { best },
                (false, Some(solution)) => SolveOutcome::Solved(solution),
                (false, None) => SolveOutcome::Infeasible(Infeasibility {
                    violations: self.joint_conflict(scope),
                    pool: scope,
                }),
            };
            (outcome, result.nodes_explored)
        };

        let terminal = match &outcome {
            SolveOutcome::Solved(_) => SolverPhase::Solved,
            SolveOutcome::Infeasible(_) => SolverPhase::Infeasible,
            SolveOutcome::BudgetExhausted { .. } => SolverPhase::BudgetExhausted,
        };
        phase.advance(terminal);

        let stats = SearchStats {
            candidates_considered,
            nodes_explored,
            truncated_to_top_k: matches!(scope, PoolScope::TopK(_)),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            event_name = "solver.completed",
            outcome = outcome.status(),
            num_sections = self.config.num_sections,
            items_per_section = self.config.items_per_section,
            candidates_considered = stats.candidates_considered,
            nodes_explored = stats.nodes_explored,
            truncated_to_top_k = stats.truncated_to_top_k,
            elapsed_ms = stats.elapsed_ms,
            overall_score = outcome.solution().map(|solution| solution.overall_score),
            "section solve finished"
        );

        Ok(SolveReport { outcome, stats, phase: phase.current })
    }

    fn pinned_ids(&self, pool: &[ScoredCandidate]) -> Result<HashMap<ItemId, usize>, RecommendError> {
        let available: HashSet<&ItemId> = pool.iter().map(|candidate| &candidate.item().id).collect();
        let mut pinned = HashMap::new();
        for requirement in &self.config.required {
            if !available.contains(&requirement.item_id) {
                return Err(invalid(format!(
                    "pinned item `{}` is not among the eligible candidates",
                    requirement.item_id
                )));
            }
            pinned.insert(requirement.item_id.clone(), requirement.section);
        }
        Ok(pinned)
    }

    fn truncate(
        &self,
        pool: Vec<ScoredCandidate>,
        pinned: &HashMap<ItemId, usize>,
    ) -> (Vec<ScoredCandidate>, PoolScope) {
        let Some(top_k) = self.config.top_k else {
            return (pool, PoolScope::FullCatalog);
        };
        if pool.len() <= top_k {
            return (pool, PoolScope::FullCatalog);
        }
        let kept = pool
            .into_iter()
            .enumerate()
            .filter(|(position, candidate)| {
                *position < top_k || pinned.contains_key(&candidate.item().id)
            })
            .map(|(_, candidate)| candidate)
            .collect();
        (kept, PoolScope::TopK(top_k))
    }

    /// Constraints that no selection of the right size could meet even when
    /// considered alone.
    fn unreachable_in_isolation(&self, pool: &[ScoredCandidate]) -> Vec<ConstraintViolation> {
        let per_section = self.config.items_per_section;
        let slots_all = self.config.num_sections * per_section;

        self.config
            .constraints
            .iter()
            .filter_map(|constraint| {
                let mut values: Vec<Decimal> = pool
                    .iter()
                    .map(|candidate| candidate.item().attribute(constraint.attribute))
                    .collect();
                values.sort();

                let (smallest, largest) = if !constraint.is_global() {
                    extreme_sums(&values, per_section)
                } else if self.config.allow_reuse {
                    let (low, high) = extreme_sums(&values, per_section);
                    let sections = Decimal::from(self.config.num_sections);
                    (low * sections, high * sections)
                } else {
                    extreme_sums(&values, slots_all)
                };
                constraint.check_in_isolation(smallest, largest)
            })
            .collect()
    }

    fn joint_conflict(&self, scope: PoolScope) -> Vec<ConstraintViolation> {
        let names: Vec<&str> =
            self.config.constraints.iter().map(|constraint| constraint.name.as_str()).collect();
        self.config
            .constraints
            .iter()
            .map(|constraint| ConstraintViolation {
                code: "JOINTLY_UNSATISFIABLE".to_string(),
                constraint: constraint.name.clone(),
                message: format!(
                    "{} cannot hold together with {} given {scope}",
                    constraint.name,
                    names
                        .iter()
                        .filter(|name| **name != constraint.name)
                        .copied()
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                suggestion: Some(format!("Relax {} or widen the candidate pool", constraint.name)),
            })
            .collect()
    }

    fn materialize(
        &self,
        pool: &[ScoredCandidate],
        assignment: Vec<Vec<usize>>,
    ) -> Option<SolutionSet> {
        let sections = assignment
            .into_iter()
            .enumerate()
            .map(|(index, positions)| {
                Section::new(index, positions.into_iter().map(|position| pool[position].clone()).collect())
            })
            .collect();
        let solution = SolutionSet::new(sections);

        let broken = solution.violations(&self.config.constraints);
        let pins_missing = self.config.required.iter().any(|requirement| {
            solution
                .sections
                .get(requirement.section)
                .map_or(true, |section| section.item_ids().all(|id| id != &requirement.item_id))
        });
        if !broken.is_empty() || pins_missing || (!self.config.allow_reuse && solution.reuses_items()) {
            tracing::error!(
                event_name = "solver.solution_rejected",
                broken = ?broken,
                pins_missing,
                "search produced an assignment that fails verification"
            );
            return None;
        }
        Some(solution)
    }
}

fn extreme_sums(sorted: &[Decimal], count: usize) -> (Decimal, Decimal) {
    let count = count.min(sorted.len());
    let smallest = sorted.iter().take(count).copied().sum();
    let largest = sorted.iter().rev().take(count).copied().sum();
    (smallest, largest)
}
