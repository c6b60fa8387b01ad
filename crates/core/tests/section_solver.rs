use std::collections::HashSet;
use std::sync::Arc;

use curate_core::solver::{
    Constraint, PoolScope, SearchBudget, SectionSolver, SolutionSet, SolveOutcome, SolverConfig,
    SolverPhase,
};
use curate_core::{Attribute, Dimension, DimensionScore, Item, ItemId, RecommendError, ScoredCandidate};
use rust_decimal::Decimal;

type SolverTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn dec(value: &str) -> Decimal {
    value.parse().unwrap_or_default()
}

fn candidate(id: &str, price: &str, rating: &str, score: f64) -> ScoredCandidate {
    candidate_from(id, price, rating, "NZ", score)
}

fn candidate_from(id: &str, price: &str, rating: &str, country: &str, score: f64) -> ScoredCandidate {
    let item = Item {
        id: ItemId::new(id),
        label: id.to_uppercase(),
        brand: "House".to_string(),
        country: country.to_string(),
        style: "plate".to_string(),
        rating: dec(rating),
        price: dec(price),
    };
    ScoredCandidate::new(
        Arc::new(item),
        vec![DimensionScore::silent(Dimension::Custom("fixture".to_string()), score)],
    )
}

/// Eight dishes in catalog order a..h.
fn menu() -> Vec<ScoredCandidate> {
    vec![
        candidate("a", "2.87", "4.25", 3.3),
        candidate("b", "1.57", "4", 3.0),
        candidate("c", "1.02", "3.75", 3.0),
        candidate("d", "1.97", "4.5", 2.9),
        candidate("e", "1.93", "4", 2.9),
        candidate("f", "2.43", "4.75", 2.9),
        candidate("g", "3.91", "5", 3.5),
        candidate("h", "4.16", "4.5", 3.4),
    ]
}

fn meal_plan(max_total_price: &str) -> SolverConfig {
    SolverConfig::meal_plan(2, 3, dec("7"), dec("7"), dec(max_total_price))
}

fn section_ids(solution: &SolutionSet) -> Vec<Vec<&str>> {
    solution
        .sections
        .iter()
        .map(|section| section.item_ids().map(ItemId::as_str).collect())
        .collect()
}

fn solved(outcome: &SolveOutcome) -> SolverTestResult<&SolutionSet> {
    match outcome {
        SolveOutcome::Solved(solution) => Ok(solution),
        other => Err(format!("expected a solution, got {}", other.status())),
    }
}

fn require_valid(solution: &SolutionSet, config: &SolverConfig) -> SolverTestResult {
    let broken = solution.violations(&config.constraints);
    require!(broken.is_empty(), "solution breaks {broken:?}");
    for section in &solution.sections {
        require_eq!(section.candidates.len(), config.items_per_section);
    }
    let distinct: HashSet<&ItemId> =
        solution.sections.iter().flat_map(|section| section.item_ids()).collect();
    require_eq!(distinct.len(), config.num_sections * config.items_per_section);
    Ok(())
}

#[test]
fn two_day_plan_reaches_the_optimum() -> SolverTestResult {
    let config = meal_plan("13");
    let solver = SectionSolver::new(config.clone()).map_err(|err| err.to_string())?;

    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;
    let solution = solved(&report.outcome)?;

    require!((solution.overall_score - 18.2).abs() < 1e-9, "score {}", solution.overall_score);
    require_valid(solution, &config)?;
    require_eq!(section_ids(solution), vec![vec!["g", "b", "c"], vec!["d", "e", "f"]]);
    require_eq!(solution.sections[0].total(Attribute::Price), dec("6.50"));
    require_eq!(solution.total(Attribute::Price), dec("12.83"));
    require_eq!(solution.total(Attribute::Count), dec("6"));
    require_eq!(report.phase, SolverPhase::Solved);
    require!(!report.stats.truncated_to_top_k);
    require!(report.stats.nodes_explored > 0);
    Ok(())
}

#[test]
fn solving_twice_returns_the_same_plan() -> SolverTestResult {
    let solver = SectionSolver::new(meal_plan("13")).map_err(|err| err.to_string())?;
    let menu = menu();

    let first = solver.solve(&menu).map_err(|err| err.to_string())?;
    let second = solver.solve(menu.iter()).map_err(|err| err.to_string())?;

    require_eq!(section_ids(solved(&first.outcome)?), section_ids(solved(&second.outcome)?));
    Ok(())
}

#[test]
fn total_price_below_cheapest_plan_is_infeasible() -> SolverTestResult {
    let solver = SectionSolver::new(meal_plan("5")).map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;

    let SolveOutcome::Infeasible(infeasibility) = &report.outcome else {
        return Err(format!("expected infeasible, got {}", report.outcome.status()));
    };
    require_eq!(infeasibility.constraint_names(), vec!["max_total_price"]);
    require_eq!(infeasibility.pool, PoolScope::FullCatalog);
    require!(infeasibility.summary().contains("no combination meets max_total_price"));
    require!(infeasibility.violations[0].message.contains("11.79"));
    require_eq!(report.phase, SolverPhase::Infeasible);
    Ok(())
}

#[test]
fn jointly_conflicting_bounds_are_proven_infeasible() -> SolverTestResult {
    let pool = vec![
        candidate("x", "4", "5", 2.0),
        candidate("y", "4", "5", 2.0),
        candidate("z", "1", "1", 1.0),
        candidate("w", "1", "1", 1.0),
    ];
    let config = SolverConfig::new(1, 2)
        .with_constraint(Constraint::section_at_most("max_section_price", Attribute::Price, dec("5")))
        .with_constraint(Constraint::section_at_least("min_section_rating", Attribute::Rating, dec("9")));
    let solver = SectionSolver::new(config).map_err(|err| err.to_string())?;

    let report = solver.solve(&pool).map_err(|err| err.to_string())?;
    let SolveOutcome::Infeasible(infeasibility) = &report.outcome else {
        return Err(format!("expected infeasible, got {}", report.outcome.status()));
    };
    require_eq!(infeasibility.constraint_names(), vec!["max_section_price", "min_section_rating"]);
    require!(infeasibility.violations.iter().all(|violation| violation.code == "JOINTLY_UNSATISFIABLE"));
    Ok(())
}

#[test]
fn node_budget_is_reported_separately_from_infeasibility() -> SolverTestResult {
    let solver = SectionSolver::new(meal_plan("13").with_budget(SearchBudget::nodes(1)))
        .map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;

    require!(
        matches!(report.outcome, SolveOutcome::BudgetExhausted { best: None }),
        "expected an empty budget-exhausted outcome, got {}",
        report.outcome.status()
    );
    require_eq!(report.phase, SolverPhase::BudgetExhausted);
    Ok(())
}

#[test]
fn budget_exhaustion_keeps_a_valid_incumbent() -> SolverTestResult {
    let config = meal_plan("13").with_budget(SearchBudget::nodes(40));
    let solver = SectionSolver::new(config.clone()).map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;

    match &report.outcome {
        SolveOutcome::BudgetExhausted { best: Some(solution) } | SolveOutcome::Solved(solution) => {
            require_valid(solution, &config)
        }
        SolveOutcome::BudgetExhausted { best: None } => Ok(()),
        SolveOutcome::Infeasible(_) => Err("a partial search must not claim infeasibility".to_string()),
    }
}

#[test]
fn top_k_truncation_marks_the_verdict_as_heuristic() -> SolverTestResult {
    let solver = SectionSolver::new(meal_plan("13").with_top_k(Some(6)))
        .map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;

    let SolveOutcome::Infeasible(infeasibility) = &report.outcome else {
        return Err(format!("expected infeasible, got {}", report.outcome.status()));
    };
    require_eq!(infeasibility.pool, PoolScope::TopK(6));
    require!(infeasibility.summary().ends_with("given the current top-6 candidates"));
    require!(report.stats.truncated_to_top_k);
    require_eq!(report.stats.candidates_considered, 8);
    Ok(())
}

#[test]
fn pinned_item_lands_in_its_section() -> SolverTestResult {
    let config = meal_plan("13").with_required(ItemId::new("f"), 0);
    let solver = SectionSolver::new(config.clone()).map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;
    let solution = solved(&report.outcome)?;

    require_valid(solution, &config)?;
    require_eq!(section_ids(solution), vec![vec!["b", "d", "f"], vec!["g", "c", "e"]]);
    require!((solution.overall_score - 18.2).abs() < 1e-9);
    Ok(())
}

#[test]
fn targeted_section_constraint_only_binds_its_section() -> SolverTestResult {
    let config = meal_plan("13").with_constraint(
        Constraint::section_at_most("light_second_day", Attribute::Price, dec("6")).for_section(1),
    );
    let solver = SectionSolver::new(config.clone()).map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;
    let solution = solved(&report.outcome)?;

    require_valid(solution, &config)?;
    require!(solution.sections[1].total(Attribute::Price) <= dec("6"));
    Ok(())
}

#[test]
fn reuse_allows_the_same_item_in_every_section() -> SolverTestResult {
    let pool = vec![
        candidate("x", "1", "5", 3.0),
        candidate("y", "1", "5", 2.0),
        candidate("z", "1", "5", 1.0),
    ];
    let config = SolverConfig::new(2, 2).with_reuse(true);
    let solver = SectionSolver::new(config).map_err(|err| err.to_string())?;
    let report = solver.solve(&pool).map_err(|err| err.to_string())?;
    let solution = solved(&report.outcome)?;

    require_eq!(section_ids(solution), vec![vec!["x", "y"], vec!["x", "y"]]);
    require!(solution.reuses_items());
    require!((solution.overall_score - 10.0).abs() < 1e-9);

    let without_reuse = SectionSolver::new(SolverConfig::new(2, 2)).map_err(|err| err.to_string())?;
    let error = without_reuse.solve(&pool).err();
    require!(
        matches!(error, Some(RecommendError::InvalidConfiguration(ref message)) if message.contains("need 4 distinct candidates")),
        "expected a capacity error, got {error:?}"
    );
    Ok(())
}

#[test]
fn excluded_candidates_never_enter_a_plan() -> SolverTestResult {
    let mut pool = menu();
    let banned = candidate_from("banned", "0.5", "5", "XX", 9.0);
    let penalized = ScoredCandidate::new(
        banned.shared_item(),
        vec![DimensionScore::triggered(
            Dimension::CountryExclusion,
            -100.0,
            "This item is from XX, a country the profile prohibits.",
        )],
    );
    pool.push(penalized);

    let solver = SectionSolver::new(meal_plan("13")).map_err(|err| err.to_string())?;
    let report = solver.solve(&pool).map_err(|err| err.to_string())?;
    let solution = solved(&report.outcome)?;

    require!(solution.sections.iter().flat_map(|section| section.item_ids()).all(|id| id.as_str() != "banned"));
    require_eq!(report.stats.candidates_considered, 8);
    Ok(())
}

#[test]
fn report_serializes_with_a_status_tag() -> SolverTestResult {
    let solver = SectionSolver::new(meal_plan("13")).map_err(|err| err.to_string())?;
    let report = solver.solve(&menu()).map_err(|err| err.to_string())?;

    let value = serde_json::to_value(&report).map_err(|err| err.to_string())?;
    require_eq!(value["outcome"]["status"], "solved");
    require_eq!(value["phase"], "solved");
    require!(value["outcome"]["detail"]["sections"].as_array().is_some_and(|sections| sections.len() == 2));
    Ok(())
}
