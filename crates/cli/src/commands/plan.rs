use curate_core::planning::MealPlanPipeline;
use curate_core::solver::{SolveOutcome, SolverConfig};
use curate_core::ProfileId;
use rust_decimal::Decimal;

use crate::commands::{CommandResult, Runtime, EXIT_NO_SOLUTION};

const COMMAND: &str = "plan";

#[derive(Clone, Debug, PartialEq)]
pub struct PlanArgs {
    pub profile: String,
    pub sections: usize,
    pub per_section: usize,
    pub min_section_rating: Decimal,
    pub max_section_price: Decimal,
    pub max_total_price: Decimal,
}

impl PlanArgs {
    /// Two sections of three items with the stock rating and price bounds.
    pub fn for_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            sections: 2,
            per_section: 3,
            min_section_rating: Decimal::new(7, 0),
            max_section_price: Decimal::new(7, 0),
            max_total_price: Decimal::new(13, 0),
        }
    }
}

pub fn run(args: &PlanArgs) -> CommandResult {
    let runtime = match Runtime::load(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let ranking = match runtime.ranking(COMMAND) {
        Ok(ranking) => ranking,
        Err(result) => return result,
    };

    let settings = &runtime.config.solver;
    let solver_config = SolverConfig::meal_plan(
        args.sections,
        args.per_section,
        args.min_section_rating,
        args.max_section_price,
        args.max_total_price,
    )
    .with_top_k(settings.top_k())
    .with_budget(settings.budget())
    .with_reuse(settings.allow_reuse);

    let pipeline = match MealPlanPipeline::new(ranking, solver_config) {
        Ok(pipeline) => pipeline,
        Err(error) => return CommandResult::from_recommend_error(COMMAND, &error),
    };

    let profile_id = ProfileId::new(args.profile.as_str());
    let plan = match pipeline.plan_for(&runtime.profiles, &profile_id) {
        Ok(plan) => plan,
        Err(error) => return CommandResult::from_recommend_error(COMMAND, &error),
    };

    match &plan.report.outcome {
        SolveOutcome::Solved(solution) => {
            let message = format!(
                "planned {} sections for profile `{profile_id}` with overall score {:.4}",
                solution.sections.len(),
                solution.overall_score
            );
            CommandResult::success_with(COMMAND, message, Some(&plan))
        }
        SolveOutcome::Infeasible(infeasibility) => CommandResult::failure_with(
            COMMAND,
            "infeasible",
            infeasibility.summary(),
            EXIT_NO_SOLUTION,
            Some(&plan),
        ),
        SolveOutcome::BudgetExhausted { best } => {
            let message = match best {
                Some(best) => format!(
                    "search budget exhausted after {} nodes; best plan found scores {:.4} but may not be optimal",
                    plan.report.stats.nodes_explored, best.overall_score
                ),
                None => format!(
                    "search budget exhausted after {} nodes before any feasible plan was found",
                    plan.report.stats.nodes_explored
                ),
            };
            CommandResult::failure_with(
                COMMAND,
                "budget_exhausted",
                message,
                EXIT_NO_SOLUTION,
                Some(&plan),
            )
        }
    }
}
