use curate_core::domain::DimensionScore;
use curate_core::ranking::SkipRecord;
use curate_core::{ItemId, ProfileId};
use serde::Serialize;

use crate::commands::{CommandResult, Runtime};

const COMMAND: &str = "rank";

#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    rank: usize,
    item_id: &'a ItemId,
    label: &'a str,
    total_score: f64,
    explanations: Vec<&'a str>,
    scores: &'a [DimensionScore],
}

#[derive(Debug, Serialize)]
struct RankData<'a> {
    profile_id: &'a ProfileId,
    total_ranked: usize,
    candidates: Vec<RankedRow<'a>>,
    skipped: &'a [SkipRecord],
}

pub fn run(profile: &str, limit: Option<usize>) -> CommandResult {
    let runtime = match Runtime::load(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let pipeline = match runtime.ranking(COMMAND) {
        Ok(pipeline) => pipeline,
        Err(result) => return result,
    };

    let profile_id = ProfileId::new(profile);
    let ranked = match pipeline.recommend_for(&runtime.profiles, &profile_id) {
        Ok(ranked) => ranked,
        Err(error) => return CommandResult::from_recommend_error(COMMAND, &error),
    };

    let shown = ranked.top(limit.unwrap_or(ranked.len()));
    let candidates = shown
        .iter()
        .enumerate()
        .map(|(position, candidate)| RankedRow {
            rank: position + 1,
            item_id: &candidate.item().id,
            label: &candidate.item().label,
            total_score: candidate.total_score(),
            explanations: candidate.explanations().map(|explanation| explanation.text()).collect(),
            scores: candidate.applied_scores(),
        })
        .collect();

    let message = format!(
        "ranked {} candidates for profile `{profile_id}` ({} skipped)",
        ranked.len(),
        ranked.skipped().len()
    );
    let data = RankData {
        profile_id: &profile_id,
        total_ranked: ranked.len(),
        candidates,
        skipped: ranked.skipped(),
    };
    CommandResult::success_with(COMMAND, message, Some(data))
}
