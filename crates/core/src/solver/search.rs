//! Depth-first branch-and-bound over a score-ordered candidate pool.
//!
//! Sections are filled in order and, within a section, candidates are taken
//! in increasing pool position. Because the pool is sorted by score, the
//! first complete assignment reaching a given score is also the
//! lexicographically earliest one, so only strict improvements replace the
//! incumbent.

use std::time::Instant;

use rust_decimal::Decimal;

use crate::domain::{Attribute, ScoredCandidate};

use super::constraints::Constraint;
use super::SolverConfig;

const SCORE_EPSILON: f64 = 1e-9;
const DEADLINE_CHECK_INTERVAL: u64 = 256;
const ATTRIBUTE_COUNT: usize = Attribute::ALL.len();

type Totals = [Decimal; ATTRIBUTE_COUNT];

#[derive(Debug)]
pub(crate) struct SearchResult {
    /// Pool positions per section.
    pub assignment: Option<Vec<Vec<usize>>>,
    pub nodes_explored: u64,
    pub exhausted_budget: bool,
}

pub(crate) struct BranchAndBound<'a> {
    scores: Vec<f64>,
    values: Vec<Totals>,
    max_values: Totals,
    section_constraints: Vec<Vec<&'a Constraint>>,
    global_constraints: Vec<&'a Constraint>,
    /// Section each pool position is pinned to, if any.
    pinned_to: Vec<Option<usize>>,
    pinned_by_section: Vec<Vec<usize>>,
    num_sections: usize,
    per_section: usize,
    allow_reuse: bool,
    interchangeable_sections: bool,
    /// Best total over any full section, used as the bound for later
    /// sections when items may repeat.
    best_section_score: f64,

    used: Vec<bool>,
    assignment: Vec<Vec<usize>>,
    section_totals: Vec<Totals>,
    global_totals: Totals,
    best: Option<(f64, Vec<Vec<usize>>)>,

    nodes: u64,
    max_nodes: Option<u64>,
    deadline: Option<Instant>,
    exhausted: bool,
}

impl<'a> BranchAndBound<'a> {
    pub(crate) fn new(
        pool: &[ScoredCandidate],
        config: &'a SolverConfig,
        pinned_to: Vec<Option<usize>>,
        started: Instant,
    ) -> Self {
        let num_sections = config.num_sections;
        let per_section = config.items_per_section;

        let scores: Vec<f64> = pool.iter().map(ScoredCandidate::total_score).collect();
        let values: Vec<Totals> = pool.iter().map(attribute_values).collect();

        let mut max_values = [Decimal::ZERO; ATTRIBUTE_COUNT];
        for item_values in &values {
            for (slot, value) in max_values.iter_mut().zip(item_values) {
                *slot = (*slot).max(*value);
            }
        }

        let section_constraints = (0..num_sections)
            .map(|section| {
                config
                    .constraints
                    .iter()
                    .filter(|constraint| constraint.applies_to_section(section))
                    .collect()
            })
            .collect();
        let global_constraints =
            config.constraints.iter().filter(|constraint| constraint.is_global()).collect();

        let mut pinned_by_section = vec![Vec::new(); num_sections];
        for (position, target) in pinned_to.iter().enumerate() {
            if let Some(section) = target {
                pinned_by_section[*section].push(position);
            }
        }

        let interchangeable_sections = !config.allow_reuse
            && pinned_by_section.iter().all(Vec::is_empty)
            && config.constraints.iter().all(|constraint| {
                !matches!(constraint.scope, super::ConstraintScope::Section(_))
            });

        let best_section_score = scores.iter().take(per_section).sum();

        Self {
            scores,
            values,
            max_values,
            section_constraints,
            global_constraints,
            pinned_to,
            pinned_by_section,
            num_sections,
            per_section,
            allow_reuse: config.allow_reuse,
            interchangeable_sections,
            best_section_score,
            used: vec![false; pool.len()],
            assignment: vec![Vec::with_capacity(per_section); num_sections],
            section_totals: vec![[Decimal::ZERO; ATTRIBUTE_COUNT]; num_sections],
            global_totals: [Decimal::ZERO; ATTRIBUTE_COUNT],
            best: None,
            nodes: 0,
            max_nodes: config.budget.max_nodes,
            deadline: config.budget.max_duration.map(|limit| started + limit),
            exhausted: false,
        }
    }

    pub(crate) fn run(mut self) -> SearchResult {
        self.descend(0, 0, 0.0);
        SearchResult {
            assignment: self.best.map(|(_, assignment)| assignment),
            nodes_explored: self.nodes,
            exhausted_budget: self.exhausted,
        }
    }

    fn descend(&mut self, section: usize, start: usize, score: f64) {
        if self.exhausted {
            return;
        }
        self.nodes += 1;
        if self.over_budget() {
            self.exhausted = true;
            return;
        }

        if section == self.num_sections {
            self.record_complete(score);
            return;
        }

        let filled = self.assignment[section].len();
        if filled == self.per_section {
            if !self.section_closes(section) {
                return;
            }
            let next_start = if self.interchangeable_sections {
                self.assignment[section].first().map_or(0, |first| first + 1)
            } else {
                0
            };
            self.descend(section + 1, next_start, score);
            return;
        }

        let open_after_pick = self.per_section - filled - 1;
        let later_slots = (self.num_sections - section - 1) * self.per_section;
        let later_bound = self.later_sections_bound(later_slots);
        if later_bound == f64::NEG_INFINITY {
            return;
        }

        for position in start..self.scores.len() {
            if self.exhausted {
                return;
            }
            if !self.allow_reuse && self.used[position] {
                continue;
            }
            if let Some(target) = self.pinned_to[position] {
                if target != section && !self.allow_reuse {
                    continue;
                }
            }
            if !self.pinned_still_reachable(section, position, open_after_pick) {
                if self.pinned_lost(section, position) {
                    break;
                }
                continue;
            }

            let in_section = self.section_bound(position + 1, open_after_pick);
            if in_section == f64::NEG_INFINITY {
                break;
            }
            let upper_bound = score + self.scores[position] + in_section + later_bound;
            if let Some((best, _)) = &self.best {
                if upper_bound <= best + SCORE_EPSILON {
                    break;
                }
            }

            if !self.fits(section, position, open_after_pick, later_slots) {
                continue;
            }

            self.push(section, position);
            self.descend(section, position + 1, score + self.scores[position]);
            self.pop(section, position);
        }
    }

    fn over_budget(&self) -> bool {
        if self.max_nodes.is_some_and(|max_nodes| self.nodes > max_nodes) {
            return true;
        }
        match self.deadline {
            Some(deadline) if self.nodes % DEADLINE_CHECK_INTERVAL == 0 => {
                Instant::now() >= deadline
            }
            _ => false,
        }
    }

    fn record_complete(&mut self, score: f64) {
        let satisfied = self.global_constraints.iter().all(|constraint| {
            constraint.is_satisfied_by(self.global_totals[constraint.attribute.index()])
        });
        if !satisfied {
            return;
        }
        let improves = match &self.best {
            Some((best, _)) => score > best + SCORE_EPSILON,
            None => true,
        };
        if improves {
            self.best = Some((score, self.assignment.clone()));
        }
    }

    fn section_closes(&self, section: usize) -> bool {
        let totals = &self.section_totals[section];
        self.section_constraints[section]
            .iter()
            .all(|constraint| constraint.is_satisfied_by(totals[constraint.attribute.index()]))
            && self.pinned_by_section[section]
                .iter()
                .all(|position| self.assignment[section].contains(position))
    }

    /// Pinned items of `section` not yet placed must still fit after picking
    /// `position`.
    fn pinned_still_reachable(
        &self,
        section: usize,
        position: usize,
        open_after_pick: usize,
    ) -> bool {
        let mut missing = 0;
        for pinned in &self.pinned_by_section[section] {
            if *pinned == position || self.assignment[section].contains(pinned) {
                continue;
            }
            if *pinned < position {
                return false;
            }
            missing += 1;
        }
        missing <= open_after_pick
    }

    /// A pinned item positioned before `position` can never be picked again
    /// in this section, so no later position can help either.
    fn pinned_lost(&self, section: usize, position: usize) -> bool {
        self.pinned_by_section[section].iter().any(|pinned| {
            *pinned < position && !self.assignment[section].contains(pinned)
        })
    }

    /// Best score for the open slots of the current section, or negative
    /// infinity when not enough positions remain to fill them.
    fn section_bound(&self, from: usize, open_in_section: usize) -> f64 {
        let mut total = 0.0;
        let mut taken = 0;
        for position in from..self.scores.len() {
            if taken == open_in_section {
                break;
            }
            if !self.allow_reuse && self.used[position] {
                continue;
            }
            total += self.scores[position];
            taken += 1;
        }
        if taken < open_in_section {
            return f64::NEG_INFINITY;
        }
        total
    }

    /// Best score for every slot in the sections after the current one. It
    /// ignores the current section's picks so it stays constant across the
    /// candidates tried at one node.
    fn later_sections_bound(&self, later_slots: usize) -> f64 {
        if later_slots == 0 {
            return 0.0;
        }
        if self.allow_reuse {
            let later_sections = later_slots / self.per_section;
            return self.best_section_score * later_sections as f64;
        }

        let mut total = 0.0;
        let mut taken = 0;
        for (position, score) in self.scores.iter().enumerate() {
            if taken == later_slots {
                break;
            }
            if self.used[position] {
                continue;
            }
            total += score;
            taken += 1;
        }
        if taken < later_slots {
            return f64::NEG_INFINITY;
        }
        total
    }

    fn fits(
        &self,
        section: usize,
        position: usize,
        open_after_pick: usize,
        later_slots: usize,
    ) -> bool {
        let item_values = &self.values[position];

        let section_totals = &self.section_totals[section];
        let section_ok = self.section_constraints[section].iter().all(|constraint| {
            let attribute = constraint.attribute.index();
            constraint.still_reachable(
                section_totals[attribute] + item_values[attribute],
                open_after_pick,
                self.max_values[attribute],
            )
        });
        if !section_ok {
            return false;
        }

        self.global_constraints.iter().all(|constraint| {
            let attribute = constraint.attribute.index();
            constraint.still_reachable(
                self.global_totals[attribute] + item_values[attribute],
                open_after_pick + later_slots,
                self.max_values[attribute],
            )
        })
    }

    fn push(&mut self, section: usize, position: usize) {
        self.assignment[section].push(position);
        if !self.allow_reuse {
            self.used[position] = true;
        }
        let item_values = self.values[position];
        for (attribute, value) in item_values.iter().enumerate() {
            self.section_totals[section][attribute] += *value;
            self.global_totals[attribute] += *value;
        }
    }

    fn pop(&mut self, section: usize, position: usize) {
        self.assignment[section].pop();
        if !self.allow_reuse {
            self.used[position] = false;
        }
        let item_values = self.values[position];
        for (attribute, value) in item_values.iter().enumerate() {
            self.section_totals[section][attribute] -= *value;
            self.global_totals[attribute] -= *value;
        }
    }
}

fn attribute_values(candidate: &ScoredCandidate) -> Totals {
    let mut values = [Decimal::ZERO; ATTRIBUTE_COUNT];
    for attribute in Attribute::ALL {
        values[attribute.index()] = candidate.item().attribute(attribute);
    }
    values
}
