use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Attribute;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtMost,
    AtLeast,
    Exactly,
}

impl Comparison {
    pub fn holds(&self, total: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::AtMost => total <= threshold,
            Self::AtLeast => total >= threshold,
            Self::Exactly => total == threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::AtMost => "<=",
            Self::AtLeast => ">=",
            Self::Exactly => "=",
        }
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "<=" | "at_most" => Ok(Self::AtMost),
            ">=" | "at_least" => Ok(Self::AtLeast),
            "=" | "==" | "exactly" => Ok(Self::Exactly),
            other => Err(format!("unsupported comparison `{other}` (expected <=|>=|=)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum ConstraintScope {
    EverySection,
    /// Zero-based section index.
    Section(usize),
    Global,
}

/// A named aggregate bound: `sum(attribute) <comparison> threshold` over one
/// section, every section, or the whole solution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub scope: ConstraintScope,
    pub attribute: Attribute,
    pub comparison: Comparison,
    pub threshold: Decimal,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        scope: ConstraintScope,
        attribute: Attribute,
        comparison: Comparison,
        threshold: Decimal,
    ) -> Self {
        Self { name: name.into(), scope, attribute, comparison, threshold }
    }

    pub fn section_at_most(name: impl Into<String>, attribute: Attribute, threshold: Decimal) -> Self {
        Self::new(name, ConstraintScope::EverySection, attribute, Comparison::AtMost, threshold)
    }

    pub fn section_at_least(name: impl Into<String>, attribute: Attribute, threshold: Decimal) -> Self {
        Self::new(name, ConstraintScope::EverySection, attribute, Comparison::AtLeast, threshold)
    }

    pub fn global_at_most(name: impl Into<String>, attribute: Attribute, threshold: Decimal) -> Self {
        Self::new(name, ConstraintScope::Global, attribute, Comparison::AtMost, threshold)
    }

    pub fn global_at_least(name: impl Into<String>, attribute: Attribute, threshold: Decimal) -> Self {
        Self::new(name, ConstraintScope::Global, attribute, Comparison::AtLeast, threshold)
    }

    pub fn for_section(mut self, section: usize) -> Self {
        self.scope = ConstraintScope::Section(section);
        self
    }

    pub fn is_global(&self) -> bool {
        self.scope == ConstraintScope::Global
    }

    pub fn applies_to_section(&self, section: usize) -> bool {
        match self.scope {
            ConstraintScope::EverySection => true,
            ConstraintScope::Section(target) => target == section,
            ConstraintScope::Global => false,
        }
    }

    pub fn is_satisfied_by(&self, total: Decimal) -> bool {
        self.comparison.holds(total, self.threshold)
    }

    /// Whether a partial total can still end up satisfying the bound, given
    /// `remaining` more items whose attribute is at most `max_value` each.
    /// Attribute values are non-negative, so partial sums only grow.
    pub(crate) fn still_reachable(&self, total: Decimal, remaining: usize, max_value: Decimal) -> bool {
        let ceiling = total + max_value * Decimal::from(remaining);
        match self.comparison {
            Comparison::AtMost => total <= self.threshold,
            Comparison::AtLeast => ceiling >= self.threshold,
            Comparison::Exactly => total <= self.threshold && ceiling >= self.threshold,
        }
    }

    /// Checks the bound in isolation against the smallest and largest totals
    /// any selection could reach.
    pub(crate) fn check_in_isolation(
        &self,
        smallest_total: Decimal,
        largest_total: Decimal,
    ) -> Option<ConstraintViolation> {
        let too_high = matches!(self.comparison, Comparison::AtMost | Comparison::Exactly)
            && smallest_total > self.threshold;
        let too_low = matches!(self.comparison, Comparison::AtLeast | Comparison::Exactly)
            && largest_total < self.threshold;

        if too_high {
            return Some(ConstraintViolation {
                code: "BOUND_BELOW_MINIMUM".to_string(),
                constraint: self.name.clone(),
                message: format!(
                    "no combination meets {} ({self}); the smallest reachable {} is {}",
                    self.name,
                    self.scope_label(),
                    smallest_total.normalize()
                ),
                suggestion: Some(format!(
                    "Raise {} to at least {}",
                    self.name,
                    smallest_total.normalize()
                )),
            });
        }
        if too_low {
            return Some(ConstraintViolation {
                code: "BOUND_ABOVE_MAXIMUM".to_string(),
                constraint: self.name.clone(),
                message: format!(
                    "no combination meets {} ({self}); the largest reachable {} is {}",
                    self.name,
                    self.scope_label(),
                    largest_total.normalize()
                ),
                suggestion: Some(format!(
                    "Lower {} to at most {}",
                    self.name,
                    largest_total.normalize()
                )),
            });
        }
        None
    }

    fn scope_label(&self) -> String {
        match self.scope {
            ConstraintScope::Global => format!("total {}", self.attribute),
            ConstraintScope::EverySection | ConstraintScope::Section(_) => {
                format!("section {}", self.attribute)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            ConstraintScope::EverySection => "each section".to_string(),
            ConstraintScope::Section(index) => format!("section {}", index + 1),
            ConstraintScope::Global => "all sections".to_string(),
        };
        write!(
            f,
            "{scope}: sum({}) {} {}",
            self.attribute,
            self.comparison.symbol(),
            self.threshold.normalize()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub code: String,
    pub constraint: String,
    pub message: String,
    pub suggestion: Option<String>,
}
