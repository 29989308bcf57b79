// 🎯 Budget Goal - target share of monthly income per spending category

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Small slack so that allocations like 33.3 + 33.3 + 33.4 are not rejected
const ALLOCATION_EPSILON: f64 = 1e-9;

/// Target allocations for spending categories (category -> percentage 0-100)
///
/// Invariants (checked on every construction, including deserialization):
/// - the sum of all percentages never exceeds 100
/// - no percentage is negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBudgetGoal")]
pub struct BudgetGoal {
    allocations: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct RawBudgetGoal {
    allocations: BTreeMap<String, f64>,
}

impl TryFrom<RawBudgetGoal> for BudgetGoal {
    type Error = DashboardError;

    fn try_from(raw: RawBudgetGoal) -> Result<Self> {
        BudgetGoal::new(raw.allocations)
    }
}

impl BudgetGoal {
    pub fn new<I, S>(allocations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let allocations: BTreeMap<String, f64> = allocations
            .into_iter()
            .map(|(category, pct)| (category.into(), pct))
            .collect();

        if allocations.values().any(|pct| !pct.is_finite()) {
            return Err(DashboardError::validation(
                "Allocations must be finite numbers",
            ));
        }

        let total: f64 = allocations.values().sum();
        if total > 100.0 + ALLOCATION_EPSILON {
            return Err(DashboardError::validation(
                "Total allocation cannot exceed 100%",
            ));
        }

        if let Some((category, _)) = allocations.iter().find(|(_, pct)| **pct < 0.0) {
            return Err(DashboardError::validation(format!(
                "Allocation for {} cannot be negative",
                category
            )));
        }

        Ok(BudgetGoal { allocations })
    }

    /// The rule-of-thumb split used until the user sets their own goals
    pub fn default_allocations() -> Self {
        BudgetGoal {
            allocations: [
                ("Housing", 30.0),
                ("Food", 15.0),
                ("Transportation", 10.0),
                ("Utilities", 10.0),
                ("Entertainment", 5.0),
                ("Investment", 20.0),
                ("Travel", 5.0),
                ("Education", 5.0),
            ]
            .into_iter()
            .map(|(c, p)| (c.to_string(), p))
            .collect(),
        }
    }

    pub fn allocations(&self) -> &BTreeMap<String, f64> {
        &self.allocations
    }

    pub fn percentage(&self, category: &str) -> Option<f64> {
        self.allocations.get(category).copied()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.allocations.contains_key(category)
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.values().sum()
    }

    pub fn unallocated(&self) -> f64 {
        (100.0 - self.total_allocated()).max(0.0)
    }

    /// Amount of `income` each category should receive
    pub fn planned_amounts(&self, income: f64) -> Vec<(String, f64)> {
        self.allocations
            .iter()
            .map(|(category, pct)| (category.clone(), income * pct / 100.0))
            .collect()
    }

    /// Return a copy with one category changed, re-validated
    pub fn with_allocation(&self, category: &str, percentage: f64) -> Result<Self> {
        let mut allocations = self.allocations.clone();
        allocations.insert(category.to_string(), percentage);
        BudgetGoal::new(allocations)
    }
}
