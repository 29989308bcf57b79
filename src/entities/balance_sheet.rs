// 🏦 Balance Sheet - assets and liabilities grouped by category
//
// Net worth = total assets - total liabilities

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const ASSET_CATEGORIES: [&str; 5] = [
    "Cash & Bank",
    "Investments",
    "Real Estate",
    "Vehicles",
    "Other Assets",
];

pub const LIABILITY_CATEGORIES: [&str; 5] = [
    "Credit Cards",
    "Personal Loans",
    "Mortgages",
    "Vehicle Loans",
    "Other Debts",
];

/// category -> item name -> amount
pub type CategoryItems = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Asset,
    Liability,
}

impl Side {
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Side::Asset => &ASSET_CATEGORIES,
            Side::Liability => &LIABILITY_CATEGORIES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Asset => "asset",
            Side::Liability => "liability",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asset" | "assets" => Ok(Side::Asset),
            "liability" | "liabilities" => Ok(Side::Liability),
            other => Err(DashboardError::validation(format!("Unknown side: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetWorthSummary {
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
}

/// How far net worth has come toward a target (the "first million")
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub target: f64,
    pub net_worth: f64,
    pub percent: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub assets: CategoryItems,
    pub liabilities: CategoryItems,
}

impl Default for BalanceSheet {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceSheet {
    /// Empty sheet with every known category present
    pub fn new() -> Self {
        BalanceSheet {
            assets: empty_categories(&ASSET_CATEGORIES),
            liabilities: empty_categories(&LIABILITY_CATEGORIES),
        }
    }

    /// Build from previously persisted data; unknown categories are kept as-is
    pub fn from_parts(assets: CategoryItems, liabilities: CategoryItems) -> Self {
        let mut sheet = BalanceSheet::new();
        sheet.assets.extend(assets);
        sheet.liabilities.extend(liabilities);
        sheet
    }

    pub fn side(&self, side: Side) -> &CategoryItems {
        match side {
            Side::Asset => &self.assets,
            Side::Liability => &self.liabilities,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut CategoryItems {
        match side {
            Side::Asset => &mut self.assets,
            Side::Liability => &mut self.liabilities,
        }
    }

    /// Insert or replace a single item
    pub fn add_item(&mut self, side: Side, category: &str, name: &str, amount: f64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DashboardError::validation("Item name is required"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(DashboardError::validation("Amount must be positive"));
        }

        let items = self
            .side_mut(side)
            .get_mut(category)
            .ok_or_else(|| {
                DashboardError::validation(format!("Unknown {} category: {}", side, category))
            })?;
        items.insert(name.to_string(), amount);
        Ok(())
    }

    /// Replace every item of a category; blank names and non-positive amounts are dropped
    pub fn replace_category<I, S>(&mut self, side: Side, category: &str, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let target = self
            .side_mut(side)
            .get_mut(category)
            .ok_or_else(|| {
                DashboardError::validation(format!("Unknown {} category: {}", side, category))
            })?;

        *target = items
            .into_iter()
            .filter(|(name, amount)| !name.as_ref().trim().is_empty() && *amount > 0.0)
            .map(|(name, amount)| (name.as_ref().trim().to_string(), amount))
            .collect();
        Ok(())
    }

    pub fn remove_item(&mut self, side: Side, category: &str, name: &str) -> Option<f64> {
        self.side_mut(side)
            .get_mut(category)
            .and_then(|items| items.remove(name))
    }

    pub fn clear(&mut self) {
        *self = BalanceSheet::new();
    }

    pub fn total(&self, side: Side) -> f64 {
        self.side(side)
            .values()
            .flat_map(|items| items.values())
            .sum()
    }

    pub fn summary(&self) -> NetWorthSummary {
        let total_assets = self.total(Side::Asset);
        let total_liabilities = self.total(Side::Liability);
        NetWorthSummary {
            total_assets,
            total_liabilities,
            net_worth: total_assets - total_liabilities,
        }
    }

    /// Per-category totals, skipping categories without items (pie chart data)
    pub fn distribution(&self, side: Side) -> Vec<(String, f64)> {
        self.side(side)
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(category, items)| (category.clone(), items.values().sum()))
            .collect()
    }

    pub fn progress_toward(&self, target: f64) -> GoalProgress {
        let net_worth = self.summary().net_worth;
        let percent = if target > 0.0 {
            (net_worth / target * 100.0).max(0.0)
        } else {
            0.0
        };
        GoalProgress {
            target,
            net_worth,
            percent,
            remaining: (target - net_worth).max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assets.values().all(|i| i.is_empty()) && self.liabilities.values().all(|i| i.is_empty())
    }

    /// Demonstration data
    pub fn demo() -> Self {
        let mut sheet = BalanceSheet::new();
        let assets: [(&str, &[(&str, f64)]); 5] = [
            (
                "Cash & Bank",
                &[
                    ("Checking Account", 5_000.0),
                    ("Savings Account", 15_000.0),
                    ("Emergency Fund", 10_000.0),
                ],
            ),
            (
                "Investments",
                &[
                    ("Stock Portfolio", 50_000.0),
                    ("401(k)", 75_000.0),
                    ("Roth IRA", 25_000.0),
                    ("Cryptocurrency", 5_000.0),
                ],
            ),
            (
                "Real Estate",
                &[("Primary Residence", 350_000.0), ("Rental Property", 250_000.0)],
            ),
            ("Vehicles", &[("Car 1", 25_000.0), ("Car 2", 15_000.0)]),
            (
                "Other Assets",
                &[("Jewelry", 5_000.0), ("Art Collection", 10_000.0)],
            ),
        ];
        let liabilities: [(&str, &[(&str, f64)]); 5] = [
            (
                "Credit Cards",
                &[("Credit Card 1", 2_500.0), ("Credit Card 2", 1_500.0)],
            ),
            (
                "Personal Loans",
                &[("Personal Loan", 15_000.0), ("Student Loan", 25_000.0)],
            ),
            (
                "Mortgages",
                &[("Primary Home", 280_000.0), ("Rental Property", 200_000.0)],
            ),
            (
                "Vehicle Loans",
                &[("Car 1 Loan", 20_000.0), ("Car 2 Loan", 10_000.0)],
            ),
            ("Other Debts", &[("Medical Bill", 5_000.0)]),
        ];

        for (category, items) in assets {
            sheet.assets.insert(category.to_string(), to_items(items));
        }
        for (category, items) in liabilities {
            sheet.liabilities.insert(category.to_string(), to_items(items));
        }
        sheet
    }
}

fn empty_categories(names: &[&str]) -> CategoryItems {
    names
        .iter()
        .map(|name| (name.to_string(), BTreeMap::new()))
        .collect()
}

fn to_items(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
    items.iter().map(|(n, a)| (n.to_string(), *a)).collect()
}
