// 💾 Flat-file store - the dashboard snapshot as CSV + JSON files in one directory
//
// Files (all optional on load):
//   assets.csv, liabilities.csv   Category,Item,Amount
//   budget_goals.csv              Category,Percentage
//   expenses.csv                  Category,Description,Amount (lowercase headers accepted)
//   first_million.csv             one row of FirstMillionConfig
//   budget_config.json            {"monthly_salary": ...}
//
// A missing or unreadable file loads as an empty value and logs a warning,
// so a damaged file never blocks the rest of the dashboard.

use crate::budget::{BudgetPlan, ExpenseBook};
use crate::entities::{BalanceSheet, BudgetGoal, CategoryItems, Side};
use crate::projection::FirstMillionConfig;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ASSETS_FILE: &str = "assets.csv";
pub const LIABILITIES_FILE: &str = "liabilities.csv";
pub const BUDGET_GOALS_FILE: &str = "budget_goals.csv";
pub const EXPENSES_FILE: &str = "expenses.csv";
pub const FIRST_MILLION_FILE: &str = "first_million.csv";
pub const BUDGET_CONFIG_FILE: &str = "budget_config.json";

#[derive(Debug, Serialize, Deserialize)]
struct ItemRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Item")]
    item: String,
    #[serde(rename = "Amount")]
    amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoalRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Percentage")]
    percentage: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpenseRow {
    #[serde(rename = "Category", alias = "category")]
    category: String,
    #[serde(rename = "Description", alias = "description")]
    description: String,
    #[serde(rename = "Amount", alias = "amount")]
    amount: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BudgetConfigFile {
    #[serde(default)]
    monthly_salary: f64,
}

/// Everything the dashboard persists between sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub balance_sheet: BalanceSheet,
    pub budget: BudgetPlan,
    pub first_million: Option<FirstMillionConfig>,
}

impl DashboardState {
    pub fn demo() -> Self {
        DashboardState {
            balance_sheet: BalanceSheet::demo(),
            budget: BudgetPlan::demo(),
            first_million: FirstMillionConfig::new(10_000.0, 1_000_000.0, 120_000.0).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory {}", self.dir.display()))
    }

    fn side_file(side: Side) -> &'static str {
        match side {
            Side::Asset => ASSETS_FILE,
            Side::Liability => LIABILITIES_FILE,
        }
    }

    // ========================================================================
    // GENERIC CSV HELPERS
    // ========================================================================

    fn write_rows<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path(name);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        for row in rows {
            wtr.serialize(row)
                .with_context(|| format!("Failed to write row to {}", path.display()))?;
        }
        wtr.flush()?;
        debug!(file = name, rows = rows.len(), "saved");
        Ok(())
    }

    fn try_read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let mut rdr = csv::Reader::from_path(path).context("Failed to open CSV file")?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            rows.push(result.context("Failed to deserialize row")?);
        }
        Ok(rows)
    }

    /// `None` when the file is missing or unreadable (the latter logged)
    fn read_rows<T: DeserializeOwned>(&self, name: &str) -> Option<Vec<T>> {
        let path = self.path(name);
        if !path.exists() {
            return None;
        }
        match Self::try_read_rows(&path) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(file = %path.display(), error = %format!("{:#}", e), "ignoring unreadable file");
                None
            }
        }
    }

    fn remove_file(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    // ========================================================================
    // NET WORTH
    // ========================================================================

    pub fn save_items(&self, side: Side, items: &CategoryItems) -> Result<()> {
        let rows: Vec<ItemRow> = items
            .iter()
            .flat_map(|(category, entries)| {
                entries.iter().map(move |(item, amount)| ItemRow {
                    category: category.clone(),
                    item: item.clone(),
                    amount: *amount,
                })
            })
            .collect();
        self.write_rows(Self::side_file(side), &rows)
    }

    pub fn load_items(&self, side: Side) -> CategoryItems {
        let mut items = CategoryItems::new();
        for row in self.read_rows::<ItemRow>(Self::side_file(side)).unwrap_or_default() {
            items.entry(row.category).or_default().insert(row.item, row.amount);
        }
        items
    }

    pub fn load_balance_sheet(&self) -> BalanceSheet {
        BalanceSheet::from_parts(self.load_items(Side::Asset), self.load_items(Side::Liability))
    }

    pub fn save_balance_sheet(&self, sheet: &BalanceSheet) -> Result<()> {
        self.save_items(Side::Asset, &sheet.assets)?;
        self.save_items(Side::Liability, &sheet.liabilities)
    }

    // ========================================================================
    // BUDGET
    // ========================================================================

    /// Without a goal the file is removed, so the next load sees "no goal"
    pub fn save_budget_goal(&self, goal: Option<&BudgetGoal>) -> Result<()> {
        let Some(goal) = goal else {
            return self.remove_file(BUDGET_GOALS_FILE);
        };
        let rows: Vec<GoalRow> = goal
            .allocations()
            .iter()
            .map(|(category, percentage)| GoalRow {
                category: category.clone(),
                percentage: *percentage,
            })
            .collect();
        self.write_rows(BUDGET_GOALS_FILE, &rows)
    }

    /// Goals that no longer validate load as "no goal"
    pub fn load_budget_goal(&self) -> Option<BudgetGoal> {
        let rows = self.read_rows::<GoalRow>(BUDGET_GOALS_FILE)?;
        if rows.is_empty() {
            return None;
        }
        match BudgetGoal::new(rows.into_iter().map(|r| (r.category, r.percentage))) {
            Ok(goal) => Some(goal),
            Err(e) => {
                warn!(error = %e, "Error loading budget goals");
                None
            }
        }
    }

    pub fn save_expenses(&self, expenses: &ExpenseBook) -> Result<()> {
        let rows: Vec<ExpenseRow> = expenses
            .categories()
            .iter()
            .flat_map(|(category, items)| {
                items.iter().map(move |(description, amount)| ExpenseRow {
                    category: category.clone(),
                    description: description.clone(),
                    amount: *amount,
                })
            })
            .collect();
        self.write_rows(EXPENSES_FILE, &rows)
    }

    pub fn load_expenses(&self) -> ExpenseBook {
        let mut map: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for row in self.read_rows::<ExpenseRow>(EXPENSES_FILE).unwrap_or_default() {
            map.entry(row.category).or_default().insert(row.description, row.amount);
        }
        ExpenseBook::from_map(map)
    }

    pub fn save_monthly_salary(&self, monthly_salary: f64) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path(BUDGET_CONFIG_FILE);
        let json = serde_json::to_string_pretty(&BudgetConfigFile { monthly_salary })?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_monthly_salary(&self) -> f64 {
        let path = self.path(BUDGET_CONFIG_FILE);
        if !path.exists() {
            return 0.0;
        }
        let parsed = fs::read_to_string(&path)
            .context("Failed to read budget config")
            .and_then(|s| serde_json::from_str::<BudgetConfigFile>(&s).context("Invalid budget config"));
        match parsed {
            Ok(config) if config.monthly_salary.is_finite() && config.monthly_salary >= 0.0 => {
                config.monthly_salary
            }
            Ok(config) => {
                warn!(salary = config.monthly_salary, "ignoring invalid monthly salary");
                0.0
            }
            Err(e) => {
                warn!(file = %path.display(), error = %format!("{:#}", e), "ignoring unreadable file");
                0.0
            }
        }
    }

    /// Goal, expenses and salary together
    pub fn save_budget(&self, budget: &BudgetPlan) -> Result<()> {
        self.save_budget_goal(budget.goal.as_ref())?;
        self.save_expenses(&budget.expenses)?;
        self.save_monthly_salary(budget.monthly_salary)
    }

    pub fn load_budget(&self) -> BudgetPlan {
        BudgetPlan {
            monthly_salary: self.load_monthly_salary(),
            goal: self.load_budget_goal(),
            expenses: self.load_expenses(),
        }
    }

    // ========================================================================
    // FIRST MILLION
    // ========================================================================

    pub fn save_first_million(&self, config: Option<&FirstMillionConfig>) -> Result<()> {
        match config {
            Some(config) => self.write_rows(FIRST_MILLION_FILE, std::slice::from_ref(config)),
            None => self.remove_file(FIRST_MILLION_FILE),
        }
    }

    pub fn load_first_million(&self) -> Option<FirstMillionConfig> {
        let row = self
            .read_rows::<FirstMillionConfig>(FIRST_MILLION_FILE)?
            .into_iter()
            .next()?;
        // Re-validate and recompute the derived monthly income
        match FirstMillionConfig::new(row.initial_amount, row.desired_amount, row.annual_income) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Error loading first million config");
                None
            }
        }
    }

    // ========================================================================
    // WHOLE STATE
    // ========================================================================

    pub fn save_state(&self, state: &DashboardState) -> Result<()> {
        self.save_balance_sheet(&state.balance_sheet)?;
        self.save_budget(&state.budget)?;
        self.save_first_million(state.first_million.as_ref())?;
        info!(dir = %self.dir.display(), "dashboard state saved");
        Ok(())
    }

    pub fn load_state(&self) -> DashboardState {
        let state = DashboardState {
            balance_sheet: self.load_balance_sheet(),
            budget: self.load_budget(),
            first_million: self.load_first_million(),
        };
        info!(dir = %self.dir.display(), "dashboard state loaded");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn test_missing_directory_loads_empty() {
        let (_dir, store) = store();
        let state = store.load_state();

        assert!(state.balance_sheet.is_empty());
        assert!(state.budget.goal.is_none());
        assert!(state.budget.expenses.is_empty());
        assert_eq!(state.budget.monthly_salary, 0.0);
        assert!(state.first_million.is_none());
    }

    #[test]
    fn test_items_round_trip() {
        let (_dir, store) = store();
        let sheet = BalanceSheet::demo();
        store.save_balance_sheet(&sheet).unwrap();

        let loaded = store.load_balance_sheet();
        assert_eq!(loaded.summary(), sheet.summary());
        assert_eq!(loaded.assets, sheet.assets);
    }

    #[test]
    fn test_legacy_expense_headers() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.dir().join(EXPENSES_FILE),
            "category,description,amount\nFood,Groceries,400\nFood,Dining Out,200\n",
        )
        .unwrap();

        let expenses = store.load_expenses();
        assert_eq!(expenses.category_total("Food"), 600.0);
    }

    #[test]
    fn test_invalid_goal_loads_as_none() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.dir().join(BUDGET_GOALS_FILE),
            "Category,Percentage\nHousing,80\nFood,40\n",
        )
        .unwrap();

        assert!(store.load_budget_goal().is_none());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join(ASSETS_FILE), "Category,Item,Amount\nCash,Wallet,lots\n").unwrap();
        fs::write(store.dir().join(BUDGET_CONFIG_FILE), "{not json").unwrap();

        assert!(store.load_items(Side::Asset).is_empty());
        assert_eq!(store.load_monthly_salary(), 0.0);
    }

    #[test]
    fn test_removing_goal_deletes_file() {
        let (_dir, store) = store();
        store
            .save_budget_goal(Some(&BudgetGoal::default_allocations()))
            .unwrap();
        assert!(store.dir().join(BUDGET_GOALS_FILE).exists());

        store.save_budget_goal(None).unwrap();
        assert!(!store.dir().join(BUDGET_GOALS_FILE).exists());
    }

    #[test]
    fn test_first_million_recomputes_monthly_income() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.dir().join(FIRST_MILLION_FILE),
            "initial_amount,desired_amount,annual_income,monthly_income\n0,1000000,120000,1\n",
        )
        .unwrap();

        let config = store.load_first_million().unwrap();
        assert_eq!(config.monthly_income, 10_000.0);
    }
}
