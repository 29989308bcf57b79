// 📊 Budget - expenses against goals, plus transaction reports

use crate::entities::{BudgetGoal, Transaction, TransactionType};
use crate::error::{DashboardError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Salary used by the demonstration budget
pub const DEMO_MONTHLY_SALARY: f64 = 10_000.0;

pub const INCOME_CATEGORIES: [&str; 3] = ["Salary", "Investments", "Other"];

pub const EXPENSE_CATEGORIES: [&str; 8] = [
    "Housing",
    "Food",
    "Transportation",
    "Utilities",
    "Entertainment",
    "Investment",
    "Travel",
    "Education",
];

// ============================================================================
// EXPENSE BOOK
// ============================================================================

/// Planned monthly expenses: category -> description -> amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseBook {
    categories: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ExpenseBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(categories: BTreeMap<String, BTreeMap<String, f64>>) -> Self {
        ExpenseBook { categories }
    }

    pub fn categories(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.categories
    }

    pub fn items(&self, category: &str) -> Option<&BTreeMap<String, f64>> {
        self.categories.get(category)
    }

    /// Add or overwrite one expense line
    pub fn add_expense(&mut self, category: &str, description: &str, amount: f64) -> Result<()> {
        if category.trim().is_empty() {
            return Err(DashboardError::validation("Category is required"));
        }
        if description.trim().is_empty() {
            return Err(DashboardError::validation("Description is required"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(DashboardError::validation("Amount must be positive"));
        }

        self.categories
            .entry(category.trim().to_string())
            .or_default()
            .insert(description.trim().to_string(), amount);
        Ok(())
    }

    pub fn replace_category(&mut self, category: &str, items: BTreeMap<String, f64>) {
        self.categories.insert(category.to_string(), items);
    }

    pub fn remove_expense(&mut self, category: &str, description: &str) -> Option<f64> {
        let items = self.categories.get_mut(category)?;
        let removed = items.remove(description);
        if items.is_empty() {
            self.categories.remove(category);
        }
        removed
    }

    pub fn category_total(&self, category: &str) -> f64 {
        self.categories
            .get(category)
            .map(|items| items.values().sum())
            .unwrap_or(0.0)
    }

    /// Totals for categories that actually have spending
    pub fn totals_by_category(&self) -> BTreeMap<String, f64> {
        self.categories
            .iter()
            .map(|(category, items)| (category.clone(), items.values().sum::<f64>()))
            .filter(|(_, total)| *total > 0.0)
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.categories
            .values()
            .flat_map(|items| items.values())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn demo() -> Self {
        let data: [(&str, &[(&str, f64)]); 8] = [
            (
                "Housing",
                &[("Rent", 1200.0), ("Insurance", 100.0), ("Maintenance", 200.0)],
            ),
            ("Food", &[("Groceries", 400.0), ("Dining Out", 200.0)]),
            (
                "Transportation",
                &[("Gas", 150.0), ("Car Insurance", 100.0), ("Public Transit", 50.0)],
            ),
            (
                "Utilities",
                &[
                    ("Electricity", 80.0),
                    ("Water", 40.0),
                    ("Internet", 60.0),
                    ("Phone", 70.0),
                ],
            ),
            (
                "Entertainment",
                &[("Streaming Services", 30.0), ("Movies", 40.0), ("Hobbies", 80.0)],
            ),
            (
                "Investment",
                &[("Stock Market", 800.0), ("Emergency Fund", 200.0)],
            ),
            ("Travel", &[("Vacation Fund", 250.0)]),
            ("Education", &[("Online Courses", 150.0), ("Books", 50.0)]),
        ];

        ExpenseBook {
            categories: data
                .iter()
                .map(|(category, items)| {
                    (
                        category.to_string(),
                        items.iter().map(|(d, a)| (d.to_string(), *a)).collect(),
                    )
                })
                .collect(),
        }
    }
}

// ============================================================================
// BUDGET PLAN & OVERVIEW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    WithinBudget,
    OverBudget,
}

impl BudgetStatus {
    fn from_used(used_percentage: f64) -> Self {
        if used_percentage <= 100.0 {
            BudgetStatus::WithinBudget
        } else {
            BudgetStatus::OverBudget
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BudgetStatus::WithinBudget => "🟢",
            BudgetStatus::OverBudget => "🔴",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    pub status: BudgetStatus,
    pub category: String,
    pub spent: f64,
    pub should_spend: f64,
    pub used_percentage: f64,
    pub remaining: f64,
}

impl BudgetRow {
    fn new(category: String, spent: f64, should_spend: f64) -> Self {
        let used_percentage = if should_spend > 0.0 {
            spent / should_spend * 100.0
        } else {
            0.0
        };
        BudgetRow {
            status: BudgetStatus::from_used(used_percentage),
            category,
            spent,
            should_spend,
            used_percentage,
            remaining: should_spend - spent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetOverview {
    pub monthly_salary: f64,
    pub rows: Vec<BudgetRow>,
    pub total: BudgetRow,
    /// Spending recorded in categories that have no allocation
    pub unbudgeted: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    pub monthly_salary: f64,
    pub goal: Option<BudgetGoal>,
    pub expenses: ExpenseBook,
}

impl Default for BudgetPlan {
    fn default() -> Self {
        BudgetPlan {
            monthly_salary: 0.0,
            goal: None,
            expenses: ExpenseBook::new(),
        }
    }
}

impl BudgetPlan {
    pub fn demo() -> Self {
        BudgetPlan {
            monthly_salary: DEMO_MONTHLY_SALARY,
            goal: Some(BudgetGoal::default_allocations()),
            expenses: ExpenseBook::demo(),
        }
    }

    pub fn set_salary(&mut self, salary: f64) -> Result<()> {
        if !salary.is_finite() || salary < 0.0 {
            return Err(DashboardError::validation("Salary must be positive"));
        }
        self.monthly_salary = salary;
        Ok(())
    }

    pub fn should_spend(&self, category: &str) -> f64 {
        self.goal
            .as_ref()
            .and_then(|g| g.percentage(category))
            .map(|pct| self.monthly_salary * pct / 100.0)
            .unwrap_or(0.0)
    }

    /// Goal distribution in currency (category -> should spend)
    pub fn planned_amounts(&self) -> Vec<(String, f64)> {
        self.goal
            .as_ref()
            .map(|g| g.planned_amounts(self.monthly_salary))
            .unwrap_or_default()
    }

    pub fn overview(&self) -> Result<BudgetOverview> {
        let goal = self.goal.as_ref().ok_or_else(|| {
            DashboardError::validation("Please set your budget goals first")
        })?;
        if self.monthly_salary <= 0.0 {
            return Err(DashboardError::validation(
                "Please set your monthly salary",
            ));
        }

        let rows: Vec<BudgetRow> = goal
            .allocations()
            .iter()
            .map(|(category, pct)| {
                BudgetRow::new(
                    category.clone(),
                    self.expenses.category_total(category),
                    self.monthly_salary * pct / 100.0,
                )
            })
            .collect();

        let total_spent: f64 = rows.iter().map(|r| r.spent).sum();
        let total_should: f64 = rows.iter().map(|r| r.should_spend).sum();

        let unbudgeted = self
            .expenses
            .totals_by_category()
            .into_iter()
            .filter(|(category, _)| !goal.contains(category))
            .collect();

        Ok(BudgetOverview {
            monthly_salary: self.monthly_salary,
            rows,
            total: BudgetRow::new("TOTAL".to_string(), total_spent, total_should),
            unbudgeted,
        })
    }
}

// ============================================================================
// TRANSACTION REPORTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
}

/// Total income vs total expenses
pub fn cash_flow(transactions: &[Transaction]) -> CashFlow {
    let mut flow = CashFlow::default();
    for tx in transactions {
        match tx.kind {
            TransactionType::Income => flow.income += tx.amount,
            TransactionType::Expense => flow.expenses += tx.amount,
        }
    }
    flow.net = flow.income - flow.expenses;
    flow
}

/// Expense totals per category
pub fn expense_breakdown(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }
    totals
}

/// Expense totals per category for the last `days` days up to `today`
pub fn recent_spending(
    transactions: &[Transaction],
    today: NaiveDate,
    days: i64,
) -> BTreeMap<String, f64> {
    let since = today - Duration::days(days);
    let recent: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.date >= since && t.date <= today)
        .cloned()
        .collect();
    expense_breakdown(&recent)
}

/// Income and expenses per `YYYY-MM`, oldest first
pub fn monthly_summary(transactions: &[Transaction]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for tx in transactions {
        let entry = months.entry(tx.month_key()).or_insert((0.0, 0.0));
        match tx.kind {
            TransactionType::Income => entry.0 += tx.amount,
            TransactionType::Expense => entry.1 += tx.amount,
        }
    }

    months
        .into_iter()
        .map(|(month, (income, expenses))| MonthlySummary {
            month,
            income,
            expenses,
            net: income - expenses,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64, kind: TransactionType, category: &str, date: &str) -> Transaction {
        Transaction::new(amount, kind, category, None)
            .unwrap()
            .with_date(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn test_demo_overview() {
        let overview = BudgetPlan::demo().overview().unwrap();

        assert_eq!(overview.rows.len(), 8);
        let housing = overview
            .rows
            .iter()
            .find(|r| r.category == "Housing")
            .unwrap();
        assert_eq!(housing.spent, 1500.0);
        assert_eq!(housing.should_spend, 3000.0);
        assert_eq!(housing.used_percentage, 50.0);
        assert_eq!(housing.remaining, 1500.0);
        assert_eq!(housing.status, BudgetStatus::WithinBudget);

        assert_eq!(overview.total.category, "TOTAL");
        assert_eq!(overview.total.should_spend, 10_000.0);
        assert_eq!(overview.total.spent, 4_250.0);
        assert!(overview.unbudgeted.is_empty());
    }

    #[test]
    fn test_over_budget_status() {
        let mut plan = BudgetPlan::demo();
        plan.expenses.add_expense("Travel", "Flights", 900.0).unwrap();

        let overview = plan.overview().unwrap();
        let travel = overview.rows.iter().find(|r| r.category == "Travel").unwrap();
        assert_eq!(travel.spent, 1150.0);
        assert_eq!(travel.status, BudgetStatus::OverBudget);
        assert!(travel.remaining < 0.0);
    }

    #[test]
    fn test_overview_requires_goal_and_salary() {
        let mut plan = BudgetPlan::default();
        assert!(plan.overview().is_err());

        plan.goal = Some(BudgetGoal::default_allocations());
        let err = plan.overview().unwrap_err();
        assert!(err.to_string().contains("monthly salary"));
    }

    #[test]
    fn test_zero_allocation_reports_zero_usage() {
        let plan = BudgetPlan {
            monthly_salary: 1000.0,
            goal: Some(BudgetGoal::new([("Food", 0.0)]).unwrap()),
            expenses: ExpenseBook::new(),
        };
        let overview = plan.overview().unwrap();
        assert_eq!(overview.rows[0].used_percentage, 0.0);
        assert_eq!(overview.total.used_percentage, 0.0);
    }

    #[test]
    fn test_unbudgeted_spending_is_reported() {
        let mut plan = BudgetPlan::demo();
        plan.expenses.add_expense("Pets", "Vet", 120.0).unwrap();

        let overview = plan.overview().unwrap();
        assert_eq!(overview.unbudgeted.get("Pets"), Some(&120.0));
        assert!(overview.rows.iter().all(|r| r.category != "Pets"));
    }

    #[test]
    fn test_expense_book_operations() {
        let mut book = ExpenseBook::new();
        book.add_expense("Food", "Groceries", 300.0).unwrap();
        book.add_expense("Food", "Dining Out", 0.0).unwrap();
        book.add_expense("Travel", "Train", 50.0).unwrap();

        assert_eq!(book.category_total("Food"), 300.0);
        assert_eq!(book.total(), 350.0);
        assert_eq!(book.totals_by_category().len(), 2);

        assert_eq!(book.remove_expense("Travel", "Train"), Some(50.0));
        assert!(book.items("Travel").is_none());
        assert!(book.add_expense("Food", "Bad", -1.0).is_err());
    }

    #[test]
    fn test_cash_flow_and_breakdown() {
        let txs = vec![
            tx(3000.0, TransactionType::Income, "Salary", "2024-01-01"),
            tx(500.0, TransactionType::Expense, "Food", "2024-01-05"),
            tx(250.0, TransactionType::Expense, "Food", "2024-01-20"),
            tx(1200.0, TransactionType::Expense, "Housing", "2024-02-01"),
        ];

        let flow = cash_flow(&txs);
        assert_eq!(flow.income, 3000.0);
        assert_eq!(flow.expenses, 1950.0);
        assert_eq!(flow.net, 1050.0);

        let breakdown = expense_breakdown(&txs);
        assert_eq!(breakdown["Food"], 750.0);
        assert_eq!(breakdown["Housing"], 1200.0);
        assert!(!breakdown.contains_key("Salary"));
    }

    #[test]
    fn test_recent_spending_window() {
        let txs = vec![
            tx(10.0, TransactionType::Expense, "Food", "2024-03-31"),
            tx(20.0, TransactionType::Expense, "Food", "2024-03-01"),
            tx(40.0, TransactionType::Expense, "Food", "2024-02-01"),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        let recent = recent_spending(&txs, today, 30);
        assert_eq!(recent["Food"], 30.0);
    }

    #[test]
    fn test_monthly_summary() {
        let txs = vec![
            tx(3000.0, TransactionType::Income, "Salary", "2024-02-01"),
            tx(100.0, TransactionType::Expense, "Food", "2024-01-05"),
            tx(200.0, TransactionType::Expense, "Food", "2024-02-10"),
        ];

        let months = monthly_summary(&txs);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[0].net, -100.0);
        assert_eq!(months[1].income, 3000.0);
        assert_eq!(months[1].net, 2800.0);
    }
}
