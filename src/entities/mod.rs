// Entity Models
//
// Flat records the dashboard is built on:
// - Transaction: a logged income or expense
// - BudgetGoal: target share of income per spending category
// - BalanceSheet: assets and liabilities, the source of net worth

pub mod balance_sheet;
pub mod budget_goal;
pub mod transaction;

pub use balance_sheet::{
    BalanceSheet, CategoryItems, GoalProgress, NetWorthSummary, Side, ASSET_CATEGORIES,
    LIABILITY_CATEGORIES,
};
pub use budget_goal::BudgetGoal;
pub use transaction::{Transaction, TransactionType};
