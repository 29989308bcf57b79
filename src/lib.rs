// Finance Dashboard - Core Library
// Exposes all modules for use in the CLI, the TUI, the API server and tests

pub mod budget;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod format;
pub mod logging;
pub mod market;
pub mod projection;
pub mod storage;

// Re-export commonly used types
pub use budget::{
    cash_flow, expense_breakdown, monthly_summary, recent_spending, BudgetOverview, BudgetPlan,
    BudgetRow, BudgetStatus, CashFlow, ExpenseBook, MonthlySummary,
};
pub use config::{AppConfig, ProviderConfig};
pub use db::{
    delete_transaction, get_all_transactions, get_cached_price, get_events_for_entity,
    get_transactions_between, get_transactions_by_kind, insert_event, insert_transactions,
    load_csv, open_database, save_cached_price, setup_database, verify_count, CachedPrice, Event,
};
pub use entities::{
    BalanceSheet, BudgetGoal, CategoryItems, GoalProgress, NetWorthSummary, Side, Transaction,
    TransactionType,
};
pub use error::{DashboardError, Result};
pub use market::{CoinGeckoClient, PricePoint, StockClient, TtlCache};
pub use projection::{
    compound_interest, first_million_plan, future_value, investment_timeline,
    required_monthly_investment, time_to_goal, FirstMillionConfig, FirstMillionPlan, PeriodUnit,
    RateBasis,
};
pub use storage::{DashboardState, FileStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
