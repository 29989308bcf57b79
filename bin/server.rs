// Finance Dashboard - Web Server
// REST API with Axum over the same library the CLI and TUI use

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use finance_dashboard::budget::{self, BudgetOverview, CashFlow, MonthlySummary};
use finance_dashboard::config::AppConfig;
use finance_dashboard::db::{self, Event};
use finance_dashboard::entities::{
    BalanceSheet, BudgetGoal, GoalProgress, NetWorthSummary, Side, Transaction, TransactionType,
};
use finance_dashboard::error::DashboardError;
use finance_dashboard::logging;
use finance_dashboard::market::crypto::{self, BollingerBand, CoinSnapshot, MarketCapOf, RoiResult};
use finance_dashboard::market::funds::{self, FundMetrics, FundQuote, IncomePlanRow};
use finance_dashboard::market::{CoinGeckoClient, CoinSearchHit, HistoryRange, PricePoint, StockClient};
use finance_dashboard::projection::{
    self, CompoundRow, FirstMillionConfig, FirstMillionPlan, GoalTimeline, PeriodUnit, RateBasis,
    RequiredInvestment, TimelinePoint,
};
use finance_dashboard::storage::{DashboardState, FileStore};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    dashboard: Arc<RwLock<DashboardState>>,
    store: FileStore,
    coingecko: Arc<CoinGeckoClient>,
    stocks: Arc<StockClient>,
    config: Arc<AppConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Error leaving a handler: a status plus the message shown to the client
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let status = match &err {
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotFound { .. } => StatusCode::NOT_FOUND,
            DashboardError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DashboardError::Api { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
            DashboardError::Http(_) | DashboardError::Api { .. } | DashboardError::InvalidResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DashboardError>() {
            Ok(inner) => inner.into(),
            Err(err) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{:#}", err),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, Json(ApiResponse::err(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

// ============================================================================
// Net worth
// ============================================================================

#[derive(Serialize)]
struct NetWorthResponse {
    summary: NetWorthSummary,
    progress: GoalProgress,
    asset_distribution: Vec<(String, f64)>,
    liability_distribution: Vec<(String, f64)>,
    balance_sheet: BalanceSheet,
}

#[derive(Deserialize)]
struct TargetQuery {
    target: Option<f64>,
}

#[derive(Deserialize)]
struct ItemRequest {
    side: Side,
    category: String,
    name: String,
    amount: f64,
}

fn net_worth_response(sheet: &BalanceSheet, target: f64) -> NetWorthResponse {
    NetWorthResponse {
        summary: sheet.summary(),
        progress: sheet.progress_toward(target),
        asset_distribution: sheet.distribution(Side::Asset),
        liability_distribution: sheet.distribution(Side::Liability),
        balance_sheet: sheet.clone(),
    }
}

/// GET /api/net-worth
async fn get_net_worth(State(state): State<AppState>, Query(query): Query<TargetQuery>) -> ApiResult<NetWorthResponse> {
    let dashboard = state.dashboard.read().await;
    let target = query.target.unwrap_or(state.config.projection.target_net_worth);
    ok(net_worth_response(&dashboard.balance_sheet, target))
}

/// POST /api/net-worth/items - Add or overwrite an item
async fn add_net_worth_item(State(state): State<AppState>, Json(req): Json<ItemRequest>) -> ApiResult<NetWorthResponse> {
    let mut dashboard = state.dashboard.write().await;
    dashboard
        .balance_sheet
        .add_item(req.side, &req.category, &req.name, req.amount)?;
    state.store.save_balance_sheet(&dashboard.balance_sheet)?;
    info!(side = %req.side, category = %req.category, item = %req.name, "net worth item saved");
    ok(net_worth_response(&dashboard.balance_sheet, state.config.projection.target_net_worth))
}

/// DELETE /api/net-worth/items/:side/:category/:name
async fn remove_net_worth_item(
    State(state): State<AppState>,
    Path((side, category, name)): Path<(Side, String, String)>,
) -> ApiResult<NetWorthResponse> {
    let mut dashboard = state.dashboard.write().await;
    if dashboard.balance_sheet.remove_item(side, &category, &name).is_none() {
        return Err(DashboardError::not_found("Item", format!("{}/{}", category, name)).into());
    }
    state.store.save_balance_sheet(&dashboard.balance_sheet)?;
    ok(net_worth_response(&dashboard.balance_sheet, state.config.projection.target_net_worth))
}

// ============================================================================
// Budget
// ============================================================================

#[derive(Deserialize)]
struct GoalEntry {
    category: String,
    percentage: f64,
}

#[derive(Deserialize)]
struct GoalRequest {
    #[serde(default)]
    allocations: Vec<GoalEntry>,
    /// Use the default split instead of `allocations`
    #[serde(default)]
    default: bool,
}

#[derive(Deserialize)]
struct SalaryRequest {
    monthly_salary: f64,
}

#[derive(Deserialize)]
struct ExpenseRequest {
    category: String,
    description: String,
    amount: f64,
}

/// GET /api/budget - Spending against goals
async fn get_budget(State(state): State<AppState>) -> ApiResult<BudgetOverview> {
    let dashboard = state.dashboard.read().await;
    ok(dashboard.budget.overview()?)
}

/// PUT /api/budget/goal
async fn set_budget_goal(State(state): State<AppState>, Json(req): Json<GoalRequest>) -> ApiResult<BudgetGoal> {
    let goal = if req.default {
        BudgetGoal::default_allocations()
    } else {
        BudgetGoal::new(req.allocations.into_iter().map(|e| (e.category, e.percentage)))?
    };
    let mut dashboard = state.dashboard.write().await;
    state.store.save_budget_goal(Some(&goal))?;
    dashboard.budget.goal = Some(goal.clone());
    ok(goal)
}

/// DELETE /api/budget/goal
async fn clear_budget_goal(State(state): State<AppState>) -> ApiResult<()> {
    let mut dashboard = state.dashboard.write().await;
    state.store.save_budget_goal(None)?;
    dashboard.budget.goal = None;
    ok(())
}

/// PUT /api/budget/salary
async fn set_salary(State(state): State<AppState>, Json(req): Json<SalaryRequest>) -> ApiResult<f64> {
    let mut dashboard = state.dashboard.write().await;
    dashboard.budget.set_salary(req.monthly_salary)?;
    state.store.save_monthly_salary(req.monthly_salary)?;
    ok(req.monthly_salary)
}

/// POST /api/budget/expenses
async fn add_expense(State(state): State<AppState>, Json(req): Json<ExpenseRequest>) -> ApiResult<BudgetOverview> {
    let mut dashboard = state.dashboard.write().await;
    dashboard
        .budget
        .expenses
        .add_expense(&req.category, &req.description, req.amount)?;
    state.store.save_expenses(&dashboard.budget.expenses)?;
    ok(dashboard.budget.overview()?)
}

/// DELETE /api/budget/expenses/:category/:description
async fn remove_expense(
    State(state): State<AppState>,
    Path((category, description)): Path<(String, String)>,
) -> ApiResult<f64> {
    let mut dashboard = state.dashboard.write().await;
    let removed = dashboard
        .budget
        .expenses
        .remove_expense(&category, &description)
        .ok_or_else(|| DashboardError::not_found("Expense", format!("{}/{}", category, description)))?;
    state.store.save_expenses(&dashboard.budget.expenses)?;
    ok(removed)
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Deserialize)]
struct TransactionQuery {
    #[serde(rename = "type")]
    kind: Option<TransactionType>,
    category: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct NewTransaction {
    amount: f64,
    #[serde(rename = "type")]
    kind: TransactionType,
    category: String,
    description: Option<String>,
    date: Option<NaiveDate>,
}

async fn load_transactions(state: &AppState, query: &TransactionQuery) -> Result<Vec<Transaction>, ApiError> {
    let conn = state.db.lock().await;
    let mut transactions = match (query.from, query.to) {
        (Some(from), Some(to)) => db::get_transactions_between(&conn, from, to)?,
        _ => db::get_all_transactions(&conn)?,
    };
    transactions.retain(|tx| {
        query.kind.map_or(true, |k| tx.kind == k)
            && query.category.as_ref().map_or(true, |c| &tx.category == c)
            && query.from.map_or(true, |d| tx.date >= d)
            && query.to.map_or(true, |d| tx.date <= d)
    });
    Ok(transactions)
}

/// GET /api/transactions?type=&category=&from=&to=
async fn get_transactions(State(state): State<AppState>, Query(query): Query<TransactionQuery>) -> ApiResult<Vec<Transaction>> {
    ok(load_transactions(&state, &query).await?)
}

/// POST /api/transactions
async fn create_transaction(
    State(state): State<AppState>,
    Json(req): Json<NewTransaction>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    let mut tx = Transaction::new(req.amount, req.kind, req.category, req.description)?;
    if let Some(date) = req.date {
        tx = tx.with_date(date);
    }

    let conn = state.db.lock().await;
    if db::insert_transactions(&conn, std::slice::from_ref(&tx))? == 0 {
        return Err(ApiError {
            status: StatusCode::CONFLICT,
            message: "An identical transaction already exists".to_string(),
        });
    }
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tx))))
}

/// GET /api/transactions/:id
async fn get_transaction(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Transaction> {
    let conn = state.db.lock().await;
    let tx = db::get_transaction(&conn, &id)?.ok_or_else(|| DashboardError::not_found("Transaction", id.clone()))?;
    ok(tx)
}

/// DELETE /api/transactions/:id
async fn delete_transaction(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<String> {
    let conn = state.db.lock().await;
    if !db::delete_transaction(&conn, &id)? {
        return Err(DashboardError::not_found("Transaction", id).into());
    }
    ok(id)
}

/// GET /api/transactions/:id/history - Audit trail
async fn transaction_history(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Event>> {
    let conn = state.db.lock().await;
    ok(db::get_events_for_entity(&conn, "transaction", &id)?)
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Serialize)]
struct CashFlowReport {
    cash_flow: CashFlow,
    expense_breakdown: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct RecentQuery {
    #[serde(default = "default_recent_days")]
    days: i64,
}

fn default_recent_days() -> i64 {
    30
}

/// GET /api/reports/cash-flow?from=&to=
async fn cash_flow_report(State(state): State<AppState>, Query(query): Query<TransactionQuery>) -> ApiResult<CashFlowReport> {
    let transactions = load_transactions(&state, &query).await?;
    ok(CashFlowReport {
        cash_flow: budget::cash_flow(&transactions),
        expense_breakdown: budget::expense_breakdown(&transactions),
    })
}

/// GET /api/reports/monthly
async fn monthly_report(State(state): State<AppState>) -> ApiResult<Vec<MonthlySummary>> {
    let conn = state.db.lock().await;
    ok(db::monthly_summary(&conn)?)
}

/// GET /api/reports/recent?days=30 - Spending per category in the window
async fn recent_report(State(state): State<AppState>, Query(query): Query<RecentQuery>) -> ApiResult<BTreeMap<String, f64>> {
    if query.days <= 0 {
        return Err(ApiError::bad_request("days must be positive"));
    }
    let conn = state.db.lock().await;
    let transactions = db::get_all_transactions(&conn)?;
    ok(budget::recent_spending(&transactions, Local::now().date_naive(), query.days))
}

// ============================================================================
// Projections
// ============================================================================

#[derive(Deserialize)]
struct FirstMillionRequest {
    initial_amount: f64,
    desired_amount: f64,
    annual_income: f64,
    /// Decimal, e.g. 0.1 for 10%
    annual_return: Option<f64>,
    #[serde(default)]
    save: bool,
}

#[derive(Deserialize)]
struct TimeToGoalRequest {
    initial: f64,
    monthly: f64,
    goal: f64,
    annual_return: Option<f64>,
}

#[derive(Deserialize)]
struct RequiredInvestmentRequest {
    initial: f64,
    years: u32,
    goal: f64,
    annual_return: Option<f64>,
}

#[derive(Deserialize)]
struct TimelineRequest {
    initial: f64,
    monthly: f64,
    years: u32,
    annual_return: Option<f64>,
}

#[derive(Deserialize)]
struct CompoundRequest {
    initial: f64,
    /// Decimal rate per `rate_basis`
    rate: f64,
    period: u32,
    #[serde(default)]
    monthly: f64,
    #[serde(default = "default_rate_basis")]
    rate_basis: RateBasis,
    #[serde(default = "default_period_unit")]
    period_unit: PeriodUnit,
}

fn default_rate_basis() -> RateBasis {
    RateBasis::Annual
}

fn default_period_unit() -> PeriodUnit {
    PeriodUnit::Months
}

/// GET /api/projection/first-million - Plan for the saved inputs
async fn get_first_million(State(state): State<AppState>) -> ApiResult<FirstMillionPlan> {
    let dashboard = state.dashboard.read().await;
    let config = dashboard
        .first_million
        .as_ref()
        .ok_or_else(|| DashboardError::not_found("First Million inputs", "saved"))?;
    ok(projection::first_million_plan(config, state.config.projection.annual_return)?)
}

/// POST /api/projection/first-million
async fn post_first_million(State(state): State<AppState>, Json(req): Json<FirstMillionRequest>) -> ApiResult<FirstMillionPlan> {
    let config = FirstMillionConfig::new(req.initial_amount, req.desired_amount, req.annual_income)?;
    let rate = req.annual_return.unwrap_or(state.config.projection.annual_return);
    let plan = projection::first_million_plan(&config, rate)?;

    if req.save {
        let mut dashboard = state.dashboard.write().await;
        state.store.save_first_million(Some(&config))?;
        dashboard.first_million = Some(config);
    }
    ok(plan)
}

/// POST /api/projection/time-to-goal
async fn time_to_goal(State(state): State<AppState>, Json(req): Json<TimeToGoalRequest>) -> ApiResult<Option<GoalTimeline>> {
    let rate = req.annual_return.unwrap_or(state.config.projection.annual_return);
    ok(projection::time_to_goal(req.initial, req.monthly, rate, req.goal))
}

/// POST /api/projection/required-investment
async fn required_investment(
    State(state): State<AppState>,
    Json(req): Json<RequiredInvestmentRequest>,
) -> ApiResult<RequiredInvestment> {
    let rate = req.annual_return.unwrap_or(state.config.projection.annual_return);
    ok(projection::required_monthly_investment(req.initial, req.years, rate, req.goal)?)
}

/// POST /api/projection/timeline
async fn timeline(State(state): State<AppState>, Json(req): Json<TimelineRequest>) -> ApiResult<Vec<TimelinePoint>> {
    let rate = req.annual_return.unwrap_or(state.config.projection.annual_return);
    ok(projection::investment_timeline(req.initial, req.monthly, req.years, rate)?)
}

/// POST /api/projection/compound
async fn compound(Json(req): Json<CompoundRequest>) -> ApiResult<Vec<CompoundRow>> {
    if req.period == 0 {
        return Err(ApiError::bad_request("period must be at least 1"));
    }
    ok(projection::compound_interest(
        req.initial,
        req.rate,
        req.period,
        req.monthly,
        req.rate_basis,
        req.period_unit,
    )?)
}

// ============================================================================
// Crypto
// ============================================================================

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Deserialize)]
struct MarketCapQuery {
    coin: String,
    reference: String,
    #[serde(default = "default_vs")]
    vs: String,
}

#[derive(Deserialize)]
struct RoiQuery {
    coin: String,
    from: NaiveDate,
    to: Option<NaiveDate>,
    #[serde(default = "default_vs")]
    vs: String,
}

#[derive(Deserialize)]
struct ChartQuery {
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default = "default_vs")]
    vs: String,
    #[serde(default = "default_window")]
    window: usize,
}

#[derive(Deserialize)]
struct PairQuery {
    a: String,
    b: String,
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default = "default_vs")]
    vs: String,
}

#[derive(Deserialize)]
struct CorrelationQuery {
    /// Comma separated ids or tickers
    ids: String,
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default = "default_vs")]
    vs: String,
}

fn default_vs() -> String {
    "usd".to_string()
}

fn default_days() -> u32 {
    365
}

fn default_window() -> usize {
    20
}

#[derive(Serialize)]
struct RoiResponse {
    coin: String,
    from: NaiveDate,
    to: NaiveDate,
    earliest_available: Option<NaiveDate>,
    result: RoiResult,
    roi_percent: String,
}

#[derive(Serialize)]
struct IndicatorPoint {
    timestamp: DateTime<Utc>,
    price: f64,
    sma: Option<f64>,
    ema: f64,
    bollinger: Option<BollingerBand>,
}

fn split_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// GET /api/crypto/search?q=
async fn crypto_search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Vec<CoinSearchHit>> {
    ok(state.coingecko.search(&query.q).await?)
}

/// GET /api/crypto/market-cap-of?coin=&reference=&vs=
async fn crypto_market_cap_of(State(state): State<AppState>, Query(query): Query<MarketCapQuery>) -> ApiResult<MarketCapOf> {
    let (a, b) = tokio::try_join!(
        state.coingecko.coin(&query.coin, &query.vs),
        state.coingecko.coin(&query.reference, &query.vs)
    )?;
    let a = CoinSnapshot::try_from(&a)?;
    let b = CoinSnapshot::try_from(&b)?;

    {
        let conn = state.db.lock().await;
        for snapshot in [&a, &b] {
            if let Err(e) = db::save_cached_price(&conn, &snapshot.id, &query.vs, snapshot.price) {
                warn!(error = %e, coin = %snapshot.id, "failed to cache price");
            }
        }
    }
    ok(crypto::market_cap_of(&a, &b)?)
}

/// GET /api/crypto/roi?coin=&from=&to=
async fn crypto_roi(State(state): State<AppState>, Query(query): Query<RoiQuery>) -> ApiResult<RoiResponse> {
    let today = Utc::now().date_naive();
    let to = query.to.unwrap_or(today);
    if query.from >= to {
        return Err(ApiError::bad_request("from must be before to"));
    }

    let details = state.coingecko.coin(&query.coin, &query.vs).await?;
    let days = (today - query.from).num_days().max(1) as u32 + 1;
    let chart = state.coingecko.market_chart(&query.coin, &query.vs, days).await?;

    let start = query.from.and_time(NaiveTime::MIN).and_utc();
    let end = to.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::days(1);
    let result = crypto::roi(&chart.prices, start, end)?;

    ok(RoiResponse {
        coin: details.name,
        from: query.from,
        to,
        earliest_available: details.genesis_date,
        roi_percent: crypto::format_roi(result.roi, true),
        result,
    })
}

/// GET /api/crypto/:id/indicators?days=&window= - SMA, EMA and Bollinger bands
async fn crypto_indicators(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<Vec<IndicatorPoint>> {
    if query.window < 2 {
        return Err(ApiError::bad_request("window must be at least 2"));
    }
    let chart = state.coingecko.market_chart(&id, &query.vs, query.days).await?;
    let prices = crypto::daily_closes(&chart.prices);
    let values: Vec<f64> = prices.iter().map(|p| p.value).collect();

    let sma = crypto::sma(&values, query.window);
    let ema = crypto::ema(&values, query.window);
    let bands = crypto::bollinger_bands(&values, query.window, 2.0);

    let points = prices
        .iter()
        .enumerate()
        .map(|(i, p)| IndicatorPoint {
            timestamp: p.timestamp,
            price: p.value,
            sma: sma[i],
            ema: ema[i],
            bollinger: bands[i],
        })
        .collect();
    ok(points)
}

/// GET /api/crypto/ratio?a=&b=&days=
async fn crypto_ratio(State(state): State<AppState>, Query(query): Query<PairQuery>) -> ApiResult<Vec<PricePoint>> {
    let (a, b) = tokio::try_join!(
        state.coingecko.market_chart(&query.a, &query.vs, query.days),
        state.coingecko.market_chart(&query.b, &query.vs, query.days)
    )?;
    ok(crypto::price_ratio(
        &crypto::daily_closes(&a.prices),
        &crypto::daily_closes(&b.prices),
    ))
}

/// GET /api/crypto/correlation?ids=bitcoin,ethereum&days=
async fn crypto_correlation(
    State(state): State<AppState>,
    Query(query): Query<CorrelationQuery>,
) -> ApiResult<BTreeMap<String, BTreeMap<String, Option<f64>>>> {
    let ids = split_ids(&query.ids);
    if ids.len() < 2 {
        return Err(ApiError::bad_request("at least two ids are required"));
    }
    let mut series = BTreeMap::new();
    for id in ids {
        let chart = state.coingecko.market_chart(&id, &query.vs, query.days).await?;
        series.insert(id, crypto::daily_closes(&chart.prices));
    }
    ok(crypto::correlation_matrix(&series))
}

// ============================================================================
// Stocks & funds
// ============================================================================

#[derive(Deserialize)]
struct RangeQuery {
    #[serde(default = "default_range")]
    range: HistoryRange,
}

#[derive(Deserialize)]
struct IncomePlanQuery {
    income: f64,
    tickers: Option<String>,
    #[serde(default = "default_range")]
    range: HistoryRange,
}

fn default_range() -> HistoryRange {
    HistoryRange::OneYear
}

#[derive(Serialize)]
struct StockMetricsResponse {
    symbol: String,
    currency: Option<String>,
    last_price: Option<f64>,
    metrics: FundMetrics,
    quote: FundQuote,
}

#[derive(Serialize)]
struct IncomePlanResponse {
    rows: Vec<IncomePlanRow>,
    total_investment: f64,
    skipped: Vec<String>,
}

/// GET /api/stocks/:symbol/metrics?range=1y
async fn stock_metrics(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<StockMetricsResponse> {
    let ticker = symbol.trim().to_uppercase();
    let history = state.stocks.history(&funds::exchange_symbol(&ticker), query.range).await?;
    let metrics = FundMetrics::from_history(&history.close_values(), funds::DEFAULT_RISK_FREE_RATE);
    let sector = funds::sector_of(&ticker).unwrap_or("Other");
    let quote = FundQuote::from_history(&ticker, sector, &history, Utc::now());

    ok(StockMetricsResponse {
        last_price: history.last_price(),
        symbol: history.symbol,
        currency: history.currency,
        metrics,
        quote,
    })
}

/// GET /api/funds/income-plan?income=&tickers=
async fn fund_income_plan(State(state): State<AppState>, Query(query): Query<IncomePlanQuery>) -> ApiResult<IncomePlanResponse> {
    if !query.income.is_finite() || query.income <= 0.0 {
        return Err(ApiError::bad_request("income must be positive"));
    }
    let tickers: Vec<String> = match &query.tickers {
        Some(list) => split_ids(list).into_iter().map(|t| t.to_uppercase()).collect(),
        None => funds::DEFAULT_UNIVERSE
            .iter()
            .flat_map(|(_, tickers)| tickers.iter().map(|t| t.to_string()))
            .collect(),
    };

    let now = Utc::now();
    let mut quotes = Vec::new();
    let mut skipped = Vec::new();
    for ticker in tickers {
        match state.stocks.history(&funds::exchange_symbol(&ticker), query.range).await {
            Ok(history) => {
                let sector = funds::sector_of(&ticker).unwrap_or("Other");
                quotes.push(FundQuote::from_history(&ticker, sector, &history, now));
            }
            Err(e) => {
                warn!(%ticker, error = %e, "skipping fund");
                skipped.push(ticker);
            }
        }
    }

    let rows = funds::income_plan(&quotes, query.income);
    let total_investment = rows.iter().map(|r| r.required_investment).sum();
    ok(IncomePlanResponse {
        rows,
        total_investment,
        skipped,
    })
}

// ============================================================================
// State
// ============================================================================

/// GET /api/state
async fn get_state(State(state): State<AppState>) -> ApiResult<DashboardState> {
    ok(state.dashboard.read().await.clone())
}

/// POST /api/state/reload - Re-read the data directory
async fn reload_state(State(state): State<AppState>) -> ApiResult<DashboardState> {
    let loaded = state.store.load_state();
    *state.dashboard.write().await = loaded.clone();
    ok(loaded)
}

/// POST /api/state/demo - Replace everything with the demonstration data
async fn load_demo(State(state): State<AppState>) -> ApiResult<DashboardState> {
    let demo = DashboardState::demo();
    let mut dashboard = state.dashboard.write().await;
    state.store.save_state(&demo)?;
    *dashboard = demo.clone();
    info!("demo state loaded");
    ok(demo)
}

/// GET /api/health - Health check
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/net-worth", get(get_net_worth))
        .route("/net-worth/items", post(add_net_worth_item))
        .route("/net-worth/items/:side/:category/:name", delete(remove_net_worth_item))
        .route("/budget", get(get_budget))
        .route("/budget/goal", put(set_budget_goal).delete(clear_budget_goal))
        .route("/budget/salary", put(set_salary))
        .route("/budget/expenses", post(add_expense))
        .route("/budget/expenses/:category/:description", delete(remove_expense))
        .route("/transactions", get(get_transactions).post(create_transaction))
        .route("/transactions/:id", get(get_transaction).delete(delete_transaction))
        .route("/transactions/:id/history", get(transaction_history))
        .route("/reports/cash-flow", get(cash_flow_report))
        .route("/reports/monthly", get(monthly_report))
        .route("/reports/recent", get(recent_report))
        .route("/projection/first-million", get(get_first_million).post(post_first_million))
        .route("/projection/time-to-goal", post(time_to_goal))
        .route("/projection/required-investment", post(required_investment))
        .route("/projection/timeline", post(timeline))
        .route("/projection/compound", post(compound))
        .route("/crypto/search", get(crypto_search))
        .route("/crypto/market-cap-of", get(crypto_market_cap_of))
        .route("/crypto/roi", get(crypto_roi))
        .route("/crypto/ratio", get(crypto_ratio))
        .route("/crypto/correlation", get(crypto_correlation))
        .route("/crypto/:id/indicators", get(crypto_indicators))
        .route("/stocks/:symbol/metrics", get(stock_metrics))
        .route("/funds/income-plan", get(fund_income_plan))
        .route("/state", get(get_state))
        .route("/state/reload", post(reload_state))
        .route("/state/demo", post(load_demo))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    if config.logging.json {
        logging::init_json_logger(config.logging.verbose);
    } else {
        logging::init_cli_logger(config.logging.verbose);
    }

    println!("🌐 Finance Dashboard - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = db::open_database(&config.storage.database_path)?;
    info!(path = %config.storage.database_path.display(), "database opened");

    let store = FileStore::new(&config.storage.data_dir);
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        dashboard: Arc::new(RwLock::new(store.load_state())),
        store,
        coingecko: Arc::new(CoinGeckoClient::new(&config.coingecko)?),
        stocks: Arc::new(StockClient::new(&config.stocks)?),
        config: Arc::new(config.clone()),
    };

    let app = Router::new().nest("/api", api_routes(state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    info!(addr = %config.server.addr, "server listening");

    println!("\n🚀 Server running on http://{}", config.server.addr);
    println!("   API: http://{}/api/net-worth", config.server.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DashboardError::validation("bad"), StatusCode::BAD_REQUEST),
            (DashboardError::not_found("Transaction", "x"), StatusCode::NOT_FOUND),
            (
                DashboardError::RateLimited {
                    provider: "CoinGecko",
                    attempts: 3,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                DashboardError::Api {
                    provider: "CoinGecko",
                    status: 500,
                    message: "boom".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                DashboardError::Config {
                    message: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_anyhow_keeps_dashboard_status() {
        let err = anyhow::Error::from(DashboardError::validation("Amount must be positive"));
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "Amount must be positive");
    }

    #[test]
    fn test_split_ids() {
        assert_eq!(split_ids(" bitcoin, ethereum ,,"), vec!["bitcoin", "ethereum"]);
    }
}
