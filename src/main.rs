// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use finance_dashboard::budget::{self, BudgetPlan};
use finance_dashboard::config::AppConfig;
use finance_dashboard::db;
use finance_dashboard::entities::{BalanceSheet, BudgetGoal, Side, Transaction, TransactionType};
use finance_dashboard::format::{bar, money, money_whole, percent};
use finance_dashboard::logging;
use finance_dashboard::market::crypto::{self, CoinSnapshot};
use finance_dashboard::market::funds::{self, FundMetrics, FundQuote};
use finance_dashboard::market::stocks::HistoryRange;
use finance_dashboard::market::{CoinGeckoClient, PricePoint, StockClient};
use finance_dashboard::projection::{self, FirstMillionConfig, PeriodUnit, RateBasis};
use finance_dashboard::storage::{DashboardState, FileStore, ASSETS_FILE};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Parser, Debug)]
#[command(
    name = "finance-dashboard",
    version,
    about = "Personal finance dashboard: net worth, budget, projections and market data"
)]
struct Cli {
    /// TOML configuration file (defaults to ./dashboard.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal dashboard (default)
    Tui,

    /// Import transactions from a CSV file (date,type,category,amount,description)
    Import { csv: PathBuf },

    /// Record one income or expense in the ledger
    Add {
        kind: TransactionType,
        amount: f64,
        category: String,
        #[arg(short, long)]
        description: Option<String>,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List ledger transactions with cash-flow reports
    Ledger {
        #[arg(long)]
        kind: Option<TransactionType>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Window of the "recent spending" report
        #[arg(long, default_value_t = 30)]
        recent_days: i64,
    },

    /// Delete a ledger transaction by id
    Delete { id: String },

    /// Show net worth; with --side/--category/--item, edit an item first
    NetWorth {
        #[arg(long)]
        side: Option<Side>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        remove: bool,
        /// Net worth goal for the progress bar
        #[arg(long)]
        target: Option<f64>,
    },

    /// Show the budget overview, optionally updating salary, goals or expenses
    Budget {
        #[arg(long)]
        salary: Option<f64>,
        /// Replace the goal, e.g. --goal Housing=30 --goal Food=15
        #[arg(long = "goal", value_name = "CATEGORY=PCT")]
        goals: Vec<String>,
        /// Use the default allocation split
        #[arg(long, conflicts_with = "goals")]
        default_goals: bool,
        /// Expense category to add to (or remove from, with --remove)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        remove: bool,
    },

    /// First Million projections; inputs are remembered once saved
    FirstMillion {
        #[arg(long)]
        initial: Option<f64>,
        #[arg(long)]
        desired: Option<f64>,
        /// Annual income
        #[arg(long)]
        income: Option<f64>,
        /// Expected annual return in percent (default from config)
        #[arg(long)]
        rate: Option<f64>,
        /// How long a fixed monthly investment takes to reach the goal
        #[arg(long)]
        monthly: Option<f64>,
        /// Monthly investment needed to reach the goal in this many years
        #[arg(long)]
        years: Option<u32>,
        #[arg(long)]
        save: bool,
    },

    /// Compound interest growth table
    Compound {
        initial: f64,
        /// Rate in percent
        rate: f64,
        period: u32,
        #[arg(long, default_value_t = 0.0)]
        monthly: f64,
        /// Rate is monthly instead of annual
        #[arg(long)]
        monthly_rate: bool,
        /// Period is in years instead of months
        #[arg(long)]
        years: bool,
    },

    /// Search coins on CoinGecko
    Search { query: String },

    /// Price of COIN if it had the market cap of REFERENCE
    MarketCapOf {
        coin: String,
        reference: String,
        #[arg(long, default_value = "usd")]
        vs: String,
    },

    /// Return on investment of one or two coins over a period
    Roi {
        #[arg(required = true, num_args = 1..=2)]
        coins: Vec<String>,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        percentage: bool,
        #[arg(long, default_value = "usd")]
        vs: String,
    },

    /// Real-estate fund metrics and the dividend income planner
    Fund {
        /// Tickers (defaults to the built-in universe)
        tickers: Vec<String>,
        /// Desired monthly income for the planner
        #[arg(long)]
        income: Option<f64>,
        #[arg(long, default_value = "1y")]
        range: HistoryRange,
        /// Print the correlation matrix of daily returns
        #[arg(long)]
        correlation: bool,
    },

    /// Fill the data directory and ledger with demonstration data
    Demo {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);

    if matches!(command, Command::Tui) {
        let config = AppConfig::load(cli.config.as_deref())?;
        let log_path = config.storage.data_dir.join("dashboard.log");
        logging::init_file_logger(&log_path, cli.verbose || config.logging.verbose)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        return run_ui_mode(&config);
    }

    logging::init_cli_logger(cli.verbose);
    let config = AppConfig::load(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match command {
        Command::Tui => unreachable!("handled above"),
        Command::Import { csv } => run_import(&config, &csv),
        Command::Add {
            kind,
            amount,
            category,
            description,
            date,
        } => run_add(&config, kind, amount, &category, description, date),
        Command::Ledger {
            kind,
            from,
            to,
            recent_days,
        } => run_ledger(&config, kind, from, to, recent_days),
        Command::Delete { id } => run_delete(&config, &id),
        Command::NetWorth {
            side,
            category,
            item,
            amount,
            remove,
            target,
        } => run_net_worth(&config, side, category, item, amount, remove, target),
        Command::Budget {
            salary,
            goals,
            default_goals,
            category,
            description,
            amount,
            remove,
        } => run_budget(
            &config,
            salary,
            &goals,
            default_goals,
            category,
            description,
            amount,
            remove,
        ),
        Command::FirstMillion {
            initial,
            desired,
            income,
            rate,
            monthly,
            years,
            save,
        } => run_first_million(&config, initial, desired, income, rate, monthly, years, save),
        Command::Compound {
            initial,
            rate,
            period,
            monthly,
            monthly_rate,
            years,
        } => run_compound(initial, rate, period, monthly, monthly_rate, years),
        Command::Search { query } => run_search(&config, &query).await,
        Command::MarketCapOf { coin, reference, vs } => {
            run_market_cap_of(&config, &coin, &reference, &vs).await
        }
        Command::Roi {
            coins,
            from,
            to,
            percentage,
            vs,
        } => run_roi(&config, &coins, from, to, percentage, &vs).await,
        Command::Fund {
            tickers,
            income,
            range,
            correlation,
        } => run_fund(&config, &tickers, income, range, correlation).await,
        Command::Demo { force } => run_demo(&config, force),
    }
}

fn store(config: &AppConfig) -> FileStore {
    FileStore::new(&config.storage.data_dir)
}

fn ledger(config: &AppConfig) -> Result<rusqlite::Connection> {
    db::open_database(&config.storage.database_path)
}

fn header(title: &str) {
    println!("{}", title);
    println!("{}", RULE);
}

// ============================================================================
// LEDGER
// ============================================================================

fn run_import(config: &AppConfig, csv: &std::path::Path) -> Result<()> {
    header("🗄️  Import transactions - CSV → SQLite");

    println!("\n📂 Loading CSV...");
    let transactions = db::load_csv(csv)?;
    println!("✓ Loaded {} transactions from {}", transactions.len(), csv.display());

    println!("\n💾 Inserting transactions...");
    let conn = ledger(config)?;
    let inserted = db::insert_transactions(&conn, &transactions)?;
    let count = db::verify_count(&conn)?;

    println!("✓ Inserted: {} transactions", inserted);
    println!("✓ Skipped duplicates: {}", transactions.len() - inserted);
    println!("✓ Ledger contains {} transactions", count);
    Ok(())
}

fn run_add(
    config: &AppConfig,
    kind: TransactionType,
    amount: f64,
    category: &str,
    description: Option<String>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut tx = Transaction::new(amount, kind, category, description)?;
    if let Some(date) = date {
        tx = tx.with_date(date);
    }

    let conn = ledger(config)?;
    if db::insert_transactions(&conn, std::slice::from_ref(&tx))? == 0 {
        println!("⚠️  An identical transaction is already in the ledger");
    } else {
        println!("✅ Added {} {} ({}) on {}", kind, money(tx.amount), tx.category, tx.date);
        println!("   id: {}", tx.id);
    }
    Ok(())
}

fn run_ledger(
    config: &AppConfig,
    kind: Option<TransactionType>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    recent_days: i64,
) -> Result<()> {
    let conn = ledger(config)?;
    let mut transactions = match (from, to, kind) {
        (Some(from), Some(to), _) => db::get_transactions_between(&conn, from, to)?,
        (None, None, Some(kind)) => db::get_transactions_by_kind(&conn, kind)?,
        _ => db::get_all_transactions(&conn)?,
    };
    transactions.retain(|t| {
        kind.map_or(true, |k| t.kind == k)
            && from.map_or(true, |d| t.date >= d)
            && to.map_or(true, |d| t.date <= d)
    });

    header("📒 Ledger");
    if transactions.is_empty() {
        println!("No transactions recorded yet. Use `add` or `import`.");
        return Ok(());
    }

    println!(
        "{:<10}  {:<8}  {:<16}  {:>12}  {}",
        "Date", "Type", "Category", "Amount", "Description"
    );
    for tx in &transactions {
        println!(
            "{:<10}  {:<8}  {:<16}  {:>12}  {}",
            tx.date,
            tx.kind,
            tx.category,
            money(tx.signed_amount()),
            tx.description.as_deref().unwrap_or("")
        );
    }

    let flow = budget::cash_flow(&transactions);
    println!("\n💰 Cash flow");
    println!("   Income:   {:>14}", money(flow.income));
    println!("   Expenses: {:>14}", money(flow.expenses));
    println!("   Net:      {:>14}", money(flow.net));

    println!("\n📅 Monthly summary");
    for month in budget::monthly_summary(&transactions) {
        println!(
            "   {}  income {:>12}  expenses {:>12}  net {:>12}",
            month.month,
            money(month.income),
            money(month.expenses),
            money(month.net)
        );
    }

    let today = Local::now().date_naive();
    let recent = budget::recent_spending(&transactions, today, recent_days);
    if !recent.is_empty() {
        println!("\n🧾 Spending in the last {} days", recent_days);
        for (category, total) in recent {
            println!("   {:<16} {:>12}", category, money(total));
        }
    }
    Ok(())
}

fn run_delete(config: &AppConfig, id: &str) -> Result<()> {
    let conn = ledger(config)?;
    if db::delete_transaction(&conn, id)? {
        println!("🗑️  Deleted transaction {}", id);
        Ok(())
    } else {
        bail!("No transaction with id {}", id)
    }
}

// ============================================================================
// NET WORTH & BUDGET
// ============================================================================

fn print_side(sheet: &BalanceSheet, side: Side) {
    let total = sheet.total(side);
    for (category, amount) in sheet.distribution(side) {
        let share = if total > 0.0 { amount / total } else { 0.0 };
        println!(
            "   {:<16} {:>14}  {} {}",
            category,
            money(amount),
            bar(share, 20),
            percent(share * 100.0)
        );
        if let Some(items) = sheet.side(side).get(&category) {
            for (name, value) in items {
                println!("      · {:<22} {:>14}", name, money(*value));
            }
        }
    }
}

fn run_net_worth(
    config: &AppConfig,
    side: Option<Side>,
    category: Option<String>,
    item: Option<String>,
    amount: Option<f64>,
    remove: bool,
    target: Option<f64>,
) -> Result<()> {
    let store = store(config);
    let mut sheet = store.load_balance_sheet();

    if let Some(side) = side {
        let (Some(category), Some(item)) = (category, item) else {
            bail!("--side needs --category and --item");
        };
        if remove {
            match sheet.remove_item(side, &category, &item) {
                Some(_) => println!("🗑️  Removed {} from {}", item, category),
                None => bail!("{} not found in {}", item, category),
            }
        } else {
            let amount = amount.context("--amount is required when adding an item")?;
            sheet.add_item(side, &category, &item, amount)?;
            println!("✅ {} → {} = {}", category, item, money(amount));
        }
        store.save_balance_sheet(&sheet)?;
    }

    header("🏦 Net Worth");
    if sheet.is_empty() {
        println!("No assets or liabilities yet. Try `net-worth --side asset --category \"Cash & Bank\" --item Checking --amount 1000` or `demo`.");
        return Ok(());
    }

    let summary = sheet.summary();
    println!("\n📈 Assets ({})", money(summary.total_assets));
    print_side(&sheet, Side::Asset);
    println!("\n📉 Liabilities ({})", money(summary.total_liabilities));
    print_side(&sheet, Side::Liability);

    let target = target.unwrap_or(config.projection.target_net_worth);
    let progress = sheet.progress_toward(target);
    println!("\n💎 Net worth: {}", money(summary.net_worth));
    println!(
        "🎯 {} toward {}  {} ({} to go)",
        percent(progress.percent),
        money_whole(target),
        bar(progress.percent / 100.0, 30),
        money(progress.remaining)
    );
    Ok(())
}

fn parse_goal(entry: &str) -> Result<(String, f64)> {
    let (category, pct) = entry
        .split_once('=')
        .with_context(|| format!("Goal '{}' must look like CATEGORY=PCT", entry))?;
    let pct: f64 = pct
        .trim()
        .trim_end_matches('%')
        .parse()
        .with_context(|| format!("Invalid percentage in '{}'", entry))?;
    Ok((category.trim().to_string(), pct))
}

#[allow(clippy::too_many_arguments)]
fn run_budget(
    config: &AppConfig,
    salary: Option<f64>,
    goals: &[String],
    default_goals: bool,
    category: Option<String>,
    description: Option<String>,
    amount: Option<f64>,
    remove: bool,
) -> Result<()> {
    let store = store(config);
    let mut plan: BudgetPlan = store.load_budget();
    let mut changed = false;

    if let Some(salary) = salary {
        plan.set_salary(salary)?;
        changed = true;
    }
    if default_goals {
        plan.goal = Some(BudgetGoal::default_allocations());
        changed = true;
    } else if !goals.is_empty() {
        let allocations = goals.iter().map(|g| parse_goal(g)).collect::<Result<Vec<_>>>()?;
        plan.goal = Some(BudgetGoal::new(allocations)?);
        changed = true;
    }
    if let Some(category) = category {
        let description = description.context("--description is required with --category")?;
        if remove {
            if plan.expenses.remove_expense(&category, &description).is_none() {
                bail!("{} not found in {}", description, category);
            }
        } else {
            let amount = amount.context("--amount is required when adding an expense")?;
            plan.expenses.add_expense(&category, &description, amount)?;
        }
        changed = true;
    }
    if changed {
        store.save_budget(&plan)?;
        info!("budget saved");
    }

    header("📊 Budget");
    let overview = match plan.overview() {
        Ok(overview) => overview,
        Err(e) => {
            println!("⚠️  {}", e);
            return Ok(());
        }
    };

    println!("Monthly salary: {}\n", money(overview.monthly_salary));
    println!(
        "    {:<16} {:>12} {:>12} {:>8} {:>12}",
        "Category", "Spent", "Planned", "Used", "Remaining"
    );
    for row in overview.rows.iter().chain(std::iter::once(&overview.total)) {
        println!(
            "{}  {:<16} {:>12} {:>12} {:>8} {:>12}",
            row.status.icon(),
            row.category,
            money(row.spent),
            money(row.should_spend),
            percent(row.used_percentage),
            money(row.remaining)
        );
    }

    if !overview.unbudgeted.is_empty() {
        println!("\n⚠️  Spending without a goal:");
        for (category, total) in &overview.unbudgeted {
            println!("   {:<16} {:>12}", category, money(*total));
        }
    }
    Ok(())
}

// ============================================================================
// PROJECTIONS
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn run_first_million(
    config: &AppConfig,
    initial: Option<f64>,
    desired: Option<f64>,
    income: Option<f64>,
    rate: Option<f64>,
    monthly: Option<f64>,
    years: Option<u32>,
    save: bool,
) -> Result<()> {
    let store = store(config);
    let saved = store.load_first_million();

    let inputs = if initial.is_some() || desired.is_some() || income.is_some() {
        FirstMillionConfig::new(
            initial.or(saved.as_ref().map(|s| s.initial_amount)).unwrap_or(0.0),
            desired
                .or(saved.as_ref().map(|s| s.desired_amount))
                .unwrap_or(config.projection.target_net_worth),
            income.or(saved.as_ref().map(|s| s.annual_income)).unwrap_or(0.0),
        )?
    } else {
        saved.context("No First Million inputs saved yet; pass --initial, --desired and --income")?
    };
    if save {
        store.save_first_million(Some(&inputs))?;
        println!("💾 Inputs saved");
    }

    let annual_return = rate.map(|r| r / 100.0).unwrap_or(config.projection.annual_return);
    let plan = projection::first_million_plan(&inputs, annual_return)?;

    header("🎯 First Million");
    println!(
        "Start {} → goal {} | income {}/month | return {}",
        money_whole(inputs.initial_amount),
        money_whole(inputs.desired_amount),
        money_whole(inputs.monthly_income),
        percent(annual_return * 100.0)
    );
    println!(
        "Minimum contribution for {} years: {}\n",
        plan.years.first().copied().unwrap_or_default(),
        money_whole(plan.minimum_contribution)
    );

    print!("{:>12}", "Monthly");
    for y in &plan.years {
        print!(" {:>14}", format!("{} years", y));
    }
    println!();
    for row in &plan.table {
        print!("{:>12}", money_whole(row.contribution));
        for (_, value) in &row.values {
            let marker = if *value >= inputs.desired_amount { "✓" } else { " " };
            print!(" {:>13}{}", money_whole(*value), marker);
        }
        println!();
    }

    if let Some(monthly) = monthly {
        println!();
        match projection::time_to_goal(inputs.initial_amount, monthly, annual_return, inputs.desired_amount) {
            Some(t) => println!(
                "⏱️  Investing {}/month reaches the goal in {} years and {} months ({} invested, {} interest)",
                money_whole(monthly),
                t.years,
                t.months,
                money_whole(t.total_invested),
                money_whole(t.total_interest)
            ),
            None => println!("⏱️  Investing {}/month does not reach the goal within 100 years", money_whole(monthly)),
        }
    }

    if let Some(years) = years {
        let required =
            projection::required_monthly_investment(inputs.initial_amount, years, annual_return, inputs.desired_amount)?;
        println!(
            "\n📅 To get there in {} years invest {}/month ({} invested, {} interest)",
            years,
            money(required.monthly_payment.max(0.0)),
            money_whole(required.total_invested),
            money_whole(required.total_interest)
        );
    }
    Ok(())
}

fn run_compound(
    initial: f64,
    rate: f64,
    period: u32,
    monthly: f64,
    monthly_rate: bool,
    years: bool,
) -> Result<()> {
    let basis = if monthly_rate { RateBasis::Monthly } else { RateBasis::Annual };
    let unit = if years { PeriodUnit::Years } else { PeriodUnit::Months };
    let rows = projection::compound_interest(initial, rate / 100.0, period, monthly, basis, unit)?;

    header("📈 Compound interest");
    let Some(last) = rows.last() else {
        println!("Period must be at least one month");
        return Ok(());
    };

    println!(
        "{:>6} {:>16} {:>16} {:>16}",
        "Month", "Invested", "Interest", "Total"
    );
    // Yearly checkpoints plus the final month
    for row in rows.iter().filter(|r| r.month % 12 == 0 || r.month == last.month) {
        println!(
            "{:>6} {:>16} {:>16} {:>16}",
            row.month,
            money(row.total_invested),
            money(row.interest),
            money(row.total_amount)
        );
    }
    println!(
        "\n💰 Final amount {} ({} invested, {} interest)",
        money(last.total_amount),
        money(last.total_invested),
        money(last.interest)
    );
    Ok(())
}

// ============================================================================
// MARKET DATA
// ============================================================================

async fn run_search(config: &AppConfig, query: &str) -> Result<()> {
    let client = CoinGeckoClient::new(&config.coingecko)?;
    let hits = client.search(query).await?;

    header(&format!("🔎 Coins matching '{}'", query));
    if hits.is_empty() {
        println!("No coins found");
    }
    for hit in hits.iter().take(15) {
        let rank = hit.market_cap_rank.map(|r| format!("#{}", r)).unwrap_or_else(|| "-".to_string());
        println!("{:>6}  {:<10} {:<28} id: {}", rank, hit.symbol.to_uppercase(), hit.name, hit.id);
    }
    Ok(())
}

async fn run_market_cap_of(config: &AppConfig, coin: &str, reference: &str, vs: &str) -> Result<()> {
    let client = CoinGeckoClient::new(&config.coingecko)?;
    let conn = ledger(config)?;

    let (a, b) = match tokio::try_join!(client.coin(coin, vs), client.coin(reference, vs)) {
        Ok(pair) => pair,
        Err(e) => {
            for id in [coin, reference] {
                if let Some(cached) = db::get_cached_price(&conn, id, vs)? {
                    println!(
                        "💾 Last known {} price: {} {} ({})",
                        id,
                        cached.price,
                        vs.to_uppercase(),
                        cached.fetched_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
            }
            return Err(e.into());
        }
    };

    let a = CoinSnapshot::try_from(&a)?;
    let b = CoinSnapshot::try_from(&b)?;
    for snapshot in [&a, &b] {
        if let Err(e) = db::save_cached_price(&conn, &snapshot.id, vs, snapshot.price) {
            warn!(error = %e, coin = %snapshot.id, "failed to cache price");
        }
    }

    let result = crypto::market_cap_of(&a, &b)?;
    header(&format!("🪙 {} with the market cap of {}", a.symbol, b.symbol));
    println!("{:<10} price {:>16}  market cap {:>22}", a.symbol, money(a.price), money_whole(a.market_cap));
    println!("{:<10} price {:>16}  market cap {:>22}", b.symbol, money(b.price), money_whole(b.market_cap));
    println!(
        "\n💡 {} would be worth {} ({:.2}x, {})",
        a.symbol,
        money(result.hypothetical_price),
        result.multiplier,
        percent(result.upside_percent())
    );
    Ok(())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

async fn run_roi(
    config: &AppConfig,
    coins: &[String],
    from: NaiveDate,
    to: Option<NaiveDate>,
    as_percentage: bool,
    vs: &str,
) -> Result<()> {
    let today = Utc::now().date_naive();
    let to = to.unwrap_or(today);
    if from >= to {
        bail!("--from must be before --to");
    }
    let days = (today - from).num_days().max(1) as u32 + 1;
    let client = CoinGeckoClient::new(&config.coingecko)?;

    header(&format!("📊 ROI from {} to {}", from, to));
    let mut histories: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
    let mut genesis = Vec::new();
    for id in coins {
        let details = client.coin(id, vs).await?;
        genesis.push(details.genesis_date);
        let chart = client.market_chart(id, vs, days).await?;

        let result = crypto::roi(&chart.prices, start_of_day(from), end_of_day(to))?;
        let marker = if result.is_gain() { "🟢" } else { "🔴" };
        println!(
            "{} {:<12} {} → {}  {}",
            marker,
            details.name,
            money(result.start_price),
            money(result.end_price),
            crypto::format_roi(result.roi, as_percentage)
        );
        histories.insert(details.symbol.to_uppercase(), crypto::daily_closes(&chart.prices));
    }

    if let [a, b] = genesis.as_slice() {
        let earliest = crypto::earliest_common_start(*a, *b);
        if from < earliest {
            println!("⚠️  Both coins only exist since {}", earliest);
        }
    }

    if let [(name_a, a), (name_b, b)] = histories.iter().collect::<Vec<_>>().as_slice() {
        if let Some(last) = crypto::price_ratio(a, b).last() {
            println!("\n⚖️  {}/{} price ratio: {:.6}", name_a, name_b, last.value);
        }
        if let Some(Some(corr)) = crypto::correlation_matrix(&histories)
            .get(*name_a)
            .and_then(|row| row.get(*name_b))
        {
            println!("🔗 Price correlation: {:.2}", corr);
        }
    }
    Ok(())
}

async fn run_fund(
    config: &AppConfig,
    tickers: &[String],
    income: Option<f64>,
    range: HistoryRange,
    correlation: bool,
) -> Result<()> {
    let tickers: Vec<String> = if tickers.is_empty() {
        funds::DEFAULT_UNIVERSE
            .iter()
            .flat_map(|(_, tickers)| tickers.iter().map(|t| t.to_string()))
            .collect()
    } else {
        tickers.iter().map(|t| t.trim().to_uppercase()).collect()
    };

    let client = StockClient::new(&config.stocks)?;
    let now = Utc::now();
    let mut quotes = Vec::new();
    let mut returns: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();

    header(&format!("🏢 Funds ({})", range.as_str()));
    println!(
        "{:<8} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Ticker", "Price", "1M %", "6M %", "12M %", "Vol %", "Sharpe", "MaxDD %", "DY %"
    );
    for ticker in &tickers {
        let history = match client.history(&funds::exchange_symbol(ticker), range).await {
            Ok(history) => history,
            Err(e) => {
                warn!(%ticker, error = %e, "skipping fund");
                println!("{:<8} ⚠️  {}", ticker, e);
                continue;
            }
        };

        let metrics = FundMetrics::from_history(&history.close_values(), funds::DEFAULT_RISK_FREE_RATE);
        let sector = funds::sector_of(ticker).unwrap_or("Other");
        let quote = FundQuote::from_history(ticker, sector, &history, now);
        let fmt = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
        println!(
            "{:<8} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8.2} {:>8.2}",
            ticker,
            money(quote.price),
            fmt(metrics.return_1m),
            fmt(metrics.return_6m),
            fmt(metrics.return_12m),
            fmt(metrics.volatility_total),
            fmt(metrics.sharpe_total),
            metrics.max_drawdown * 100.0,
            quote.dividend_yield_12m
        );

        returns.insert(ticker.clone(), funds::return_series(&history.closes));
        quotes.push(quote);
    }

    if correlation && returns.len() > 1 {
        println!("\n🔗 Correlation of daily returns");
        let matrix = crypto::correlation_matrix(&returns);
        print!("{:<8}", "");
        for name in matrix.keys() {
            print!(" {:>8}", name);
        }
        println!();
        for (name, row) in &matrix {
            print!("{:<8}", name);
            for value in row.values() {
                match value {
                    Some(v) => print!(" {:>8.2}", v),
                    None => print!(" {:>8}", "-"),
                }
            }
            println!();
        }
    }

    if let Some(income) = income {
        println!("\n💸 Plan for {}/month split across {} funds", money(income), quotes.len());
        println!(
            "{:<16} {:<8} {:>10} {:>8} {:>10} {:>16}",
            "Sector", "Ticker", "Price", "DY %", "Shares", "Investment"
        );
        let rows = funds::income_plan(&quotes, income);
        for row in &rows {
            println!(
                "{:<16} {:<8} {:>10} {:>8.2} {:>10} {:>16}",
                row.sector,
                row.ticker,
                money(row.price),
                row.dividend_yield_12m,
                row.required_shares,
                money(row.required_investment)
            );
        }
        let total: f64 = rows.iter().map(|r| r.required_investment).sum();
        println!("\n💰 Total investment: {}", money(total));
    }
    Ok(())
}

// ============================================================================
// DEMO & TUI
// ============================================================================

/// Current-month ledger entries matching the demo budget
fn demo_transactions(state: &DashboardState) -> Result<Vec<Transaction>> {
    let today = Local::now().date_naive();
    let mut transactions = vec![Transaction::new(
        state.budget.monthly_salary,
        TransactionType::Income,
        "Salary",
        Some("Monthly salary".to_string()),
    )?
    .with_date(today)];

    for (category, items) in state.budget.expenses.categories() {
        for (description, amount) in items {
            transactions.push(
                Transaction::new(*amount, TransactionType::Expense, category.clone(), Some(description.clone()))?
                    .with_date(today),
            );
        }
    }
    Ok(transactions)
}

fn run_demo(config: &AppConfig, force: bool) -> Result<()> {
    let store = store(config);
    if store.dir().join(ASSETS_FILE).exists() && !force {
        bail!(
            "Data already exists in {}; pass --force to overwrite it",
            store.dir().display()
        );
    }

    let state = DashboardState::demo();
    store.save_state(&state)?;
    println!("✅ Demo state saved to {}", store.dir().display());

    let conn = ledger(config)?;
    let inserted = db::insert_transactions(&conn, &demo_transactions(&state)?)?;
    println!("✅ {} demo transactions added to the ledger", inserted);

    let summary = state.balance_sheet.summary();
    println!("\n💎 Net worth: {}", money(summary.net_worth));
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let state = store(config).load_state();
    let conn = ledger(config)?;
    let transactions = db::get_all_transactions(&conn)?;
    info!(transactions = transactions.len(), "starting TUI");

    let mut app = ui::App::new(state, transactions, config.projection.clone());
    ui::run_ui(&mut app)?;

    println!("✅ Dashboard closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin dashboard-server --features server");
    std::process::exit(1);
}
