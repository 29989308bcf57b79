// 🗄️ Ledger - SQLite store for income/expense transactions, the audit trail
// and the last known market prices

use crate::budget::MonthlySummary;
use crate::entities::{Transaction, TransactionType};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Event for audit trail (every change to the ledger is recorded)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Last price seen for a coin, used when the provider is unreachable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPrice {
    pub coin_id: String,
    pub vs_currency: String,
    pub price: f64,
    pub fetched_at: DateTime<Utc>,
}

/// Open (or create) the ledger file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;
    setup_database(&conn)?;
    debug!(path = %path.display(), "ledger ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_uuid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            category TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            description TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Audit trail
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS price_cache (
            coin_id TEXT NOT NULL,
            vs_currency TEXT NOT NULL,
            price REAL NOT NULL,
            fetched_at TEXT NOT NULL,
            PRIMARY KEY (coin_id, vs_currency)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_date ON transactions(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_kind ON transactions(kind)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One line of an import file; headers match in either case
#[derive(Debug, Deserialize)]
struct CsvTransaction {
    #[serde(alias = "Date")]
    date: String,
    #[serde(rename = "type", alias = "Type")]
    kind: String,
    #[serde(alias = "Category")]
    category: String,
    #[serde(alias = "Amount")]
    amount: f64,
    #[serde(default, alias = "Description")]
    description: Option<String>,
}

impl CsvTransaction {
    fn into_transaction(self) -> Result<Transaction> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", self.date))?;
        let kind: TransactionType = self.kind.parse()?;
        Ok(Transaction::new(self.amount, kind, self.category.trim(), self.description)?.with_date(date))
    }
}

/// Read transactions from a CSV with date, type, category, amount, description columns
pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut transactions = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row: CsvTransaction =
            result.with_context(|| format!("Failed to deserialize transaction on line {}", line))?;
        let tx = row
            .into_transaction()
            .with_context(|| format!("Invalid transaction on line {}", line))?;
        transactions.push(tx);
    }

    Ok(transactions)
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Insert transactions, skipping ones already in the ledger
///
/// Returns the number of rows actually inserted.
pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for tx in transactions {
        let hash = tx.compute_idempotency_hash();

        let result = conn.execute(
            "INSERT INTO transactions (
                tx_uuid, idempotency_hash, date, kind, category, amount, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tx.id,
                hash,
                tx.date.format(DATE_FORMAT).to_string(),
                tx.kind.as_str(),
                tx.category,
                tx.amount,
                tx.description,
            ],
        );

        match result {
            Ok(_) => {
                inserted += 1;

                let event = Event::new(
                    "transaction_added",
                    "transaction",
                    &tx.id,
                    serde_json::json!({
                        "kind": tx.kind,
                        "amount": tx.amount,
                        "category": tx.category,
                        "date": tx.date,
                    }),
                    "ledger",
                );
                if let Err(e) = insert_event(conn, &event) {
                    warn!(error = %e, tx = %tx.id, "failed to record audit event");
                }
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                debug!(date = %tx.date, category = %tx.category, "duplicate transaction skipped");
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(inserted, duplicates, "transactions stored");
    Ok(inserted)
}

/// Parse a TEXT column, reporting failures as a conversion error on that column
fn parse_column<T, E, F>(index: usize, value: String, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> std::result::Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    parse(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: parse_column(1, row.get(1)?, |s| NaiveDate::parse_from_str(s, DATE_FORMAT))?,
        kind: parse_column(2, row.get(2)?, |s| s.parse::<TransactionType>())?,
        category: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
    })
}

const SELECT_TRANSACTIONS: &str =
    "SELECT tx_uuid, date, kind, category, amount, description FROM transactions";

fn query_transactions<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let transactions = stmt
        .query_map(params, transaction_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(transactions)
}

/// Newest first
pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!("{} ORDER BY date DESC, id DESC", SELECT_TRANSACTIONS),
        [],
    )
}

pub fn get_transactions_by_kind(conn: &Connection, kind: TransactionType) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!("{} WHERE kind = ?1 ORDER BY date DESC, id DESC", SELECT_TRANSACTIONS),
        params![kind.as_str()],
    )
}

/// Inclusive on both ends
pub fn get_transactions_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "{} WHERE date >= ?1 AND date <= ?2 ORDER BY date DESC, id DESC",
            SELECT_TRANSACTIONS
        ),
        params![from.format(DATE_FORMAT).to_string(), to.format(DATE_FORMAT).to_string()],
    )
}

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let tx = conn
        .query_row(
            &format!("{} WHERE tx_uuid = ?1", SELECT_TRANSACTIONS),
            params![id],
            transaction_from_row,
        )
        .optional()?;
    Ok(tx)
}

/// Returns false when no transaction has that id
pub fn delete_transaction(conn: &Connection, id: &str) -> Result<bool> {
    let Some(tx) = get_transaction(conn, id)? else {
        return Ok(false);
    };

    conn.execute("DELETE FROM transactions WHERE tx_uuid = ?1", params![id])?;
    insert_event(
        conn,
        &Event::new(
            "transaction_deleted",
            "transaction",
            id,
            serde_json::to_value(&tx)?,
            "ledger",
        ),
    )?;
    info!(tx = id, "transaction deleted");
    Ok(true)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    Ok(count)
}

/// Income and expenses per `YYYY-MM`, oldest first
pub fn monthly_summary(conn: &Connection) -> Result<Vec<MonthlySummary>> {
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', date) AS month,
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount END), 0)
         FROM transactions
         GROUP BY month
         ORDER BY month",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let income: f64 = row.get(1)?;
            let expenses: f64 = row.get(2)?;
            Ok(MonthlySummary {
                month: row.get(0)?,
                income,
                expenses,
                net: income - expenses,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_column(1, row.get(1)?, |s| {
                    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
                })?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: parse_column(5, row.get(5)?, |s| serde_json::from_str::<serde_json::Value>(s))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

// ============================================================================
// PRICE CACHE
// ============================================================================

pub fn save_cached_price(conn: &Connection, coin_id: &str, vs_currency: &str, price: f64) -> Result<()> {
    conn.execute(
        "INSERT INTO price_cache (coin_id, vs_currency, price, fetched_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(coin_id, vs_currency)
         DO UPDATE SET price = excluded.price, fetched_at = excluded.fetched_at",
        params![coin_id, vs_currency.to_lowercase(), price, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn get_cached_price(conn: &Connection, coin_id: &str, vs_currency: &str) -> Result<Option<CachedPrice>> {
    let cached = conn
        .query_row(
            "SELECT coin_id, vs_currency, price, fetched_at FROM price_cache
             WHERE coin_id = ?1 AND vs_currency = ?2",
            params![coin_id, vs_currency.to_lowercase()],
            |row| {
                Ok(CachedPrice {
                    coin_id: row.get(0)?,
                    vs_currency: row.get(1)?,
                    price: row.get(2)?,
                    fetched_at: parse_column(3, row.get(3)?, |s| {
                        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
                    })?,
                })
            },
        )
        .optional()?;
    Ok(cached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ledger() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn tx(amount: f64, kind: TransactionType, category: &str, date: &str) -> Transaction {
        Transaction::new(amount, kind, category, Some(format!("{} {}", category, date)))
            .unwrap()
            .with_date(NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap())
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(5000.0, TransactionType::Income, "Salary", "2024-01-05"),
            tx(1200.0, TransactionType::Expense, "Housing", "2024-01-10"),
            tx(300.0, TransactionType::Expense, "Food", "2024-02-03"),
            tx(5000.0, TransactionType::Income, "Salary", "2024-02-05"),
        ]
    }

    #[test]
    fn test_idempotency_import_twice() {
        let conn = ledger();
        let transactions = sample();

        let inserted1 = insert_transactions(&conn, &transactions).unwrap();
        let count1 = verify_count(&conn).unwrap();

        // Same values with fresh ids are still duplicates
        let reimport: Vec<Transaction> = transactions
            .iter()
            .map(|t| {
                Transaction::new(t.amount, t.kind, t.category.clone(), t.description.clone())
                    .unwrap()
                    .with_date(t.date)
            })
            .collect();
        let inserted2 = insert_transactions(&conn, &reimport).unwrap();
        let count2 = verify_count(&conn).unwrap();

        assert_eq!(inserted1, 4, "First import should insert 4 transactions");
        assert_eq!(count1, 4);
        assert_eq!(inserted2, 0, "Second import should insert 0 transactions (all duplicates)");
        assert_eq!(count2, 4);
    }

    #[test]
    fn test_round_trip_and_ordering() {
        let conn = ledger();
        let transactions = sample();
        insert_transactions(&conn, &transactions).unwrap();

        let all = get_all_transactions(&conn).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], transactions[3]);
        assert_eq!(all[3].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_filters() {
        let conn = ledger();
        insert_transactions(&conn, &sample()).unwrap();

        let income = get_transactions_by_kind(&conn, TransactionType::Income).unwrap();
        assert_eq!(income.len(), 2);
        assert!(income.iter().all(|t| t.is_income()));

        let january = get_transactions_between(
            &conn,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(january.len(), 2);
    }

    #[test]
    fn test_delete_records_event() {
        let conn = ledger();
        let transactions = sample();
        insert_transactions(&conn, &transactions).unwrap();
        let id = transactions[1].id.clone();

        assert!(delete_transaction(&conn, &id).unwrap());
        assert!(!delete_transaction(&conn, &id).unwrap());
        assert_eq!(verify_count(&conn).unwrap(), 3);

        let events = get_events_for_entity(&conn, "transaction", &id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "transaction_deleted");
        assert_eq!(events[1].event_type, "transaction_added");
    }

    #[test]
    fn test_monthly_summary() {
        let conn = ledger();
        insert_transactions(&conn, &sample()).unwrap();

        let months = monthly_summary(&conn).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[0].income, 5000.0);
        assert_eq!(months[0].expenses, 1200.0);
        assert_eq!(months[0].net, 3800.0);
        assert_eq!(months[1].net, 4700.0);
    }

    #[test]
    fn test_price_cache_upsert() {
        let conn = ledger();
        assert!(get_cached_price(&conn, "bitcoin", "usd").unwrap().is_none());

        save_cached_price(&conn, "bitcoin", "USD", 60000.0).unwrap();
        save_cached_price(&conn, "bitcoin", "usd", 61000.0).unwrap();

        let cached = get_cached_price(&conn, "bitcoin", "usd").unwrap().unwrap();
        assert_eq!(cached.price, 61000.0);
        assert_eq!(cached.vs_currency, "usd");
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,type,category,amount,description").unwrap();
        writeln!(file, "2024-03-01,income,Salary,5000,March salary").unwrap();
        writeln!(file, "2024-03-02,Expense,Food,42.5,").unwrap();
        file.flush().unwrap();

        let transactions = load_csv(file.path()).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].kind, TransactionType::Income);
        assert_eq!(transactions[1].amount, 42.5);
        assert!(transactions[1].description.is_none());
    }

    #[test]
    fn test_load_csv_rejects_negative_amount() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,type,category,amount,description").unwrap();
        writeln!(file, "2024-03-01,expense,Food,-5,oops").unwrap();
        file.flush().unwrap();

        let err = load_csv(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
