use chrono::{TimeZone, Utc};
use finance_dashboard::config::ProviderConfig;
use finance_dashboard::error::DashboardError;
use finance_dashboard::market::funds::{self, FundMetrics, FundQuote};
use finance_dashboard::market::{HistoryRange, StockClient};
use httpmock::prelude::*;
use serde_json::{json, Map, Value};

const NOW: i64 = 1_717_200_000; // 2024-06-01T00:00:00Z
const DAY: i64 = 86_400;

fn settings(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        base_url: server.base_url(),
        max_retries: 1,
        retry_base_delay_ms: 1,
        timeout_secs: 5,
        ..ProviderConfig::default()
    }
}

/// Thirty trading days rising 1 per day, twelve monthly dividends of 1.0 and one stale one
fn chart_body() -> Value {
    let timestamps: Vec<i64> = (0..30).map(|i| NOW - (30 - i) * DAY).collect();
    let closes: Vec<Value> = (0..30)
        .map(|i| if i == 10 { Value::Null } else { json!(90.0 + i as f64) })
        .collect();

    let mut dividends = Map::new();
    for k in 1..=12 {
        let date = NOW - k * 30 * DAY;
        dividends.insert(date.to_string(), json!({"amount": 1.0, "date": date}));
    }
    let stale = NOW - 400 * DAY;
    dividends.insert(stale.to_string(), json!({"amount": 50.0, "date": stale}));

    json!({
        "chart": {
            "result": [{
                "meta": {"currency": "BRL", "regularMarketPrice": 100.0},
                "timestamp": timestamps,
                "indicators": {"quote": [{"close": closes}]},
                "events": {"dividends": dividends}
            }],
            "error": null
        }
    })
}

#[tokio::test]
async fn test_history_and_fund_quote() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v8/finance/chart/HGLG11.SA")
                .query_param("range", "1y")
                .query_param("interval", "1d")
                .query_param("events", "div");
            then.status(200).json_body(chart_body());
        })
        .await;

    let client = StockClient::new(&settings(&server)).unwrap();
    let history = client
        .history(&funds::exchange_symbol("hglg11"), HistoryRange::OneYear)
        .await
        .unwrap();
    mock.assert_async().await;

    // The null close is dropped
    assert_eq!(history.closes.len(), 29);
    assert_eq!(history.dividends.len(), 13);
    assert_eq!(history.last_price(), Some(100.0));

    let now = Utc.timestamp_opt(NOW, 0).unwrap();
    let quote = FundQuote::from_history("HGLG11", "Logistics", &history, now);
    assert!((quote.dividend_yield_12m - 12.0).abs() < 1e-9);

    let plan = funds::income_plan(&[quote], 100.0);
    assert_eq!(plan.len(), 1);
    assert!((100..=101).contains(&plan[0].required_shares));

    let metrics = FundMetrics::from_history(&history.close_values(), funds::DEFAULT_RISK_FREE_RATE);
    assert!(metrics.return_12m.is_none());
    assert!(metrics.return_1m.is_some());
    assert_eq!(metrics.max_drawdown, 0.0);
    assert_eq!(metrics.consistency.negative_days, 0);
}

#[tokio::test]
async fn test_unknown_symbol_is_an_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v8/finance/chart/NOPE11.SA");
            then.status(404).json_body(json!({
                "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
            }));
        })
        .await;

    let client = StockClient::new(&settings(&server)).unwrap();
    let err = client
        .history(&funds::exchange_symbol("NOPE11"), HistoryRange::OneMonth)
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_blank_symbol_is_rejected_without_request() {
    let server = MockServer::start_async().await;
    let client = StockClient::new(&settings(&server)).unwrap();
    let err = client.history("  ", HistoryRange::OneYear).await.unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_symbol_with_path_characters_is_rejected_without_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).json_body(chart_body());
        })
        .await;

    let client = StockClient::new(&settings(&server)).unwrap();
    for symbol in ["../v7/finance/quote", "HGLG11.SA?range=max", "HGLG11/.SA"] {
        let err = client.history(symbol, HistoryRange::OneYear).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)), "{} was not rejected", symbol);
    }
    mock.assert_hits_async(0).await;
}
