use finance_dashboard::config::ProviderConfig;
use finance_dashboard::error::DashboardError;
use finance_dashboard::market::crypto::{self, CoinSnapshot};
use finance_dashboard::market::CoinGeckoClient;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn settings(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        base_url: server.base_url(),
        max_retries: 2,
        retry_base_delay_ms: 1,
        timeout_secs: 5,
        ..ProviderConfig::default()
    }
}

fn coin_body(id: &str, symbol: &str, price: f64, cap: f64) -> serde_json::Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": id,
        "genesis_date": null,
        "market_data": {
            "current_price": {"usd": price},
            "market_cap": {"usd": cap}
        }
    })
}

#[tokio::test]
async fn test_search_is_cached() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/search").query_param("query", "btc");
            then.status(200).json_body(json!({
                "coins": [{"id": "bitcoin", "name": "Bitcoin", "symbol": "BTC", "market_cap_rank": 1}]
            }));
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let first = client.search("btc").await.unwrap();
    let second = client.search("  btc ").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_empty_search_skips_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(json!({"coins": []}));
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    assert!(client.search("   ").await.unwrap().is_empty());
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_rate_limit_retries_then_fails() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(429);
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let err = client.coin("bitcoin", "usd").await.unwrap_err();

    match err {
        DashboardError::RateLimited { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected rate limit error, got {:?}", other),
    }
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/nope");
            then.status(404).body(r#"{"error":"coin not found"}"#);
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let err = client.coin("nope", "usd").await.unwrap_err();

    assert!(matches!(err, DashboardError::Api { status: 404, .. }));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/coins/ethereum")
                .header("x-cg-demo-api-key", "demo-key");
            then.status(200).json_body(coin_body("ethereum", "eth", 3000.0, 3.6e11));
        })
        .await;

    let config = ProviderConfig {
        api_key: Some("demo-key".to_string()),
        ..settings(&server)
    };
    let client = CoinGeckoClient::new(&config).unwrap();
    let coin = client.coin("ethereum", "usd").await.unwrap();

    assert_eq!(coin.current_price, Some(3000.0));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_market_cap_of_from_live_responses() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/ethereum");
            then.status(200).json_body(coin_body("ethereum", "eth", 3000.0, 3.6e11));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(200).json_body(coin_body("bitcoin", "btc", 60000.0, 1.2e12));
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let (eth, btc) = tokio::try_join!(client.coin("ethereum", "usd"), client.coin("bitcoin", "usd")).unwrap();
    let eth = CoinSnapshot::try_from(&eth).unwrap();
    let btc = CoinSnapshot::try_from(&btc).unwrap();

    let result = crypto::market_cap_of(&eth, &btc).unwrap();
    assert!((result.hypothetical_price - 10000.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_market_chart_requests_daily_interval_for_long_ranges() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/coins/bitcoin/market_chart")
                .query_param("vs_currency", "usd")
                .query_param("days", "365")
                .query_param("interval", "daily");
            then.status(200).json_body(json!({
                "prices": [[1704067200000.0, 42000.0], [1704153600000.0, 46200.0]],
                "market_caps": [],
                "total_volumes": []
            }));
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let chart = client.market_chart("bitcoin", "usd", 365).await.unwrap();

    assert_eq!(chart.prices.len(), 2);
    let roi = crypto::roi(&chart.prices, chart.prices[0].timestamp, chart.prices[1].timestamp).unwrap();
    assert!((roi.roi - 1.1).abs() < 1e-9);
    mock.assert_async().await;
}

/// Waits until `mock` has been hit, then swaps it for one answering 200
async fn recover_after_first_hit(server: &MockServer, mut failing: httpmock::Mock<'_>) {
    while failing.hits_async().await == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    failing.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(200).json_body(coin_body("bitcoin", "btc", 60000.0, 1.2e12));
        })
        .await;
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(503);
        })
        .await;

    // Backoff leaves room to swap the mock before the retry goes out
    let config = ProviderConfig {
        retry_base_delay_ms: 500,
        ..settings(&server)
    };
    let client = CoinGeckoClient::new(&config).unwrap();
    let (coin, _) = tokio::join!(
        client.coin("bitcoin", "usd"),
        recover_after_first_hit(&server, failing)
    );

    assert_eq!(coin.unwrap().current_price, Some(60000.0));
}

#[tokio::test]
async fn test_server_error_exhausts_retries_as_api_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(502).body("bad gateway");
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    let err = client.coin("bitcoin", "usd").await.unwrap_err();

    assert!(matches!(err, DashboardError::Api { status: 502, .. }));
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_retry_after_header_overrides_backoff() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(429).header("Retry-After", "0");
        })
        .await;

    // Without the header each retry would wait a minute or more
    let config = ProviderConfig {
        retry_base_delay_ms: 60_000,
        ..settings(&server)
    };
    let client = CoinGeckoClient::new(&config).unwrap();
    let err = tokio::time::timeout(Duration::from_secs(10), client.coin("bitcoin", "usd"))
        .await
        .expect("Retry-After: 0 should retry immediately")
        .unwrap_err();

    assert!(matches!(err, DashboardError::RateLimited { attempts: 3, .. }));
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_rate_limit_recovers_after_retry_after() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin");
            then.status(429).header("Retry-After", "1");
        })
        .await;

    let config = ProviderConfig {
        retry_base_delay_ms: 60_000,
        ..settings(&server)
    };
    let client = CoinGeckoClient::new(&config).unwrap();
    let (coin, _) = tokio::time::timeout(
        Duration::from_secs(10),
        async { tokio::join!(client.coin("bitcoin", "usd"), recover_after_first_hit(&server, failing)) },
    )
    .await
    .expect("retry should follow Retry-After, not the long backoff");

    assert_eq!(coin.unwrap().current_price, Some(60000.0));
}

#[tokio::test]
async fn test_coin_id_with_path_characters_is_rejected_without_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).json_body(json!({}));
        })
        .await;

    let client = CoinGeckoClient::new(&settings(&server)).unwrap();
    for id in ["bitcoin/tickers", "../search", "bitcoin?x=1", ".."] {
        let err = client.coin(id, "usd").await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)), "{} was not rejected", id);
        let err = client.market_chart(id, "usd", 30).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)), "{} was not rejected", id);
    }
    mock.assert_hits_async(0).await;
}
