//! Contract tests shared by every upstream adapter.
//!
//! Each adapter is driven through its trait object over a scripted transport:
//! successes honor the trait's data invariants, and every failure surfaces as
//! a classified `SourceError` rather than a panic.

use std::sync::Arc;

use darkflow_core::{
    CacheStore, FinraShortVolumeFeed, HttpError, HttpResponse, MarketVolumeSource,
    ScriptedHttpClient, ShortInterestSource, ShortVolumeFeed, SourceErrorKind, Symbol,
    TradingDate, YahooMarketVolume, YahooSession, YahooShortInterest,
};

const FINRA_CAPITALIZED: &str = "Date|Symbol|ShortVolume|ShortExemptVolume|TotalVolume|Market\n\
    20240308|AAPL|4200000|12000|9000000|B,Q,N\n\
    20240308|TSLA|1500000.75|0|3100000.5|B,Q,N\n";

const FINRA_CAMEL_CASE: &str = "date|symbol|shortVolume|shortExemptVolume|totalVolume|market\n\
    20240307|AAPL|3900000|0|8800000|B,Q,N\n";

// 2024-03-06..08 at 14:30 UTC, exchange offset -5h; the middle bar has no volume.
const CHART: &str = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},
    "timestamp":[1709735400,1709821800,1709908200],
    "indicators":{"quote":[{"volume":[51000000,null,52000000]}]}}],"error":null}}"#;

const SUMMARY: &str = r#"{"quoteSummary":{"result":[{"defaultKeyStatistics":{
    "sharesShort":{"raw":20000000,"fmt":"20M"},
    "shortPercentOfFloat":{"raw":0.215,"fmt":"21.5%"},
    "shortRatio":{"raw":6.1,"fmt":"6.10"}}}],"error":null}}"#;

fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

fn date(value: &str) -> TradingDate {
    TradingDate::parse(value).expect("valid date")
}

// =============================================================================
// Short-volume feed
// =============================================================================

fn finra(client: Arc<ScriptedHttpClient>) -> Box<dyn ShortVolumeFeed> {
    Box::new(FinraShortVolumeFeed::new(client, CacheStore::default()).with_base_url("https://cdn.test"))
}

#[tokio::test]
async fn short_volume_feed_reads_either_header_spelling() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .route("https://cdn.test/CNMSshvol20240308.txt", HttpResponse::ok(FINRA_CAPITALIZED))
            .route("https://cdn.test/CNMSshvol20240307.txt", HttpResponse::ok(FINRA_CAMEL_CASE)),
    );
    let feed = finra(client);

    let friday = feed
        .daily_short_volume(&symbol("AAPL"), date("2024-03-08"))
        .await
        .expect("capitalized header");
    let thursday = feed
        .daily_short_volume(&symbol("AAPL"), date("2024-03-07"))
        .await
        .expect("camel-case header");
    let fractional = feed
        .daily_short_volume(&symbol("TSLA"), date("2024-03-08"))
        .await
        .expect("fractional volumes");

    assert_eq!((friday.short_volume, friday.total_volume), (4_200_000, 9_000_000));
    assert_eq!((thursday.short_volume, thursday.total_volume), (3_900_000, 8_800_000));
    assert_eq!((fractional.short_volume, fractional.total_volume), (1_500_000, 3_100_000));
    for record in [friday, thursday, fractional] {
        assert!(record.short_volume <= record.total_volume);
    }
}

#[tokio::test]
async fn short_volume_feed_classifies_every_failure() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .fail("https://cdn.test/CNMSshvol20240305.txt", HttpError::timeout("request timed out"))
            .fail("https://cdn.test/CNMSshvol20240304.txt", HttpError::new("connection reset"))
            .route("https://cdn.test/CNMSshvol20240301.txt", HttpResponse::with_status(503, ""))
            .route("https://cdn.test/CNMSshvol20240229.txt", HttpResponse::ok("<html>maintenance</html>"))
            .route("https://cdn.test/CNMSshvol20240308.txt", HttpResponse::ok(FINRA_CAPITALIZED)),
    );
    let feed = finra(client);
    let aapl = symbol("AAPL");

    let cases = [
        ("2024-03-05", SourceErrorKind::Unavailable),
        ("2024-03-04", SourceErrorKind::Unavailable),
        ("2024-03-01", SourceErrorKind::Unavailable),
        ("2024-02-29", SourceErrorKind::Malformed),
        ("2024-02-28", SourceErrorKind::NotFound),
        ("2024-03-09", SourceErrorKind::NotFound),
    ];
    for (day, expected) in cases {
        let error = feed
            .daily_short_volume(&aapl, date(day))
            .await
            .expect_err("failure expected");
        assert_eq!(error.kind(), expected, "{day}: {error}");
    }

    let absent = feed
        .daily_short_volume(&symbol("ZZZZ"), date("2024-03-08"))
        .await
        .expect_err("absent symbol");
    assert_eq!(absent.kind(), SourceErrorKind::NotFound);
}

// =============================================================================
// Market-volume source
// =============================================================================

fn chart_source(client: Arc<ScriptedHttpClient>) -> Box<dyn MarketVolumeSource> {
    Box::new(YahooMarketVolume::new(client, CacheStore::default()).with_base_url("https://yahoo.test"))
}

#[tokio::test]
async fn market_volume_series_is_dated_ascending_and_gap_free_of_nulls() {
    let client = Arc::new(
        ScriptedHttpClient::new().route("https://yahoo.test/v8/finance/chart/AAPL", HttpResponse::ok(CHART)),
    );
    let source = chart_source(client.clone());

    let series = source
        .daily_volume(&symbol("AAPL"), 30, date("2024-03-08"))
        .await
        .expect("series");

    let dates = series.points().iter().map(|point| point.date.iso()).collect::<Vec<_>>();
    assert_eq!(dates, vec!["2024-03-06", "2024-03-08"]);
    assert_eq!(series.volume_on(date("2024-03-07")), 0);
    assert_eq!(series.volume_on(date("2024-03-08")), 52_000_000);

    let request = &client.recorded_requests()[0];
    assert!(request.url.contains("interval=1d"));
}

#[tokio::test]
async fn market_volume_source_classifies_every_failure() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .route("https://yahoo.test/v8/finance/chart/AAPL", HttpResponse::with_status(429, ""))
            .route("https://yahoo.test/v8/finance/chart/MSFT", HttpResponse::with_status(500, ""))
            .route("https://yahoo.test/v8/finance/chart/NVDA", HttpResponse::ok("not json"))
            .route(
                "https://yahoo.test/v8/finance/chart/ZZZZ",
                HttpResponse::ok(r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#),
            )
            .route(
                "https://yahoo.test/v8/finance/chart/AMD",
                HttpResponse::ok(r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[]}}],"error":null}}"#),
            )
            .fail("https://yahoo.test/v8/finance/chart/TSLA", HttpError::timeout("request timed out")),
    );
    let source = chart_source(client.clone());
    let as_of = date("2024-03-08");

    let cases = [
        ("AAPL", SourceErrorKind::RateLimited),
        ("MSFT", SourceErrorKind::Unavailable),
        ("NVDA", SourceErrorKind::Malformed),
        ("ZZZZ", SourceErrorKind::NotFound),
        ("AMD", SourceErrorKind::NotFound),
        ("TSLA", SourceErrorKind::Unavailable),
    ];
    for (ticker, expected) in cases {
        let error = source
            .daily_volume(&symbol(ticker), 30, as_of)
            .await
            .expect_err("failure expected");
        assert_eq!(error.kind(), expected, "{ticker}: {error}");
    }

    let before = client.recorded_requests().len();
    let invalid = source
        .daily_volume(&symbol("AAPL"), 0, as_of)
        .await
        .expect_err("zero lookback");
    assert_eq!(invalid.kind(), SourceErrorKind::InvalidRequest);
    assert_eq!(client.recorded_requests().len(), before);
}

// =============================================================================
// Short-interest source
// =============================================================================

fn short_interest_source(client: Arc<ScriptedHttpClient>) -> Box<dyn ShortInterestSource> {
    let session = Arc::new(
        YahooSession::new(client.clone())
            .with_endpoints("https://cookie.test/", "https://yahoo.test/v1/test/getcrumb"),
    );
    Box::new(
        YahooShortInterest::new(client, session, CacheStore::default()).with_base_url("https://yahoo.test"),
    )
}

#[tokio::test]
async fn short_interest_snapshot_defaults_missing_fields_to_zero() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .route("https://cookie.test/", HttpResponse::with_status(404, ""))
            .route("https://yahoo.test/v1/test/getcrumb", HttpResponse::ok("abcDEF123"))
            .route("https://yahoo.test/v10/finance/quoteSummary/GME", HttpResponse::ok(SUMMARY)),
    );
    let source = short_interest_source(client.clone());

    let snapshot = source.snapshot(&symbol("GME")).await.expect("snapshot");

    assert_eq!(snapshot.shares_short, 20_000_000);
    assert!((snapshot.short_percent_of_float - 21.5).abs() < 1e-9);
    assert_eq!(snapshot.days_to_cover, 6.1);
    assert_eq!(snapshot.shares_outstanding, 0);
    assert!(!snapshot.degraded);

    let summary_request = client
        .recorded_requests()
        .into_iter()
        .find(|request| request.url.contains("quoteSummary"))
        .expect("summary requested");
    assert!(summary_request.url.ends_with("crumb=abcDEF123"));
}

#[tokio::test]
async fn rejected_crumb_is_refreshed_exactly_once() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .route("https://cookie.test/", HttpResponse::ok(""))
            .route("https://yahoo.test/v1/test/getcrumb", HttpResponse::ok("crumb1"))
            .route("https://yahoo.test/v10/finance/quoteSummary/GME", HttpResponse::with_status(401, "")),
    );
    let source = short_interest_source(client.clone());

    let error = source.snapshot(&symbol("GME")).await.expect_err("still unauthorized");

    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert_eq!(client.request_count("https://yahoo.test/v10/finance/quoteSummary/"), 2);
    assert_eq!(client.request_count("https://yahoo.test/v1/test/getcrumb"), 2);
}

#[tokio::test]
async fn unusable_crumb_answers_fail_the_handshake() {
    let html = Arc::new(
        ScriptedHttpClient::new()
            .route("https://cookie.test/", HttpResponse::ok(""))
            .route("https://yahoo.test/v1/test/getcrumb", HttpResponse::ok("<html>consent</html>")),
    );
    let throttled = Arc::new(
        ScriptedHttpClient::new()
            .route("https://cookie.test/", HttpResponse::ok(""))
            .route("https://yahoo.test/v1/test/getcrumb", HttpResponse::ok("Too Many Requests")),
    );

    let html_error = short_interest_source(html.clone())
        .snapshot(&symbol("GME"))
        .await
        .expect_err("no crumb");
    let throttled_error = short_interest_source(throttled)
        .snapshot(&symbol("GME"))
        .await
        .expect_err("no crumb");

    assert_eq!(html_error.kind(), SourceErrorKind::Unavailable);
    assert_eq!(throttled_error.kind(), SourceErrorKind::RateLimited);
    assert_eq!(html.request_count("https://yahoo.test/v10/"), 0);
}
