use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::cache::{CacheKey, CacheOperation, CacheStore};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::sources::{
    MarketVolumeSource, RequestPacer, ShortInterestSource, SourceError, VolumePoint, VolumeSeries,
};
use crate::{ShortInterestSnapshot, Symbol, TradingDate};

/// Query host for chart and quote-summary calls.
pub const YAHOO_QUERY_BASE_URL: &str = "https://query1.finance.yahoo.com";

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const SESSION_TTL: Duration = Duration::from_secs(3_600);
const DEFAULT_PADDING_DAYS: u32 = 10;

// ============================================================================
// Session - cookie/crumb handshake for quote-summary calls
// ============================================================================

#[derive(Debug, Clone)]
struct Crumb {
    value: String,
    fetched_at: Instant,
}

/// Cookie and crumb required by the quote-summary endpoint.
///
/// The session cookie lives in the HTTP client's cookie jar; this type only
/// tracks the crumb and when it was obtained.
pub struct YahooSession {
    http_client: Arc<dyn HttpClient>,
    cookie_url: String,
    crumb_urls: Vec<String>,
    crumb: tokio::sync::Mutex<Option<Crumb>>,
    ttl: Duration,
}

impl YahooSession {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            cookie_url: COOKIE_URL.to_owned(),
            crumb_urls: CRUMB_URLS.iter().map(|url| (*url).to_owned()).collect(),
            crumb: tokio::sync::Mutex::new(None),
            ttl: SESSION_TTL,
        }
    }

    /// Points the handshake at other hosts (used by offline tests).
    pub fn with_endpoints(mut self, cookie_url: impl Into<String>, crumb_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self.crumb_urls = vec![crumb_url.into()];
        self
    }

    /// Cached crumb, refreshed when missing or older than the session TTL.
    pub async fn crumb(&self) -> Result<String, SourceError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            if crumb.fetched_at.elapsed() < self.ttl {
                return Ok(crumb.value.clone());
            }
        }

        let value = self.refresh().await?;
        *guard = Some(Crumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Forget the crumb; the next call performs a fresh handshake.
    pub async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }

    async fn refresh(&self) -> Result<String, SourceError> {
        // Only the Set-Cookie header matters here; the status is often 404.
        let cookie_request = HttpRequest::get(self.cookie_url.clone())
            .with_header("referer", REFERER)
            .with_timeout_ms(DEFAULT_TIMEOUT_MS);
        self.http_client
            .execute(cookie_request)
            .await
            .map_err(|e| SourceError::unavailable(format!("yahoo cookie fetch failed: {}", e.message())))?;

        for endpoint in &self.crumb_urls {
            let crumb_request = HttpRequest::get(endpoint.clone())
                .with_header("referer", REFERER)
                .with_timeout_ms(DEFAULT_TIMEOUT_MS);

            let response = match self.http_client.execute(crumb_request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) if response.status == 429 => {
                    return Err(SourceError::rate_limited("yahoo rate limited the crumb request"));
                }
                _ => continue,
            };

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited("yahoo rate limited the crumb request"));
            }
            let plausible = !body.is_empty()
                && body.len() < 100
                && !body.contains(char::is_whitespace)
                && !body.contains('<');
            if plausible {
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::unavailable("failed to obtain a yahoo crumb from any endpoint"))
    }
}

// ============================================================================
// Market volume - daily chart
// ============================================================================

/// Daily consolidated volume from the chart endpoint.
#[derive(Clone)]
pub struct YahooMarketVolume {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
    pacer: RequestPacer,
    base_url: String,
    timeout_ms: u64,
    padding_days: u32,
}

impl YahooMarketVolume {
    pub fn new(http_client: Arc<dyn HttpClient>, cache: CacheStore) -> Self {
        Self {
            http_client,
            cache,
            pacer: RequestPacer::unlimited(),
            base_url: YAHOO_QUERY_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            padding_days: DEFAULT_PADDING_DAYS,
        }
    }

    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Extra calendar days requested beyond the lookback.
    pub fn with_padding_days(mut self, padding_days: u32) -> Self {
        self.padding_days = padding_days;
        self
    }

    pub fn chart_url(&self, symbol: &Symbol, lookback_days: u32, as_of: TradingDate) -> String {
        let start = as_of
            .minus_days(lookback_days.saturating_add(self.padding_days))
            .unix_timestamp();
        // period2 is exclusive; include the whole as-of session.
        let end = as_of.unix_timestamp() + 86_400;
        format!(
            "{}/v8/finance/chart/{}?period1={start}&period2={end}&interval=1d&events=history",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
        )
    }

    async fn fetch(
        &self,
        symbol: &Symbol,
        lookback_days: u32,
        as_of: TradingDate,
    ) -> Result<VolumeSeries, SourceError> {
        if lookback_days == 0 {
            return Err(SourceError::invalid_request("lookback must be at least one day"));
        }

        let key = CacheKey::new(CacheOperation::MarketVolume, symbol)
            .with_window(format!("{lookback_days}:{as_of}"));
        if let Some(series) = self.cache.get::<VolumeSeries>(&key).await {
            return Ok(series);
        }

        self.pacer.ready().await;
        let request = HttpRequest::get(self.chart_url(symbol, lookback_days, as_of))
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|e| {
            SourceError::unavailable(format!("yahoo chart transport error: {}", e.message()))
        })?;
        if !response.is_success() {
            return Err(SourceError::from_status("yahoo chart", response.status));
        }

        let series = parse_chart_volume(&response.body)?;
        if series.is_empty() {
            return Err(SourceError::not_found(format!("no volume history for {symbol}")));
        }

        self.cache.put(key, &series, None).await;
        Ok(series)
    }
}

impl MarketVolumeSource for YahooMarketVolume {
    fn daily_volume<'a>(
        &'a self,
        symbol: &'a Symbol,
        lookback_days: u32,
        as_of: TradingDate,
    ) -> Pin<Box<dyn Future<Output = Result<VolumeSeries, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(symbol, lookback_days, as_of))
    }
}

/// Extracts `(session date, volume)` pairs from a chart payload.
///
/// Timestamps are converted to calendar dates in the exchange's own UTC
/// offset; bars with a null volume are dropped.
fn parse_chart_volume(body: &str) -> Result<VolumeSeries, SourceError> {
    let chart: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error.filter(|error| !error.is_null()) {
        return Err(SourceError::not_found(format!("yahoo chart API error: {error}")));
    }

    let result = chart
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::not_found("no chart data in response"))?;

    let offset = result.meta.map(|meta| meta.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let volumes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.volume)
        .unwrap_or_default();

    let points = timestamps
        .into_iter()
        .zip(volumes)
        .filter_map(|(timestamp, volume)| {
            let volume = volume.filter(|v| v.is_finite() && *v >= 0.0)?;
            let date = TradingDate::from_unix_timestamp(timestamp, offset).ok()?;
            Some(VolumePoint {
                date,
                volume: volume as u64,
            })
        })
        .collect();

    Ok(VolumeSeries::new(points))
}

// ============================================================================
// Short interest - quote summary key statistics
// ============================================================================

/// Short-interest snapshot from the quote-summary `defaultKeyStatistics` module.
#[derive(Clone)]
pub struct YahooShortInterest {
    http_client: Arc<dyn HttpClient>,
    session: Arc<YahooSession>,
    cache: CacheStore,
    pacer: RequestPacer,
    base_url: String,
    timeout_ms: u64,
}

impl YahooShortInterest {
    pub fn new(http_client: Arc<dyn HttpClient>, session: Arc<YahooSession>, cache: CacheStore) -> Self {
        Self {
            http_client,
            session,
            cache,
            pacer: RequestPacer::unlimited(),
            base_url: YAHOO_QUERY_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn summary_url(&self, symbol: &Symbol, crumb: &str) -> String {
        format!(
            "{}/v10/finance/quoteSummary/{}?modules=defaultKeyStatistics&crumb={}",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(crumb),
        )
    }

    async fn request_summary(&self, symbol: &Symbol) -> Result<HttpResponse, SourceError> {
        let crumb = self.session.crumb().await?;
        self.pacer.ready().await;
        let request = HttpRequest::get(self.summary_url(symbol, &crumb))
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);
        self.http_client.execute(request).await.map_err(|e| {
            SourceError::unavailable(format!("yahoo quote summary transport error: {}", e.message()))
        })
    }

    async fn fetch(&self, symbol: &Symbol) -> Result<ShortInterestSnapshot, SourceError> {
        let key = CacheKey::new(CacheOperation::ShortInterest, symbol);
        if let Some(snapshot) = self.cache.get::<ShortInterestSnapshot>(&key).await {
            return Ok(snapshot);
        }

        let mut response = self.request_summary(symbol).await?;

        // A stale crumb shows up as 401 or 429; refresh the session and retry once.
        if response.status == 401 || response.status == 429 {
            self.session.invalidate().await;
            response = self.request_summary(symbol).await?;
        }
        if !response.is_success() {
            return Err(SourceError::from_status("yahoo quote summary", response.status));
        }

        let snapshot = parse_short_interest(&response.body)?;
        self.cache.put(key, &snapshot, None).await;
        Ok(snapshot)
    }
}

impl ShortInterestSource for YahooShortInterest {
    fn snapshot<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ShortInterestSnapshot, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(symbol))
    }
}

/// Absent statistics read as zero, matching how the provider omits fields
/// for instruments it does not track (ETFs have no short float, for example).
fn parse_short_interest(body: &str) -> Result<ShortInterestSnapshot, SourceError> {
    let summary: YahooQuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo quote summary: {e}")))?;

    if let Some(error) = summary.quote_summary.error.filter(|error| !error.is_null()) {
        return Err(SourceError::not_found(format!("yahoo quote summary API error: {error}")));
    }

    let statistics = summary
        .quote_summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|result| result.default_key_statistics)
        .ok_or_else(|| SourceError::not_found("quote summary has no key statistics"))?;

    Ok(ShortInterestSnapshot {
        shares_short: raw_count(statistics.shares_short.as_ref()),
        short_percent_of_float: raw_value(statistics.short_percent_of_float.as_ref()) * 100.0,
        days_to_cover: raw_value(statistics.short_ratio.as_ref()),
        shares_outstanding: raw_count(statistics.shares_outstanding.as_ref()),
        degraded: false,
    })
}

fn raw_value(value: Option<&YahooRawValue>) -> f64 {
    value
        .and_then(|value| value.raw)
        .filter(|raw| raw.is_finite())
        .unwrap_or(0.0)
}

fn raw_count(value: Option<&YahooRawValue>) -> u64 {
    raw_value(value).max(0.0) as u64
}

// ============================================================================
// Response structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooQuoteSummaryData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<YahooQuoteSummaryResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteSummaryResult {
    #[serde(rename = "defaultKeyStatistics", default)]
    default_key_statistics: Option<YahooKeyStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooKeyStatistics {
    #[serde(rename = "sharesShort", default)]
    shares_short: Option<YahooRawValue>,
    #[serde(rename = "shortPercentOfFloat", default)]
    short_percent_of_float: Option<YahooRawValue>,
    #[serde(rename = "shortRatio", default)]
    short_ratio: Option<YahooRawValue>,
    #[serde(rename = "sharesOutstanding", default)]
    shares_outstanding: Option<YahooRawValue>,
}

/// Numeric statistic wrapped with display metadata (`{"raw": 1.5, "fmt": "1.50"}`).
#[derive(Debug, Clone, Deserialize)]
struct YahooRawValue {
    #[serde(default)]
    raw: Option<f64>,
}
