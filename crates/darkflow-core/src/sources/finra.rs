use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::cache::{CacheKey, CacheOperation, CacheStore};
use crate::http_client::{HttpClient, HttpRequest};
use crate::sources::{RequestPacer, ShortVolumeFeed, ShortVolumeRecord, SourceError};
use crate::{Symbol, TradingDate};

/// Directory holding the consolidated daily short-sale volume files.
pub const FINRA_DAILY_BASE_URL: &str = "https://cdn.finra.org/equity/regsho/daily";

const DEFAULT_TIMEOUT_MS: u64 = 3_000;

// Header spellings seen across publication dates, compared case-insensitively.
const SYMBOL_HEADERS: &[&str] = &["symbol"];
const SHORT_VOLUME_HEADERS: &[&str] = &["shortvolume", "short_volume"];
const TOTAL_VOLUME_HEADERS: &[&str] = &["totalvolume", "total_volume"];

/// One parsed line of a daily short-volume file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortVolumeRow {
    pub symbol: String,
    pub short_volume: u64,
    pub total_volume: u64,
}

/// Parses a pipe-delimited daily file.
///
/// The first non-blank line must be a header naming the symbol, short volume
/// and total volume columns, in any position and under either known spelling.
/// Lines that do not parse (trailers, short rows, non-numeric volumes) are
/// skipped.
pub fn parse_short_volume_file(body: &str) -> Result<Vec<ShortVolumeRow>, SourceError> {
    let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| SourceError::malformed("short volume file is empty"))?;
    let columns = header
        .split('|')
        .map(|name| name.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();

    let find = |names: &[&str], label: &str| {
        columns
            .iter()
            .position(|column| names.contains(&column.as_str()))
            .ok_or_else(|| SourceError::malformed(format!("short volume file has no {label} column")))
    };
    let symbol_index = find(SYMBOL_HEADERS, "symbol")?;
    let short_index = find(SHORT_VOLUME_HEADERS, "short volume")?;
    let total_index = find(TOTAL_VOLUME_HEADERS, "total volume")?;

    let rows = lines
        .filter_map(|line| {
            let fields = line.split('|').map(str::trim).collect::<Vec<_>>();
            let symbol = fields.get(symbol_index)?;
            if symbol.is_empty() {
                return None;
            }
            Some(ShortVolumeRow {
                symbol: symbol.to_ascii_uppercase(),
                short_volume: parse_volume(fields.get(short_index)?)?,
                total_volume: parse_volume(fields.get(total_index)?)?,
            })
        })
        .collect();

    Ok(rows)
}

/// Volumes are integral in older files and carry fractional shares in newer
/// ones; fractions are truncated.
fn parse_volume(raw: &str) -> Option<u64> {
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// Short-volume feed backed by the regulator's daily flat files.
#[derive(Clone)]
pub struct FinraShortVolumeFeed {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
    pacer: RequestPacer,
    base_url: String,
    timeout_ms: u64,
}

impl FinraShortVolumeFeed {
    pub fn new(http_client: Arc<dyn HttpClient>, cache: CacheStore) -> Self {
        Self {
            http_client,
            cache,
            pacer: RequestPacer::unlimited(),
            base_url: FINRA_DAILY_BASE_URL.to_owned(),
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

    pub fn file_url(&self, date: TradingDate) -> String {
        format!("{}/CNMSshvol{}.txt", self.base_url, date.compact())
    }

    async fn fetch(
        &self,
        symbol: &Symbol,
        date: TradingDate,
    ) -> Result<ShortVolumeRecord, SourceError> {
        if date.is_weekend() {
            return Err(SourceError::not_found(format!("no session on {date}")));
        }

        let key = CacheKey::new(CacheOperation::ShortVolume, symbol).with_window(date.compact());
        if let Some(record) = self.cache.get::<ShortVolumeRecord>(&key).await {
            return Ok(record);
        }

        self.pacer.ready().await;
        let request = HttpRequest::get(self.file_url(date)).with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("short volume transport error: {}", error.message()))
        })?;

        if !response.is_success() {
            return Err(SourceError::from_status("short volume file", response.status));
        }

        let row = parse_short_volume_file(&response.body)?
            .into_iter()
            .find(|row| row.symbol == symbol.as_str())
            .ok_or_else(|| SourceError::not_found(format!("{symbol} absent from {date} file")))?;

        if row.short_volume > row.total_volume {
            return Err(SourceError::malformed(format!(
                "{symbol} short volume {} exceeds total {} on {date}",
                row.short_volume, row.total_volume
            )));
        }

        let record = ShortVolumeRecord {
            total_volume: row.total_volume,
            short_volume: row.short_volume,
        };
        self.cache.put(key, &record, None).await;
        Ok(record)
    }
}

impl ShortVolumeFeed for FinraShortVolumeFeed {
    fn daily_short_volume<'a>(
        &'a self,
        symbol: &'a Symbol,
        date: TradingDate,
    ) -> Pin<Box<dyn Future<Output = Result<ShortVolumeRecord, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(symbol, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse, ScriptedHttpClient};
    use crate::sources::SourceErrorKind;

    const CAPITALIZED: &str = "Date|Symbol|ShortVolume|ShortExemptVolume|TotalVolume|Market\n\
        20240308|AAPL|4200000|12000|9000000|B,Q,N\n\
        20240308|MSFT|1500000.75|300|3100000.25|B,Q,N\n";

    const CAMEL_CASE: &str = "date|symbol|shortVolume|shortExemptVolume|totalVolume|market\n\
        20240307|AAPL|3900000|8000|8800000|B,Q,N\n";

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    fn date(value: &str) -> TradingDate {
        TradingDate::parse(value).expect("valid date")
    }

    #[test]
    fn parses_both_header_spellings() {
        let capitalized = parse_short_volume_file(CAPITALIZED).expect("parses");
        let camel = parse_short_volume_file(CAMEL_CASE).expect("parses");

        assert_eq!(capitalized.len(), 2);
        assert_eq!(
            capitalized[0],
            ShortVolumeRow {
                symbol: String::from("AAPL"),
                short_volume: 4_200_000,
                total_volume: 9_000_000,
            }
        );
        assert_eq!(camel[0].short_volume, 3_900_000);
        assert_eq!(camel[0].total_volume, 8_800_000);
    }

    #[test]
    fn truncates_fractional_volumes() {
        let rows = parse_short_volume_file(CAPITALIZED).expect("parses");
        assert_eq!(rows[1].short_volume, 1_500_000);
        assert_eq!(rows[1].total_volume, 3_100_000);
    }

    #[test]
    fn skips_trailer_and_short_lines() {
        let body = "Symbol|ShortVolume|TotalVolume\nAAPL|10|20\n\nTSLA|x|30\n1234\n";
        let rows = parse_short_volume_file(body).expect("parses");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
    }

    #[test]
    fn missing_column_is_malformed() {
        let err = parse_short_volume_file("Symbol|ShortVolume\nAAPL|10\n").expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Malformed);

        let err = parse_short_volume_file("   \n").expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Malformed);
    }

    #[tokio::test]
    async fn fetches_the_date_stamped_file_and_caches_the_row() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .route("https://cdn.test/CNMSshvol20240308.txt", HttpResponse::ok(CAPITALIZED)),
        );
        let feed = FinraShortVolumeFeed::new(client.clone(), CacheStore::default())
            .with_base_url("https://cdn.test/");

        let first = feed
            .daily_short_volume(&symbol("aapl"), date("2024-03-08"))
            .await
            .expect("row present");
        let second = feed
            .daily_short_volume(&symbol("AAPL"), date("2024-03-08"))
            .await
            .expect("cached");

        assert_eq!(first, second);
        assert_eq!(first.short_volume, 4_200_000);
        assert_eq!(client.request_count("https://cdn.test/"), 1);
        assert_eq!(client.recorded_requests()[0].timeout_ms, 3_000);
    }

    #[tokio::test]
    async fn absent_symbol_is_not_found() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .route("https://cdn.test/CNMSshvol20240308.txt", HttpResponse::ok(CAPITALIZED)),
        );
        let feed = FinraShortVolumeFeed::new(client, CacheStore::default())
            .with_base_url("https://cdn.test");

        let err = feed
            .daily_short_volume(&symbol("COIN"), date("2024-03-08"))
            .await
            .expect_err("absent");
        assert_eq!(err.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn timeouts_and_missing_files_are_errors_not_panics() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .fail("https://cdn.test/CNMSshvol20240307.txt", HttpError::timeout("slow cdn")),
        );
        let feed = FinraShortVolumeFeed::new(client.clone(), CacheStore::default())
            .with_base_url("https://cdn.test");

        let timeout = feed
            .daily_short_volume(&symbol("AAPL"), date("2024-03-07"))
            .await
            .expect_err("timeout");
        let missing = feed
            .daily_short_volume(&symbol("AAPL"), date("2024-03-06"))
            .await
            .expect_err("404");

        assert_eq!(timeout.kind(), SourceErrorKind::Unavailable);
        assert_eq!(missing.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn weekends_never_hit_the_network() {
        let client = Arc::new(ScriptedHttpClient::new());
        let feed = FinraShortVolumeFeed::new(client.clone(), CacheStore::default());

        let err = feed
            .daily_short_volume(&symbol("AAPL"), date("2024-03-09"))
            .await
            .expect_err("saturday");
        assert_eq!(err.kind(), SourceErrorKind::NotFound);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn short_above_total_is_rejected() {
        let body = "Symbol|ShortVolume|TotalVolume\nAAPL|30|20\n";
        let client = Arc::new(
            ScriptedHttpClient::new().route("https://cdn.test/", HttpResponse::ok(body)),
        );
        let feed = FinraShortVolumeFeed::new(client, CacheStore::default())
            .with_base_url("https://cdn.test");

        let err = feed
            .daily_short_volume(&symbol("AAPL"), date("2024-03-08"))
            .await
            .expect_err("inconsistent row");
        assert_eq!(err.kind(), SourceErrorKind::Malformed);
    }
}
