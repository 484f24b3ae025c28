//! Bar source implementations: CSV files and deterministic synthetic data.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use retrace_core::domain::{Bar, TimeRange};
use retrace_core::source::{BarSource, FetchResult, SourceError};

// ── CSV ──────────────────────────────────────────────────────────────

/// OHLCV CSV file source.
///
/// Expects a header with `ts_event,open,high,low,close,volume`; extra
/// columns are ignored. Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC), or integer epoch nanoseconds — the data files mix all
/// three. Rows that fail to parse are dropped and counted, not fatal.
pub struct CsvBarSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    ts_event: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CsvBarSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, range: Option<&TimeRange>) -> Result<FetchResult, SourceError> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.path.display())))?;

        let mut bars = Vec::new();
        let mut malformed_dropped = 0;

        for record in reader.deserialize::<CsvRow>() {
            let row = match record {
                Ok(row) => row,
                Err(_) => {
                    malformed_dropped += 1;
                    continue;
                }
            };
            let Some(timestamp) = parse_timestamp(&row.ts_event) else {
                malformed_dropped += 1;
                continue;
            };
            if let Some(r) = range {
                if !r.contains(timestamp) {
                    continue;
                }
            }
            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        // The files are ordered by timestamp; sort anyway to guarantee the
        // ascending contract (stable, so equal timestamps keep file order).
        bars.sort_by_key(|b| b.timestamp);

        Ok(FetchResult {
            bars,
            malformed_dropped,
        })
    }
}

/// Parse a timestamp in any of the encodings the data files use.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(DateTime::from_timestamp_nanos)
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Deterministic synthetic bar generator for demos and tests.
///
/// One bar per minute from 13:00 to 19:00 UTC on each weekday of the date
/// range, on a random walk seeded from the symbol. Same symbol and range ⇒
/// bit-identical bars.
pub struct SyntheticBarSource {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl SyntheticBarSource {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }
}

impl BarSource for SyntheticBarSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, range: Option<&TimeRange>) -> Result<FetchResult, SourceError> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        // Deterministic seed from the symbol name.
        let seed: [u8; 32] = *blake3::hash(self.symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let session_open = NaiveTime::from_hms_opt(13, 0, 0)
            .ok_or_else(|| SourceError::Other("invalid session open".into()))?;

        let mut bars = Vec::new();
        let mut price = 100.0_f64;
        let mut day = self.start;

        while day <= self.end {
            let weekday = day.weekday();
            if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
                day += chrono::Duration::days(1);
                continue;
            }

            for minute in 0..360 {
                let minute_return: f64 = rng.gen_range(-0.0008..0.0008);
                let open = price;
                let close = price * (1.0 + minute_return);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0004));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0004));
                let volume = rng.gen_range(50..2_000u64);

                let timestamp = Utc.from_utc_datetime(
                    &day.and_time(session_open + chrono::Duration::minutes(minute)),
                );
                if range.map_or(true, |r| r.contains(timestamp)) {
                    bars.push(Bar {
                        timestamp,
                        open,
                        high,
                        low,
                        close,
                        volume,
                    });
                }
                price = close;
            }

            day += chrono::Duration::days(1);
        }

        Ok(FetchResult {
            bars,
            malformed_dropped: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_source_parses_rfc3339_timestamps() {
        let file = write_csv(
            "ts_event,open,high,low,close,volume\n\
             2019-06-03T13:30:00Z,100.0,101.0,99.0,100.5,250\n\
             2019-06-03T13:31:00Z,100.5,101.5,100.0,101.0,300\n",
        );
        let source = CsvBarSource::new(file.path());
        let fetched = source.fetch(None).unwrap();
        assert_eq!(fetched.bars.len(), 2);
        assert_eq!(fetched.malformed_dropped, 0);
        assert_eq!(fetched.bars[0].high, 101.0);
        assert_eq!(
            fetched.bars[0].timestamp,
            Utc.with_ymd_and_hms(2019, 6, 3, 13, 30, 0).unwrap()
        );
    }

    #[test]
    fn csv_source_parses_epoch_nanoseconds() {
        // 2019-06-03T13:30:00Z = 1559568600 seconds.
        let file = write_csv(
            "ts_event,open,high,low,close,volume\n\
             1559568600000000000,100.0,101.0,99.0,100.5,250\n",
        );
        let source = CsvBarSource::new(file.path());
        let fetched = source.fetch(None).unwrap();
        assert_eq!(fetched.bars.len(), 1);
        assert_eq!(
            fetched.bars[0].timestamp,
            Utc.with_ymd_and_hms(2019, 6, 3, 13, 30, 0).unwrap()
        );
    }

    #[test]
    fn csv_source_counts_malformed_rows() {
        let file = write_csv(
            "ts_event,open,high,low,close,volume\n\
             not-a-timestamp,100.0,101.0,99.0,100.5,250\n\
             2019-06-03T13:30:00Z,oops,101.0,99.0,100.5,250\n\
             2019-06-03T13:31:00Z,100.0,101.0,99.0,100.5,250\n",
        );
        let source = CsvBarSource::new(file.path());
        let fetched = source.fetch(None).unwrap();
        assert_eq!(fetched.bars.len(), 1);
        assert_eq!(fetched.malformed_dropped, 2);
    }

    #[test]
    fn csv_source_ignores_extra_columns() {
        let file = write_csv(
            "ts_event,rtype,open,high,low,close,volume,symbol\n\
             2019-06-03T13:30:00Z,32,100.0,101.0,99.0,100.5,250,MESM9\n",
        );
        let source = CsvBarSource::new(file.path());
        let fetched = source.fetch(None).unwrap();
        assert_eq!(fetched.bars.len(), 1);
    }

    #[test]
    fn csv_source_applies_time_range() {
        let file = write_csv(
            "ts_event,open,high,low,close,volume\n\
             2019-06-03T13:30:00Z,100.0,101.0,99.0,100.5,250\n\
             2019-06-04T13:30:00Z,100.0,101.0,99.0,100.5,250\n",
        );
        let source = CsvBarSource::new(file.path());
        let range = TimeRange {
            start: Utc.with_ymd_and_hms(2019, 6, 4, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2019, 6, 4, 23, 59, 59).unwrap(),
        };
        let fetched = source.fetch(Some(&range)).unwrap();
        assert_eq!(fetched.bars.len(), 1);
        assert_eq!(fetched.bars[0].trading_day().day(), 4);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let source = CsvBarSource::new("/nonexistent/bars.csv");
        let err = source.fetch(None).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn synthetic_bars_are_deterministic_and_sane() {
        let start = NaiveDate::from_ymd_opt(2019, 6, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 6, 7).unwrap();
        let a = SyntheticBarSource::new("MES", start, end).fetch(None).unwrap();
        let b = SyntheticBarSource::new("MES", start, end).fetch(None).unwrap();
        assert_eq!(a.bars, b.bars);
        assert!(!a.bars.is_empty());
        assert!(a.bars.iter().all(Bar::is_sane));
        assert!(a.bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn synthetic_skips_weekends() {
        // 2019-06-08/09 is a weekend.
        let start = NaiveDate::from_ymd_opt(2019, 6, 8).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 6, 9).unwrap();
        let fetched = SyntheticBarSource::new("MES", start, end).fetch(None).unwrap();
        assert!(fetched.bars.is_empty());
    }

    #[test]
    fn different_symbols_diverge() {
        let start = NaiveDate::from_ymd_opt(2019, 6, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 6, 3).unwrap();
        let mes = SyntheticBarSource::new("MES", start, end).fetch(None).unwrap();
        let es = SyntheticBarSource::new("ES", start, end).fetch(None).unwrap();
        assert_ne!(mes.bars[0].close, es.bars[0].close);
    }
}
