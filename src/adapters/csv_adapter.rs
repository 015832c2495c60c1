//! CSV kline files, one per symbol and interval: `<SYMBOL>_<interval>.csv`.

use crate::domain::error::SpotTraderError;
use crate::domain::tick::Kline;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct KlineRow {
    open_time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    quote_volume: Option<f64>,
}

fn market_data_error(symbol: &str, reason: String) -> SpotTraderError {
    SpotTraderError::MarketData {
        symbol: symbol.to_string(),
        reason,
    }
}

/// RFC 3339 or epoch milliseconds.
fn parse_open_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = value.trim().parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }

    /// Overwrites the file for `symbol` / `interval`.
    pub fn write_klines(&self, symbol: &str, interval: &str, klines: &[Kline]) -> Result<PathBuf, SpotTraderError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol, interval);
        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| market_data_error(symbol, format!("cannot write {}: {}", path.display(), e)))?;

        for kline in klines {
            writer
                .serialize(KlineRow {
                    open_time: kline.open_time.to_rfc3339(),
                    open: kline.open,
                    high: kline.high,
                    low: kline.low,
                    close: kline.close,
                    volume: kline.volume,
                    quote_volume: Some(kline.quote_volume),
                })
                .map_err(|e| market_data_error(symbol, format!("CSV write error: {}", e)))?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Kline>, SpotTraderError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path)
            .map_err(|e| market_data_error(symbol, format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut klines = Vec::new();

        for (line, result) in rdr.deserialize::<KlineRow>().enumerate() {
            let row = result.map_err(|e| market_data_error(symbol, format!("CSV parse error: {}", e)))?;
            let open_time = parse_open_time(&row.open_time).ok_or_else(|| {
                market_data_error(
                    symbol,
                    format!("invalid open_time '{}' on row {}", row.open_time, line + 1),
                )
            })?;

            klines.push(Kline {
                open_time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                quote_volume: row.quote_volume.unwrap_or(row.volume * row.close),
            });
        }

        klines.sort_by_key(|k| k.open_time);
        if let Some(limit) = limit {
            if klines.len() > limit {
                klines.drain(..klines.len() - limit);
            }
        }
        Ok(klines)
    }

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, SpotTraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
