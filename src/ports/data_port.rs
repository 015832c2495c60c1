//! Historical kline source port.

use crate::domain::error::SpotTraderError;
use crate::domain::tick::Kline;

pub trait DataPort {
    /// Oldest-first klines of `symbol`; at most the latest `limit` when set.
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Kline>, SpotTraderError>;

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, SpotTraderError>;
}
