//! Persistence port for the open position snapshot.

use crate::domain::error::SpotTraderError;
use crate::domain::position::PositionRecord;

pub trait PositionStore {
    fn load(&self, symbol: &str) -> Result<Option<PositionRecord>, SpotTraderError>;
    fn save(&self, record: &PositionRecord) -> Result<(), SpotTraderError>;
    fn clear(&self, symbol: &str) -> Result<(), SpotTraderError>;
}
