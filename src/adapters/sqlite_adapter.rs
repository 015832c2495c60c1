//! SQLite position store.

use crate::domain::error::SpotTraderError;
use crate::domain::position::PositionRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::position_store::PositionStore;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> SpotTraderError {
    SpotTraderError::Store {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> SpotTraderError {
    SpotTraderError::Store {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SpotTraderError> {
        let db_path = config
            .get_string("store", "path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| SpotTraderError::ConfigMissing {
                section: "store".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("store", "pool_size", 2).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SpotTraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), SpotTraderError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS positions (
                symbol TEXT PRIMARY KEY,
                quantity REAL NOT NULL,
                entry_price REAL NOT NULL,
                entry_time TEXT NOT NULL,
                fees_paid REAL NOT NULL DEFAULT 0
            );",
        )
        .map_err(query_error)?;

        Ok(())
    }
}

impl PositionStore for SqliteAdapter {
    fn load(&self, symbol: &str) -> Result<Option<PositionRecord>, SpotTraderError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.query_row(
            "SELECT symbol, quantity, entry_price, entry_time, fees_paid
             FROM positions WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(PositionRecord {
                    symbol: row.get(0)?,
                    quantity: row.get(1)?,
                    entry_price: row.get(2)?,
                    entry_time: row.get(3)?,
                    fees_paid: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(query_error)
    }

    fn save(&self, record: &PositionRecord) -> Result<(), SpotTraderError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute(
            "INSERT OR REPLACE INTO positions (symbol, quantity, entry_price, entry_time, fees_paid)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.symbol,
                record.quantity,
                record.entry_price,
                record.entry_time,
                record.fees_paid
            ],
        )
        .map_err(query_error)?;

        Ok(())
    }

    fn clear(&self, symbol: &str) -> Result<(), SpotTraderError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute("DELETE FROM positions WHERE symbol = ?1", params![symbol])
            .map_err(query_error)?;

        Ok(())
    }
}
