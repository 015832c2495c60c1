//! Concrete adapter implementations for ports.

#[cfg(feature = "live")]
pub mod binance;
pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
