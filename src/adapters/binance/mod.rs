//! Binance spot REST adapter (blocking).

pub mod model;
pub mod signer;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::domain::error::SpotTraderError;
use crate::domain::sizing::{FeeSchedule, SymbolRules};
use crate::domain::tick::{Kline, MarketTick};
use crate::domain::trade::Side;
use crate::ports::data_port::DataPort;
use crate::ports::exchange_port::{ExchangePort, OrderAck};
use model::{AccountInfo, ApiError, ExchangeInfo, OrderResponse, Ticker24h, TickerPrice, kline_from_row};
pub use signer::RequestSigner;

pub const MAINNET_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";
/// Largest page the klines endpoint returns.
pub const MAX_KLINES: usize = 1000;

#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

impl BinanceConfig {
    pub fn new(testnet: bool) -> Self {
        Self {
            base_url: if testnet { TESTNET_URL } else { MAINNET_URL }.to_string(),
            recv_window_ms: 5_000,
            timeout_secs: 10,
        }
    }
}

pub struct BinanceAdapter {
    client: Client,
    config: BinanceConfig,
    signer: Option<RequestSigner>,
}

/// Order quantity as sent on the wire: at most 8 decimals, no trailing zeros.
pub fn format_quantity(quantity: f64) -> String {
    let s = format!("{:.8}", quantity);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

/// Body of a response, or a reason naming the status and API error.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, String> {
    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiError>(body) {
            Ok(err) => format!("{} (code {}): {}", status, err.code, err.msg),
            Err(_) => format!("{}: {}", status, body),
        });
    }
    serde_json::from_str(body).map_err(|e| format!("invalid response: {}", e))
}

impl BinanceAdapter {
    pub fn new(config: BinanceConfig, signer: Option<RequestSigner>) -> Result<Self, SpotTraderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpotTraderError::ConfigInvalid {
                section: "exchange".to_string(),
                key: "base_url".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, config, signer })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, String> {
        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().map_err(|e| e.to_string())?;
        decode(status, &body)
    }

    fn get_public<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, String> {
        self.send(self.client.get(self.url(path)).query(query))
    }

    fn signed_request(&self, method: reqwest::Method, path: &str, params: &[(&str, String)]) -> Result<RequestBuilder, String> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| "API credentials are required for this endpoint".to_string())?;
        let mut params = params.to_vec();
        params.push(("recvWindow", self.config.recv_window_ms.to_string()));
        let query = signer
            .signed_query(&params, Utc::now().timestamp_millis())
            .map_err(|e| e.to_string())?;
        Ok(self
            .client
            .request(method, format!("{}?{}", self.url(path), query))
            .header("X-MBX-APIKEY", signer.api_key()))
    }

    fn account(&self) -> Result<AccountInfo, String> {
        let request = self.signed_request(reqwest::Method::GET, "/api/v3/account", &[])?;
        self.send(request)
    }
}

fn market_error(symbol: &str) -> impl Fn(String) -> SpotTraderError + '_ {
    move |reason| SpotTraderError::MarketData {
        symbol: symbol.to_string(),
        reason,
    }
}

impl ExchangePort for BinanceAdapter {
    fn get_tick(&self, symbol: &str) -> Result<MarketTick, SpotTraderError> {
        let ticker: Ticker24h = self
            .get_public("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .map_err(market_error(symbol))?;
        Ok(MarketTick {
            symbol: ticker.symbol,
            price: ticker.last_price,
            volume: ticker.volume,
            quote_volume: ticker.quote_volume,
            high_24h: ticker.high_price,
            low_24h: ticker.low_price,
            timestamp: Utc::now(),
        })
    }

    fn get_price(&self, symbol: &str) -> Result<f64, SpotTraderError> {
        let ticker: TickerPrice = self
            .get_public("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .map_err(market_error(symbol))?;
        Ok(ticker.price)
    }

    fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, SpotTraderError> {
        let rows: Vec<Vec<serde_json::Value>> = self
            .get_public(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.clamp(1, MAX_KLINES).to_string()),
                ],
            )
            .map_err(market_error(symbol))?;

        rows.iter()
            .map(|row| kline_from_row(row).ok_or_else(|| market_error(symbol)(format!("malformed kline row: {:?}", row))))
            .collect()
    }

    fn get_balance(&self, asset: &str) -> Result<f64, SpotTraderError> {
        let account = self.account().map_err(market_error(asset))?;
        Ok(account.free(asset))
    }

    fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolRules, SpotTraderError> {
        let info: ExchangeInfo = self
            .get_public("/api/v3/exchangeInfo", &[("symbol", symbol.to_string())])
            .map_err(market_error(symbol))?;
        info.symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| s.rules())
            .ok_or_else(|| market_error(symbol)("no LOT_SIZE filter".to_string()))
    }

    fn get_fee_schedule(&self) -> Result<FeeSchedule, SpotTraderError> {
        let account = self.account().map_err(market_error("account"))?;
        let (maker, taker) = account
            .fee_rates()
            .ok_or_else(|| market_error("account")("no commission rates".to_string()))?;
        Ok(FeeSchedule {
            maker_fee_rate: maker,
            taker_fee_rate: taker,
        })
    }

    fn place_order(&self, symbol: &str, side: Side, quantity: f64) -> Result<OrderAck, SpotTraderError> {
        let rejection = |reason: String| SpotTraderError::ExchangeRejection {
            symbol: symbol.to_string(),
            side: side.to_string(),
            reason,
        };
        let request = self
            .signed_request(
                reqwest::Method::POST,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", format_quantity(quantity)),
                    ("newOrderRespType", "FULL".to_string()),
                ],
            )
            .map_err(rejection)?;
        let response: OrderResponse = self.send(request).map_err(rejection)?;
        Ok(response.into())
    }
}

impl DataPort for BinanceAdapter {
    fn fetch_klines(&self, symbol: &str, interval: &str, limit: Option<usize>) -> Result<Vec<Kline>, SpotTraderError> {
        self.get_klines(symbol, interval, limit.unwrap_or(MAX_KLINES))
    }

    fn list_symbols(&self, _interval: &str) -> Result<Vec<String>, SpotTraderError> {
        let info: ExchangeInfo = self
            .get_public("/api/v3/exchangeInfo", &[])
            .map_err(market_error("exchangeInfo"))?;
        let mut symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol)
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}
