#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use spottrader::domain::error::{OrderViolation, SpotTraderError};
use spottrader::domain::event::TraderEvent;
use spottrader::domain::indicator::IndicatorReadings;
use spottrader::domain::position::PositionRecord;
use spottrader::domain::sizing::{FeeSchedule, SizingConfig, SymbolRules, validate_order};
use spottrader::domain::strategy::{FeeAwareSizing, Strategy};
use spottrader::domain::tick::{Kline, MarketTick, WalletBalances};
use spottrader::domain::trade::{Side, Trade};
use spottrader::ports::exchange_port::{ExchangePort, OrderAck, OrderFill};
use spottrader::ports::position_store::PositionStore;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const SYMBOL: &str = "BTCBRL";
pub const BASE: &str = "BTC";
pub const QUOTE: &str = "BRL";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn tick_at(price: f64, timestamp: DateTime<Utc>) -> MarketTick {
    MarketTick {
        symbol: SYMBOL.to_string(),
        price,
        volume: 1.0,
        quote_volume: price,
        high_24h: price,
        low_24h: price,
        timestamp,
    }
}

/// One tick per minute starting at `t0()`.
pub fn ticks_from_prices(prices: &[f64]) -> Vec<MarketTick> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| tick_at(p, t0() + Duration::minutes(i as i64)))
        .collect()
}

/// Hourly candles closing at each price.
pub fn klines_from_prices(prices: &[f64]) -> Vec<Kline> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| Kline {
            open_time: t0() + Duration::hours(i as i64),
            open: p,
            high: p,
            low: p,
            close: p,
            volume: 1.0,
            quote_volume: p,
        })
        .collect()
}

pub fn drain(events: &flume::Receiver<TraderEvent>) -> Vec<TraderEvent> {
    events.try_iter().collect()
}

// --- exchange ---------------------------------------------------------------

/// Scripted exchange. Orders fill at the price of the last tick handed out,
/// with commission charged in the quote asset.
pub struct MockExchange {
    pub ticks: RefCell<VecDeque<Result<MarketTick, String>>>,
    pub balances: RefCell<HashMap<String, f64>>,
    pub klines: Result<Vec<Kline>, String>,
    pub rules: Option<SymbolRules>,
    pub fees: Option<FeeSchedule>,
    pub commission_rate: f64,
    pub reject_orders: Cell<bool>,
    pub orders: RefCell<Vec<(Side, f64)>>,
    last_price: Cell<f64>,
}

impl MockExchange {
    pub fn new(quote: f64, base: f64) -> Self {
        let mut balances = HashMap::new();
        balances.insert(QUOTE.to_string(), quote);
        balances.insert(BASE.to_string(), base);
        Self {
            ticks: RefCell::new(VecDeque::new()),
            balances: RefCell::new(balances),
            klines: Ok(Vec::new()),
            rules: None,
            fees: Some(FeeSchedule::default()),
            commission_rate: 0.001,
            reject_orders: Cell::new(false),
            orders: RefCell::new(Vec::new()),
            last_price: Cell::new(0.0),
        }
    }

    pub fn with_ticks(self, ticks: Vec<MarketTick>) -> Self {
        self.ticks.borrow_mut().extend(ticks.into_iter().map(Ok));
        self
    }

    pub fn push_tick(&self, tick: MarketTick) {
        self.ticks.borrow_mut().push_back(Ok(tick));
    }

    pub fn push_tick_error(&self, reason: &str) {
        self.ticks.borrow_mut().push_back(Err(reason.to_string()));
    }

    pub fn with_klines(mut self, klines: Result<Vec<Kline>, String>) -> Self {
        self.klines = klines;
        self
    }

    pub fn with_rules(mut self, rules: SymbolRules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_fees(mut self, fees: Option<FeeSchedule>) -> Self {
        self.fees = fees;
        self
    }

    /// Fill price for orders placed without a preceding tick.
    pub fn set_price(&self, price: f64) {
        self.last_price.set(price);
    }

    pub fn balance(&self, asset: &str) -> f64 {
        self.balances.borrow().get(asset).copied().unwrap_or(0.0)
    }

    pub fn set_balance(&self, asset: &str, amount: f64) {
        self.balances.borrow_mut().insert(asset.to_string(), amount);
    }

    fn market_error(symbol: &str, reason: &str) -> SpotTraderError {
        SpotTraderError::MarketData {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ExchangePort for MockExchange {
    fn get_tick(&self, symbol: &str) -> Result<MarketTick, SpotTraderError> {
        match self.ticks.borrow_mut().pop_front() {
            Some(Ok(tick)) => {
                self.last_price.set(tick.price);
                Ok(tick)
            }
            Some(Err(reason)) => Err(Self::market_error(symbol, &reason)),
            None => Err(Self::market_error(symbol, "no more ticks")),
        }
    }

    fn get_price(&self, _symbol: &str) -> Result<f64, SpotTraderError> {
        Ok(self.last_price.get())
    }

    fn get_klines(&self, symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Kline>, SpotTraderError> {
        match &self.klines {
            Ok(klines) => {
                let skip = klines.len().saturating_sub(limit);
                Ok(klines[skip..].to_vec())
            }
            Err(reason) => Err(Self::market_error(symbol, reason)),
        }
    }

    fn get_balance(&self, asset: &str) -> Result<f64, SpotTraderError> {
        Ok(self.balance(asset))
    }

    fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolRules, SpotTraderError> {
        self.rules
            .ok_or_else(|| Self::market_error(symbol, "symbol rules unavailable"))
    }

    fn get_fee_schedule(&self) -> Result<FeeSchedule, SpotTraderError> {
        self.fees
            .ok_or_else(|| Self::market_error("account", "fee schedule unavailable"))
    }

    fn place_order(&self, symbol: &str, side: Side, quantity: f64) -> Result<OrderAck, SpotTraderError> {
        if self.reject_orders.get() {
            return Err(SpotTraderError::ExchangeRejection {
                symbol: symbol.to_string(),
                side: side.to_string(),
                reason: "Filter failure: NOTIONAL".to_string(),
            });
        }

        let price = self.last_price.get();
        let value = quantity * price;
        let commission = value * self.commission_rate;
        {
            let mut balances = self.balances.borrow_mut();
            match side {
                Side::Buy => {
                    *balances.entry(QUOTE.to_string()).or_default() -= value + commission;
                    *balances.entry(BASE.to_string()).or_default() += quantity;
                }
                Side::Sell => {
                    *balances.entry(QUOTE.to_string()).or_default() += value - commission;
                    *balances.entry(BASE.to_string()).or_default() -= quantity;
                }
            }
        }
        self.orders.borrow_mut().push((side, quantity));

        Ok(OrderAck {
            order_id: self.orders.borrow().len() as u64,
            status: "FILLED".to_string(),
            fills: vec![OrderFill {
                price,
                quantity,
                commission,
                commission_asset: QUOTE.to_string(),
            }],
        })
    }
}

// --- store ------------------------------------------------------------------

/// In-memory position store; clones share the same slot.
#[derive(Clone, Default)]
pub struct MockStore {
    pub record: Arc<Mutex<Option<PositionRecord>>>,
    pub fail_writes: bool,
}

impl MockStore {
    pub fn with_record(record: PositionRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
            fail_writes: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<PositionRecord> {
        self.record.lock().unwrap().clone()
    }
}

impl PositionStore for MockStore {
    fn load(&self, _symbol: &str) -> Result<Option<PositionRecord>, SpotTraderError> {
        Ok(self.current())
    }

    fn save(&self, record: &PositionRecord) -> Result<(), SpotTraderError> {
        if self.fail_writes {
            return Err(SpotTraderError::Store {
                reason: "disk full".to_string(),
            });
        }
        *self.record.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    fn clear(&self, _symbol: &str) -> Result<(), SpotTraderError> {
        if self.fail_writes {
            return Err(SpotTraderError::Store {
                reason: "disk full".to_string(),
            });
        }
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

pub fn position_record(quantity: f64, entry_price: f64) -> PositionRecord {
    PositionRecord {
        symbol: SYMBOL.to_string(),
        quantity,
        entry_price,
        entry_time: t0().to_rfc3339(),
        fees_paid: 0.0,
    }
}

// --- strategies ---------------------------------------------------------------

/// Buys at or below `buy_below`, sells at or above `sell_above`, always
/// for a fixed quantity. Fills and ticks are shared so tests can inspect
/// them after the strategy is boxed.
pub struct BandStrategy {
    pub buy_below: f64,
    pub sell_above: f64,
    pub quantity: f64,
    pub sizing: SizingConfig,
    pub rules: Option<SymbolRules>,
    pub fills: Arc<Mutex<Vec<Trade>>>,
    pub ticks_seen: Arc<Mutex<usize>>,
}

impl BandStrategy {
    pub fn new(buy_below: f64, sell_above: f64, quantity: f64) -> Self {
        Self {
            buy_below,
            sell_above,
            quantity,
            sizing: SizingConfig::default(),
            rules: None,
            fills: Arc::new(Mutex::new(Vec::new())),
            ticks_seen: Arc::new(Mutex::new(0)),
        }
    }
}

impl FeeAwareSizing for BandStrategy {
    fn sizing_config(&self) -> &SizingConfig {
        &self.sizing
    }

    fn check_order(&self, quantity: f64, price: f64) -> Result<(), OrderViolation> {
        match &self.rules {
            Some(rules) => validate_order(quantity, price, rules),
            None => Ok(()),
        }
    }

    fn configure_exchange(&mut self, _fees: FeeSchedule, rules: Option<SymbolRules>) {
        self.rules = rules;
    }
}

impl Strategy for BandStrategy {
    fn name(&self) -> &str {
        "band"
    }

    fn required_history(&self) -> usize {
        3
    }

    fn on_tick(&mut self, _tick: &MarketTick) {
        *self.ticks_seen.lock().unwrap() += 1;
    }

    fn should_buy(&self, tick: &MarketTick) -> bool {
        tick.price <= self.buy_below
    }

    fn should_sell(&self, tick: &MarketTick) -> bool {
        tick.price >= self.sell_above
    }

    fn on_fill(&mut self, trade: &Trade) {
        self.fills.lock().unwrap().push(trade.clone());
    }

    fn readings(&self) -> IndicatorReadings {
        IndicatorReadings::default()
    }

    fn calculate_position_size(&self, _tick: &MarketTick, _wallet: &WalletBalances) -> f64 {
        self.quantity
    }
}

/// Buys on the first tick it sees and never sells.
pub struct BuyOnce {
    pub quantity: f64,
    pub sizing: SizingConfig,
    bought: bool,
}

impl BuyOnce {
    pub fn new(quantity: f64) -> Self {
        Self {
            quantity,
            sizing: SizingConfig::default(),
            bought: false,
        }
    }
}

impl FeeAwareSizing for BuyOnce {
    fn sizing_config(&self) -> &SizingConfig {
        &self.sizing
    }
}

impl Strategy for BuyOnce {
    fn name(&self) -> &str {
        "buy-once"
    }

    fn required_history(&self) -> usize {
        0
    }

    fn on_tick(&mut self, _tick: &MarketTick) {}

    fn should_buy(&self, _tick: &MarketTick) -> bool {
        !self.bought
    }

    fn should_sell(&self, _tick: &MarketTick) -> bool {
        false
    }

    fn on_fill(&mut self, trade: &Trade) {
        if trade.side == Side::Buy {
            self.bought = true;
        }
    }

    fn readings(&self) -> IndicatorReadings {
        IndicatorReadings::default()
    }

    fn calculate_position_size(&self, _tick: &MarketTick, _wallet: &WalletBalances) -> f64 {
        self.quantity
    }
}
