//! Live orchestrator.
//!
//! One control loop owns the indicator windows, the single position and the
//! daily counters. Each step runs fetch, indicator update, fusion, lifecycle
//! check, sizing and execution to completion; the only suspension point is
//! the wait between polls, which is also where a stop request is observed.

use std::time::Duration;

use chrono::NaiveDate;

use super::error::SpotTraderError;
use super::event::{SessionStats, SkipReason, TraderEvent};
use super::fusion::{Action, SignalDecision, SignalStrength};
use super::lifecycle::{ExitRules, PositionChange, PositionLifecycle, Reconciliation};
use super::position::Position;
use super::signal_source::SignalSource;
use super::sizing::{FeeSchedule, SymbolRules};
use super::tick::{MarketTick, WalletBalances};
use super::trade::{Side, Trade};
use crate::ports::exchange_port::{ExchangePort, OrderAck};
use crate::ports::position_store::PositionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub exit_rules: ExitRules,
    /// Used when the account fee schedule cannot be fetched.
    pub default_fees: FeeSchedule,
    pub allow_pyramiding: bool,
    pub max_daily_trades: u32,
    pub poll_interval: Duration,
    pub warm_up_interval: String,
    /// Base balance below which a restored position is cleared, when the
    /// symbol's minimum quantity is unknown.
    pub dust_threshold: f64,
}

impl TraderConfig {
    pub fn new(base_asset: &str, quote_asset: &str) -> Self {
        Self {
            symbol: format!("{}{}", base_asset, quote_asset),
            base_asset: base_asset.to_string(),
            quote_asset: quote_asset.to_string(),
            exit_rules: ExitRules::default(),
            default_fees: FeeSchedule::default(),
            allow_pyramiding: true,
            max_daily_trades: 10,
            poll_interval: Duration::from_secs(30),
            warm_up_interval: "1h".to_string(),
            dust_threshold: 0.00001,
        }
    }
}

pub struct Trader<E: ExchangePort> {
    exchange: E,
    store: Option<Box<dyn PositionStore>>,
    source: SignalSource,
    lifecycle: PositionLifecycle,
    config: TraderConfig,
    fees: FeeSchedule,
    rules: Option<SymbolRules>,
    trades: Vec<Trade>,
    daily_trades: u32,
    trading_day: Option<NaiveDate>,
    stats: SessionStats,
    events: flume::Sender<TraderEvent>,
}

impl<E: ExchangePort> Trader<E> {
    pub fn new(exchange: E, source: SignalSource, config: TraderConfig, events: flume::Sender<TraderEvent>) -> Self {
        let fees = config.default_fees;
        Self {
            exchange,
            store: None,
            source,
            lifecycle: PositionLifecycle::new(),
            config,
            fees,
            rules: None,
            trades: Vec::new(),
            daily_trades: 0,
            trading_day: None,
            stats: SessionStats::default(),
            events,
        }
    }

    pub fn with_store(mut self, store: Box<dyn PositionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn lifecycle(&self) -> &PositionLifecycle {
        &self.lifecycle
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn daily_trades(&self) -> u32 {
        self.daily_trades
    }

    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    fn emit(&self, event: TraderEvent) {
        // A dropped receiver only loses the rendering.
        let _ = self.events.send(event);
    }

    /// Fetch fees and symbol filters, warm up the indicators and restore the
    /// persisted position against the wallet.
    pub fn startup(&mut self) -> Result<(), SpotTraderError> {
        self.fees = self.exchange.get_fee_schedule().unwrap_or(self.config.default_fees);
        self.rules = self.exchange.get_symbol_rules(&self.config.symbol).ok();
        self.source.configure_exchange(self.fees, self.rules);

        self.emit(TraderEvent::Started {
            symbol: self.config.symbol.clone(),
            strategy: self.source.name(),
            fees: self.fees,
            rules: self.rules,
        });

        let history = self.source.required_history();
        match self
            .exchange
            .get_klines(&self.config.symbol, &self.config.warm_up_interval, history)
        {
            Ok(klines) => {
                self.source.warm_up(&klines);
                self.emit(TraderEvent::WarmedUp { candles: klines.len() });
            }
            Err(e) => self.emit(TraderEvent::WarmUpFailed { reason: e.to_string() }),
        }

        self.restore_position()
    }

    fn restore_position(&mut self) -> Result<(), SpotTraderError> {
        let record = match &self.store {
            Some(store) => store.load(&self.config.symbol)?,
            None => None,
        };
        let Some(record) = record else {
            return Ok(());
        };

        let position = Position::from_record(&record)?;
        self.source.on_fill(&Trade {
            symbol: position.symbol.clone(),
            side: Side::Buy,
            quantity: position.quantity,
            price: position.entry_price,
            timestamp: position.entry_time,
            fee: position.fees_paid,
        });
        self.lifecycle.restore(position.clone());
        self.emit(TraderEvent::PositionRestored(position));

        self.sync_with_wallet()
    }

    /// Cap or clear the open position to the free base balance. Holdings can
    /// leave the wallet outside the bot at any time.
    fn sync_with_wallet(&mut self) -> Result<(), SpotTraderError> {
        if !self.lifecycle.has_position() {
            return Ok(());
        }
        let base = self.exchange.get_balance(&self.config.base_asset)?;
        let dust = self.rules.map_or(self.config.dust_threshold, |r| r.min_qty);
        let outcome = self.lifecycle.reconcile(base, dust);
        match outcome {
            Reconciliation::Unchanged => {}
            Reconciliation::Capped { .. } => {
                if let Some(pos) = self.lifecycle.position() {
                    self.persist_save(pos.clone());
                }
                self.emit(TraderEvent::Reconciled(outcome));
            }
            Reconciliation::Cleared { .. } => {
                self.persist_clear();
                self.emit(TraderEvent::Reconciled(outcome));
            }
        }
        Ok(())
    }

    /// Start a new trading day when the UTC date of `date` differs from the
    /// current one.
    fn roll_trading_day(&mut self, date: NaiveDate) {
        match self.trading_day {
            Some(day) if day == date => {}
            Some(_) => {
                self.emit(TraderEvent::NewTradingDay {
                    previous_trades: self.daily_trades,
                });
                self.daily_trades = 0;
                self.trading_day = Some(date);
            }
            None => self.trading_day = Some(date),
        }
    }

    /// One poll. Market data failures abort the tick and are returned.
    pub fn step(&mut self) -> Result<Option<SignalDecision>, SpotTraderError> {
        let tick = self.exchange.get_tick(&self.config.symbol)?;
        self.roll_trading_day(tick.timestamp.date_naive());

        if self.daily_trades >= self.config.max_daily_trades {
            self.emit(TraderEvent::DailyLimitReached {
                trades: self.daily_trades,
                limit: self.config.max_daily_trades,
            });
            return Ok(None);
        }

        self.source.on_tick(&tick);
        self.emit(TraderEvent::TickObserved {
            symbol: tick.symbol.clone(),
            price: tick.price,
            timestamp: tick.timestamp,
            readings: self.source.readings(),
        });

        self.sync_with_wallet()?;
        let checks = self.lifecycle.exit_checks(
            tick.price,
            tick.timestamp,
            &self.config.exit_rules,
            self.fees.taker_fee_rate,
        );
        let decision = self
            .source
            .evaluate(&tick, checks, self.config.allow_pyramiding);
        self.count_signal(decision.strength);
        self.emit(TraderEvent::SignalEvaluated(decision));

        if decision.held_by_min_holding {
            let holding_minutes = self
                .lifecycle
                .position()
                .map_or(0, |p| p.holding_minutes(tick.timestamp));
            self.emit(TraderEvent::HeldByMinHolding { holding_minutes });
        }

        match decision.action {
            Action::Buy => {
                let wallet = self.wallet()?;
                let quantity = self.source.sizer().calculate_position_size(&tick, &wallet);
                self.execute_buy(&tick, quantity, &wallet);
            }
            Action::Sell => {
                if let Some(reason) = decision.exit_reason.filter(|r| r.is_forced()) {
                    self.emit(TraderEvent::ForcedExit(reason));
                }
                let wallet = self.wallet()?;
                self.execute_sell(&tick, &wallet);
            }
            Action::Keep => {}
        }

        Ok(Some(decision))
    }

    fn count_signal(&mut self, strength: SignalStrength) {
        match strength {
            SignalStrength::Strong => self.stats.strong_signals += 1,
            SignalStrength::Moderate => self.stats.moderate_signals += 1,
            SignalStrength::Conservative => self.stats.conservative_signals += 1,
            SignalStrength::None => {}
        }
    }

    fn wallet(&self) -> Result<WalletBalances, SpotTraderError> {
        let quote = self.exchange.get_balance(&self.config.quote_asset)?;
        let base = self.exchange.get_balance(&self.config.base_asset)?;
        Ok(WalletBalances::new(quote, base))
    }

    fn skip(&self, side: Side, reason: SkipReason) -> Option<Trade> {
        self.emit(TraderEvent::OrderSkipped { side, reason });
        None
    }

    /// Place a market buy of `quantity`. Skipped orders return `None`.
    pub fn execute_buy(&mut self, tick: &MarketTick, quantity: f64, wallet: &WalletBalances) -> Option<Trade> {
        if quantity <= 0.0 {
            return self.skip(Side::Buy, SkipReason::ZeroQuantity);
        }
        if self.lifecycle.has_position() && !self.config.allow_pyramiding {
            return self.skip(Side::Buy, SkipReason::AlreadyInPosition);
        }
        if let Err(violation) = self.source.sizer().check_order(quantity, tick.price) {
            return self.skip(Side::Buy, SkipReason::Validation(violation.to_string()));
        }
        let required = quantity * tick.price;
        if wallet.quote < required {
            return self.skip(
                Side::Buy,
                SkipReason::InsufficientBalance {
                    required,
                    available: wallet.quote,
                },
            );
        }

        let ack = match self.exchange.place_order(&self.config.symbol, Side::Buy, quantity) {
            Ok(ack) => ack,
            Err(e) => return self.skip(Side::Buy, SkipReason::Rejected(e.to_string())),
        };

        let trade = self.trade_from_ack(Side::Buy, tick, quantity, &ack);
        self.record_fill(&trade);
        Some(trade)
    }

    /// Sell the whole position, rounded down to what the wallet holds.
    pub fn execute_sell(&mut self, tick: &MarketTick, wallet: &WalletBalances) -> Option<Trade> {
        let Some(held) = self.lifecycle.position().map(|p| p.quantity) else {
            return self.skip(Side::Sell, SkipReason::NoPosition);
        };

        let available = wallet.base;
        let quantity = self.source.sizer().sell_quantity(held, available);
        if quantity <= 0.0 {
            return self.skip(Side::Sell, SkipReason::ZeroQuantity);
        }
        if quantity > available {
            return self.skip(
                Side::Sell,
                SkipReason::InsufficientBalance {
                    required: quantity,
                    available,
                },
            );
        }
        if let Err(violation) = self.source.sizer().check_order(quantity, tick.price) {
            return self.skip(Side::Sell, SkipReason::Validation(violation.to_string()));
        }

        let ack = match self.exchange.place_order(&self.config.symbol, Side::Sell, quantity) {
            Ok(ack) => ack,
            Err(e) => return self.skip(Side::Sell, SkipReason::Rejected(e.to_string())),
        };

        let trade = self.trade_from_ack(Side::Sell, tick, quantity, &ack);
        self.record_fill(&trade);
        Some(trade)
    }

    /// Fee is expressed in the quote asset; base-asset commission is valued
    /// at the fill price.
    fn trade_from_ack(&self, side: Side, tick: &MarketTick, requested: f64, ack: &OrderAck) -> Trade {
        let executed = ack.executed_quantity();
        let quantity = if executed > 0.0 { executed } else { requested };
        let price = ack.average_price(tick.price);
        let fee = ack.commission_in(&self.config.quote_asset) + ack.commission_in(&self.config.base_asset) * price;
        Trade {
            symbol: self.config.symbol.clone(),
            side,
            quantity,
            price,
            timestamp: tick.timestamp,
            fee,
        }
    }

    fn record_fill(&mut self, trade: &Trade) {
        self.daily_trades += 1;
        self.stats.total_trades += 1;
        self.trades.push(trade.clone());
        self.source.on_fill(trade);
        self.emit(TraderEvent::OrderExecuted(trade.clone()));

        match self.lifecycle.apply(trade) {
            PositionChange::Opened(pos) => {
                self.persist_save(pos.clone());
                self.emit(TraderEvent::PositionOpened(pos));
            }
            PositionChange::Increased(pos) => {
                self.persist_save(pos.clone());
                self.emit(TraderEvent::PositionIncreased(pos));
            }
            PositionChange::Closed(pos) => {
                let pnl = trade.quantity * (trade.price - pos.entry_price) - pos.fees_paid - trade.fee;
                self.stats.closed_trades += 1;
                self.stats.total_pnl += pnl;
                if pnl > 0.0 {
                    self.stats.winning_trades += 1;
                }
                self.persist_clear();
                self.emit(TraderEvent::PositionClosed { position: pos, pnl });
            }
            PositionChange::Unchanged => {}
        }
    }

    fn persist_save(&self, position: Position) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&position.to_record()) {
                self.emit(TraderEvent::StoreFailed { reason: e.to_string() });
            }
        }
    }

    fn persist_clear(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear(&self.config.symbol) {
                self.emit(TraderEvent::StoreFailed { reason: e.to_string() });
            }
        }
    }

    /// Poll until `stop` receives a message or its sender is dropped.
    pub fn run(&mut self, stop: &flume::Receiver<()>) -> SessionStats {
        loop {
            if let Err(e) = self.step() {
                self.emit(TraderEvent::TickAborted { reason: e.to_string() });
            }
            match stop.recv_timeout(self.config.poll_interval) {
                Err(flume::RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }
        let stats = self.stats.clone();
        self.emit(TraderEvent::Stopped(stats.clone()));
        stats
    }
}
