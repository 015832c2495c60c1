//! Position lifecycle: `NoPosition -> Open -> NoPosition`.
//!
//! Owns the single open position of the traded symbol and evaluates the
//! forced-exit predicates consumed by the fusion policy.

use chrono::{DateTime, Utc};

use super::position::Position;
use super::trade::{Side, Trade};

/// Thresholds for the forced exits and the minimum-holding veto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    pub min_profit_percentage: f64,
    pub max_position_age_hours: f64,
    pub stop_loss_percentage: f64,
    pub min_holding_time_minutes: i64,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            min_profit_percentage: 1.5,
            max_position_age_hours: 24.0,
            stop_loss_percentage: 2.0,
            min_holding_time_minutes: 30,
        }
    }
}

/// Outcome of every forced-exit predicate for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitChecks {
    pub profit_target: bool,
    pub max_age: bool,
    pub stop_loss: bool,
    pub below_min_holding: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NoPosition,
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionChange {
    Opened(Position),
    Increased(Position),
    Closed(Position),
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    Unchanged,
    Capped { from: f64, to: f64 },
    Cleared { quantity: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct PositionLifecycle {
    position: Option<Position>,
}

impl PositionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.position.is_some() {
            LifecycleState::Open
        } else {
            LifecycleState::NoPosition
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn restore(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn clear(&mut self) -> Option<Position> {
        self.position.take()
    }

    /// Apply an executed fill. A buy opens or merges into the position; any
    /// sell closes it entirely.
    pub fn apply(&mut self, trade: &Trade) -> PositionChange {
        match trade.side {
            Side::Buy => match self.position.as_mut() {
                Some(pos) => {
                    pos.add_fill(trade.quantity, trade.price, trade.fee);
                    PositionChange::Increased(pos.clone())
                }
                None => {
                    let mut pos = Position::new(&trade.symbol, trade.quantity, trade.price, trade.timestamp);
                    pos.fees_paid = trade.fee;
                    self.position = Some(pos.clone());
                    PositionChange::Opened(pos)
                }
            },
            Side::Sell => match self.position.take() {
                Some(pos) => PositionChange::Closed(pos),
                None => PositionChange::Unchanged,
            },
        }
    }

    pub fn exit_checks(
        &self,
        price: f64,
        now: DateTime<Utc>,
        rules: &ExitRules,
        sell_fee_rate: f64,
    ) -> Option<ExitChecks> {
        let pos = self.position.as_ref()?;
        Some(ExitChecks {
            profit_target: pos.should_sell_for_profit(price, rules.min_profit_percentage, sell_fee_rate),
            max_age: pos.should_sell_for_time(now, rules.max_position_age_hours),
            stop_loss: pos.should_sell_for_stop_loss(price, rules.stop_loss_percentage, sell_fee_rate),
            below_min_holding: pos.holding_minutes(now) < rules.min_holding_time_minutes,
        })
    }

    /// Align the tracked quantity with the free base balance of the wallet.
    /// Balances below `dust` clear the position.
    pub fn reconcile(&mut self, base_balance: f64, dust: f64) -> Reconciliation {
        let Some(pos) = self.position.as_mut() else {
            return Reconciliation::Unchanged;
        };

        if base_balance < dust {
            let quantity = pos.quantity;
            self.position = None;
            return Reconciliation::Cleared { quantity };
        }

        if base_balance < pos.quantity {
            let from = pos.quantity;
            let fee_share = pos.fees_paid * base_balance / from;
            pos.quantity = base_balance;
            pos.fees_paid = fee_share;
            return Reconciliation::Capped { from, to: base_balance };
        }

        Reconciliation::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()
    }

    fn fill(side: Side, quantity: f64, price: f64, fee: f64) -> Trade {
        Trade {
            symbol: "BTCBRL".into(),
            side,
            quantity,
            price,
            timestamp: t0(),
            fee,
        }
    }

    #[test]
    fn buy_opens_and_sell_closes() {
        let mut lc = PositionLifecycle::new();
        assert_eq!(lc.state(), LifecycleState::NoPosition);

        let change = lc.apply(&fill(Side::Buy, 0.01, 100_000.0, 1.0));
        assert!(matches!(change, PositionChange::Opened(_)));
        assert_eq!(lc.state(), LifecycleState::Open);
        assert!((lc.position().unwrap().fees_paid - 1.0).abs() < f64::EPSILON);

        let change = lc.apply(&fill(Side::Sell, 0.01, 101_000.0, 1.01));
        assert!(matches!(change, PositionChange::Closed(_)));
        assert_eq!(lc.state(), LifecycleState::NoPosition);
    }

    #[test]
    fn second_buy_increases() {
        let mut lc = PositionLifecycle::new();
        lc.apply(&fill(Side::Buy, 0.01, 100_000.0, 1.0));
        let change = lc.apply(&fill(Side::Buy, 0.03, 120_000.0, 3.6));
        match change {
            PositionChange::Increased(pos) => {
                assert!((pos.quantity - 0.04).abs() < 1e-12);
                assert!((pos.entry_price - 115_000.0).abs() < 1e-6);
                assert!((pos.fees_paid - 4.6).abs() < 1e-9);
            }
            other => panic!("expected Increased, got {:?}", other),
        }
    }

    #[test]
    fn sell_without_position_is_unchanged() {
        let mut lc = PositionLifecycle::new();
        assert_eq!(lc.apply(&fill(Side::Sell, 1.0, 1.0, 0.0)), PositionChange::Unchanged);
    }

    #[test]
    fn exit_checks_only_when_open() {
        let lc = PositionLifecycle::new();
        assert!(lc.exit_checks(100.0, t0(), &ExitRules::default(), 0.001).is_none());
    }

    #[test]
    fn exit_checks_evaluate_each_predicate() {
        let mut lc = PositionLifecycle::new();
        lc.restore(Position::new("BTCBRL", 1.0, 100.0, t0()));
        let rules = ExitRules::default();

        let checks = lc.exit_checks(100.0, t0() + Duration::minutes(10), &rules, 0.0).unwrap();
        assert_eq!(
            checks,
            ExitChecks {
                profit_target: false,
                max_age: false,
                stop_loss: false,
                below_min_holding: true,
            }
        );

        let checks = lc.exit_checks(97.0, t0() + Duration::hours(25), &rules, 0.0).unwrap();
        assert!(checks.max_age);
        assert!(checks.stop_loss);
        assert!(!checks.below_min_holding);

        let checks = lc.exit_checks(102.0, t0() + Duration::hours(1), &rules, 0.0).unwrap();
        assert!(checks.profit_target);
    }

    #[test]
    fn reconcile_caps_to_balance() {
        let mut lc = PositionLifecycle::new();
        let mut pos = Position::new("BTCBRL", 0.02, 100_000.0, t0());
        pos.fees_paid = 2.0;
        lc.restore(pos);

        let result = lc.reconcile(0.015, 1e-5);
        assert_eq!(result, Reconciliation::Capped { from: 0.02, to: 0.015 });
        let pos = lc.position().unwrap();
        assert!((pos.quantity - 0.015).abs() < 1e-12);
        assert!((pos.fees_paid - 1.5).abs() < 1e-9);
    }

    #[test]
    fn reconcile_clears_on_dust() {
        let mut lc = PositionLifecycle::new();
        lc.restore(Position::new("BTCBRL", 0.02, 100_000.0, t0()));
        assert_eq!(lc.reconcile(0.000001, 1e-5), Reconciliation::Cleared { quantity: 0.02 });
        assert!(!lc.has_position());
    }

    #[test]
    fn reconcile_keeps_when_balance_covers() {
        let mut lc = PositionLifecycle::new();
        lc.restore(Position::new("BTCBRL", 0.02, 100_000.0, t0()));
        assert_eq!(lc.reconcile(0.05, 1e-5), Reconciliation::Unchanged);
        assert!((lc.position().unwrap().quantity - 0.02).abs() < 1e-12);
    }
}
