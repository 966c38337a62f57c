//! Currencies, purchase cost curves and the warehouse sale draw.

use crate::die::DieKind;
use crate::rng::SimRng;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurrencyKind {
    PlainBuck,
    GoldBuck,
}

impl CurrencyKind {
    pub fn all() -> [CurrencyKind; 2] {
        [CurrencyKind::PlainBuck, CurrencyKind::GoldBuck]
    }
}

// ---------------------------------------------------------------------------
// Cost curves
// ---------------------------------------------------------------------------

/// Price of the next object of a kind as a function of how many are placed.
///
/// Both growing curves are strictly increasing in `n` until they saturate
/// at `u64::MAX`, which is also the sentinel for `Unbuyable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostCurve {
    /// `coefficient * (n + 1)^exponent`
    Power { coefficient: u64, exponent: u32 },
    /// `coefficient * base^(n + 1)`
    Exponential { coefficient: u64, base: u64 },
    Unbuyable,
}

impl CostCurve {
    /// Sentinel cost reported for kinds that cannot be bought.
    pub const UNBUYABLE: u64 = u64::MAX;

    pub fn cost(&self, placed: u64) -> u64 {
        let next = placed.saturating_add(1);
        match *self {
            CostCurve::Power {
                coefficient,
                exponent,
            } => saturating_pow(next, exponent).saturating_mul(coefficient),
            CostCurve::Exponential { coefficient, base } => {
                let exponent = u32::try_from(next).unwrap_or(u32::MAX);
                saturating_pow(base, exponent).saturating_mul(coefficient)
            }
            CostCurve::Unbuyable => Self::UNBUYABLE,
        }
    }

    pub fn is_purchasable(&self) -> bool {
        !matches!(self, CostCurve::Unbuyable)
    }
}

fn saturating_pow(base: u64, exponent: u32) -> u64 {
    base.checked_pow(exponent).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Balances per currency. Only a successful purchase ever lowers one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    balances: BTreeMap<CurrencyKind, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(balances: impl IntoIterator<Item = (CurrencyKind, u64)>) -> Self {
        let mut ledger = Self::new();
        for (currency, amount) in balances {
            ledger.credit(currency, amount);
        }
        ledger
    }

    pub fn balance(&self, currency: CurrencyKind) -> u64 {
        self.balances.get(&currency).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, currency: CurrencyKind, amount: u64) {
        let balance = self.balances.entry(currency).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Subtract `amount` if the balance covers it; otherwise change nothing.
    pub fn pay(&mut self, currency: CurrencyKind, amount: u64) -> bool {
        let balance = self.balance(currency);
        if balance < amount {
            return false;
        }
        if amount > 0 {
            self.balances.insert(currency, balance - amount);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurrencyKind, u64)> + '_ {
        self.balances.iter().map(|(&c, &a)| (c, a))
    }
}

// ---------------------------------------------------------------------------
// Sale draw
// ---------------------------------------------------------------------------

/// Choose the die the warehouse sells next: a kind uniformly among kinds in
/// stock, then a face uniformly among that kind's stocked faces.
pub fn pick_sale(stock: &Storage, rng: &mut SimRng) -> Option<(DieKind, u8)> {
    let kinds: Vec<DieKind> = stock.kinds_present().collect();
    let kind = *rng.pick(&kinds)?;
    let faces = stock.faces_present(kind);
    let face = *rng.pick(&faces)?;
    Some((kind, face))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_curves_match_original_prices() {
        let belt = CostCurve::Power {
            coefficient: 1,
            exponent: 2,
        };
        let builder = CostCurve::Exponential {
            coefficient: 1,
            base: 2,
        };
        let upgrader = CostCurve::Exponential {
            coefficient: 10,
            base: 3,
        };
        assert_eq!(belt.cost(0), 1);
        assert_eq!(belt.cost(3), 16);
        assert_eq!(builder.cost(0), 2);
        assert_eq!(builder.cost(4), 32);
        assert_eq!(upgrader.cost(0), 30);
        assert_eq!(upgrader.cost(1), 90);
    }

    #[test]
    fn curves_saturate_instead_of_overflowing() {
        let builder = CostCurve::Exponential {
            coefficient: 1,
            base: 2,
        };
        assert_eq!(builder.cost(100), u64::MAX);
        assert_eq!(CostCurve::Unbuyable.cost(0), CostCurve::UNBUYABLE);
        assert!(!CostCurve::Unbuyable.is_purchasable());
    }

    #[test]
    fn pay_is_check_then_subtract() {
        let mut ledger = Ledger::with_balances([(CurrencyKind::PlainBuck, 5)]);
        assert!(!ledger.pay(CurrencyKind::PlainBuck, 6));
        assert_eq!(ledger.balance(CurrencyKind::PlainBuck), 5);
        assert!(ledger.pay(CurrencyKind::PlainBuck, 5));
        assert_eq!(ledger.balance(CurrencyKind::PlainBuck), 0);
        assert!(ledger.pay(CurrencyKind::GoldBuck, 0));
    }

    #[test]
    fn free_payment_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        let before = ledger.clone();
        assert!(ledger.pay(CurrencyKind::GoldBuck, 0));
        assert_eq!(ledger, before);
        assert_eq!(ledger.iter().count(), 0);
    }

    #[test]
    fn pick_sale_empty_stock_is_none() {
        let mut rng = SimRng::new(1);
        assert!(pick_sale(&Storage::new(10, 0), &mut rng).is_none());
    }

    #[test]
    fn pick_sale_only_returns_stocked_buckets() {
        let mut rng = SimRng::new(11);
        let mut stock = Storage::new(100, 0);
        stock.store_die(DieKind::Gold, 3);
        stock.store_dice(DieKind::Plain, 5, 20);
        for _ in 0..50 {
            let (kind, face) = pick_sale(&stock, &mut rng).unwrap();
            assert!(stock.quantity(kind, face) > 0);
        }
    }

    #[test]
    fn pick_sale_is_two_stage() {
        // One gold die against many plain ones: the gold kind is still
        // chosen about half the time.
        let mut rng = SimRng::new(99);
        let mut stock = Storage::new(1000, 0);
        stock.store_die(DieKind::Gold, 1);
        for face in 1..=6 {
            stock.store_dice(DieKind::Plain, face, 100);
        }
        let gold = (0..2_000)
            .filter(|_| matches!(pick_sale(&stock, &mut rng), Some((DieKind::Gold, _))))
            .count();
        assert!((800..=1200).contains(&gold), "gold picked {gold} times");
    }
}
