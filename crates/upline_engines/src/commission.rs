#![forbid(unsafe_code)]

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use upline_kernel_contracts::payout::{CommissionRate, PayoutLevel, MAX_COMMISSION_LEVELS};
use upline_kernel_contracts::sale::{SaleAmount, SALE_AMOUNT_SCALE};
use upline_kernel_contracts::{ContractViolation, Validate};

/// Level-indexed commission percentages. Index 0 holds the level-1 rate.
///
/// Rates never increase with depth: a farther ancestor never earns more than a nearer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionTable {
    rates: Vec<Decimal>,
}

impl CommissionTable {
    /// 10 / 5 / 3 / 2 / 1 percent for levels 1..=5.
    pub fn mvp_v1() -> Self {
        Self {
            rates: vec![
                Decimal::from(10),
                Decimal::from(5),
                Decimal::from(3),
                Decimal::from(2),
                Decimal::from(1),
            ],
        }
    }

    pub fn new(rates: Vec<CommissionRate>) -> Result<Self, ContractViolation> {
        if rates.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "commission_table.rates",
                reason: "must not be empty",
            });
        }
        if rates.len() > MAX_COMMISSION_LEVELS as usize {
            return Err(ContractViolation::InvalidRange {
                field: "commission_table.rates",
                min: 1.0,
                max: MAX_COMMISSION_LEVELS as f64,
                got: rates.len() as f64,
            });
        }
        for rate in &rates {
            rate.validate()?;
        }
        if rates.windows(2).any(|w| w[1] > w[0]) {
            return Err(ContractViolation::InvalidValue {
                field: "commission_table.rates",
                reason: "must be non-increasing with level",
            });
        }
        Ok(Self {
            rates: rates.into_iter().map(|r| r.value()).collect(),
        })
    }

    pub fn max_levels(&self) -> u8 {
        // Bounded by MAX_COMMISSION_LEVELS at construction.
        self.rates.len() as u8
    }

    pub fn rate_for_level(&self, level: PayoutLevel) -> Result<CommissionRate, ContractViolation> {
        let idx = level.0 as usize;
        if idx == 0 || idx > self.rates.len() {
            return Err(ContractViolation::InvalidRange {
                field: "commission_table.level",
                min: 1.0,
                max: self.rates.len() as f64,
                got: level.0 as f64,
            });
        }
        CommissionRate::percent(self.rates[idx - 1])
    }

    pub fn levels(&self) -> Vec<(PayoutLevel, Decimal)> {
        self.rates
            .iter()
            .enumerate()
            .map(|(i, r)| (PayoutLevel(i as u8 + 1), *r))
            .collect()
    }
}

/// `sale_amount * rate / 100`, rounded half away from zero to two fractional digits.
pub fn commission_amount(sale_amount: SaleAmount, rate: CommissionRate) -> Decimal {
    let raw = sale_amount.value() * rate.value() / Decimal::ONE_HUNDRED;
    let mut rounded =
        raw.round_dp_with_strategy(SALE_AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SALE_AMOUNT_SCALE);
    rounded
}
