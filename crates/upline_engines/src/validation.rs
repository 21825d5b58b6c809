#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use upline_kernel_contracts::sale::{sale_amount_max, SaleAmount, SaleId};
use upline_kernel_contracts::{ContractViolation, Validate};

/// Acceptance policy for incoming sale amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountPolicy {
    pub ceiling: Decimal,
}

impl AmountPolicy {
    pub fn mvp_v1() -> Self {
        Self {
            ceiling: sale_amount_max(),
        }
    }

    pub fn new(ceiling: Decimal) -> Result<Self, ContractViolation> {
        if ceiling <= Decimal::ZERO || ceiling > sale_amount_max() {
            return Err(ContractViolation::InvalidValue {
                field: "amount_policy.ceiling",
                reason: "must be within (0, 99999999.99]",
            });
        }
        Ok(Self { ceiling })
    }

    pub fn check(&self, raw: Decimal) -> Result<SaleAmount, ContractViolation> {
        let amount = SaleAmount::new(raw)?;
        if amount.value() > self.ceiling {
            return Err(ContractViolation::InvalidValue {
                field: "sale_amount",
                reason: "exceeds configured ceiling",
            });
        }
        Ok(amount)
    }

    pub fn check_str(&self, raw: &str) -> Result<SaleAmount, ContractViolation> {
        let amount = SaleAmount::parse(raw)?;
        self.check(amount.value())
    }
}

pub fn check_sale_id(sale_id: SaleId) -> Result<SaleId, ContractViolation> {
    sale_id.validate()?;
    Ok(sale_id)
}
