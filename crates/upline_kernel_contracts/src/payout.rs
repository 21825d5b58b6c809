#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::member::MemberId;
use crate::sale::{SaleId, SALE_AMOUNT_SCALE};
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

/// Upper bound for any commission table depth.
pub const MAX_COMMISSION_LEVELS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayoutId(pub u64);

impl Validate for PayoutId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "payout_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Parent-hop distance from a sale's owner to the beneficiary. Level 1 is the direct parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayoutLevel(pub u8);

impl Validate for PayoutLevel {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 || self.0 > MAX_COMMISSION_LEVELS {
            return Err(ContractViolation::InvalidRange {
                field: "payout_level",
                min: 1.0,
                max: MAX_COMMISSION_LEVELS as f64,
                got: self.0 as f64,
            });
        }
        Ok(())
    }
}

/// Commission percentage, e.g. `10` means ten percent of the sale amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct CommissionRate(Decimal);

impl CommissionRate {
    pub fn percent(value: Decimal) -> Result<Self, ContractViolation> {
        let rate = CommissionRate(value);
        rate.validate()?;
        Ok(rate)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Validate for CommissionRate {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 <= Decimal::ZERO || self.0 > Decimal::ONE_HUNDRED {
            return Err(ContractViolation::InvalidValue {
                field: "commission_rate",
                reason: "must be within (0, 100]",
            });
        }
        Ok(())
    }
}

impl TryFrom<Decimal> for CommissionRate {
    type Error = ContractViolation;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        CommissionRate::percent(value)
    }
}

impl From<CommissionRate> for Decimal {
    fn from(value: CommissionRate) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutRowInput {
    pub sale_id: SaleId,
    pub beneficiary_id: MemberId,
    pub amount: Decimal,
    pub level: PayoutLevel,
    pub created_at: MonotonicTimeNs,
}

impl PayoutRowInput {
    pub fn v1(
        sale_id: SaleId,
        beneficiary_id: MemberId,
        amount: Decimal,
        level: PayoutLevel,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            sale_id,
            beneficiary_id,
            amount,
            level,
            created_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for PayoutRowInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.sale_id.validate()?;
        self.beneficiary_id.validate()?;
        self.level.validate()?;
        if self.amount.is_sign_negative() {
            return Err(ContractViolation::InvalidValue {
                field: "payout_row_input.amount",
                reason: "must be >= 0",
            });
        }
        if self.amount.scale() > SALE_AMOUNT_SCALE {
            return Err(ContractViolation::InvalidValue {
                field: "payout_row_input.amount",
                reason: "must be rounded to 2 fractional digits",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub schema_version: SchemaVersion,
    pub payout_id: PayoutId,
    pub sale_id: SaleId,
    pub beneficiary_id: MemberId,
    pub amount: Decimal,
    pub level: PayoutLevel,
    pub created_at: MonotonicTimeNs,
}

impl PayoutRecord {
    pub fn from_input(payout_id: PayoutId, input: PayoutRowInput) -> Self {
        Self {
            schema_version: SchemaVersion(1),
            payout_id,
            sale_id: input.sale_id,
            beneficiary_id: input.beneficiary_id,
            amount: input.amount,
            level: input.level,
            created_at: input.created_at,
        }
    }
}
