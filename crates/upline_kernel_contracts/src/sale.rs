#![forbid(unsafe_code)]

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::member::MemberId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const SALE_AMOUNT_SCALE: u32 = 2;

/// Inclusive ceiling for a single sale: 99,999,999.99.
pub fn sale_amount_max() -> Decimal {
    Decimal::new(9_999_999_999, SALE_AMOUNT_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SaleId(pub u64);

impl Validate for SaleId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "sale_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Positive monetary amount with at most two fractional digits.
///
/// The stored value is always rescaled to exactly two fractional digits so that
/// `100`, `100.0` and `100.00` are the same amount and render as `100.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct SaleAmount(Decimal);

impl SaleAmount {
    pub fn new(value: Decimal) -> Result<Self, ContractViolation> {
        if value <= Decimal::ZERO {
            return Err(ContractViolation::InvalidValue {
                field: "sale_amount",
                reason: "must be > 0",
            });
        }
        let mut normalized = value.normalize();
        if normalized.scale() > SALE_AMOUNT_SCALE {
            return Err(ContractViolation::InvalidValue {
                field: "sale_amount",
                reason: "must have at most 2 fractional digits",
            });
        }
        if normalized > sale_amount_max() {
            return Err(ContractViolation::InvalidValue {
                field: "sale_amount",
                reason: "must be <= 99999999.99",
            });
        }
        normalized.rescale(SALE_AMOUNT_SCALE);
        Ok(Self(normalized))
    }

    pub fn parse(raw: &str) -> Result<Self, ContractViolation> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| ContractViolation::InvalidValue {
            field: "sale_amount",
            reason: "must be a decimal number",
        })?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Validate for SaleAmount {
    fn validate(&self) -> Result<(), ContractViolation> {
        SaleAmount::new(self.0).map(|_| ())
    }
}

impl TryFrom<Decimal> for SaleAmount {
    type Error = ContractViolation;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        SaleAmount::new(value)
    }
}

impl From<SaleAmount> for Decimal {
    fn from(value: SaleAmount) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRowInput {
    pub member_id: MemberId,
    pub amount: SaleAmount,
    pub created_at: MonotonicTimeNs,
}

impl SaleRowInput {
    pub fn v1(
        member_id: MemberId,
        amount: SaleAmount,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            member_id,
            amount,
            created_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for SaleRowInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.member_id.validate()?;
        self.amount.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub schema_version: SchemaVersion,
    pub sale_id: SaleId,
    pub member_id: MemberId,
    pub amount: SaleAmount,
    pub created_at: MonotonicTimeNs,
}

impl SaleRecord {
    pub fn from_input(sale_id: SaleId, input: SaleRowInput) -> Self {
        Self {
            schema_version: SchemaVersion(1),
            sale_id,
            member_id: input.member_id,
            amount: input.amount,
            created_at: input.created_at,
        }
    }
}
