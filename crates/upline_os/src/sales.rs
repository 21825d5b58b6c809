#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use upline_engines::validation::AmountPolicy;
use upline_kernel_contracts::member::MemberId;
use upline_kernel_contracts::sale::{SaleAmount, SaleId, SaleRowInput};
use upline_kernel_contracts::{MonotonicTimeNs, Validate};
use upline_storage::repo::{MemberTablesRepo, SalesTablesRepo};

use crate::error::UplineError;

pub struct SaleRecorder<'a, R: MemberTablesRepo + SalesTablesRepo + ?Sized> {
    repo: &'a mut R,
    amount_policy: AmountPolicy,
}

impl<'a, R: MemberTablesRepo + SalesTablesRepo + ?Sized> SaleRecorder<'a, R> {
    pub fn new(repo: &'a mut R, amount_policy: AmountPolicy) -> Self {
        Self {
            repo,
            amount_policy,
        }
    }

    /// Persists one `sales` row and returns it with the accepted amount. Member existence
    /// and the amount are checked first; a rejected call writes nothing.
    pub fn record(
        &mut self,
        member_id: MemberId,
        amount: Decimal,
        now: MonotonicTimeNs,
    ) -> Result<(SaleId, SaleAmount), UplineError> {
        member_id.validate()?;
        if self
            .repo
            .member_row(member_id)
            .map_err(UplineError::Persistence)?
            .is_none()
        {
            return Err(UplineError::invalid("member does not exist"));
        }
        let amount = self.amount_policy.check(amount)?;
        let input = SaleRowInput::v1(member_id, amount, now)?;
        let sale_id = self.repo.insert_sale_row(input)?;
        Ok((sale_id, amount))
    }
}
