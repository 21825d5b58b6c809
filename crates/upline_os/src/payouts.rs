#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use upline_engines::commission::{commission_amount, CommissionTable};
use upline_engines::validation::{check_sale_id, AmountPolicy};
use upline_kernel_contracts::member::{DisplayName, MemberId};
use upline_kernel_contracts::payout::{CommissionRate, PayoutId, PayoutLevel, PayoutRowInput};
use upline_kernel_contracts::sale::SaleId;
use upline_kernel_contracts::MonotonicTimeNs;
use upline_storage::repo::{MemberTablesRepo, PayoutTablesRepo};

use crate::error::UplineError;
use crate::hierarchy::HierarchyResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutResult {
    pub payout_id: PayoutId,
    pub beneficiary_id: MemberId,
    pub display_name: DisplayName,
    pub level: PayoutLevel,
    pub amount: Decimal,
    pub rate: CommissionRate,
}

/// Computes and persists one payout per ancestor of the payer.
pub struct PayoutEngine<'a, R: MemberTablesRepo + PayoutTablesRepo + ?Sized> {
    repo: &'a mut R,
    table: &'a CommissionTable,
    amount_policy: AmountPolicy,
    cycle_guard_hops: u32,
}

impl<'a, R: MemberTablesRepo + PayoutTablesRepo + ?Sized> PayoutEngine<'a, R> {
    pub fn new(
        repo: &'a mut R,
        table: &'a CommissionTable,
        amount_policy: AmountPolicy,
        cycle_guard_hops: u32,
    ) -> Self {
        Self {
            repo,
            table,
            amount_policy,
            cycle_guard_hops,
        }
    }

    /// Payout rows in upline order, nearest ancestor first.
    ///
    /// Preconditions are checked before the first write. A failing payout insert is
    /// returned as-is; rows already written by this call are left for the caller's unit
    /// of work to roll back.
    pub fn distribute(
        &mut self,
        sale_id: SaleId,
        payer_id: MemberId,
        sale_amount: Decimal,
        now: MonotonicTimeNs,
    ) -> Result<Vec<PayoutResult>, UplineError> {
        check_sale_id(sale_id)?;
        if self
            .repo
            .member_row(payer_id)
            .map_err(UplineError::Persistence)?
            .is_none()
        {
            return Err(UplineError::invalid("payer member does not exist"));
        }
        let sale_amount = self.amount_policy.check(sale_amount)?;

        let upline = HierarchyResolver::new(&*self.repo, self.cycle_guard_hops)
            .resolve_upline(payer_id, self.table.max_levels());

        let mut payouts = Vec::with_capacity(upline.len());
        for entry in upline {
            let rate = self.table.rate_for_level(entry.level)?;
            let amount = commission_amount(sale_amount, rate);
            let input =
                PayoutRowInput::v1(sale_id, entry.beneficiary_id, amount, entry.level, now)?;
            let payout_id = self.repo.insert_payout_row(input)?;
            debug!(
                sale_id = sale_id.0,
                beneficiary_id = entry.beneficiary_id.0,
                level = entry.level.0,
                %amount,
                "payout written"
            );
            payouts.push(PayoutResult {
                payout_id,
                beneficiary_id: entry.beneficiary_id,
                display_name: entry.display_name,
                level: entry.level,
                amount,
                rate,
            });
        }
        Ok(payouts)
    }
}
