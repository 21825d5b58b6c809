#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use upline_kernel_contracts::member::{DisplayName, MemberId, MemberRecord};
use upline_kernel_contracts::payout::{PayoutId, PayoutLevel};
use upline_kernel_contracts::sale::{SaleAmount, SaleId, SaleRecord, SALE_AMOUNT_SCALE};
use upline_kernel_contracts::MonotonicTimeNs;
use upline_storage::ledger::StorageError;
use upline_storage::repo::{MemberTablesRepo, PayoutTablesRepo, SalesTablesRepo};

use crate::hierarchy::HierarchyResolver;

/// A sale row joined with its seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleView {
    pub sale_id: SaleId,
    pub member_id: MemberId,
    pub display_name: DisplayName,
    pub amount: SaleAmount,
    pub created_at: MonotonicTimeNs,
}

/// A payout earned by one member, joined with the sale that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPayoutView {
    pub payout_id: PayoutId,
    pub sale_id: SaleId,
    pub amount: Decimal,
    pub level: PayoutLevel,
    pub sale_amount: SaleAmount,
    pub seller_id: MemberId,
    pub seller_display_name: DisplayName,
    pub created_at: MonotonicTimeNs,
}

/// A payout generated by one sale, joined with its beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalePayoutView {
    pub payout_id: PayoutId,
    pub beneficiary_id: MemberId,
    pub display_name: DisplayName,
    pub amount: Decimal,
    pub level: PayoutLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub member_id: MemberId,
    pub display_name: DisplayName,
    pub depth: u32,
    pub sales_count: usize,
    pub total_sales: Decimal,
    pub payout_count: usize,
    pub total_payouts: Decimal,
}

/// Read-only views over the ledger.
///
/// Nothing here returns an error. A failing store read is logged and reported as empty
/// or zero.
pub struct Reporting<'a, R: MemberTablesRepo + SalesTablesRepo + PayoutTablesRepo + ?Sized> {
    repo: &'a R,
    cycle_guard_hops: u32,
}

impl<'a, R: MemberTablesRepo + SalesTablesRepo + PayoutTablesRepo + ?Sized> Reporting<'a, R> {
    pub fn new(repo: &'a R, cycle_guard_hops: u32) -> Self {
        Self {
            repo,
            cycle_guard_hops,
        }
    }

    pub fn member(&self, member_id: MemberId) -> Option<MemberRecord> {
        degrade("member", self.repo.member_row(member_id))
    }

    /// Direct children, oldest first.
    pub fn children(&self, member_id: MemberId) -> Vec<MemberRecord> {
        degrade("children", self.repo.member_child_rows(member_id))
    }

    pub fn all_members(&self) -> Vec<MemberRecord> {
        degrade("all_members", self.repo.member_rows())
    }

    pub fn member_depth(&self, member_id: MemberId) -> u32 {
        HierarchyResolver::new(self.repo, self.cycle_guard_hops).member_depth(member_id)
    }

    pub fn sale(&self, sale_id: SaleId) -> Option<SaleView> {
        let sale = degrade("sale", self.repo.sale_row(sale_id))?;
        let mut names = NameCache::default();
        self.sale_view(sale, &mut names)
    }

    /// Sales by one member, newest first.
    pub fn member_sales(&self, member_id: MemberId, limit: Option<usize>) -> Vec<SaleView> {
        let rows = degrade("member_sales", self.repo.sale_rows_by_member(member_id));
        self.sale_views(rows, limit)
    }

    /// Every sale in the ledger, newest first.
    pub fn all_sales(&self, limit: Option<usize>) -> Vec<SaleView> {
        let rows = degrade("all_sales", self.repo.sale_rows());
        self.sale_views(rows, limit)
    }

    pub fn member_total_sales(&self, member_id: MemberId) -> Decimal {
        let rows = degrade(
            "member_total_sales",
            self.repo.sale_rows_by_member(member_id),
        );
        money_total(rows.iter().map(|s| s.amount.value()))
    }

    pub fn member_sales_count(&self, member_id: MemberId) -> usize {
        degrade(
            "member_sales_count",
            self.repo.sale_rows_by_member(member_id),
        )
        .len()
    }

    /// Payouts earned by one member, newest first.
    pub fn member_payouts(&self, member_id: MemberId, limit: Option<usize>) -> Vec<MemberPayoutView> {
        let rows = degrade("member_payouts", self.repo.payout_rows_by_member(member_id));
        let mut names = NameCache::default();
        let mut views = Vec::with_capacity(rows.len());
        for payout in rows {
            let Some(sale) = degrade("member_payouts", self.repo.sale_row(payout.sale_id)) else {
                continue;
            };
            let Some(seller_display_name) = names.lookup(self.repo, sale.member_id) else {
                continue;
            };
            views.push(MemberPayoutView {
                payout_id: payout.payout_id,
                sale_id: payout.sale_id,
                amount: payout.amount,
                level: payout.level,
                sale_amount: sale.amount,
                seller_id: sale.member_id,
                seller_display_name,
                created_at: payout.created_at,
            });
        }
        apply_limit(views, limit)
    }

    /// Payouts produced by one sale, ordered by level.
    pub fn sale_payouts(&self, sale_id: SaleId) -> Vec<SalePayoutView> {
        let rows = degrade("sale_payouts", self.repo.payout_rows_by_sale(sale_id));
        let mut names = NameCache::default();
        rows.into_iter()
            .filter_map(|payout| {
                let display_name = names.lookup(self.repo, payout.beneficiary_id)?;
                Some(SalePayoutView {
                    payout_id: payout.payout_id,
                    beneficiary_id: payout.beneficiary_id,
                    display_name,
                    amount: payout.amount,
                    level: payout.level,
                })
            })
            .collect()
    }

    pub fn member_total_payouts(&self, member_id: MemberId) -> Decimal {
        let rows = degrade(
            "member_total_payouts",
            self.repo.payout_rows_by_member(member_id),
        );
        money_total(rows.iter().map(|p| p.amount))
    }

    pub fn member_payout_count(&self, member_id: MemberId) -> usize {
        degrade(
            "member_payout_count",
            self.repo.payout_rows_by_member(member_id),
        )
        .len()
    }

    pub fn member_summary(&self, member_id: MemberId) -> Option<MemberSummary> {
        let member = self.member(member_id)?;
        Some(MemberSummary {
            member_id,
            display_name: member.display_name,
            depth: self.member_depth(member_id),
            sales_count: self.member_sales_count(member_id),
            total_sales: self.member_total_sales(member_id),
            payout_count: self.member_payout_count(member_id),
            total_payouts: self.member_total_payouts(member_id),
        })
    }

    fn sale_views(&self, rows: Vec<SaleRecord>, limit: Option<usize>) -> Vec<SaleView> {
        let mut names = NameCache::default();
        let views = rows
            .into_iter()
            .filter_map(|sale| self.sale_view(sale, &mut names))
            .collect();
        apply_limit(views, limit)
    }

    fn sale_view(&self, sale: SaleRecord, names: &mut NameCache) -> Option<SaleView> {
        let display_name = names.lookup(self.repo, sale.member_id)?;
        Some(SaleView {
            sale_id: sale.sale_id,
            member_id: sale.member_id,
            display_name,
            amount: sale.amount,
            created_at: sale.created_at,
        })
    }
}

// Rows whose join target is missing are skipped, like an inner join.
#[derive(Default)]
struct NameCache {
    names: BTreeMap<MemberId, Option<DisplayName>>,
}

impl NameCache {
    fn lookup<R: MemberTablesRepo + ?Sized>(
        &mut self,
        repo: &R,
        member_id: MemberId,
    ) -> Option<DisplayName> {
        self.names
            .entry(member_id)
            .or_insert_with(|| {
                degrade("member_join", repo.member_row(member_id)).map(|m| m.display_name)
            })
            .clone()
    }
}

fn degrade<T: Default>(op: &'static str, result: Result<T, StorageError>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => {
            warn!(op, error = %err, "reporting read failed; returning empty result");
            T::default()
        }
    }
}

fn apply_limit<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit.filter(|n| *n > 0) {
        rows.truncate(n);
    }
    rows
}

fn money_total(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    let mut total: Decimal = amounts.sum();
    total.rescale(SALE_AMOUNT_SCALE);
    total
}
