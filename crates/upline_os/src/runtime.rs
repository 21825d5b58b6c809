#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use upline_engines::commission::CommissionTable;
use upline_engines::validation::AmountPolicy;
use upline_kernel_contracts::member::MemberId;
use upline_kernel_contracts::payout::MAX_COMMISSION_LEVELS;
use upline_kernel_contracts::sale::SaleAmount;
use upline_kernel_contracts::{ContractViolation, MonotonicTimeNs};
use upline_storage::repo::UplineLedgerRepo;

use crate::coordinator::{SaleWithPayoutsOutcome, TransactionCoordinator, UnitFailure};
use crate::error::UplineError;
use crate::hierarchy::{HierarchyResolver, UplineEntry, DEFAULT_CYCLE_GUARD_HOPS};
use crate::members::MemberDirectory;
use crate::reporting::Reporting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplineWiringConfig {
    /// Default depth for upline queries; must match the commission table.
    pub max_levels: u8,
    pub cycle_guard_hops: u32,
}

impl UplineWiringConfig {
    pub fn mvp_v1() -> Self {
        Self {
            max_levels: 5,
            cycle_guard_hops: DEFAULT_CYCLE_GUARD_HOPS,
        }
    }
}

/// Owns a ledger repo and the policies applied to it.
pub struct UplineRuntime<R: UplineLedgerRepo> {
    repo: R,
    config: UplineWiringConfig,
    table: CommissionTable,
    amount_policy: AmountPolicy,
}

impl<R: UplineLedgerRepo> UplineRuntime<R> {
    pub fn new(
        repo: R,
        config: UplineWiringConfig,
        table: CommissionTable,
        amount_policy: AmountPolicy,
    ) -> Result<Self, ContractViolation> {
        if config.max_levels == 0 || config.max_levels > MAX_COMMISSION_LEVELS {
            return Err(ContractViolation::InvalidValue {
                field: "upline_wiring_config.max_levels",
                reason: "must be within 1..=16",
            });
        }
        if config.max_levels != table.max_levels() {
            return Err(ContractViolation::InvalidValue {
                field: "upline_wiring_config.max_levels",
                reason: "must equal the commission table depth",
            });
        }
        if config.cycle_guard_hops <= u32::from(config.max_levels)
            || config.cycle_guard_hops > 10_000
        {
            return Err(ContractViolation::InvalidValue {
                field: "upline_wiring_config.cycle_guard_hops",
                reason: "must exceed max_levels and be <= 10_000",
            });
        }
        Ok(Self {
            repo,
            config,
            table,
            amount_policy,
        })
    }

    pub fn mvp_v1(repo: R) -> Self {
        Self {
            repo,
            config: UplineWiringConfig::mvp_v1(),
            table: CommissionTable::mvp_v1(),
            amount_policy: AmountPolicy::mvp_v1(),
        }
    }

    pub fn config(&self) -> UplineWiringConfig {
        self.config
    }

    pub fn commission_table(&self) -> &CommissionTable {
        &self.table
    }

    pub fn amount_policy(&self) -> AmountPolicy {
        self.amount_policy
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn create_member(
        &mut self,
        display_name: &str,
        contact_address: &str,
        parent_id: Option<MemberId>,
        now: MonotonicTimeNs,
    ) -> Result<MemberId, UplineError> {
        MemberDirectory::new(&mut self.repo, self.config.cycle_guard_hops).create_member(
            display_name,
            contact_address,
            parent_id,
            now,
        )
    }

    pub fn get_upline(&self, member_id: MemberId) -> Vec<UplineEntry> {
        self.get_upline_bounded(member_id, self.config.max_levels)
    }

    pub fn get_upline_bounded(&self, member_id: MemberId, max_levels: u8) -> Vec<UplineEntry> {
        HierarchyResolver::new(&self.repo, self.config.cycle_guard_hops)
            .resolve_upline(member_id, max_levels)
    }

    pub fn record_sale_with_payouts(
        &mut self,
        member_id: MemberId,
        amount: SaleAmount,
        now: MonotonicTimeNs,
    ) -> SaleWithPayoutsOutcome {
        self.record_sale_with_payouts_raw(member_id, amount.value(), now)
    }

    /// Same unit of work for an amount that has not been validated yet. A rejected amount
    /// comes back as `RolledBack` with nothing written.
    pub fn record_sale_with_payouts_raw(
        &mut self,
        member_id: MemberId,
        amount: Decimal,
        now: MonotonicTimeNs,
    ) -> SaleWithPayoutsOutcome {
        TransactionCoordinator::new(
            &mut self.repo,
            &self.table,
            self.amount_policy,
            self.config.cycle_guard_hops,
        )
        .record_sale_with_payouts(member_id, amount, now)
    }

    /// Takes the amount as submitted text. Text the amount policy rejects is reported as
    /// an `InvalidArgument` rollback without opening a unit.
    pub fn record_sale_with_payouts_text(
        &mut self,
        member_id: MemberId,
        amount: &str,
        now: MonotonicTimeNs,
    ) -> SaleWithPayoutsOutcome {
        match self.amount_policy.check_str(amount) {
            Ok(amount) => self.record_sale_with_payouts(member_id, amount, now),
            Err(violation) => SaleWithPayoutsOutcome::RolledBack(UnitFailure::from_error(
                &UplineError::from(violation),
            )),
        }
    }

    pub fn reporting(&self) -> Reporting<'_, R> {
        Reporting::new(&self.repo, self.config.cycle_guard_hops)
    }
}
