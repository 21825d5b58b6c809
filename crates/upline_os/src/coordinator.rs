#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{error, info, warn};

use upline_engines::commission::CommissionTable;
use upline_engines::validation::AmountPolicy;
use upline_kernel_contracts::member::MemberId;
use upline_kernel_contracts::sale::{SaleAmount, SaleId};
use upline_kernel_contracts::MonotonicTimeNs;
use upline_storage::ledger::StorageError;
use upline_storage::repo::UplineLedgerRepo;

use crate::error::UplineError;
use crate::payouts::{PayoutEngine, PayoutResult};
use crate::sales::SaleRecorder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    pub sale_id: SaleId,
    pub amount: SaleAmount,
    pub member_id: MemberId,
    pub payouts: Vec<PayoutResult>,
    pub payout_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidArgument,
    Persistence,
    /// The unit of work itself could not be opened or committed.
    Transaction,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidArgument => "INVALID_ARGUMENT",
            FailureKind::Persistence => "PERSISTENCE",
            FailureKind::Transaction => "TRANSACTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub kind: FailureKind,
    pub error: String,
}

impl UnitFailure {
    pub fn from_error(err: &UplineError) -> Self {
        let kind = if err.is_invalid_argument() {
            FailureKind::InvalidArgument
        } else {
            FailureKind::Persistence
        };
        Self {
            kind,
            error: err.to_string(),
        }
    }

    fn transaction(err: &StorageError) -> Self {
        Self {
            kind: FailureKind::Transaction,
            error: format!("transaction failure: {err}"),
        }
    }
}

/// Result of one sale-with-payouts unit of work.
///
/// `RolledBack` guarantees no `sales` or `payouts` row from the attempt survived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleWithPayoutsOutcome {
    Committed(SaleReceipt),
    RolledBack(UnitFailure),
}

impl SaleWithPayoutsOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SaleWithPayoutsOutcome::Committed(_))
    }

    pub fn payout_count(&self) -> usize {
        match self {
            SaleWithPayoutsOutcome::Committed(receipt) => receipt.payout_count,
            SaleWithPayoutsOutcome::RolledBack(_) => 0,
        }
    }

    pub fn receipt(&self) -> Option<&SaleReceipt> {
        match self {
            SaleWithPayoutsOutcome::Committed(receipt) => Some(receipt),
            SaleWithPayoutsOutcome::RolledBack(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&UnitFailure> {
        match self {
            SaleWithPayoutsOutcome::Committed(_) => None,
            SaleWithPayoutsOutcome::RolledBack(failure) => Some(failure),
        }
    }
}

// Wire shape: `{"success": true, "sale_id", "amount", "member_id", "payouts", "payout_count"}`
// or `{"success": false, "error", "kind"}`.
impl Serialize for SaleWithPayoutsOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SaleWithPayoutsOutcome::Committed(r) => {
                let mut st = serializer.serialize_struct("SaleWithPayoutsOutcome", 6)?;
                st.serialize_field("success", &true)?;
                st.serialize_field("sale_id", &r.sale_id)?;
                st.serialize_field("amount", &r.amount)?;
                st.serialize_field("member_id", &r.member_id)?;
                st.serialize_field("payouts", &r.payouts)?;
                st.serialize_field("payout_count", &r.payout_count)?;
                st.end()
            }
            SaleWithPayoutsOutcome::RolledBack(f) => {
                let mut st = serializer.serialize_struct("SaleWithPayoutsOutcome", 3)?;
                st.serialize_field("success", &false)?;
                st.serialize_field("error", &f.error)?;
                st.serialize_field("kind", f.kind.as_str())?;
                st.end()
            }
        }
    }
}

/// Runs sale recording and payout distribution as one unit of work.
///
/// Unit states: Idle -> UnitOpen -> SaleWritten -> PayoutsWritten -> Committed, or
/// RolledBack from any state after UnitOpen.
pub struct TransactionCoordinator<'a, R: UplineLedgerRepo + ?Sized> {
    repo: &'a mut R,
    table: &'a CommissionTable,
    amount_policy: AmountPolicy,
    cycle_guard_hops: u32,
}

impl<'a, R: UplineLedgerRepo + ?Sized> TransactionCoordinator<'a, R> {
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

    pub fn record_sale_with_payouts(
        &mut self,
        member_id: MemberId,
        amount: Decimal,
        now: MonotonicTimeNs,
    ) -> SaleWithPayoutsOutcome {
        if let Err(err) = self.repo.begin_unit() {
            // The open unit, if any, belongs to someone else; leave it alone.
            warn!(member_id = member_id.0, error = %err, "could not open sale unit");
            return SaleWithPayoutsOutcome::RolledBack(UnitFailure::transaction(&err));
        }

        let receipt = match self.run_unit(member_id, amount, now) {
            Ok(receipt) => receipt,
            Err(err) => {
                self.roll_back(member_id);
                warn!(member_id = member_id.0, error = %err, "sale unit rolled back");
                return SaleWithPayoutsOutcome::RolledBack(UnitFailure::from_error(&err));
            }
        };

        if let Err(err) = self.repo.commit_unit() {
            if self.repo.has_open_unit() {
                self.roll_back(member_id);
            }
            warn!(member_id = member_id.0, error = %err, "sale unit commit failed");
            return SaleWithPayoutsOutcome::RolledBack(UnitFailure::transaction(&err));
        }

        info!(
            sale_id = receipt.sale_id.0,
            member_id = member_id.0,
            payout_count = receipt.payout_count,
            "sale unit committed"
        );
        SaleWithPayoutsOutcome::Committed(receipt)
    }

    fn run_unit(
        &mut self,
        member_id: MemberId,
        amount: Decimal,
        now: MonotonicTimeNs,
    ) -> Result<SaleReceipt, UplineError> {
        let (sale_id, amount) =
            SaleRecorder::new(&mut *self.repo, self.amount_policy).record(member_id, amount, now)?;
        let payouts = PayoutEngine::new(
            &mut *self.repo,
            self.table,
            self.amount_policy,
            self.cycle_guard_hops,
        )
        .distribute(sale_id, member_id, amount.value(), now)?;
        Ok(SaleReceipt {
            sale_id,
            amount,
            member_id,
            payout_count: payouts.len(),
            payouts,
        })
    }

    fn roll_back(&mut self, member_id: MemberId) {
        if let Err(err) = self.repo.rollback_unit() {
            error!(member_id = member_id.0, error = %err, "sale unit rollback failed");
        }
    }
}
