#![forbid(unsafe_code)]

use std::str::FromStr;

use rust_decimal::Decimal;
use upline_kernel_contracts::member::{MemberId, MemberRecord, MemberRowInput};
use upline_kernel_contracts::payout::{PayoutId, PayoutRecord, PayoutRowInput};
use upline_kernel_contracts::sale::{SaleAmount, SaleId, SaleRecord, SaleRowInput};
use upline_kernel_contracts::MonotonicTimeNs;
use upline_os::reporting::Reporting;
use upline_os::{FailureKind, UplineRuntime};
use upline_storage::ledger::{StorageError, UplineLedgerStore};
use upline_storage::repo::{MemberTablesRepo, PayoutTablesRepo, SalesTablesRepo, UnitOfWorkRepo};

/// Ledger store with switchable failures.
#[derive(Default)]
struct FaultyRepo {
    inner: UplineLedgerStore,
    /// 1-based index of the payout insert that fails.
    fail_payout_insert_at: Option<usize>,
    payout_inserts: usize,
    fail_reads: bool,
    fail_commit: bool,
}

fn unavailable() -> StorageError {
    StorageError::Unavailable {
        reason: "injected fault".to_string(),
    }
}

impl FaultyRepo {
    fn read_guard(&self) -> Result<(), StorageError> {
        if self.fail_reads {
            return Err(unavailable());
        }
        Ok(())
    }
}

impl UnitOfWorkRepo for FaultyRepo {
    fn begin_unit(&mut self) -> Result<(), StorageError> {
        self.inner.begin_unit()
    }

    fn commit_unit(&mut self) -> Result<(), StorageError> {
        if self.fail_commit {
            return Err(unavailable());
        }
        self.inner.commit_unit()
    }

    fn rollback_unit(&mut self) -> Result<(), StorageError> {
        self.inner.rollback_unit()
    }

    fn has_open_unit(&self) -> bool {
        self.inner.has_open_unit()
    }
}

impl MemberTablesRepo for FaultyRepo {
    fn insert_member_row(&mut self, input: MemberRowInput) -> Result<MemberId, StorageError> {
        self.inner.insert_member_row(input)
    }

    fn member_row(&self, member_id: MemberId) -> Result<Option<MemberRecord>, StorageError> {
        self.read_guard()?;
        self.inner.member_row(member_id)
    }

    fn member_child_rows(&self, parent_id: MemberId) -> Result<Vec<MemberRecord>, StorageError> {
        self.read_guard()?;
        self.inner.member_child_rows(parent_id)
    }

    fn member_rows(&self) -> Result<Vec<MemberRecord>, StorageError> {
        self.read_guard()?;
        self.inner.member_rows()
    }
}

impl SalesTablesRepo for FaultyRepo {
    fn insert_sale_row(&mut self, input: SaleRowInput) -> Result<SaleId, StorageError> {
        self.inner.insert_sale_row(input)
    }

    fn sale_row(&self, sale_id: SaleId) -> Result<Option<SaleRecord>, StorageError> {
        self.read_guard()?;
        self.inner.sale_row(sale_id)
    }

    fn sale_rows_by_member(&self, member_id: MemberId) -> Result<Vec<SaleRecord>, StorageError> {
        self.read_guard()?;
        self.inner.sale_rows_by_member(member_id)
    }

    fn sale_rows(&self) -> Result<Vec<SaleRecord>, StorageError> {
        self.read_guard()?;
        self.inner.sale_rows()
    }
}

impl PayoutTablesRepo for FaultyRepo {
    fn insert_payout_row(&mut self, input: PayoutRowInput) -> Result<PayoutId, StorageError> {
        self.payout_inserts += 1;
        if self.fail_payout_insert_at == Some(self.payout_inserts) {
            return Err(unavailable());
        }
        self.inner.insert_payout_row(input)
    }

    fn payout_rows_by_sale(&self, sale_id: SaleId) -> Result<Vec<PayoutRecord>, StorageError> {
        self.read_guard()?;
        self.inner.payout_rows_by_sale(sale_id)
    }

    fn payout_rows_by_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<PayoutRecord>, StorageError> {
        self.read_guard()?;
        self.inner.payout_rows_by_member(member_id)
    }

    fn payout_rows(&self) -> Result<Vec<PayoutRecord>, StorageError> {
        self.read_guard()?;
        self.inner.payout_rows()
    }
}

fn seeded(levels: usize) -> (UplineRuntime<FaultyRepo>, Vec<MemberId>) {
    let mut rt = UplineRuntime::mvp_v1(FaultyRepo::default());
    let mut ids: Vec<MemberId> = Vec::new();
    for i in 0..=levels {
        let name = format!("node_{i}");
        let parent = ids.last().copied();
        ids.push(
            rt.create_member(
                &name,
                &format!("{name}@example.com"),
                parent,
                MonotonicTimeNs(i as u64 + 1),
            )
            .unwrap(),
        );
    }
    (rt, ids)
}

#[test]
fn at_fault_01_payout_insert_failure_rolls_back_everything() {
    let (mut rt, ids) = seeded(5);
    rt.repo_mut().fail_payout_insert_at = Some(3);

    let out = rt.record_sale_with_payouts(
        ids[5],
        SaleAmount::parse("1000").unwrap(),
        MonotonicTimeNs(100),
    );
    assert!(!out.is_success());
    assert_eq!(out.failure().unwrap().kind, FailureKind::Persistence);
    assert!(!rt.repo().has_open_unit());
    assert!(rt.repo().inner.sales().is_empty());
    assert!(rt.repo().inner.payouts().is_empty());

    // The store is usable again once the fault clears; ids were not consumed.
    rt.repo_mut().fail_payout_insert_at = None;
    let out = rt.record_sale_with_payouts(
        ids[5],
        SaleAmount::parse("1000").unwrap(),
        MonotonicTimeNs(101),
    );
    assert_eq!(out.receipt().unwrap().sale_id, SaleId(1));
    assert_eq!(out.payout_count(), 5);
}

#[test]
fn at_fault_02_commit_failure_is_a_transaction_failure() {
    let (mut rt, ids) = seeded(2);
    rt.repo_mut().fail_commit = true;
    let out = rt.record_sale_with_payouts(
        ids[2],
        SaleAmount::parse("10").unwrap(),
        MonotonicTimeNs(100),
    );
    assert_eq!(out.failure().unwrap().kind, FailureKind::Transaction);
    assert!(!rt.repo().has_open_unit());
    assert!(rt.repo().inner.sales().is_empty());
}

#[test]
fn at_fault_03_failed_reads_degrade_to_empty() {
    let (mut rt, ids) = seeded(3);
    let out = rt.record_sale_with_payouts(
        ids[3],
        SaleAmount::parse("400").unwrap(),
        MonotonicTimeNs(100),
    );
    let sale_id = out.receipt().unwrap().sale_id;
    rt.repo_mut().fail_reads = true;

    let r = Reporting::new(rt.repo(), 100);
    assert!(r.member(ids[0]).is_none());
    assert!(r.children(ids[0]).is_empty());
    assert!(r.all_members().is_empty());
    assert!(r.sale(sale_id).is_none());
    assert!(r.member_sales(ids[3], None).is_empty());
    assert!(r.all_sales(None).is_empty());
    assert_eq!(r.member_total_sales(ids[3]), Decimal::from_str("0.00").unwrap());
    assert_eq!(r.member_sales_count(ids[3]), 0);
    assert!(r.member_payouts(ids[2], None).is_empty());
    assert!(r.sale_payouts(sale_id).is_empty());
    assert_eq!(r.member_total_payouts(ids[2]), Decimal::ZERO);
    assert_eq!(r.member_payout_count(ids[2]), 0);
    assert_eq!(r.member_depth(ids[3]), 1);
    assert!(rt.get_upline(ids[3]).is_empty());
}

#[test]
fn at_fault_04_failed_member_read_rejects_sale() {
    let (mut rt, ids) = seeded(1);
    rt.repo_mut().fail_reads = true;
    let out = rt.record_sale_with_payouts(
        ids[1],
        SaleAmount::parse("10").unwrap(),
        MonotonicTimeNs(100),
    );
    assert_eq!(out.failure().unwrap().kind, FailureKind::Persistence);
    assert!(rt.repo().inner.sales().is_empty());
}
