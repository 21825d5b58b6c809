#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use upline_kernel_contracts::member::{ContactAddress, DisplayName, MemberId, MemberRowInput};
use upline_kernel_contracts::payout::{PayoutLevel, PayoutRowInput};
use upline_kernel_contracts::sale::{SaleAmount, SaleRowInput};
use upline_kernel_contracts::MonotonicTimeNs;
use upline_storage::ledger::{StorageError, UplineLedgerStore};
use upline_storage::repo::{MemberTablesRepo, PayoutTablesRepo, SalesTablesRepo};

fn store_with_pair() -> (UplineLedgerStore, MemberId, MemberId) {
    let mut s = UplineLedgerStore::new_in_memory();
    let parent = s
        .insert_member_row(
            MemberRowInput::v1(
                DisplayName::new("uow_parent").unwrap(),
                ContactAddress::new("uow_parent@example.com").unwrap(),
                None,
                MonotonicTimeNs(1),
            )
            .unwrap(),
        )
        .unwrap();
    let child = s
        .insert_member_row(
            MemberRowInput::v1(
                DisplayName::new("uow_child").unwrap(),
                ContactAddress::new("uow_child@example.com").unwrap(),
                Some(parent),
                MonotonicTimeNs(2),
            )
            .unwrap(),
        )
        .unwrap();
    (s, parent, child)
}

fn write_sale_with_payout(s: &mut UplineLedgerStore, parent: MemberId, child: MemberId) {
    let sale_id = s
        .insert_sale_row(
            SaleRowInput::v1(
                child,
                SaleAmount::parse("100.00").unwrap(),
                MonotonicTimeNs(10),
            )
            .unwrap(),
        )
        .unwrap();
    s.insert_payout_row(
        PayoutRowInput::v1(
            sale_id,
            parent,
            Decimal::new(1000, 2),
            PayoutLevel(1),
            MonotonicTimeNs(10),
        )
        .unwrap(),
    )
    .unwrap();
}

#[test]
fn at_uow_db_01_rollback_discards_every_write_in_unit() {
    let (mut s, parent, child) = store_with_pair();
    s.begin_unit().unwrap();
    write_sale_with_payout(&mut s, parent, child);
    assert_eq!(s.sale_rows().unwrap().len(), 1);
    assert_eq!(s.payout_rows().unwrap().len(), 1);

    s.rollback_unit().unwrap();
    assert!(!s.has_open_unit());
    assert!(s.sale_rows().unwrap().is_empty());
    assert!(s.payout_rows().unwrap().is_empty());
    assert_eq!(s.member_rows().unwrap().len(), 2);
}

#[test]
fn at_uow_db_02_commit_keeps_writes() {
    let (mut s, parent, child) = store_with_pair();
    s.begin_unit().unwrap();
    write_sale_with_payout(&mut s, parent, child);
    s.commit_unit().unwrap();
    assert!(!s.has_open_unit());
    assert_eq!(s.sale_rows().unwrap().len(), 1);
    assert_eq!(s.payout_rows().unwrap().len(), 1);

    // A later rollback never reaches back past a commit.
    s.begin_unit().unwrap();
    s.rollback_unit().unwrap();
    assert_eq!(s.sale_rows().unwrap().len(), 1);
}

#[test]
fn at_uow_db_03_nested_begin_rejected() {
    let (mut s, _, _) = store_with_pair();
    s.begin_unit().unwrap();
    assert_eq!(s.begin_unit().unwrap_err(), StorageError::UnitAlreadyOpen);
    assert!(s.has_open_unit());
}

#[test]
fn at_uow_db_04_commit_or_rollback_without_unit_rejected() {
    let (mut s, _, _) = store_with_pair();
    assert_eq!(s.commit_unit().unwrap_err(), StorageError::NoOpenUnit);
    assert_eq!(s.rollback_unit().unwrap_err(), StorageError::NoOpenUnit);
}

#[test]
fn at_uow_db_05_writes_outside_unit_are_immediate() {
    let (mut s, parent, child) = store_with_pair();
    write_sale_with_payout(&mut s, parent, child);
    assert!(!s.has_open_unit());
    assert_eq!(s.payout_rows_by_member(parent).unwrap().len(), 1);
}
