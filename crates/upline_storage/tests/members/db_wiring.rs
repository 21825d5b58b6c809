#![forbid(unsafe_code)]

use upline_kernel_contracts::member::{ContactAddress, DisplayName, MemberId, MemberRowInput};
use upline_kernel_contracts::MonotonicTimeNs;
use upline_storage::ledger::{StorageError, UplineLedgerStore};
use upline_storage::repo::MemberTablesRepo;

fn member(name: &str, address: &str, parent_id: Option<MemberId>, t: u64) -> MemberRowInput {
    MemberRowInput::v1(
        DisplayName::new(name).unwrap(),
        ContactAddress::new(address).unwrap(),
        parent_id,
        MonotonicTimeNs(t),
    )
    .unwrap()
}

#[test]
fn at_members_db_01_parent_foreign_key_enforced() {
    let mut s = UplineLedgerStore::new_in_memory();
    let err = s
        .insert_member_row(member(
            "orphan_1",
            "orphan_1@example.com",
            Some(MemberId(42)),
            1,
        ))
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::ForeignKeyViolation {
            table: "members.parent_id",
            key: "42".to_string(),
        }
    );
    assert!(s.member_rows().unwrap().is_empty());
}

#[test]
fn at_members_db_02_display_name_unique_case_insensitive() {
    let mut s = UplineLedgerStore::new_in_memory();
    s.insert_member_row(member("john_root", "john@example.com", None, 1))
        .unwrap();
    let err = s
        .insert_member_row(member("JOHN_ROOT", "other@example.com", None, 2))
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::DuplicateKey {
            table: "members.display_name",
            ..
        }
    ));
}

#[test]
fn at_members_db_03_contact_address_unique() {
    let mut s = UplineLedgerStore::new_in_memory();
    s.insert_member_row(member("john_root", "john@example.com", None, 1))
        .unwrap();
    let err = s
        .insert_member_row(member("john_two", "John@Example.com", None, 2))
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::DuplicateKey {
            table: "members.contact_address",
            ..
        }
    ));
}

#[test]
fn at_members_db_04_children_listed_oldest_first() {
    let mut s = UplineLedgerStore::new_in_memory();
    let root = s
        .insert_member_row(member("root_1", "root_1@example.com", None, 1))
        .unwrap();
    let late = s
        .insert_member_row(member("child_late", "late@example.com", Some(root), 30))
        .unwrap();
    let early = s
        .insert_member_row(member("child_early", "early@example.com", Some(root), 20))
        .unwrap();
    s.insert_member_row(member("unrelated", "unrelated@example.com", None, 25))
        .unwrap();

    let children = s.member_child_rows(root).unwrap();
    let ids: Vec<MemberId> = children.iter().map(|m| m.member_id).collect();
    assert_eq!(ids, vec![early, late]);
}

#[test]
fn at_members_db_05_member_rows_round_trip_fields() {
    let mut s = UplineLedgerStore::new_in_memory();
    let root = s
        .insert_member_row(member("root_1", "root_1@example.com", None, 7))
        .unwrap();
    let child = s
        .insert_member_row(member("child_1", "child_1@example.com", Some(root), 8))
        .unwrap();

    let row = s.member_row(child).unwrap().unwrap();
    assert_eq!(row.display_name.as_str(), "child_1");
    assert_eq!(row.contact_address.as_str(), "child_1@example.com");
    assert_eq!(row.parent_id, Some(root));
    assert_eq!(row.created_at, MonotonicTimeNs(8));
    assert!(s.member_row(root).unwrap().unwrap().is_root());
    assert!(s.member_row(MemberId(99)).unwrap().is_none());
}

