#![forbid(unsafe_code)]

use std::str::FromStr;

use rust_decimal::Decimal;
use upline_kernel_contracts::member::MemberId;
use upline_kernel_contracts::payout::PayoutLevel;
use upline_kernel_contracts::sale::SaleAmount;
use upline_kernel_contracts::MonotonicTimeNs;
use upline_os::{UplineError, UplineRuntime};
use upline_storage::ledger::UplineLedgerStore;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn amount(s: &str) -> SaleAmount {
    SaleAmount::parse(s).unwrap()
}

struct Clock(u64);

impl Clock {
    fn tick(&mut self) -> MonotonicTimeNs {
        self.0 += 1;
        MonotonicTimeNs(self.0)
    }
}

fn runtime() -> (UplineRuntime<UplineLedgerStore>, Clock) {
    (
        UplineRuntime::mvp_v1(UplineLedgerStore::new_in_memory()),
        Clock(0),
    )
}

fn add(
    rt: &mut UplineRuntime<UplineLedgerStore>,
    clock: &mut Clock,
    name: &str,
    parent: Option<MemberId>,
) -> MemberId {
    rt.create_member(name, &format!("{name}@example.com"), parent, clock.tick())
        .unwrap()
}

fn chain(
    rt: &mut UplineRuntime<UplineLedgerStore>,
    clock: &mut Clock,
    len: usize,
) -> Vec<MemberId> {
    let mut ids: Vec<MemberId> = Vec::new();
    for i in 0..=len {
        let parent = ids.last().copied();
        ids.push(add(rt, clock, &format!("member_{i}"), parent));
    }
    ids
}

#[test]
fn at_e2e_01_upline_length_tracks_chain_length() {
    for len in 0..=7 {
        let (mut rt, mut clock) = runtime();
        let ids = chain(&mut rt, &mut clock, len);
        let upline = rt.get_upline(*ids.last().unwrap());
        assert_eq!(upline.len(), len.min(5), "chain length {len}");
        if let Some(first) = upline.first() {
            assert_eq!(first.beneficiary_id, ids[len - 1]);
            assert_eq!(first.level, PayoutLevel(1));
        }
    }
}

#[test]
fn at_e2e_02_five_level_amounts_follow_rates() {
    for raw in ["1000.00", "0.01", "123.45", "99999999.99", "33.33"] {
        let (mut rt, mut clock) = runtime();
        let ids = chain(&mut rt, &mut clock, 6);
        let out = rt.record_sale_with_payouts(ids[6], amount(raw), clock.tick());
        let receipt = out.receipt().unwrap();
        assert_eq!(receipt.payout_count, 5, "{raw}");

        let a = d(raw);
        for (payout, pct) in receipt.payouts.iter().zip([10, 5, 3, 2, 1]) {
            let expected = (a * Decimal::from(pct) / Decimal::from(100)).round_dp_with_strategy(
                2,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            );
            assert_eq!(payout.amount, expected, "{raw} at {pct}%");
        }
    }
}

#[test]
fn at_e2e_03_root_sale_succeeds_without_payouts() {
    let (mut rt, mut clock) = runtime();
    let root = add(&mut rt, &mut clock, "john_root", None);
    let out = rt.record_sale_with_payouts(root, amount("300.00"), clock.tick());
    assert!(out.is_success());
    assert_eq!(out.payout_count(), 0);
    assert_eq!(rt.reporting().member_sales_count(root), 1);
    assert!(rt.repo().payouts().is_empty());
}

#[test]
fn at_e2e_04_negative_amount_leaves_no_rows() {
    let (mut rt, mut clock) = runtime();
    let ids = chain(&mut rt, &mut clock, 3);
    let now = clock.tick();
    let out = rt.record_sale_with_payouts_raw(ids[3], d("-100.00"), now);
    assert!(!out.is_success());
    assert_eq!(rt.reporting().member_sales_count(ids[3]), 0);
    assert!(rt.repo().sales().is_empty());
    assert!(rt.repo().payouts().is_empty());
}

#[test]
fn at_e2e_05_sibling_sales_accumulate_on_parent() {
    let (mut rt, mut clock) = runtime();
    let parent = add(&mut rt, &mut clock, "parent_p", None);
    let kids = [
        add(&mut rt, &mut clock, "kid_one", Some(parent)),
        add(&mut rt, &mut clock, "kid_two", Some(parent)),
        add(&mut rt, &mut clock, "kid_three", Some(parent)),
    ];
    for (kid, raw) in kids.iter().zip(["100", "200", "300"]) {
        let now = clock.tick();
        assert!(rt.record_sale_with_payouts(*kid, amount(raw), now).is_success());
    }
    assert_eq!(rt.reporting().member_total_payouts(parent), d("60.00"));
    assert_eq!(rt.reporting().member_payout_count(parent), 3);
}

#[test]
fn at_e2e_06_branching_tree_pays_only_direct_line() {
    let (mut rt, mut clock) = runtime();
    let root = add(&mut rt, &mut clock, "root_r", None);
    let b1 = add(&mut rt, &mut clock, "branch_b1", Some(root));
    let b2 = add(&mut rt, &mut clock, "branch_b2", Some(root));
    let c1 = add(&mut rt, &mut clock, "leaf_c1", Some(b1));
    let c2 = add(&mut rt, &mut clock, "leaf_c2", Some(b1));
    let c3 = add(&mut rt, &mut clock, "leaf_c3", Some(b2));
    let d1 = add(&mut rt, &mut clock, "leaf_d1", Some(c1));

    let now = clock.tick();
    let out = rt.record_sale_with_payouts(d1, amount("600.00"), now);
    let receipt = out.receipt().unwrap();
    let paid: Vec<(MemberId, PayoutLevel, Decimal)> = receipt
        .payouts
        .iter()
        .map(|p| (p.beneficiary_id, p.level, p.amount))
        .collect();
    assert_eq!(
        paid,
        vec![
            (c1, PayoutLevel(1), d("60.00")),
            (b1, PayoutLevel(2), d("30.00")),
            (root, PayoutLevel(3), d("18.00")),
        ]
    );
    for untouched in [b2, c2, c3] {
        assert_eq!(rt.reporting().member_payout_count(untouched), 0);
    }

    let by_sale = rt.reporting().sale_payouts(receipt.sale_id);
    let names: Vec<&str> = by_sale.iter().map(|p| p.display_name.as_str()).collect();
    assert_eq!(names, vec!["leaf_c1", "branch_b1", "root_r"]);
}

#[test]
fn at_e2e_07_reporting_reads_are_idempotent() {
    let (mut rt, mut clock) = runtime();
    let ids = chain(&mut rt, &mut clock, 4);
    let now = clock.tick();
    rt.record_sale_with_payouts(ids[4], amount("250.00"), now);

    let r = rt.reporting();
    assert_eq!(r.all_sales(None), r.all_sales(None));
    assert_eq!(r.member_payouts(ids[0], None), r.member_payouts(ids[0], None));
    assert_eq!(r.member_total_payouts(ids[3]), r.member_total_payouts(ids[3]));
    assert_eq!(r.member_summary(ids[2]), r.member_summary(ids[2]));
}

#[test]
fn at_e2e_08_unknown_member_sale_rolls_back() {
    let (mut rt, mut clock) = runtime();
    let now = clock.tick();
    let out = rt.record_sale_with_payouts(MemberId(404), amount("10"), now);
    assert!(!out.is_success());
    assert_eq!(out.failure().unwrap().error, "invalid argument: member does not exist");
    assert!(rt.repo().sales().is_empty());
}

#[test]
fn at_e2e_09_outcome_json_shape() {
    let (mut rt, mut clock) = runtime();
    let ids = chain(&mut rt, &mut clock, 2);
    let now = clock.tick();
    let ok = serde_json::to_value(rt.record_sale_with_payouts(ids[2], amount("1000"), now)).unwrap();
    assert_eq!(ok["success"], true);
    assert_eq!(ok["member_id"], ids[2].0);
    assert_eq!(ok["payout_count"], 2);
    assert_eq!(ok["payouts"][1]["amount"], "50.00");

    let now = clock.tick();
    let failed =
        serde_json::to_value(rt.record_sale_with_payouts_raw(ids[2], d("0"), now)).unwrap();
    assert_eq!(failed["success"], false);
    assert!(failed.get("payouts").is_none());
    assert!(failed["error"].is_string());
}

#[test]
fn at_e2e_10_duplicate_member_is_reported() {
    let (mut rt, mut clock) = runtime();
    add(&mut rt, &mut clock, "sarah_l2", None);
    let now = clock.tick();
    let err = rt
        .create_member("sarah_l2", "other@example.com", None, now)
        .unwrap_err();
    assert!(matches!(err, UplineError::DuplicateName(_)));
    assert!(err.is_invalid_argument());
}
