#![forbid(unsafe_code)]

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use upline_kernel_contracts::member::{MemberId, MemberRecord};
use upline_kernel_contracts::sale::SaleAmount;
use upline_kernel_contracts::MonotonicTimeNs;
use upline_os::reporting::{SalePayoutView, SaleView};
use upline_os::{SaleReceipt, SaleWithPayoutsOutcome, UplineRuntime};
use upline_storage::ledger::UplineLedgerStore;

pub const USAGE: &str = "usage: upline <demo|view> [--json]";

const RULE_WIDTH: usize = 60;

/// Hands out strictly increasing timestamps for seeded rows.
#[derive(Debug, Default)]
pub struct SeedClock(u64);

impl SeedClock {
    pub fn tick(&mut self) -> MonotonicTimeNs {
        self.0 += 1;
        MonotonicTimeNs(self.0)
    }
}

pub type LedgerRuntime = UplineRuntime<UplineLedgerStore>;

pub fn execute_ledger_command(subcommand: &str, json: bool) -> Result<String, String> {
    match subcommand {
        "demo" => run_demo(),
        "view" => {
            let mut runtime = LedgerRuntime::mvp_v1(UplineLedgerStore::new_in_memory());
            let mut clock = SeedClock::default();
            seed_sample_ledger(&mut runtime, &mut clock)?;
            if json {
                let snapshot = snapshot(&runtime);
                serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())
            } else {
                Ok(render_view(&runtime))
            }
        }
        _ => Err(format!(
            "unknown subcommand: {subcommand}. expected one of: demo, view"
        )),
    }
}

/// Members created by [`seed_sample_ledger`], in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLedger {
    pub members: Vec<(String, MemberId)>,
    pub receipts: Vec<SaleReceipt>,
}

impl SampleLedger {
    pub fn member(&self, name: &str) -> Option<MemberId> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }
}

/// Six-level chain under `john_root` plus a two-member branch, and four sales.
pub fn seed_sample_ledger(
    runtime: &mut LedgerRuntime,
    clock: &mut SeedClock,
) -> Result<SampleLedger, String> {
    let plan: [(&str, &str, Option<&str>); 8] = [
        ("john_root", "john@example.com", None),
        ("sarah_l2", "sarah@example.com", Some("john_root")),
        ("mike_l3", "mike@example.com", Some("sarah_l2")),
        ("emma_l4", "emma@example.com", Some("mike_l3")),
        ("david_l5", "david@example.com", Some("emma_l4")),
        ("lisa_l6", "lisa@example.com", Some("david_l5")),
        ("tom_l2b", "tom@example.com", Some("john_root")),
        ("anna_l3b", "anna@example.com", Some("tom_l2b")),
    ];
    let mut ledger = SampleLedger {
        members: Vec::with_capacity(plan.len()),
        receipts: Vec::new(),
    };
    for (name, address, parent) in plan {
        let parent_id = match parent {
            Some(parent) => Some(
                ledger
                    .member(parent)
                    .ok_or_else(|| format!("seed parent {parent} missing"))?,
            ),
            None => None,
        };
        let id = runtime
            .create_member(name, address, parent_id, clock.tick())
            .map_err(|e| format!("failed to create {name}: {e}"))?;
        ledger.members.push((name.to_string(), id));
    }

    for (seller, amount) in [
        ("lisa_l6", "1000.00"),
        ("mike_l3", "500.00"),
        ("anna_l3b", "750.00"),
        ("john_root", "300.00"),
    ] {
        let member_id = ledger
            .member(seller)
            .ok_or_else(|| format!("seed seller {seller} missing"))?;
        let receipt = record(runtime, clock, member_id, amount)?;
        info!(
            seller,
            sale_id = receipt.sale_id.0,
            payout_count = receipt.payout_count,
            "seeded sale"
        );
        ledger.receipts.push(receipt);
    }
    Ok(ledger)
}

fn record(
    runtime: &mut LedgerRuntime,
    clock: &mut SeedClock,
    member_id: MemberId,
    amount: &str,
) -> Result<SaleReceipt, String> {
    let amount = SaleAmount::parse(amount).map_err(|e| e.to_string())?;
    match runtime.record_sale_with_payouts(member_id, amount, clock.tick()) {
        SaleWithPayoutsOutcome::Committed(receipt) => Ok(receipt),
        SaleWithPayoutsOutcome::RolledBack(failure) => {
            Err(format!("sale was rolled back: {}", failure.error))
        }
    }
}

pub fn run_demo() -> Result<String, String> {
    let mut runtime = LedgerRuntime::mvp_v1(UplineLedgerStore::new_in_memory());
    let mut clock = SeedClock::default();
    let mut out = String::new();

    heading(&mut out, "STEP 1: Creating member hierarchy");
    let names = [
        "alice_demo",
        "bob_demo",
        "charlie_demo",
        "diana_demo",
        "eve_demo",
        "frank_demo",
    ];
    let mut ids: Vec<MemberId> = Vec::with_capacity(names.len());
    for name in names {
        let parent = ids.last().copied();
        let short = name.trim_end_matches("_demo");
        let id = runtime
            .create_member(name, &format!("{short}@demo.com"), parent, clock.tick())
            .map_err(|e| format!("failed to create {name}: {e}"))?;
        match parent {
            Some(p) => line(&mut out, format!("{name} (ID: {}) - parent: {}", id.0, p.0)),
            None => line(&mut out, format!("{name} (ID: {})", id.0)),
        }
        ids.push(id);
    }
    let &[alice, _bob, charlie, _diana, eve, frank] = ids.as_slice() else {
        return Err("demo hierarchy incomplete".to_string());
    };

    heading(&mut out, "STEP 2: Verifying upline chain");
    line(&mut out, "frank_demo upline (up to 5 levels):".to_string());
    for entry in runtime.get_upline(frank) {
        line(
            &mut out,
            format!(
                "  L{} {} (ID: {})",
                entry.level.0,
                entry.display_name.as_str(),
                entry.beneficiary_id.0
            ),
        );
    }

    heading(&mut out, "STEP 3: Recording sale and calculating payouts");
    let receipt = record(&mut runtime, &mut clock, frank, "1000.00")?;
    render_receipt(&mut out, &receipt);

    heading(&mut out, "STEP 4: Querying member payouts");
    for (label, member) in [("eve_demo", eve), ("alice_demo", alice)] {
        render_earnings(&mut out, &runtime, label, member);
    }

    heading(&mut out, "STEP 5: Additional sale");
    let receipt = record(&mut runtime, &mut clock, charlie, "500.00")?;
    render_receipt(&mut out, &receipt);

    line(&mut out, String::new());
    line(&mut out, "Demo completed successfully.".to_string());
    Ok(out)
}

fn render_receipt(out: &mut String, receipt: &SaleReceipt) {
    line(out, format!("Sale ID: {}", receipt.sale_id.0));
    line(out, format!("Amount: ${}", receipt.amount.value()));
    line(out, format!("Payouts created: {}", receipt.payout_count));
    line(out, "-".repeat(RULE_WIDTH));
    line(out, format!("{:<15} {:<12} {:<15}", "Recipient", "Rate", "Commission"));
    line(out, "-".repeat(RULE_WIDTH));
    let mut total = Decimal::ZERO;
    for payout in &receipt.payouts {
        line(
            out,
            format!(
                "{:<15} {:<12} ${:<14}",
                payout.display_name.as_str(),
                format!("{}%", payout.rate.value()),
                payout.amount
            ),
        );
        total += payout.amount;
    }
    line(out, "-".repeat(RULE_WIDTH));
    line(out, format!("{:<28} ${:<14}", "Total commissions:", money(total)));
}

fn render_earnings(out: &mut String, runtime: &LedgerRuntime, label: &str, member: MemberId) {
    let reporting = runtime.reporting();
    line(out, format!("{label} commission earnings:"));
    let payouts = reporting.member_payouts(member, None);
    if payouts.is_empty() {
        line(out, "  No payouts yet.".to_string());
        return;
    }
    for payout in payouts {
        line(
            out,
            format!(
                "  ${} (commission from {}'s sale)",
                payout.amount,
                payout.seller_display_name.as_str()
            ),
        );
    }
    line(
        out,
        format!(
            "  Total earnings: ${}",
            reporting.member_total_payouts(member)
        ),
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTotalsRow {
    pub member_id: MemberId,
    pub display_name: String,
    pub sales_count: usize,
    pub total_sales: Decimal,
    pub payout_count: usize,
    pub total_payouts: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub members: Vec<MemberRecord>,
    pub sales: Vec<SaleView>,
    pub payouts: Vec<SalePayoutView>,
    pub totals: Vec<MemberTotalsRow>,
}

pub fn snapshot(runtime: &LedgerRuntime) -> LedgerSnapshot {
    let reporting = runtime.reporting();
    let members = reporting.all_members();
    let sales = reporting.all_sales(None);
    let payouts = sales
        .iter()
        .flat_map(|sale| reporting.sale_payouts(sale.sale_id))
        .collect();
    let totals = members
        .iter()
        .map(|m| MemberTotalsRow {
            member_id: m.member_id,
            display_name: m.display_name.as_str().to_string(),
            sales_count: reporting.member_sales_count(m.member_id),
            total_sales: reporting.member_total_sales(m.member_id),
            payout_count: reporting.member_payout_count(m.member_id),
            total_payouts: reporting.member_total_payouts(m.member_id),
        })
        .collect();
    LedgerSnapshot {
        members,
        sales,
        payouts,
        totals,
    }
}

pub fn render_view(runtime: &LedgerRuntime) -> String {
    let snap = snapshot(runtime);
    let mut out = String::new();

    heading(&mut out, "Members");
    line(
        &mut out,
        format!("{:<4} {:<14} {:<22} {:<7}", "ID", "Name", "Contact", "Parent"),
    );
    for m in &snap.members {
        let parent = m
            .parent_id
            .map(|p| p.0.to_string())
            .unwrap_or_else(|| "-".to_string());
        line(
            &mut out,
            format!(
                "{:<4} {:<14} {:<22} {:<7}",
                m.member_id.0,
                m.display_name.as_str(),
                m.contact_address.as_str(),
                parent
            ),
        );
    }

    heading(&mut out, "Sales");
    line(&mut out, format!("{:<4} {:<14} {:>12}", "ID", "Seller", "Amount"));
    for s in &snap.sales {
        line(
            &mut out,
            format!(
                "{:<4} {:<14} {:>12}",
                s.sale_id.0,
                s.display_name.as_str(),
                format!("${}", s.amount.value())
            ),
        );
    }

    heading(&mut out, "Payouts");
    line(
        &mut out,
        format!("{:<4} {:<14} {:<6} {:>12}", "ID", "Beneficiary", "Level", "Amount"),
    );
    for p in &snap.payouts {
        line(
            &mut out,
            format!(
                "{:<4} {:<14} {:<6} {:>12}",
                p.payout_id.0,
                p.display_name.as_str(),
                p.level.0,
                format!("${}", p.amount)
            ),
        );
    }

    heading(&mut out, "Totals");
    line(
        &mut out,
        format!("{:<14} {:>6} {:>14} {:>14}", "Member", "Sales", "Sold", "Earned"),
    );
    for t in &snap.totals {
        line(
            &mut out,
            format!(
                "{:<14} {:>6} {:>14} {:>14}",
                t.display_name,
                t.sales_count,
                format!("${}", t.total_sales),
                format!("${}", t.total_payouts)
            ),
        );
    }
    out
}

fn money(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(2);
    value
}

fn heading(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    line(out, title.to_string());
    line(out, "=".repeat(RULE_WIDTH));
}

fn line(out: &mut String, text: String) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{text}");
}
