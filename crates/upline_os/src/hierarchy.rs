#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use upline_kernel_contracts::member::{ContactAddress, DisplayName, MemberId, MemberRecord};
use upline_kernel_contracts::payout::PayoutLevel;
use upline_storage::ledger::StorageError;
use upline_storage::repo::MemberTablesRepo;

use crate::error::UplineError;

pub const DEFAULT_CYCLE_GUARD_HOPS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UplineEntry {
    pub beneficiary_id: MemberId,
    pub level: PayoutLevel,
    pub display_name: DisplayName,
    pub contact_address: ContactAddress,
}

/// Read-only walker over the `members.parent_id` pointers.
///
/// Every walk is bounded by `cycle_guard_hops`. Reaching that bound means the parent graph
/// is corrupted; the walk stops and logs instead of looping.
pub struct HierarchyResolver<'a, R: MemberTablesRepo + ?Sized> {
    repo: &'a R,
    cycle_guard_hops: u32,
}

impl<'a, R: MemberTablesRepo + ?Sized> HierarchyResolver<'a, R> {
    pub fn new(repo: &'a R, cycle_guard_hops: u32) -> Self {
        Self {
            repo,
            cycle_guard_hops,
        }
    }

    /// Ancestors of `member_id`, nearest first, at most `max_levels` of them.
    ///
    /// Unknown members, dangling parent references and store failures all end the walk
    /// early; whatever was collected up to that point is returned.
    pub fn resolve_upline(&self, member_id: MemberId, max_levels: u8) -> Vec<UplineEntry> {
        let mut upline = Vec::new();
        if max_levels == 0 {
            return upline;
        }
        let mut current = member_id;
        let mut hops: u32 = 0;

        loop {
            if hops >= self.cycle_guard_hops {
                warn!(
                    member_id = member_id.0,
                    hops,
                    "upline walk hit the cycle guard; parent graph may contain a cycle"
                );
                break;
            }
            let Some(record) = self.lookup(current, "resolve_upline") else {
                break;
            };
            let Some(parent_id) = record.parent_id else {
                break;
            };
            let Some(parent) = self.lookup(parent_id, "resolve_upline") else {
                debug!(
                    member_id = current.0,
                    parent_id = parent_id.0,
                    "parent reference does not resolve; ending upline walk"
                );
                break;
            };

            hops += 1;
            upline.push(UplineEntry {
                beneficiary_id: parent.member_id,
                level: PayoutLevel(u8::try_from(hops).unwrap_or(u8::MAX)),
                display_name: parent.display_name,
                contact_address: parent.contact_address,
            });
            if upline.len() >= max_levels as usize {
                break;
            }
            current = parent_id;
        }
        upline
    }

    /// Depth of a member in its tree: 1 for a root, plus one per ancestor.
    pub fn member_depth(&self, member_id: MemberId) -> u32 {
        let mut depth: u32 = 1;
        let mut current = member_id;
        loop {
            let Some(record) = self.lookup(current, "member_depth") else {
                break;
            };
            let Some(parent_id) = record.parent_id else {
                break;
            };
            depth += 1;
            current = parent_id;
            if depth > self.cycle_guard_hops {
                warn!(
                    member_id = member_id.0,
                    depth, "depth walk hit the cycle guard; parent graph may contain a cycle"
                );
                break;
            }
        }
        depth
    }

    /// Fails when the chain above `member_id` repeats a member or runs past the guard.
    pub fn verify_chain_terminates(&self, member_id: MemberId) -> Result<(), UplineError> {
        let mut seen = BTreeSet::new();
        let mut current = Some(member_id);
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(UplineError::invalid("parent hierarchy contains a cycle"));
            }
            if seen.len() as u32 > self.cycle_guard_hops {
                return Err(UplineError::invalid(format!(
                    "parent hierarchy is deeper than {} levels",
                    self.cycle_guard_hops
                )));
            }
            current = self
                .repo
                .member_row(id)
                .map_err(UplineError::Persistence)?
                .and_then(|r| r.parent_id);
        }
        Ok(())
    }

    fn lookup(&self, member_id: MemberId, op: &'static str) -> Option<MemberRecord> {
        match self.repo.member_row(member_id) {
            Ok(row) => row,
            Err(err) => {
                log_degraded(op, member_id, &err);
                None
            }
        }
    }
}

fn log_degraded(op: &'static str, member_id: MemberId, err: &StorageError) {
    warn!(op, member_id = member_id.0, error = %err, "member lookup failed; treating as no further ancestors");
}
