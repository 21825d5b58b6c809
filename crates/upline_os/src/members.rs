#![forbid(unsafe_code)]

use tracing::info;

use upline_kernel_contracts::member::{ContactAddress, DisplayName, MemberId, MemberRowInput};
use upline_kernel_contracts::{MonotonicTimeNs, Validate};
use upline_storage::repo::MemberTablesRepo;

use crate::error::UplineError;
use crate::hierarchy::HierarchyResolver;

/// Write path for the `members` table.
pub struct MemberDirectory<'a, R: MemberTablesRepo + ?Sized> {
    repo: &'a mut R,
    cycle_guard_hops: u32,
}

impl<'a, R: MemberTablesRepo + ?Sized> MemberDirectory<'a, R> {
    pub fn new(repo: &'a mut R, cycle_guard_hops: u32) -> Self {
        Self {
            repo,
            cycle_guard_hops,
        }
    }

    pub fn create_member(
        &mut self,
        display_name: &str,
        contact_address: &str,
        parent_id: Option<MemberId>,
        now: MonotonicTimeNs,
    ) -> Result<MemberId, UplineError> {
        let display_name = DisplayName::new(display_name)?;
        let contact_address = ContactAddress::new(contact_address)?;

        if let Some(parent_id) = parent_id {
            parent_id.validate()?;
            if self
                .repo
                .member_row(parent_id)
                .map_err(UplineError::Persistence)?
                .is_none()
            {
                return Err(UplineError::invalid("parent member does not exist"));
            }
            HierarchyResolver::new(&*self.repo, self.cycle_guard_hops)
                .verify_chain_terminates(parent_id)?;
        }

        let input = MemberRowInput::v1(display_name, contact_address, parent_id, now)?;
        let member_id = self
            .repo
            .insert_member_row(input)
            .map_err(UplineError::from_member_write)?;
        info!(
            member_id = member_id.0,
            parent_id = parent_id.map(|p| p.0),
            "member created"
        );
        Ok(member_id)
    }
}
