#![forbid(unsafe_code)]

use upline_kernel_contracts::member::{MemberId, MemberRecord, MemberRowInput};
use upline_kernel_contracts::payout::{PayoutId, PayoutRecord, PayoutRowInput};
use upline_kernel_contracts::sale::{SaleId, SaleRecord, SaleRowInput};

use crate::ledger::{StorageError, UplineLedgerStore};

/// Typed repository interface for unit-of-work control over the ledger tables.
pub trait UnitOfWorkRepo {
    fn begin_unit(&mut self) -> Result<(), StorageError>;
    fn commit_unit(&mut self) -> Result<(), StorageError>;
    fn rollback_unit(&mut self) -> Result<(), StorageError>;
    fn has_open_unit(&self) -> bool;
}

/// Typed repository interface for the `members` table.
pub trait MemberTablesRepo {
    fn insert_member_row(&mut self, input: MemberRowInput) -> Result<MemberId, StorageError>;
    fn member_row(&self, member_id: MemberId) -> Result<Option<MemberRecord>, StorageError>;
    fn member_child_rows(&self, parent_id: MemberId) -> Result<Vec<MemberRecord>, StorageError>;
    fn member_rows(&self) -> Result<Vec<MemberRecord>, StorageError>;
}

/// Typed repository interface for the `sales` table.
pub trait SalesTablesRepo {
    fn insert_sale_row(&mut self, input: SaleRowInput) -> Result<SaleId, StorageError>;
    fn sale_row(&self, sale_id: SaleId) -> Result<Option<SaleRecord>, StorageError>;
    fn sale_rows_by_member(&self, member_id: MemberId) -> Result<Vec<SaleRecord>, StorageError>;
    fn sale_rows(&self) -> Result<Vec<SaleRecord>, StorageError>;
}

/// Typed repository interface for the `payouts` table.
pub trait PayoutTablesRepo {
    fn insert_payout_row(&mut self, input: PayoutRowInput) -> Result<PayoutId, StorageError>;
    fn payout_rows_by_sale(&self, sale_id: SaleId) -> Result<Vec<PayoutRecord>, StorageError>;
    fn payout_rows_by_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<PayoutRecord>, StorageError>;
    fn payout_rows(&self) -> Result<Vec<PayoutRecord>, StorageError>;
}

/// Everything the commission engine needs from a backing store.
pub trait UplineLedgerRepo:
    UnitOfWorkRepo + MemberTablesRepo + SalesTablesRepo + PayoutTablesRepo
{
}

impl<T> UplineLedgerRepo for T where
    T: UnitOfWorkRepo + MemberTablesRepo + SalesTablesRepo + PayoutTablesRepo
{
}

impl UnitOfWorkRepo for UplineLedgerStore {
    fn begin_unit(&mut self) -> Result<(), StorageError> {
        UplineLedgerStore::begin_unit(self)
    }

    fn commit_unit(&mut self) -> Result<(), StorageError> {
        UplineLedgerStore::commit_unit(self)
    }

    fn rollback_unit(&mut self) -> Result<(), StorageError> {
        UplineLedgerStore::rollback_unit(self)
    }

    fn has_open_unit(&self) -> bool {
        UplineLedgerStore::has_open_unit(self)
    }
}

impl MemberTablesRepo for UplineLedgerStore {
    fn insert_member_row(&mut self, input: MemberRowInput) -> Result<MemberId, StorageError> {
        self.insert_member(input)
    }

    fn member_row(&self, member_id: MemberId) -> Result<Option<MemberRecord>, StorageError> {
        Ok(self.get_member(member_id).cloned())
    }

    fn member_child_rows(&self, parent_id: MemberId) -> Result<Vec<MemberRecord>, StorageError> {
        Ok(self.member_children(parent_id).into_iter().cloned().collect())
    }

    fn member_rows(&self) -> Result<Vec<MemberRecord>, StorageError> {
        Ok(self.members().into_iter().cloned().collect())
    }
}

impl SalesTablesRepo for UplineLedgerStore {
    fn insert_sale_row(&mut self, input: SaleRowInput) -> Result<SaleId, StorageError> {
        self.insert_sale(input)
    }

    fn sale_row(&self, sale_id: SaleId) -> Result<Option<SaleRecord>, StorageError> {
        Ok(self.get_sale(sale_id).cloned())
    }

    fn sale_rows_by_member(&self, member_id: MemberId) -> Result<Vec<SaleRecord>, StorageError> {
        Ok(self.sales_by_member(member_id).into_iter().cloned().collect())
    }

    fn sale_rows(&self) -> Result<Vec<SaleRecord>, StorageError> {
        Ok(self.sales().into_iter().cloned().collect())
    }
}

impl PayoutTablesRepo for UplineLedgerStore {
    fn insert_payout_row(&mut self, input: PayoutRowInput) -> Result<PayoutId, StorageError> {
        self.insert_payout(input)
    }

    fn payout_rows_by_sale(&self, sale_id: SaleId) -> Result<Vec<PayoutRecord>, StorageError> {
        Ok(self.payouts_by_sale(sale_id).into_iter().cloned().collect())
    }

    fn payout_rows_by_member(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<PayoutRecord>, StorageError> {
        Ok(self
            .payouts_by_member(member_id)
            .into_iter()
            .cloned()
            .collect())
    }

    fn payout_rows(&self) -> Result<Vec<PayoutRecord>, StorageError> {
        Ok(self.payouts().into_iter().cloned().collect())
    }
}
