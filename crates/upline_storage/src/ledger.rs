#![forbid(unsafe_code)]

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use upline_kernel_contracts::member::{MemberId, MemberRecord, MemberRowInput};
use upline_kernel_contracts::payout::{PayoutId, PayoutRecord, PayoutRowInput};
use upline_kernel_contracts::sale::{SaleId, SaleRecord, SaleRowInput};
use upline_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    ForeignKeyViolation { table: &'static str, key: String },
    DuplicateKey { table: &'static str, key: String },
    ContractViolation(ContractViolation),
    UnitAlreadyOpen,
    NoOpenUnit,
    /// The backing store could not serve the call at all.
    Unavailable { reason: String },
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ForeignKeyViolation { table, key } => {
                write!(f, "foreign key violation on {table} (key {key})")
            }
            StorageError::DuplicateKey { table, key } => {
                write!(f, "duplicate key on {table} (key {key})")
            }
            StorageError::ContractViolation(v) => write!(f, "contract violation: {v}"),
            StorageError::UnitAlreadyOpen => write!(f, "a unit of work is already open"),
            StorageError::NoOpenUnit => write!(f, "no unit of work is open"),
            StorageError::Unavailable { reason } => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StorageError {}

// Uniqueness on `members` is case-insensitive.
fn unique_key(s: &str) -> String {
    s.to_ascii_lowercase()
}

#[derive(Debug, Clone)]
struct LedgerTables {
    members: BTreeMap<MemberId, MemberRecord>,
    members_by_display_name: BTreeMap<String, MemberId>,
    members_by_contact_address: BTreeMap<String, MemberId>,
    sales: BTreeMap<SaleId, SaleRecord>,
    payouts: BTreeMap<PayoutId, PayoutRecord>,
    next_member_id: u64,
    next_sale_id: u64,
    next_payout_id: u64,
}

impl LedgerTables {
    fn empty() -> Self {
        Self {
            members: BTreeMap::new(),
            members_by_display_name: BTreeMap::new(),
            members_by_contact_address: BTreeMap::new(),
            sales: BTreeMap::new(),
            payouts: BTreeMap::new(),
            next_member_id: 1,
            next_sale_id: 1,
            next_payout_id: 1,
        }
    }
}

/// In-memory relational store for the `members`, `sales` and `payouts` tables.
///
/// Writes may be grouped into a unit of work: `begin_unit` snapshots every table and id
/// sequence, `rollback_unit` restores that snapshot and `commit_unit` drops it. Only one
/// unit may be open at a time.
#[derive(Debug, Clone)]
pub struct UplineLedgerStore {
    tables: LedgerTables,
    open_unit: Option<LedgerTables>,
}

impl Default for UplineLedgerStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl UplineLedgerStore {
    pub fn new_in_memory() -> Self {
        Self {
            tables: LedgerTables::empty(),
            open_unit: None,
        }
    }

    // ------------------------
    // Units of work.
    // ------------------------

    pub fn begin_unit(&mut self) -> Result<(), StorageError> {
        if self.open_unit.is_some() {
            return Err(StorageError::UnitAlreadyOpen);
        }
        self.open_unit = Some(self.tables.clone());
        Ok(())
    }

    pub fn commit_unit(&mut self) -> Result<(), StorageError> {
        match self.open_unit.take() {
            Some(_) => Ok(()),
            None => Err(StorageError::NoOpenUnit),
        }
    }

    pub fn rollback_unit(&mut self) -> Result<(), StorageError> {
        match self.open_unit.take() {
            Some(snapshot) => {
                self.tables = snapshot;
                Ok(())
            }
            None => Err(StorageError::NoOpenUnit),
        }
    }

    pub fn has_open_unit(&self) -> bool {
        self.open_unit.is_some()
    }

    // ------------------------
    // members
    // ------------------------

    pub fn insert_member(&mut self, input: MemberRowInput) -> Result<MemberId, StorageError> {
        input.validate()?;
        if let Some(parent_id) = input.parent_id {
            if !self.tables.members.contains_key(&parent_id) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "members.parent_id",
                    key: parent_id.0.to_string(),
                });
            }
        }
        let name_key = unique_key(input.display_name.as_str());
        if self.tables.members_by_display_name.contains_key(&name_key) {
            return Err(StorageError::DuplicateKey {
                table: "members.display_name",
                key: input.display_name.as_str().to_string(),
            });
        }
        let address_key = unique_key(input.contact_address.as_str());
        if self
            .tables
            .members_by_contact_address
            .contains_key(&address_key)
        {
            return Err(StorageError::DuplicateKey {
                table: "members.contact_address",
                key: input.contact_address.as_str().to_string(),
            });
        }

        let member_id = MemberId(self.tables.next_member_id);
        self.tables.next_member_id = self.tables.next_member_id.saturating_add(1);
        self.tables
            .members_by_display_name
            .insert(name_key, member_id);
        self.tables
            .members_by_contact_address
            .insert(address_key, member_id);
        self.tables
            .members
            .insert(member_id, MemberRecord::from_input(member_id, input));
        Ok(member_id)
    }

    pub fn get_member(&self, member_id: MemberId) -> Option<&MemberRecord> {
        self.tables.members.get(&member_id)
    }

    /// Oldest first.
    pub fn member_children(&self, parent_id: MemberId) -> Vec<&MemberRecord> {
        let mut out: Vec<&MemberRecord> = self
            .tables
            .members
            .values()
            .filter(|m| m.parent_id == Some(parent_id))
            .collect();
        out.sort_by_key(|m| (m.created_at, m.member_id));
        out
    }

    /// Oldest first.
    pub fn members(&self) -> Vec<&MemberRecord> {
        let mut out: Vec<&MemberRecord> = self.tables.members.values().collect();
        out.sort_by_key(|m| (m.created_at, m.member_id));
        out
    }

    /// Test and repair hook: rewrites the parent pointer of an existing member without
    /// any acyclicity check. Used to model a store that was corrupted outside the engine.
    pub fn overwrite_member_parent(
        &mut self,
        member_id: MemberId,
        parent_id: Option<MemberId>,
    ) -> Result<(), StorageError> {
        let Some(record) = self.tables.members.get_mut(&member_id) else {
            return Err(StorageError::ForeignKeyViolation {
                table: "members.id",
                key: member_id.0.to_string(),
            });
        };
        record.parent_id = parent_id;
        Ok(())
    }

    // ------------------------
    // sales
    // ------------------------

    pub fn insert_sale(&mut self, input: SaleRowInput) -> Result<SaleId, StorageError> {
        input.validate()?;
        if !self.tables.members.contains_key(&input.member_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "sales.member_id",
                key: input.member_id.0.to_string(),
            });
        }
        let sale_id = SaleId(self.tables.next_sale_id);
        self.tables.next_sale_id = self.tables.next_sale_id.saturating_add(1);
        self.tables
            .sales
            .insert(sale_id, SaleRecord::from_input(sale_id, input));
        Ok(sale_id)
    }

    pub fn get_sale(&self, sale_id: SaleId) -> Option<&SaleRecord> {
        self.tables.sales.get(&sale_id)
    }

    /// Newest first.
    pub fn sales_by_member(&self, member_id: MemberId) -> Vec<&SaleRecord> {
        let mut out: Vec<&SaleRecord> = self
            .tables
            .sales
            .values()
            .filter(|s| s.member_id == member_id)
            .collect();
        out.sort_by_key(|s| Reverse((s.created_at, s.sale_id)));
        out
    }

    /// Newest first.
    pub fn sales(&self) -> Vec<&SaleRecord> {
        let mut out: Vec<&SaleRecord> = self.tables.sales.values().collect();
        out.sort_by_key(|s| Reverse((s.created_at, s.sale_id)));
        out
    }

    // ------------------------
    // payouts
    // ------------------------

    pub fn insert_payout(&mut self, input: PayoutRowInput) -> Result<PayoutId, StorageError> {
        input.validate()?;
        if !self.tables.sales.contains_key(&input.sale_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "payouts.sale_id",
                key: input.sale_id.0.to_string(),
            });
        }
        if !self.tables.members.contains_key(&input.beneficiary_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "payouts.member_id",
                key: input.beneficiary_id.0.to_string(),
            });
        }
        let payout_id = PayoutId(self.tables.next_payout_id);
        self.tables.next_payout_id = self.tables.next_payout_id.saturating_add(1);
        self.tables
            .payouts
            .insert(payout_id, PayoutRecord::from_input(payout_id, input));
        Ok(payout_id)
    }

    /// Ordered by level, nearest beneficiary first.
    pub fn payouts_by_sale(&self, sale_id: SaleId) -> Vec<&PayoutRecord> {
        let mut out: Vec<&PayoutRecord> = self
            .tables
            .payouts
            .values()
            .filter(|p| p.sale_id == sale_id)
            .collect();
        out.sort_by_key(|p| (p.level, p.payout_id));
        out
    }

    /// Newest first.
    pub fn payouts_by_member(&self, member_id: MemberId) -> Vec<&PayoutRecord> {
        let mut out: Vec<&PayoutRecord> = self
            .tables
            .payouts
            .values()
            .filter(|p| p.beneficiary_id == member_id)
            .collect();
        out.sort_by_key(|p| Reverse((p.created_at, p.payout_id)));
        out
    }

    /// Insertion order.
    pub fn payouts(&self) -> Vec<&PayoutRecord> {
        self.tables.payouts.values().collect()
    }
}
