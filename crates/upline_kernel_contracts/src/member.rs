#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const DISPLAY_NAME_MIN_LEN: usize = 3;
pub const DISPLAY_NAME_MAX_LEN: usize = 100;
pub const CONTACT_ADDRESS_MAX_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl Validate for MemberId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "member_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Public handle of a member. Unique across the `members` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: impl Into<String>) -> Result<Self, ContractViolation> {
        let name = DisplayName(name.into());
        name.validate()?;
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for DisplayName {
    fn validate(&self) -> Result<(), ContractViolation> {
        let len = self.0.len();
        if !(DISPLAY_NAME_MIN_LEN..=DISPLAY_NAME_MAX_LEN).contains(&len) {
            return Err(ContractViolation::InvalidValue {
                field: "display_name",
                reason: "must be 3..=100 chars",
            });
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ContractViolation::InvalidValue {
                field: "display_name",
                reason: "must contain only ASCII letters, digits, '_' or '-'",
            });
        }
        Ok(())
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ContractViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DisplayName::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Contact address of a member in `local@domain` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactAddress(String);

impl ContactAddress {
    pub fn new(address: impl Into<String>) -> Result<Self, ContractViolation> {
        let address = ContactAddress(address.into());
        address.validate()?;
        Ok(address)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ContactAddress {
    fn validate(&self) -> Result<(), ContractViolation> {
        let invalid = |reason| {
            Err(ContractViolation::InvalidValue {
                field: "contact_address",
                reason,
            })
        };
        if self.0.is_empty() || self.0.len() > CONTACT_ADDRESS_MAX_LEN {
            return invalid("must be 1..=254 chars");
        }
        let Some((local, domain)) = self.0.split_once('@') else {
            return invalid("must contain '@'");
        };
        if !is_valid_local_part(local) {
            return invalid("local part is malformed");
        }
        if !is_valid_domain(domain) {
            return invalid("domain is malformed");
        }
        Ok(())
    }
}

impl TryFrom<String> for ContactAddress {
    type Error = ContractViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContactAddress::new(value)
    }
}

impl From<ContactAddress> for String {
    fn from(value: ContactAddress) -> Self {
        value.0
    }
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);
    labels_ok && tld_ok
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRowInput {
    pub display_name: DisplayName,
    pub contact_address: ContactAddress,
    pub parent_id: Option<MemberId>,
    pub created_at: MonotonicTimeNs,
}

impl MemberRowInput {
    pub fn v1(
        display_name: DisplayName,
        contact_address: ContactAddress,
        parent_id: Option<MemberId>,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            display_name,
            contact_address,
            parent_id,
            created_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for MemberRowInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.display_name.validate()?;
        self.contact_address.validate()?;
        if let Some(parent_id) = self.parent_id {
            parent_id.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub schema_version: SchemaVersion,
    pub member_id: MemberId,
    pub display_name: DisplayName,
    pub contact_address: ContactAddress,
    pub parent_id: Option<MemberId>,
    pub created_at: MonotonicTimeNs,
}

impl MemberRecord {
    pub fn from_input(member_id: MemberId, input: MemberRowInput) -> Self {
        Self {
            schema_version: SchemaVersion(1),
            member_id,
            display_name: input.display_name,
            contact_address: input.contact_address,
            parent_id: input.parent_id,
            created_at: input.created_at,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
