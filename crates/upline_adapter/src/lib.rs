#![forbid(unsafe_code)]

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use rust_decimal::Decimal;
use tracing::debug;

use upline_kernel_contracts::member::MemberId;
use upline_kernel_contracts::payout::{PayoutLevel, MAX_COMMISSION_LEVELS};
use upline_kernel_contracts::sale::SaleId;
use upline_kernel_contracts::{MonotonicTimeNs, Validate};
use upline_os::hierarchy::UplineEntry;
use upline_os::reporting::{MemberPayoutView, MemberSummary, SalePayoutView};
use upline_os::{FailureKind, SaleWithPayoutsOutcome, UnitFailure, UplineError, UplineRuntime};
use upline_storage::ledger::UplineLedgerStore;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub member_count: usize,
    pub sale_count: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateMemberAdapterRequest {
    pub display_name: String,
    pub contact_address: String,
    pub parent_id: Option<u64>,
    pub now_ns: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateMemberAdapterResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub member_id: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SaleAdapterRequest {
    pub member_id: u64,
    pub amount: SaleAmountField,
    pub now_ns: Option<u64>,
}

/// Sale amount as it arrived on the wire. Validated by the unit of work, not here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum SaleAmountField {
    Text(String),
    Number(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UplineAdapterResponse {
    pub member_id: MemberId,
    pub max_levels: u8,
    pub upline: Vec<UplineEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemberPayoutsAdapterResponse {
    pub member_id: MemberId,
    pub payout_count: usize,
    pub total_payouts: Decimal,
    pub payouts: Vec<MemberPayoutView>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SalePayoutsAdapterResponse {
    pub sale_id: SaleId,
    pub amount: Decimal,
    pub member_id: MemberId,
    pub payouts: Vec<SalePayoutView>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommissionLevelRow {
    pub level: PayoutLevel,
    pub rate_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommissionTableResponse {
    pub max_levels: u8,
    pub levels: Vec<CommissionLevelRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AdapterErrorResponse {
    pub status: String,
    pub outcome: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterRejection {
    Invalid(String),
    NotFound(String),
    Internal(String),
}

impl AdapterRejection {
    /// A request whose path, query or body could not be decoded.
    pub fn malformed(detail: impl fmt::Display) -> Self {
        AdapterRejection::Invalid(format!("malformed request: {detail}"))
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AdapterRejection::Invalid(_) => StatusCode::BAD_REQUEST,
            AdapterRejection::NotFound(_) => StatusCode::NOT_FOUND,
            AdapterRejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_body(self) -> AdapterErrorResponse {
        let (outcome, reason) = match self {
            AdapterRejection::Invalid(reason) => ("REJECTED", reason),
            AdapterRejection::NotFound(reason) => ("NOT_FOUND", reason),
            AdapterRejection::Internal(reason) => ("INTERNAL", reason),
        };
        AdapterErrorResponse {
            status: "error".to_string(),
            outcome: outcome.to_string(),
            reason,
        }
    }
}

impl fmt::Display for AdapterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterRejection::Invalid(reason) => write!(f, "rejected: {reason}"),
            AdapterRejection::NotFound(reason) => write!(f, "not found: {reason}"),
            AdapterRejection::Internal(reason) => write!(f, "internal: {reason}"),
        }
    }
}

pub fn create_member_http_status(
    result: &Result<CreateMemberAdapterResponse, AdapterRejection>,
) -> StatusCode {
    match result {
        Ok(_) => StatusCode::CREATED,
        Err(rejection) => rejection.http_status(),
    }
}

pub fn sale_outcome_http_status(outcome: &SaleWithPayoutsOutcome) -> StatusCode {
    match outcome.failure() {
        None => StatusCode::OK,
        Some(failure) => match failure.kind {
            FailureKind::InvalidArgument => StatusCode::BAD_REQUEST,
            FailureKind::Persistence | FailureKind::Transaction => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    }
}

/// Sale body that could not be decoded, reported in the sale outcome shape.
pub fn malformed_sale_request(detail: impl fmt::Display) -> SaleWithPayoutsOutcome {
    SaleWithPayoutsOutcome::RolledBack(UnitFailure {
        kind: FailureKind::InvalidArgument,
        error: format!("invalid argument: malformed request: {detail}"),
    })
}

/// HTTP-facing wrapper around one in-memory ledger runtime.
pub struct AdapterRuntime {
    runtime: UplineRuntime<UplineLedgerStore>,
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new(UplineRuntime::mvp_v1(UplineLedgerStore::new_in_memory()))
    }
}

impl AdapterRuntime {
    pub fn new(runtime: UplineRuntime<UplineLedgerStore>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &UplineRuntime<UplineLedgerStore> {
        &self.runtime
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        let store = self.runtime.repo();
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason: None,
            member_count: store.members().len(),
            sale_count: store.sales().len(),
        }
    }

    pub fn create_member(
        &mut self,
        request: CreateMemberAdapterRequest,
    ) -> Result<CreateMemberAdapterResponse, AdapterRejection> {
        let now = request_now(request.now_ns);
        let member_id = self
            .runtime
            .create_member(
                &request.display_name,
                &request.contact_address,
                request.parent_id.map(MemberId),
                now,
            )
            .map_err(rejection_from)?;
        Ok(CreateMemberAdapterResponse {
            status: "ok".to_string(),
            outcome: "CREATED".to_string(),
            reason: None,
            member_id: Some(member_id.0),
        })
    }

    pub fn upline_report(
        &self,
        member_id: u64,
        max_levels: Option<u8>,
    ) -> Result<UplineAdapterResponse, AdapterRejection> {
        let member_id = self.existing_member(member_id)?;
        let max_levels = max_levels.unwrap_or(self.runtime.config().max_levels);
        if max_levels == 0 || max_levels > MAX_COMMISSION_LEVELS {
            return Err(AdapterRejection::Invalid(format!(
                "max_levels must be within 1..={MAX_COMMISSION_LEVELS}"
            )));
        }
        Ok(UplineAdapterResponse {
            member_id,
            max_levels,
            upline: self.runtime.get_upline_bounded(member_id, max_levels),
        })
    }

    pub fn record_sale(&mut self, request: SaleAdapterRequest) -> SaleWithPayoutsOutcome {
        let now = request_now(request.now_ns);
        let member_id = MemberId(request.member_id);
        match request.amount {
            SaleAmountField::Text(raw) => {
                debug!(member_id = member_id.0, amount = %raw, "sale request");
                self.runtime.record_sale_with_payouts_text(member_id, &raw, now)
            }
            SaleAmountField::Number(amount) => {
                debug!(member_id = member_id.0, %amount, "sale request");
                self.runtime.record_sale_with_payouts_raw(member_id, amount, now)
            }
        }
    }

    pub fn member_payouts(
        &self,
        member_id: u64,
        limit: Option<usize>,
    ) -> Result<MemberPayoutsAdapterResponse, AdapterRejection> {
        let member_id = self.existing_member(member_id)?;
        let reporting = self.runtime.reporting();
        Ok(MemberPayoutsAdapterResponse {
            member_id,
            payout_count: reporting.member_payout_count(member_id),
            total_payouts: reporting.member_total_payouts(member_id),
            payouts: reporting.member_payouts(member_id, limit),
        })
    }

    pub fn member_summary(&self, member_id: u64) -> Result<MemberSummary, AdapterRejection> {
        let member_id = self.existing_member(member_id)?;
        self.runtime
            .reporting()
            .member_summary(member_id)
            .ok_or_else(|| AdapterRejection::NotFound("member does not exist".to_string()))
    }

    pub fn sale_payouts(&self, sale_id: u64) -> Result<SalePayoutsAdapterResponse, AdapterRejection> {
        let sale_id = SaleId(sale_id);
        sale_id
            .validate()
            .map_err(|v| AdapterRejection::Invalid(v.to_string()))?;
        let reporting = self.runtime.reporting();
        let sale = reporting
            .sale(sale_id)
            .ok_or_else(|| AdapterRejection::NotFound("sale does not exist".to_string()))?;
        Ok(SalePayoutsAdapterResponse {
            sale_id,
            amount: sale.amount.value(),
            member_id: sale.member_id,
            payouts: reporting.sale_payouts(sale_id),
        })
    }

    pub fn commission_table(&self) -> CommissionTableResponse {
        let table = self.runtime.commission_table();
        CommissionTableResponse {
            max_levels: table.max_levels(),
            levels: table
                .levels()
                .into_iter()
                .map(|(level, rate_percent)| CommissionLevelRow {
                    level,
                    rate_percent,
                })
                .collect(),
        }
    }

    fn existing_member(&self, member_id: u64) -> Result<MemberId, AdapterRejection> {
        let member_id = MemberId(member_id);
        member_id
            .validate()
            .map_err(|v| AdapterRejection::Invalid(v.to_string()))?;
        if self.runtime.reporting().member(member_id).is_none() {
            return Err(AdapterRejection::NotFound(
                "member does not exist".to_string(),
            ));
        }
        Ok(member_id)
    }
}

fn rejection_from(err: UplineError) -> AdapterRejection {
    if err.is_invalid_argument() {
        AdapterRejection::Invalid(err.to_string())
    } else {
        AdapterRejection::Internal(err.to_string())
    }
}

fn request_now(now_ns: Option<u64>) -> MonotonicTimeNs {
    MonotonicTimeNs(now_ns.unwrap_or_else(system_time_now_ns).max(1))
}

fn system_time_now_ns() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    u64::try_from(nanos).unwrap_or(u64::MAX)
}
