//! The abstract roaming-partner boundary.
//!
//! Wire-level encoding (OICP, OCPP, or anything else a roaming partner
//! speaks) is explicitly out of scope for this crate: the provider only
//! ever calls [`UpstreamService`], an object-safe async trait. A concrete
//! implementation (e.g. an OCPP or OICP client, or a mock for tests) lives
//! in a separate crate.

use crate::ids::{EvseId, OperatorId};
use crate::reservation::ChargeDetailRecord;
use crate::status::OperationalStatus;
use async_trait::async_trait;
use std::time::Duration;

/// The kind of upsert a push represents, mirroring how most roaming
/// protocols distinguish a first full sync from incremental deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    FullLoad,
    Insert,
    Update,
    Delete,
}

/// Generic upstream response: success or a human-readable rejection
/// reason. Deliberately not a `Result` — a rejection is everyday business
/// data here, not an exceptional condition in the caller's control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub ok: bool,
    pub message: Option<String>,
}

impl Acknowledgement {
    pub fn ok() -> Self {
        Self { ok: true, message: None }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

/// A static-data record pushed for one EVSE (id plus whatever descriptive
/// fields the upstream partner cares about).
#[derive(Debug, Clone, PartialEq)]
pub struct EvseDataRecord {
    pub evse_id: EvseId,
    pub operator_id: OperatorId,
}

/// A status-change record pushed for one EVSE.
#[derive(Debug, Clone, PartialEq)]
pub struct EvseStatusRecord {
    pub evse_id: EvseId,
    pub status: OperationalStatus,
}

/// An authorization token presented by a driver (RFID, app token, ...).
/// Opaque to this crate; only ever forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// What a driver is trying to authorize against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTarget {
    pub evse_id: EvseId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStartResult {
    Authorized { session_id: crate::ids::SessionId },
    NotAuthorized { reason: String },
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStopResult {
    Authorized,
    NotAuthorized { reason: String },
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendCdrResult {
    Accepted,
    Rejected { reason: String },
    Timeout,
}

/// The sole interface a provider uses to talk to an external roaming
/// partner. Object-safe (via `async-trait`) so a provider can hold a
/// `Arc<dyn UpstreamService>` without knowing the concrete wire protocol.
#[async_trait]
pub trait UpstreamService: Send + Sync {
    async fn push_evse_data(&self, evses: Vec<EvseDataRecord>, action: PushAction, timeout: Duration) -> Acknowledgement;

    async fn push_evse_status(
        &self,
        statuses: Vec<EvseStatusRecord>,
        action: PushAction,
        timeout: Duration,
    ) -> Acknowledgement;

    async fn authorize_start(
        &self,
        operator: OperatorId,
        token: AuthToken,
        target: AuthTarget,
        timeout: Duration,
    ) -> AuthStartResult;

    async fn authorize_stop(
        &self,
        operator: OperatorId,
        token: AuthToken,
        target: AuthTarget,
        timeout: Duration,
    ) -> AuthStopResult;

    async fn send_charge_detail_record(&self, record: ChargeDetailRecord, timeout: Duration) -> Acknowledgement;
}
