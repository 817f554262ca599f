//! Reservations, charging sessions, and charge detail records.
//!
//! An EVSE owns at most one of each at a time. Station-level operations
//! (`reserve_evse`, `cancel_reservation`, `remote_start`, `remote_stop`)
//! wrap the EVSE-level result kinds with station-scoped outcomes
//! (`OutOfService`, `NoEVSEsAvailable`) — see [`crate::station`].

use crate::ids::{EvseId, ReservationId, SessionId, StationId};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Upper bound on how long a reservation may be held, enforced by
/// [`crate::evse::Evse::reserve`].
pub const MAX_RESERVATION_DURATION: Duration = Duration::from_secs(30 * 60);

/// Why a reservation is being cancelled, forwarded to the upstream partner
/// when the EVSE has a remote twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    ByDriver,
    ByOperator,
    Expired,
    Superseded,
}

/// A held reservation on one EVSE.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingReservation {
    pub id: ReservationId,
    pub evse_id: EvseId,
    pub id_tag: String,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    /// Deliberately left unset on the success path of `reserve_evse` /
    /// `reserve_station` (an accepted design gap, not an oversight — see
    /// DESIGN.md).
    pub station: Option<StationId>,
}

impl ChargingReservation {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::from_std(self.duration).unwrap_or_default()
    }

    pub fn is_expired_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.expires_at()
    }
}

/// An open charging session on one EVSE.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSession {
    pub id: SessionId,
    pub evse_id: EvseId,
    pub id_tag: String,
    pub start_time: DateTime<Utc>,
    /// Set by the station if a freshly-started session doesn't already
    /// carry one — unlike the reservation/CDR back-references, this one
    /// *is* wired on the success path (SPEC_FULL.md §4.4).
    pub station: Option<StationId>,
}

/// A closed session, handed off to [`crate::upstream::UpstreamService::send_charge_detail_record`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDetailRecord {
    pub session_id: SessionId,
    pub evse_id: EvseId,
    pub id_tag: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub energy_kwh: f64,
    /// Deliberately left unset on the success path of `remote_stop` — see
    /// DESIGN.md.
    pub station: Option<StationId>,
}

/// Outcome of reserving an EVSE or a station.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationResult {
    Success(ChargingReservation),
    /// Already reserved, for a different reservation id than the one
    /// requested. Re-requesting with the *same* id is idempotent and also
    /// reports `Success`.
    AlreadyReserved,
    /// Rejected because a charging session is already active.
    Occupied,
    UnknownEVSE,
    OutOfService,
    NoEVSEsAvailable,
    Error(String),
}

/// Outcome of cancelling a reservation.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelReservationResult {
    Success,
    UnknownReservation,
    OutOfService,
    NoEVSEsAvailable,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_expiry_uses_start_time_plus_duration() {
        let start = crate::now();
        let reservation = ChargingReservation {
            id: ReservationId::new("R1"),
            evse_id: EvseId::new("E1"),
            id_tag: "tag".into(),
            start_time: start,
            duration: Duration::from_secs(60),
            station: None,
        };
        assert!(!reservation.is_expired_at(start));
        assert!(reservation.is_expired_at(start + chrono::Duration::seconds(61)));
    }
}
