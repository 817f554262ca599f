//! A single electric vehicle supply equipment (EVSE): the leaf of the
//! roaming-network hierarchy that actually holds reservations and charging
//! sessions.

use crate::entity::{EntityBase, EventBus};
use crate::ids::{EvseId, ReservationId, SessionId, StationId};
use crate::reservation::{
    CancellationReason, ChargeDetailRecord, ChargingReservation, ChargingSession, ReservationResult,
    MAX_RESERVATION_DURATION,
};
use crate::schedule::StatusSchedule;
use crate::status::{AdminStatus, OperationalStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// Outcome of a remote (or remote-falling-back-to-local) start request.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStartEVSEResult {
    Success(ChargingSession),
    UnknownEVSE,
    AlreadyInUse,
    /// Reserved for a different id token than the one starting.
    Reserved,
    Error(String),
    OutOfService,
}

/// Outcome of a remote (or remote-falling-back-to-local) stop request.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStopEVSEResult {
    Success(ChargeDetailRecord),
    UnknownEVSE,
    InvalidSessionId,
    Error(String),
    OutOfService,
}

#[derive(Default)]
struct EvseState {
    reservation: Option<ChargingReservation>,
    session: Option<ChargingSession>,
}

pub struct Evse {
    pub base: EntityBase<EvseId>,
    pub station_id: StationId,
    pub status: StatusSchedule<OperationalStatus>,
    pub admin_status: StatusSchedule<AdminStatus>,

    pub on_reservation_cancelled: EventBus<(EvseId, ReservationId, CancellationReason)>,
    pub on_new_charging_session: EventBus<ChargingSession>,
    pub on_new_charge_detail_record: EventBus<ChargeDetailRecord>,

    state: Mutex<EvseState>,
}

impl Evse {
    pub fn new(id: EvseId, station_id: StationId, status_schedule_size: usize) -> Self {
        Self {
            base: EntityBase::new(id),
            station_id,
            status: StatusSchedule::new(status_schedule_size),
            admin_status: StatusSchedule::new(status_schedule_size),
            on_reservation_cancelled: EventBus::new(),
            on_new_charging_session: EventBus::new(),
            on_new_charge_detail_record: EventBus::new(),
            state: Mutex::new(EvseState::default()),
        }
    }

    pub fn id(&self) -> &EvseId {
        &self.base.id
    }

    pub fn current_reservation(&self) -> Option<ChargingReservation> {
        self.state.lock().reservation.clone()
    }

    pub fn current_session(&self) -> Option<ChargingSession> {
        self.state.lock().session.clone()
    }

    /// Reserve this EVSE for `id_tag` until `duration` elapses.
    ///
    /// Rejects a duration exceeding [`MAX_RESERVATION_DURATION`] without
    /// touching any state. Re-requesting the reservation already held under
    /// `id` is idempotent; requesting a new id while another reservation is
    /// held is a hard conflict, as is an already-occupied EVSE.
    pub fn reserve(
        &self,
        id: ReservationId,
        id_tag: impl Into<String>,
        duration: Duration,
        instant: DateTime<Utc>,
    ) -> ReservationResult {
        if duration > MAX_RESERVATION_DURATION {
            return ReservationResult::Error(format!(
                "requested duration {duration:?} exceeds max reservation duration {MAX_RESERVATION_DURATION:?}"
            ));
        }

        let id_tag = id_tag.into();
        let mut state = self.state.lock();

        if state.session.is_some() {
            return ReservationResult::Occupied;
        }

        if let Some(existing) = &state.reservation {
            if existing.id != id {
                return ReservationResult::AlreadyReserved;
            }
        }

        let reservation = ChargingReservation {
            id,
            evse_id: self.base.id.clone(),
            id_tag,
            start_time: instant,
            duration,
            station: None,
        };
        state.reservation = Some(reservation.clone());
        drop(state);

        self.status.insert_at(OperationalStatus::Reserved, instant);
        debug!(evse_id = %self.base.id, reservation_id = %reservation.id, "evse reserved");
        ReservationResult::Success(reservation)
    }

    /// Cancel the held reservation matching `id`, if any.
    ///
    /// Returns whether a matching reservation was found and removed; the
    /// station layer maps this into the full [`crate::reservation::CancelReservationResult`].
    pub fn cancel_reservation(&self, id: &ReservationId, reason: CancellationReason) -> bool {
        let mut state = self.state.lock();
        let matches = state.reservation.as_ref().is_some_and(|r| &r.id == id);
        if !matches {
            return false;
        }
        state.reservation = None;
        drop(state);

        self.status.insert(OperationalStatus::Available);
        self.on_reservation_cancelled.fire(&(self.base.id.clone(), id.clone(), reason));
        debug!(evse_id = %self.base.id, reservation_id = %id, ?reason, "reservation cancelled");
        true
    }

    /// Start a charging session for `id_tag`.
    ///
    /// A reservation held by the *same* id token is consumed by the start;
    /// one held by a different token blocks it. The returned session's
    /// `station` back-reference is left unset here — the station layer
    /// wires it in on success (SPEC_FULL.md §4.4), unlike the reservation
    /// and charge-detail-record back-references.
    pub fn remote_start(&self, session_id: SessionId, id_tag: impl Into<String>, instant: DateTime<Utc>) -> RemoteStartEVSEResult {
        let id_tag = id_tag.into();
        let mut state = self.state.lock();

        if state.session.is_some() {
            return RemoteStartEVSEResult::AlreadyInUse;
        }

        if let Some(reservation) = &state.reservation {
            if reservation.id_tag != id_tag {
                return RemoteStartEVSEResult::Reserved;
            }
        }
        state.reservation = None;

        let session = ChargingSession {
            id: session_id,
            evse_id: self.base.id.clone(),
            id_tag,
            start_time: instant,
            station: None,
        };
        state.session = Some(session.clone());
        drop(state);

        self.status.insert_at(OperationalStatus::Charging, instant);
        self.on_new_charging_session.fire(&session);
        debug!(evse_id = %self.base.id, session_id = %session.id, "charging session started");
        RemoteStartEVSEResult::Success(session)
    }

    /// Stop the active session matching `session_id`, closing it out into a
    /// [`ChargeDetailRecord`].
    ///
    /// This crate has no live metering loop, so `energy_kwh` on the emitted
    /// record is always `0.0`; a real deployment would read it from the
    /// EVSE's metering backend before closing the session.
    pub fn remote_stop(&self, session_id: &SessionId, instant: DateTime<Utc>) -> RemoteStopEVSEResult {
        let mut state = self.state.lock();
        let matches = state.session.as_ref().is_some_and(|s| &s.id == session_id);
        if !matches {
            return RemoteStopEVSEResult::InvalidSessionId;
        }
        let session = state.session.take().expect("just confirmed present");
        drop(state);

        let record = ChargeDetailRecord {
            session_id: session.id.clone(),
            evse_id: session.evse_id.clone(),
            id_tag: session.id_tag.clone(),
            start_time: session.start_time,
            end_time: instant,
            energy_kwh: 0.0,
            station: None,
        };

        self.status.insert_at(OperationalStatus::Available, instant);
        self.on_new_charge_detail_record.fire(&record);
        debug!(evse_id = %self.base.id, session_id = %record.session_id, "charging session stopped");
        RemoteStopEVSEResult::Success(record)
    }
}
