//! A charging station: an owned set of EVSEs, admin/operational status
//! aggregation, attribute inheritance from its pool, and the reservation /
//! remote-start / remote-stop dispatch protocol.

use crate::config::StationConfig;
use crate::entity::{EntityBase, EventBus, PropertyValue, ReactiveMap};
use crate::error::StationError;
use crate::evse::{Evse, RemoteStartEVSEResult, RemoteStopEVSEResult};
use crate::ids::{EvseId, PoolId, ReservationId, SessionId, StationId};
use crate::network::ChargingPool;
use crate::reservation::{
    CancellationReason, CancelReservationResult, ChargeDetailRecord, ChargingReservation, ChargingSession,
    ReservationResult,
};
use crate::schedule::StatusSchedule;
use crate::status::{AdminStatus, EvseStatusReport, OperationalStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

/// Derives a station's aggregate operational status from a snapshot of its
/// EVSEs' statuses. Invoked every time a child EVSE's operational status
/// changes, while the station's admin status still exposes it
/// (SPEC_FULL.md §4.4).
pub type StatusAggregationDelegate = Arc<dyn Fn(&EvseStatusReport) -> OperationalStatus + Send + Sync>;

/// A descriptive attribute a station either overrides locally or inherits
/// from its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Name,
    Description,
    Address,
    GeoLocation,
    EntranceAddress,
    ExitAddress,
    OpeningTimes,
    AuthModes,
    PaymentOptions,
    Accessibility,
    Hotline,
}

impl AttributeKind {
    fn property_name(self) -> &'static str {
        match self {
            AttributeKind::Name => "name",
            AttributeKind::Description => "description",
            AttributeKind::Address => "address",
            AttributeKind::GeoLocation => "geo_location",
            AttributeKind::EntranceAddress => "entrance_address",
            AttributeKind::ExitAddress => "exit_address",
            AttributeKind::OpeningTimes => "opening_times",
            AttributeKind::AuthModes => "auth_modes",
            AttributeKind::PaymentOptions => "payment_options",
            AttributeKind::Accessibility => "accessibility",
            AttributeKind::Hotline => "hotline",
        }
    }
}

/// A standard library of useful, commonly-grounded [`StatusAggregationDelegate`]s.
pub mod aggregation {
    use super::*;

    /// Available if any EVSE is available, Charging if any is charging
    /// (and none available), else Faulted if any EVSE is faulted, else
    /// OutOfService.
    pub fn any_available_wins() -> StatusAggregationDelegate {
        Arc::new(|report: &EvseStatusReport| {
            if report.any_match(OperationalStatus::Available) {
                OperationalStatus::Available
            } else if report.any_match(OperationalStatus::Charging) {
                OperationalStatus::Charging
            } else if report.any_match(OperationalStatus::Faulted) {
                OperationalStatus::Faulted
            } else if report.evse_statuses.is_empty() {
                OperationalStatus::Unspecified
            } else {
                OperationalStatus::OutOfService
            }
        })
    }
}

pub struct ChargingStation {
    pub base: EntityBase<StationId>,
    pub pool_id: PoolId,
    pool: Weak<ChargingPool>,

    evses: ReactiveMap<EvseId, Evse>,
    evse_schedule_size: usize,

    pub status: StatusSchedule<OperationalStatus>,
    pub admin_status: StatusSchedule<AdminStatus>,

    evse_creation_voting: crate::voting::VotingNotificator<(DateTime<Utc>, StationId, EvseId)>,
    evse_removal_voting: crate::voting::VotingNotificator<(DateTime<Utc>, StationId, EvseId)>,

    aggregation_delegate: Mutex<Option<StatusAggregationDelegate>>,
    remote: Mutex<Option<Arc<ChargingStation>>>,
    local_attrs: Mutex<HashMap<AttributeKind, String>>,

    pub on_evse_addition: EventBus<Arc<Evse>>,
    pub on_evse_removal: EventBus<Arc<Evse>>,
    pub on_new_reservation: EventBus<ChargingReservation>,
    pub on_reservation_cancelled: EventBus<(EvseId, ReservationId, CancellationReason)>,
    pub on_new_charging_session: EventBus<ChargingSession>,
    pub on_new_charge_detail_record: EventBus<ChargeDetailRecord>,
}

impl ChargingStation {
    pub fn new(id: StationId, pool_id: PoolId, pool: Weak<ChargingPool>, config: StationConfig) -> Arc<Self> {
        let station = Arc::new(Self {
            base: EntityBase::new(id),
            pool_id,
            pool,
            evses: ReactiveMap::new(),
            evse_schedule_size: 100,
            status: StatusSchedule::new(config.operational_schedule_size),
            admin_status: StatusSchedule::new(config.admin_schedule_size),
            evse_creation_voting: crate::voting::VotingNotificator::new(),
            evse_removal_voting: crate::voting::VotingNotificator::new(),
            aggregation_delegate: Mutex::new(None),
            remote: Mutex::new(None),
            local_attrs: Mutex::new(HashMap::new()),
            on_evse_addition: EventBus::new(),
            on_evse_removal: EventBus::new(),
            on_new_reservation: EventBus::new(),
            on_reservation_cancelled: EventBus::new(),
            on_new_charging_session: EventBus::new(),
            on_new_charge_detail_record: EventBus::new(),
        });
        station.wire_self();
        station
    }

    fn wire_self(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.admin_status.on_status_changed(move |now, _old, new: AdminStatus| {
            let Some(station) = weak.upgrade() else { return };
            if new.exposes_operational_status() {
                station.recompute_aggregated_status_at(now);
            } else {
                station.status.reset_to(OperationalStatus::OutOfService, now);
            }
        });
    }

    pub fn id(&self) -> &StationId {
        &self.base.id
    }

    // --- attribute inheritance -------------------------------------------------

    pub fn attribute(&self, kind: AttributeKind) -> Option<String> {
        if let Some(local) = self.local_attrs.lock().get(&kind).cloned() {
            return Some(local);
        }
        self.pool.upgrade().and_then(|p| p.attribute(kind))
    }

    /// Write a descriptive attribute.
    ///
    /// A no-op results in no `name`/`description`/... property-changed
    /// event: this covers both "new value equals what the pool already
    /// provides" (so the local override is cleared, falling back to
    /// inheritance) and a genuinely unchanged value.
    pub fn set_attribute(&self, kind: AttributeKind, value: Option<String>) {
        let old_effective = self.attribute(kind);
        let pool_value = self.pool.upgrade().and_then(|p| p.attribute(kind));

        let mut locals = self.local_attrs.lock();
        match &value {
            Some(v) if !v.is_empty() && Some(v.clone()) != pool_value => {
                locals.insert(kind, v.clone());
            }
            _ => {
                locals.remove(&kind);
            }
        }
        drop(locals);

        let new_effective = self.attribute(kind);
        if old_effective != new_effective {
            self.base.fire_property_changed(
                kind.property_name(),
                PropertyValue::OptText(old_effective),
                PropertyValue::OptText(new_effective),
            );
        }
    }

    pub fn name(&self) -> Option<String> {
        self.attribute(AttributeKind::Name)
    }

    pub fn set_name(&self, name: Option<impl Into<String>>) {
        self.set_attribute(AttributeKind::Name, name.map(|n| n.into()));
    }

    // --- aggregation ------------------------------------------------------

    pub fn set_aggregation_delegate(&self, delegate: StatusAggregationDelegate) {
        *self.aggregation_delegate.lock() = Some(delegate);
        self.recompute_aggregated_status_at(crate::now());
    }

    fn recompute_aggregated_status_at(&self, now: DateTime<Utc>) {
        if !self.admin_status.current_value().exposes_operational_status() {
            return;
        }
        let Some(delegate) = self.aggregation_delegate.lock().clone() else {
            return;
        };
        let mut evse_statuses = HashMap::new();
        for evse in self.evses.values() {
            evse_statuses.insert(evse.base.id.clone(), evse.status.current_value());
        }
        let report = EvseStatusReport {
            station_id: self.base.id.clone(),
            evse_statuses,
        };
        let new_status = delegate(&report);
        self.status.insert_at(new_status, now);
    }

    // --- EVSE lifecycle -----------------------------------------------------

    pub fn contains_evse(&self, id: &EvseId) -> bool {
        self.evses.contains_key(id)
    }

    pub fn get_evse_by_id(&self, id: &EvseId) -> Arc<Evse> {
        self.try_get_evse_by_id(id).expect("evse not found")
    }

    pub fn try_get_evse_by_id(&self, id: &EvseId) -> Option<Arc<Evse>> {
        self.evses.get(id)
    }

    pub fn evse_ids(&self) -> Vec<EvseId> {
        self.evses.values().iter().map(|e| e.base.id.clone()).collect()
    }

    /// All currently-owned EVSEs, for a provider to wire up at subscription
    /// time (SPEC_FULL.md §4.6 — only EVSEs added *after* subscription are
    /// covered by `on_evse_addition`, so the provider needs this to cover
    /// ones that already existed).
    pub fn evses(&self) -> Vec<Arc<Evse>> {
        self.evses.values()
    }

    pub fn evse_count(&self) -> usize {
        self.evses.len()
    }

    /// Register a handler consulted before an EVSE is created, any of which
    /// can veto the creation by returning `false` (SPEC_FULL.md §4.4).
    pub fn on_evse_creation_vote(&self, handler: impl Fn(&(DateTime<Utc>, StationId, EvseId)) -> bool + Send + Sync + 'static) {
        self.evse_creation_voting.add_voting_handler(handler);
    }

    /// Register a handler consulted before an EVSE is removed, any of which
    /// can veto the removal by returning `false`.
    pub fn on_evse_removal_vote(&self, handler: impl Fn(&(DateTime<Utc>, StationId, EvseId)) -> bool + Send + Sync + 'static) {
        self.evse_removal_voting.add_voting_handler(handler);
    }

    /// Attach a remote twin station. Only EVSEs created *after* this call
    /// get a mirrored remote twin (SPEC_FULL.md §4.4 step 4) — existing
    /// EVSEs are not retroactively mirrored.
    pub fn attach_remote_station(&self, remote: Arc<ChargingStation>) {
        *self.remote.lock() = Some(remote);
    }

    /// Create a new EVSE, running the creation vote before it becomes
    /// visible and, if a remote station is attached, wiring a mirrored
    /// twin EVSE on it.
    pub fn create_evse(
        self: &Arc<Self>,
        id: EvseId,
        configure: impl FnOnce(&Evse),
    ) -> Result<Option<Arc<Evse>>, StationError> {
        if self.evses.contains_key(&id) {
            return Err(StationError::EvseAlreadyExists(id));
        }

        let evse = Arc::new(Evse::new(id.clone(), self.base.id.clone(), self.evse_schedule_size));
        configure(&evse);

        let now = crate::now();
        if !self
            .evse_creation_voting
            .send_voting(&(now, self.base.id.clone(), id.clone()))
        {
            debug!(station_id = %self.base.id, evse_id = %id, "evse creation vetoed");
            return Ok(None);
        }

        self.evses.insert(id.clone(), Arc::clone(&evse));
        self.wire_evse_events(&evse);

        if let Some(remote) = self.remote.lock().clone() {
            self.attach_remote_evse_mirror(&evse, &remote);
        }

        self.evse_creation_voting
            .send_notification(&(now, self.base.id.clone(), id));
        self.on_evse_addition.fire(&evse);
        Ok(Some(evse))
    }

    pub fn remove_evse(self: &Arc<Self>, id: &EvseId) -> Result<bool, StationError> {
        let evse = self.evses.get(id).ok_or_else(|| StationError::EvseNotFound(id.clone()))?;

        let now = crate::now();
        if !self
            .evse_removal_voting
            .send_voting(&(now, self.base.id.clone(), id.clone()))
        {
            debug!(station_id = %self.base.id, evse_id = %id, "evse removal vetoed");
            return Ok(false);
        }

        self.evses.remove(id);
        self.evse_removal_voting
            .send_notification(&(now, self.base.id.clone(), id.clone()));
        self.on_evse_removal.fire(&evse);
        Ok(true)
    }

    fn wire_evse_events(self: &Arc<Self>, evse: &Arc<Evse>) {
        let weak = Arc::downgrade(self);
        evse.status.on_status_changed(move |now, _old, _new| {
            if let Some(station) = weak.upgrade() {
                station.recompute_aggregated_status_at(now);
            }
        });
    }

    fn attach_remote_evse_mirror(&self, evse: &Arc<Evse>, remote_station: &Arc<ChargingStation>) {
        let remote_evse = Arc::new(Evse::new(
            evse.base.id.clone(),
            remote_station.base.id.clone(),
            evse.status.max_size(),
        ));
        remote_station.evses.insert(evse.base.id.clone(), Arc::clone(&remote_evse));

        let remote_clone = Arc::clone(&remote_evse);
        evse.status.on_status_changed(move |_now, _old, new| {
            remote_clone.status.insert(new);
        });
        let local_clone = Arc::clone(evse);
        remote_evse.status.on_status_changed(move |_now, _old, new| {
            local_clone.status.insert(new);
        });
    }

    // --- reservation / remote start-stop dispatch --------------------------

    /// Reserve a specific EVSE. Admin-gated, then dispatched remote-first
    /// with local fallback on `UnknownEVSE`/`Error` if a remote station is
    /// attached.
    pub fn reserve_evse(
        self: &Arc<Self>,
        evse_id: &EvseId,
        reservation_id: ReservationId,
        id_tag: impl Into<String>,
        duration: Duration,
    ) -> ReservationResult {
        let id_tag = id_tag.into();
        let now = crate::now();

        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                ReservationResult::OutOfService
            } else {
                ReservationResult::NoEVSEsAvailable
            };
        }
        if self.evses.is_empty() {
            return ReservationResult::NoEVSEsAvailable;
        }
        let Some(evse) = self.evses.get(evse_id) else {
            return ReservationResult::UnknownEVSE;
        };

        let remote = self.remote.lock().clone();
        let result = if let Some(remote_station) = remote {
            match remote_station.reserve_evse(evse_id, reservation_id.clone(), id_tag.clone(), duration) {
                ReservationResult::UnknownEVSE | ReservationResult::Error(_) => {
                    evse.reserve(reservation_id, id_tag, duration, now)
                }
                other => other,
            }
        } else {
            evse.reserve(reservation_id, id_tag, duration, now)
        };

        if let ReservationResult::Success(reservation) = &result {
            self.on_new_reservation.fire(reservation);
        }
        result
    }

    /// Reserve any one available EVSE on this station.
    pub fn reserve_station(
        self: &Arc<Self>,
        reservation_id: ReservationId,
        id_tag: impl Into<String>,
        duration: Duration,
    ) -> ReservationResult {
        let id_tag = id_tag.into();
        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                ReservationResult::OutOfService
            } else {
                ReservationResult::NoEVSEsAvailable
            };
        }
        let available = self
            .evses
            .values()
            .into_iter()
            .find(|e| e.status.current_value() == OperationalStatus::Available);
        match available {
            Some(evse) => self.reserve_evse(&evse.base.id.clone(), reservation_id, id_tag, duration),
            None => ReservationResult::NoEVSEsAvailable,
        }
    }

    /// Cancel a held reservation. If a remote station is attached its copy
    /// is cancelled too; the local EVSE set is *always* scanned regardless
    /// of the remote outcome (SPEC_FULL.md §4.4).
    pub fn cancel_reservation(&self, id: &ReservationId, reason: CancellationReason) -> CancelReservationResult {
        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                CancelReservationResult::OutOfService
            } else {
                CancelReservationResult::NoEVSEsAvailable
            };
        }
        if self.evses.is_empty() {
            return CancelReservationResult::NoEVSEsAvailable;
        }

        let mut remote_found = false;
        if let Some(remote) = self.remote.lock().clone() {
            remote_found = matches!(remote.cancel_reservation(id, reason), CancelReservationResult::Success);
        }

        let mut local_found = false;
        for evse in self.evses.values() {
            if evse.cancel_reservation(id, reason) {
                self.on_reservation_cancelled.fire(&(evse.base.id.clone(), id.clone(), reason));
                local_found = true;
                break;
            }
        }

        if remote_found || local_found {
            CancelReservationResult::Success
        } else {
            CancelReservationResult::UnknownReservation
        }
    }

    pub fn remote_start_evse(
        self: &Arc<Self>,
        evse_id: &EvseId,
        session_id: SessionId,
        id_tag: impl Into<String>,
    ) -> RemoteStartEVSEResult {
        let id_tag = id_tag.into();
        let now = crate::now();

        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                RemoteStartEVSEResult::OutOfService
            } else {
                RemoteStartEVSEResult::Error(format!("station administratively unavailable ({admin:?})"))
            };
        }
        let Some(evse) = self.evses.get(evse_id) else {
            return RemoteStartEVSEResult::UnknownEVSE;
        };

        let remote = self.remote.lock().clone();
        let result = if let Some(remote_station) = remote {
            match remote_station.remote_start_evse(evse_id, session_id.clone(), id_tag.clone()) {
                RemoteStartEVSEResult::UnknownEVSE | RemoteStartEVSEResult::Error(_) => {
                    evse.remote_start(session_id, id_tag, now)
                }
                other => other,
            }
        } else {
            evse.remote_start(session_id, id_tag, now)
        };

        match result {
            RemoteStartEVSEResult::Success(mut session) => {
                if session.station.is_none() {
                    session.station = Some(self.base.id.clone());
                }
                self.on_new_charging_session.fire(&session);
                RemoteStartEVSEResult::Success(session)
            }
            other => other,
        }
    }

    pub fn remote_start_station(
        self: &Arc<Self>,
        session_id: SessionId,
        id_tag: impl Into<String>,
    ) -> RemoteStartChargingStationResult {
        let id_tag = id_tag.into();
        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                RemoteStartChargingStationResult::OutOfService
            } else {
                RemoteStartChargingStationResult::NoEVSEsAvailable
            };
        }
        let available = self
            .evses
            .values()
            .into_iter()
            .find(|e| e.status.current_value() == OperationalStatus::Available);
        let Some(evse) = available else {
            return RemoteStartChargingStationResult::NoEVSEsAvailable;
        };
        match self.remote_start_evse(&evse.base.id.clone(), session_id, id_tag) {
            RemoteStartEVSEResult::Success(session) => RemoteStartChargingStationResult::Success(session),
            RemoteStartEVSEResult::AlreadyInUse => RemoteStartChargingStationResult::NoEVSEsAvailable,
            RemoteStartEVSEResult::Reserved => RemoteStartChargingStationResult::Reserved,
            RemoteStartEVSEResult::Error(e) => RemoteStartChargingStationResult::Error(e),
            RemoteStartEVSEResult::OutOfService => RemoteStartChargingStationResult::OutOfService,
            RemoteStartEVSEResult::UnknownEVSE => {
                RemoteStartChargingStationResult::Error("evse disappeared mid-dispatch".into())
            }
        }
    }

    pub fn remote_stop_evse(self: &Arc<Self>, evse_id: &EvseId, session_id: &SessionId) -> RemoteStopEVSEResult {
        let now = crate::now();
        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                RemoteStopEVSEResult::OutOfService
            } else {
                RemoteStopEVSEResult::Error(format!("station administratively unavailable ({admin:?})"))
            };
        }
        let Some(evse) = self.evses.get(evse_id) else {
            return RemoteStopEVSEResult::UnknownEVSE;
        };

        let remote = self.remote.lock().clone();
        let result = if let Some(remote_station) = remote {
            match remote_station.remote_stop_evse(evse_id, session_id) {
                RemoteStopEVSEResult::UnknownEVSE | RemoteStopEVSEResult::Error(_) => evse.remote_stop(session_id, now),
                other => other,
            }
        } else {
            evse.remote_stop(session_id, now)
        };

        if let RemoteStopEVSEResult::Success(record) = &result {
            self.on_new_charge_detail_record.fire(record);
        }
        result
    }

    pub fn remote_stop_station(
        self: &Arc<Self>,
        evse_id: &EvseId,
        session_id: &SessionId,
    ) -> RemoteStopChargingStationResult {
        let admin = self.admin_status.current_value();
        if !admin.exposes_operational_status() {
            return if admin == AdminStatus::OutOfService {
                RemoteStopChargingStationResult::OutOfService
            } else {
                RemoteStopChargingStationResult::NoEVSEsAvailable
            };
        }
        if self.evses.is_empty() {
            return RemoteStopChargingStationResult::NoEVSEsAvailable;
        }
        match self.remote_stop_evse(evse_id, session_id) {
            RemoteStopEVSEResult::Success(record) => RemoteStopChargingStationResult::Success(record),
            RemoteStopEVSEResult::InvalidSessionId => RemoteStopChargingStationResult::InvalidSessionId,
            RemoteStopEVSEResult::Error(e) => RemoteStopChargingStationResult::Error(e),
            RemoteStopEVSEResult::OutOfService => RemoteStopChargingStationResult::OutOfService,
            RemoteStopEVSEResult::UnknownEVSE => RemoteStopChargingStationResult::InvalidSessionId,
        }
    }
}

/// Outcome of a station-level remote-start that doesn't target a specific
/// EVSE (the station picks one itself).
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStartChargingStationResult {
    Success(ChargingSession),
    NoEVSEsAvailable,
    Reserved,
    Error(String),
    OutOfService,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStopChargingStationResult {
    Success(ChargeDetailRecord),
    NoEVSEsAvailable,
    InvalidSessionId,
    Error(String),
    OutOfService,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EvseId, OperatorId};
    use crate::network::ChargingPool;

    fn pool() -> Arc<ChargingPool> {
        ChargingPool::new(PoolId::new("P1"), OperatorId::new("OP1"), Weak::new())
    }

    fn station() -> Arc<ChargingStation> {
        let pool = pool();
        let station = ChargingStation::new(
            StationId::new("S1"),
            pool.id().clone(),
            Arc::downgrade(&pool),
            StationConfig::default(),
        );
        pool.adopt_station(Arc::clone(&station));
        station
    }

    #[test]
    fn create_evse_makes_it_visible_and_fires_addition() {
        let station = station();
        let added = Arc::new(Mutex::new(false));
        let added2 = added.clone();
        station.on_evse_addition.subscribe(move |_evse| {
            *added2.lock() = true;
        });

        let result = station.create_evse(EvseId::new("E1"), |_| {});
        assert!(matches!(result, Ok(Some(_))));
        assert!(station.contains_evse(&EvseId::new("E1")));
        assert!(*added.lock());
    }

    #[test]
    fn create_evse_rejects_duplicate_id() {
        let station = station();
        station.create_evse(EvseId::new("E1"), |_| {}).unwrap();
        let result = station.create_evse(EvseId::new("E1"), |_| {});
        assert_eq!(result, Err(StationError::EvseAlreadyExists(EvseId::new("E1"))));
    }

    #[test]
    fn create_evse_can_be_vetoed() {
        let station = station();
        station.evse_creation_voting.add_voting_handler(|_| false);
        let result = station.create_evse(EvseId::new("E1"), |_| {});
        assert_eq!(result, Ok(None));
        assert!(!station.contains_evse(&EvseId::new("E1")));
    }

    #[test]
    fn admin_out_of_service_masks_operational_status() {
        let station = station();
        station.set_aggregation_delegate(aggregation::any_available_wins());
        station.create_evse(EvseId::new("E1"), |evse| evse.status.insert(OperationalStatus::Available)).unwrap();
        assert_eq!(station.status.current_value(), OperationalStatus::Available);

        station.admin_status.insert(AdminStatus::Blocked);
        assert_eq!(station.status.current_value(), OperationalStatus::OutOfService);

        station.admin_status.insert(AdminStatus::Operational);
        assert_eq!(station.status.current_value(), OperationalStatus::Available);
    }

    #[test]
    fn reserve_evse_rejects_when_out_of_service() {
        let station = station();
        station.create_evse(EvseId::new("E1"), |_| {}).unwrap();
        station.admin_status.insert(AdminStatus::OutOfService);
        let result = station.reserve_evse(&EvseId::new("E1"), ReservationId::new("R1"), "tag", Duration::from_secs(60));
        assert_eq!(result, ReservationResult::OutOfService);
    }

    #[test]
    fn reserve_evse_reports_unknown_evse() {
        let station = station();
        station.create_evse(EvseId::new("E1"), |_| {}).unwrap();
        let result = station.reserve_evse(&EvseId::new("MISSING"), ReservationId::new("R1"), "tag", Duration::from_secs(60));
        assert_eq!(result, ReservationResult::UnknownEVSE);
    }

    #[test]
    fn reserve_station_picks_any_available_evse() {
        let station = station();
        station
            .create_evse(EvseId::new("E1"), |evse| evse.status.insert(OperationalStatus::Faulted))
            .unwrap();
        station
            .create_evse(EvseId::new("E2"), |evse| evse.status.insert(OperationalStatus::Available))
            .unwrap();

        let result = station.reserve_station(ReservationId::new("R1"), "tag", Duration::from_secs(60));
        match result {
            ReservationResult::Success(reservation) => assert_eq!(reservation.evse_id, EvseId::new("E2")),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn remote_start_station_reports_no_evses_available() {
        let station = station();
        station
            .create_evse(EvseId::new("E1"), |evse| evse.status.insert(OperationalStatus::Faulted))
            .unwrap();
        let result = station.remote_start_station(SessionId::new("SESS1"), "tag");
        assert_eq!(result, RemoteStartChargingStationResult::NoEVSEsAvailable);
    }

    #[test]
    fn remote_start_evse_wires_station_back_reference_on_session() {
        let station = station();
        station.create_evse(EvseId::new("E1"), |_| {}).unwrap();
        let result = station.remote_start_evse(&EvseId::new("E1"), SessionId::new("SESS1"), "tag");
        match result {
            RemoteStartEVSEResult::Success(session) => assert_eq!(session.station, Some(StationId::new("S1"))),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn remote_stop_evse_leaves_cdr_station_unset() {
        let station = station();
        station.create_evse(EvseId::new("E1"), |_| {}).unwrap();
        station.remote_start_evse(&EvseId::new("E1"), SessionId::new("SESS1"), "tag");
        let result = station.remote_stop_evse(&EvseId::new("E1"), &SessionId::new("SESS1"));
        match result {
            RemoteStopEVSEResult::Success(record) => assert_eq!(record.station, None),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn attribute_inherits_from_pool_until_overridden() {
        let pool = pool();
        pool.set_attribute(AttributeKind::Name, Some("Pool Name".into()));
        let station = ChargingStation::new(
            StationId::new("S1"),
            pool.id().clone(),
            Arc::downgrade(&pool),
            StationConfig::default(),
        );
        pool.adopt_station(Arc::clone(&station));

        assert_eq!(station.name(), Some("Pool Name".to_string()));
        station.set_name(Some("Station Name"));
        assert_eq!(station.name(), Some("Station Name".to_string()));
        station.set_name(None::<String>);
        assert_eq!(station.name(), Some("Pool Name".to_string()));
    }
}
