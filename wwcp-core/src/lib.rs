//! # wwcp-core
//!
//! In-memory domain model and event-propagation core for a world-wide
//! charging-protocol (WWCP) roaming network: the hierarchy of charge-point
//! infrastructure (roaming network → operator → pool → station → EVSE),
//! admin/operational status tracking over time, reservation and remote
//! start/stop session orchestration across a locally-mastered entity and an
//! optionally-attached remote backend, and a fan-out event-propagation chain
//! into operator roaming providers that batch and push data/status deltas to
//! external roaming partners.
//!
//! ## Architecture
//!
//! ```text
//! EVSE mutation
//!   │
//!   ▼
//! ChargingStation (aggregation + fan-out to pool)
//!   │
//!   ▼
//! Operator / RoamingNetwork (routing collaborators)
//!   │
//!   ▼
//! EVSEOperatorRoamingProvider (bounded queues + periodic flush)
//!   │
//!   ▼
//! UpstreamService (abstract roaming-partner push — see wwcp-upstream-mock)
//! ```
//!
//! Wire-level encoding to roaming partners (OICP, OCPP, ...) is explicitly
//! out of scope: the provider only ever talks to an abstract
//! [`upstream::UpstreamService`].

pub mod config;
pub mod entity;
pub mod error;
pub mod evse;
pub mod ids;
pub mod network;
pub mod provider;
pub mod reservation;
pub mod schedule;
pub mod station;
pub mod status;
pub mod time;
pub mod upstream;
pub mod voting;

pub use config::{ProviderConfig, ScheduleConfig, StationConfig};
pub use entity::{EntityBase, PropertyChangedEvent, PropertyValue};
pub use error::{ProviderError, StationError};
pub use evse::{Evse, RemoteStartEVSEResult, RemoteStopEVSEResult};
pub use ids::{EvseId, OperatorId, PoolId, ProviderId, ReservationId, SessionId, StationId};
pub use network::{ChargingPool, Operator, RoamingNetwork};
pub use provider::{EVSEOperatorRoamingProvider, EvseSnapshot};
pub use reservation::{ChargeDetailRecord, ChargingReservation, ChargingSession};
pub use schedule::{InsertMode, StatusSchedule};
pub use station::{ChargingStation, StatusAggregationDelegate};
pub use status::{AdminStatus, EvseStatusReport, OperationalStatus};
pub use time::Timestamped;
pub use upstream::{Acknowledgement, PushAction, UpstreamService};
pub use voting::VotingNotificator;

/// Current instant, the single clock the whole crate reads from.
///
/// Centralized so tests can reason about "now" consistently and so a future
/// injectable clock only has to change this one function.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
