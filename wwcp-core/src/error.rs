//! Hard errors for argument validation and structural failures.
//!
//! Long-running dual-dispatch operations (reserve, remote start/stop,
//! cancel) never appear here — they return a result-kind enum from
//! [`crate::reservation`] / [`crate::evse`] / [`crate::station`] instead, per
//! the error-handling design in SPEC_FULL.md §7.

use crate::ids::EvseId;
use thiserror::Error;

/// Errors raised by [`crate::station::ChargingStation`] mutators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StationError {
    #[error("EVSE {0} already exists in this station")]
    EvseAlreadyExists(EvseId),

    #[error("EVSE {0} not found in this station")]
    EvseNotFound(EvseId),
}

/// Errors surfaced (logging-only) from an [`EVSEOperatorRoamingProvider`](crate::provider::EVSEOperatorRoamingProvider) flush.
///
/// Never returned to a caller: the flush loop catches these, logs once, and
/// moves on (SPEC_FULL.md §4.6 / §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("upstream rejected {action} of {count} EVSE data record(s): {message}")]
    DataPushRejected {
        action: &'static str,
        count: usize,
        message: String,
    },

    #[error("upstream rejected {action} of {count} status record(s): {message}")]
    StatusPushRejected {
        action: &'static str,
        count: usize,
        message: String,
    },
}
