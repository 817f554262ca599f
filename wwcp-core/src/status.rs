//! Admin and operational status enums, plus the EVSE status snapshot used
//! for station-level aggregation.

use crate::ids::EvseId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Administrative state of a charging station.
///
/// Only [`AdminStatus::Operational`] and [`AdminStatus::InternalUse`] expose
/// the station's underlying operational schedule as-is; every other variant
/// masks it to a single synthetic [`OperationalStatus::OutOfService`] entry
/// (SPEC_FULL.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdminStatus {
    #[default]
    Operational,
    InternalUse,
    OutOfService,
    Blocked,
    Planned,
    UnderConstruction,
    Error,
}

impl AdminStatus {
    /// Whether this admin status exposes the real operational schedule
    /// rather than a masked `OutOfService` stand-in.
    pub fn exposes_operational_status(self) -> bool {
        matches!(self, AdminStatus::Operational | AdminStatus::InternalUse)
    }
}

/// Operational state of a station or an individual EVSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationalStatus {
    #[default]
    Unspecified,
    Available,
    Occupied,
    Reserved,
    Charging,
    Faulted,
    OutOfService,
    Offline,
}

/// A snapshot of one station's EVSEs' operational statuses, handed to a
/// [`StatusAggregationDelegate`](crate::station::StatusAggregationDelegate)
/// whenever a child EVSE's status changes, so the delegate can derive the
/// station's own aggregate status.
#[derive(Debug, Clone)]
pub struct EvseStatusReport {
    pub station_id: crate::ids::StationId,
    pub evse_statuses: HashMap<EvseId, OperationalStatus>,
}

impl EvseStatusReport {
    pub fn count_matching(&self, status: OperationalStatus) -> usize {
        self.evse_statuses.values().filter(|&&s| s == status).count()
    }

    pub fn all_match(&self, status: OperationalStatus) -> bool {
        !self.evse_statuses.is_empty() && self.evse_statuses.values().all(|&s| s == status)
    }

    pub fn any_match(&self, status: OperationalStatus) -> bool {
        self.evse_statuses.values().any(|&s| s == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_operational_and_internal_use_expose_real_status() {
        assert!(AdminStatus::Operational.exposes_operational_status());
        assert!(AdminStatus::InternalUse.exposes_operational_status());
        assert!(!AdminStatus::OutOfService.exposes_operational_status());
        assert!(!AdminStatus::Blocked.exposes_operational_status());
        assert!(!AdminStatus::Planned.exposes_operational_status());
        assert!(!AdminStatus::UnderConstruction.exposes_operational_status());
        assert!(!AdminStatus::Error.exposes_operational_status());
    }

    #[test]
    fn report_aggregations() {
        let mut evse_statuses = HashMap::new();
        evse_statuses.insert(EvseId::new("E1"), OperationalStatus::Available);
        evse_statuses.insert(EvseId::new("E2"), OperationalStatus::Available);
        let report = EvseStatusReport {
            station_id: crate::ids::StationId::new("S1"),
            evse_statuses,
        };
        assert!(report.all_match(OperationalStatus::Available));
        assert_eq!(report.count_matching(OperationalStatus::Available), 2);
        assert!(!report.any_match(OperationalStatus::Charging));
    }
}
