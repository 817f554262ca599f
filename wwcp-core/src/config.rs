//! Plain configuration structs, `Default` plus `with_*` builder methods.
//!
//! No CLI parsing lives here (or anywhere in this crate) — wiring a
//! `ProviderConfig`/`StationConfig`/`ScheduleConfig` from flags, env vars or
//! a config file is left to whatever binary embeds this crate.

use crate::provider::EvseSnapshot;
use std::sync::Arc;
use std::time::Duration;

/// A predicate deciding whether a given EVSE is in scope for a provider's
/// upload queues at all.
pub type IncludeEvsePredicate = Arc<dyn Fn(&EvseSnapshot) -> bool + Send + Sync>;

/// History depth for a [`crate::schedule::StatusSchedule`].
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub max_size: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

impl ScheduleConfig {
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Per-station schedule sizing. Stations retain a shorter admin/operational
/// history than individual EVSEs by default.
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub operational_schedule_size: usize,
    pub admin_schedule_size: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            operational_schedule_size: 15,
            admin_schedule_size: 15,
        }
    }
}

impl StationConfig {
    pub fn with_operational_schedule_size(mut self, size: usize) -> Self {
        self.operational_schedule_size = size;
        self
    }

    pub fn with_admin_schedule_size(mut self, size: usize) -> Self {
        self.admin_schedule_size = size;
        self
    }
}

/// Configuration for an [`crate::provider::EVSEOperatorRoamingProvider`].
#[derive(Clone)]
pub struct ProviderConfig {
    /// How often the flush timer fires once armed.
    pub service_check_every: Duration,
    /// When set, enqueueing never arms the flush timer; only an explicit
    /// `flush_now()` call drains the queues. Intended for tests.
    pub disable_auto_uploads: bool,
    /// When set, only EVSEs the predicate accepts are ever enqueued.
    pub include_evse: Option<IncludeEvsePredicate>,
    /// Upper bound on the pending status-change queue; oldest entries are
    /// dropped (with a warning) once exceeded.
    pub max_status_queue: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            service_check_every: Duration::from_secs(5),
            disable_auto_uploads: false,
            include_evse: None,
            max_status_queue: 10_000,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("service_check_every", &self.service_check_every)
            .field("disable_auto_uploads", &self.disable_auto_uploads)
            .field("include_evse", &self.include_evse.is_some())
            .field("max_status_queue", &self.max_status_queue)
            .finish()
    }
}

impl ProviderConfig {
    pub fn with_service_check_every(mut self, interval: Duration) -> Self {
        self.service_check_every = interval;
        self
    }

    pub fn with_disable_auto_uploads(mut self, disable: bool) -> Self {
        self.disable_auto_uploads = disable;
        self
    }

    pub fn with_include_evse(mut self, predicate: IncludeEvsePredicate) -> Self {
        self.include_evse = Some(predicate);
        self
    }

    pub fn with_max_status_queue(mut self, max: usize) -> Self {
        self.max_status_queue = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_defaults_match_spec() {
        let config = ProviderConfig::default();
        assert_eq!(config.service_check_every, Duration::from_secs(5));
        assert!(!config.disable_auto_uploads);
        assert_eq!(config.max_status_queue, 10_000);
    }

    #[test]
    fn builder_methods_are_chainable() {
        let config = ProviderConfig::default()
            .with_service_check_every(Duration::from_secs(1))
            .with_disable_auto_uploads(true)
            .with_max_status_queue(50);
        assert_eq!(config.service_check_every, Duration::from_secs(1));
        assert!(config.disable_auto_uploads);
        assert_eq!(config.max_status_queue, 50);
    }

    #[test]
    fn station_config_defaults_to_fifteen() {
        let config = StationConfig::default();
        assert_eq!(config.operational_schedule_size, 15);
        assert_eq!(config.admin_schedule_size, 15);
    }
}
