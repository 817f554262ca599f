//! An operator roaming provider: the bridge between the locally-mastered
//! hierarchy and an external roaming partner.
//!
//! Subscribes to station/EVSE change events and batches them into four
//! bounded queues (`to_add`, `data_updates`, `to_remove`, `status_changes`);
//! a timer flushes the queues periodically, pushing snapshots to an
//! abstract [`UpstreamService`] outside any entity lock. See SPEC_FULL.md
//! §4.6 for the full flush algorithm this implements.

use crate::config::ProviderConfig;
use crate::entity::PropertyChangedEvent;
use crate::error::ProviderError;
use crate::evse::Evse;
use crate::ids::{EvseId, OperatorId, ProviderId};
use crate::station::ChargingStation;
use crate::status::OperationalStatus;
use crate::upstream::{EvseDataRecord, EvseStatusRecord, PushAction, UpstreamService};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeout applied to each upstream push call. Not currently surfaced on
/// [`ProviderConfig`] — the distilled spec only names `service_check_every`,
/// `disable_auto_uploads`, `include_evse` and `max_status_queue` as
/// provider-level configuration.
const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// A point-in-time view of one EVSE, handed to the provider's
/// `include_evse` filter and used to build upstream data/status records.
#[derive(Debug, Clone, PartialEq)]
pub struct EvseSnapshot {
    pub evse_id: EvseId,
    pub operator_id: OperatorId,
    pub status: OperationalStatus,
}

#[derive(Default)]
struct ProviderState {
    to_add: HashMap<EvseId, EvseSnapshot>,
    data_updates: HashMap<EvseId, EvseSnapshot>,
    to_remove: HashSet<EvseId>,
    status_changes: Vec<(EvseId, OperationalStatus, OperationalStatus)>,
}

impl ProviderState {
    fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.data_updates.is_empty() && self.to_remove.is_empty() && self.status_changes.is_empty()
    }
}

/// Everything a flush needs, taken out from under the queue lock in one
/// shot (SPEC_FULL.md §4.6 step 4).
struct FlushSnapshot {
    run_id: u64,
    to_add: HashMap<EvseId, EvseSnapshot>,
    data_updates: HashMap<EvseId, EvseSnapshot>,
    to_remove: HashSet<EvseId>,
    status_changes: Vec<(EvseId, OperationalStatus, OperationalStatus)>,
}

fn action_label(action: PushAction) -> &'static str {
    match action {
        PushAction::FullLoad => "full_load",
        PushAction::Insert => "insert",
        PushAction::Update => "update",
        PushAction::Delete => "delete",
    }
}

/// Subscribes to upstream entity events, batches them into bounded queues,
/// and periodically pushes snapshots to an [`UpstreamService`].
///
/// Two distinct locks cover two distinct concerns: `state` is a
/// `parking_lot::Mutex`, taken synchronously by the (always-fast,
/// never-suspending) enqueue entry points and by the flush's snapshot step.
/// `flush_guard` is a `tokio::sync::Mutex<()>`, taken only via `try_lock` —
/// never awaited — purely to stop two flushes from overlapping while one is
/// off awaiting an upstream call with `state` already released.
pub struct EVSEOperatorRoamingProvider {
    pub id: ProviderId,
    pub operator_id: OperatorId,
    config: ProviderConfig,
    upstream: Arc<dyn UpstreamService>,
    state: Mutex<ProviderState>,
    flush_guard: tokio::sync::Mutex<()>,
    armed: AtomicBool,
    run_id: AtomicU64,
}

impl EVSEOperatorRoamingProvider {
    pub fn new(id: ProviderId, operator_id: OperatorId, upstream: Arc<dyn UpstreamService>, config: ProviderConfig) -> Arc<Self> {
        Arc::new(Self {
            id,
            operator_id,
            config,
            upstream,
            state: Mutex::new(ProviderState::default()),
            flush_guard: tokio::sync::Mutex::new(()),
            armed: AtomicBool::new(false),
            run_id: AtomicU64::new(0),
        })
    }

    fn passes_filter(&self, snapshot: &EvseSnapshot) -> bool {
        match &self.config.include_evse {
            Some(predicate) => predicate(snapshot),
            None => true,
        }
    }

    /// Wire a station's current and future EVSEs into this provider's
    /// enqueue entry points. Only EVSEs present at call time or added
    /// afterward are covered — a provider subscribed to several stations
    /// (via their shared operator/roaming network) just calls this once per
    /// station.
    pub fn subscribe_to_station(self: &Arc<Self>, station: &Arc<ChargingStation>) {
        for evse in station.evses() {
            self.wire_evse(&evse);
        }

        let this = Arc::clone(self);
        station.on_evse_addition.subscribe(move |evse: &Arc<Evse>| {
            this.wire_evse(evse);
            this.enqueue_add(EvseSnapshot {
                evse_id: evse.base.id.clone(),
                operator_id: this.operator_id.clone(),
                status: evse.status.current_value(),
            });
        });

        let this = Arc::clone(self);
        station.on_evse_removal.subscribe(move |evse: &Arc<Evse>| {
            this.enqueue_remove(evse.base.id.clone(), this.operator_id.clone());
        });
    }

    fn wire_evse(self: &Arc<Self>, evse: &Arc<Evse>) {
        let this = Arc::clone(self);
        let evse_id = evse.base.id.clone();
        let operator_id = self.operator_id.clone();
        evse.status.on_status_changed(move |_now, old, new| {
            this.enqueue_status_change(evse_id.clone(), operator_id.clone(), old, new);
        });

        let this = Arc::clone(self);
        let evse_for_status = Arc::clone(evse);
        let operator_id = self.operator_id.clone();
        evse.base.on_property_changed(move |event: &PropertyChangedEvent<EvseId>| {
            this.enqueue_data_update(EvseSnapshot {
                evse_id: event.sender_id.clone(),
                operator_id: operator_id.clone(),
                status: evse_for_status.status.current_value(),
            });
        });
    }

    // --- enqueue entry points -----------------------------------------------

    pub fn enqueue_add(self: &Arc<Self>, snapshot: EvseSnapshot) {
        if !self.passes_filter(&snapshot) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.to_remove.remove(&snapshot.evse_id);
            state.to_add.insert(snapshot.evse_id.clone(), snapshot);
        }
        self.arm();
    }

    pub fn enqueue_remove(self: &Arc<Self>, evse_id: EvseId, operator_id: OperatorId) {
        let snapshot = EvseSnapshot {
            evse_id: evse_id.clone(),
            operator_id,
            status: OperationalStatus::Unspecified,
        };
        if !self.passes_filter(&snapshot) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.to_add.remove(&evse_id);
            state.data_updates.remove(&evse_id);
            state.to_remove.insert(evse_id);
        }
        self.arm();
    }

    pub fn enqueue_data_update(self: &Arc<Self>, snapshot: EvseSnapshot) {
        if !self.passes_filter(&snapshot) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.data_updates.insert(snapshot.evse_id.clone(), snapshot);
        }
        self.arm();
    }

    pub fn enqueue_status_change(
        self: &Arc<Self>,
        evse_id: EvseId,
        operator_id: OperatorId,
        old: OperationalStatus,
        new: OperationalStatus,
    ) {
        let snapshot = EvseSnapshot {
            evse_id: evse_id.clone(),
            operator_id,
            status: new,
        };
        if !self.passes_filter(&snapshot) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.status_changes.push((evse_id, old, new));
            let max = self.config.max_status_queue;
            if state.status_changes.len() > max {
                let overflow = state.status_changes.len() - max;
                state.status_changes.drain(0..overflow);
                warn!(provider_id = %self.id, dropped = overflow, "status-change queue overflowed max_status_queue, oldest entries dropped");
            }
        }
        self.arm();
    }

    /// Whether every queue is currently empty.
    pub fn is_idle(&self) -> bool {
        self.state.lock().is_empty()
    }

    // --- flush timer ---------------------------------------------------------

    /// Arm the flush timer unless it's already armed or auto-uploads are
    /// disabled. A single `AtomicBool` swap guards arming so concurrent
    /// enqueues only ever schedule one pending flush.
    fn arm(self: &Arc<Self>) {
        if self.config.disable_auto_uploads {
            return;
        }
        if self.armed.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        let wait = self.config.service_check_every;
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            this.armed.store(false, Ordering::SeqCst);
            this.flush().await;
        });
    }

    /// Drain and push the queues right now, bypassing the timer. Intended
    /// for tests and for an embedder that wants deterministic flush points
    /// (`disable_auto_uploads = true`).
    pub async fn flush_now(self: &Arc<Self>) {
        self.flush().await;
    }

    async fn flush(self: &Arc<Self>) {
        let Ok(_permit) = self.flush_guard.try_lock() else {
            debug!(provider_id = %self.id, "flush already in progress, skipping this tick");
            return;
        };

        let snapshot = {
            let mut state = self.state.lock();
            if state.is_empty() {
                return;
            }
            let run_id = self.run_id.fetch_add(1, Ordering::SeqCst) + 1;
            FlushSnapshot {
                run_id,
                to_add: std::mem::take(&mut state.to_add),
                data_updates: std::mem::take(&mut state.data_updates),
                to_remove: std::mem::take(&mut state.to_remove),
                status_changes: std::mem::take(&mut state.status_changes),
            }
        };

        info!(
            provider_id = %self.id,
            run_id = snapshot.run_id,
            adds = snapshot.to_add.len(),
            data_updates = snapshot.data_updates.len(),
            status_changes = snapshot.status_changes.len(),
            removes = snapshot.to_remove.len(),
            "flushing provider queues",
        );

        let first_run = snapshot.run_id == 1;

        if !snapshot.to_add.is_empty() {
            let action = if first_run { PushAction::FullLoad } else { PushAction::Insert };
            let records: Vec<EvseDataRecord> = snapshot
                .to_add
                .values()
                .map(|s| EvseDataRecord {
                    evse_id: s.evse_id.clone(),
                    operator_id: s.operator_id.clone(),
                })
                .collect();
            let count = records.len();
            let ack = self.upstream.push_evse_data(records, action, DEFAULT_PUSH_TIMEOUT).await;
            if !ack.ok {
                let err = ProviderError::DataPushRejected {
                    action: action_label(action),
                    count,
                    message: ack.message.unwrap_or_default(),
                };
                error!(provider_id = %self.id, %err, "evse data push rejected");
            }
        }

        if !snapshot.data_updates.is_empty() {
            // A brand-new EVSE's data update is redundant with the insert/
            // full-load push it already rode along in (SPEC_FULL.md §4.6).
            let records: Vec<EvseDataRecord> = snapshot
                .data_updates
                .values()
                .filter(|s| !snapshot.to_add.contains_key(&s.evse_id))
                .map(|s| EvseDataRecord {
                    evse_id: s.evse_id.clone(),
                    operator_id: s.operator_id.clone(),
                })
                .collect();
            if !records.is_empty() {
                let count = records.len();
                let ack = self
                    .upstream
                    .push_evse_data(records, PushAction::Update, DEFAULT_PUSH_TIMEOUT)
                    .await;
                if !ack.ok {
                    let err = ProviderError::DataPushRejected {
                        action: action_label(PushAction::Update),
                        count,
                        message: ack.message.unwrap_or_default(),
                    };
                    error!(provider_id = %self.id, %err, "evse data push rejected");
                }
            }
        }

        if !snapshot.status_changes.is_empty() {
            let action = if first_run { PushAction::FullLoad } else { PushAction::Update };
            let records: Vec<EvseStatusRecord> = snapshot
                .status_changes
                .iter()
                .map(|(evse_id, _old, new)| EvseStatusRecord {
                    evse_id: evse_id.clone(),
                    status: *new,
                })
                .collect();
            let count = records.len();
            let ack = self.upstream.push_evse_status(records, action, DEFAULT_PUSH_TIMEOUT).await;
            if !ack.ok {
                let err = ProviderError::StatusPushRejected {
                    action: action_label(action),
                    count,
                    message: ack.message.unwrap_or_default(),
                };
                error!(provider_id = %self.id, %err, "evse status push rejected");
            }
        }

        if !snapshot.to_remove.is_empty() {
            // Maintained but never pushed upstream: no `delete`-action call
            // exists in the flush loop (SPEC_FULL.md §9 open question #1).
            debug!(
                provider_id = %self.id,
                count = snapshot.to_remove.len(),
                "to_remove queue drained but not pushed upstream",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{AuthStartResult, AuthStopResult, AuthTarget, AuthToken};
    use crate::reservation::ChargeDetailRecord;
    use crate::upstream::Acknowledgement;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Data(Vec<EvseDataRecord>, PushAction),
        Status(Vec<EvseStatusRecord>, PushAction),
    }

    #[derive(Default)]
    struct MockUpstream {
        calls: StdMutex<Vec<Call>>,
    }

    impl MockUpstream {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamService for MockUpstream {
        async fn push_evse_data(&self, evses: Vec<EvseDataRecord>, action: PushAction, _timeout: Duration) -> Acknowledgement {
            self.calls.lock().unwrap().push(Call::Data(evses, action));
            Acknowledgement::ok()
        }

        async fn push_evse_status(
            &self,
            statuses: Vec<EvseStatusRecord>,
            action: PushAction,
            _timeout: Duration,
        ) -> Acknowledgement {
            self.calls.lock().unwrap().push(Call::Status(statuses, action));
            Acknowledgement::ok()
        }

        async fn authorize_start(
            &self,
            _operator: OperatorId,
            _token: AuthToken,
            _target: AuthTarget,
            _timeout: Duration,
        ) -> AuthStartResult {
            AuthStartResult::NotAuthorized {
                reason: "mock does not authorize".into(),
            }
        }

        async fn authorize_stop(
            &self,
            _operator: OperatorId,
            _token: AuthToken,
            _target: AuthTarget,
            _timeout: Duration,
        ) -> AuthStopResult {
            AuthStopResult::NotAuthorized {
                reason: "mock does not authorize".into(),
            }
        }

        async fn send_charge_detail_record(&self, _record: ChargeDetailRecord, _timeout: Duration) -> Acknowledgement {
            Acknowledgement::ok()
        }
    }

    fn provider(upstream: Arc<MockUpstream>, config: ProviderConfig) -> Arc<EVSEOperatorRoamingProvider> {
        EVSEOperatorRoamingProvider::new(ProviderId::new("PRV1"), OperatorId::new("OP1"), upstream, config)
    }

    #[tokio::test]
    async fn flush_is_a_noop_when_every_queue_is_empty() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(upstream.clone(), ProviderConfig::default().with_disable_auto_uploads(true));
        provider.flush_now().await;
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn first_flush_uses_full_load_for_adds_and_status() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(upstream.clone(), ProviderConfig::default().with_disable_auto_uploads(true));

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E1"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.enqueue_status_change(
            EvseId::new("E1"),
            OperatorId::new("OP1"),
            OperationalStatus::Unspecified,
            OperationalStatus::Available,
        );
        provider.flush_now().await;

        let calls = upstream.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::Data(_, PushAction::FullLoad))));
        assert!(calls.iter().any(|c| matches!(c, Call::Status(_, PushAction::FullLoad))));
    }

    #[tokio::test]
    async fn second_flush_uses_insert_and_update() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(upstream.clone(), ProviderConfig::default().with_disable_auto_uploads(true));

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E1"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.flush_now().await;

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E2"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.enqueue_status_change(
            EvseId::new("E1"),
            OperatorId::new("OP1"),
            OperationalStatus::Available,
            OperationalStatus::Charging,
        );
        provider.flush_now().await;

        let calls = upstream.calls();
        assert!(calls.iter().any(|c| matches!(c, Call::Data(_, PushAction::Insert))));
        assert!(calls.iter().any(|c| matches!(c, Call::Status(_, PushAction::Update))));
    }

    #[tokio::test]
    async fn data_update_for_a_brand_new_evse_is_suppressed() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(upstream.clone(), ProviderConfig::default().with_disable_auto_uploads(true));

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E1"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.enqueue_data_update(EvseSnapshot {
            evse_id: EvseId::new("E1"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.flush_now().await;

        let calls = upstream.calls();
        let data_calls: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, Call::Data(_, _)))
            .collect();
        assert_eq!(data_calls.len(), 1, "the data update must not ride along separately");
    }

    #[tokio::test]
    async fn repeated_enqueues_without_flush_drain_in_one_cycle() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(upstream.clone(), ProviderConfig::default().with_disable_auto_uploads(true));

        for i in 0..5 {
            provider.enqueue_add(EvseSnapshot {
                evse_id: EvseId::new(format!("E{i}")),
                operator_id: OperatorId::new("OP1"),
                status: OperationalStatus::Available,
            });
        }
        provider.flush_now().await;
        let data_calls = upstream.calls().into_iter().filter(|c| matches!(c, Call::Data(_, _))).count();
        assert_eq!(data_calls, 1);
        if let Call::Data(records, _) = &upstream.calls()[0] {
            assert_eq!(records.len(), 5);
        }

        provider.flush_now().await;
        let total_after_second_flush = upstream.calls().len();
        provider.flush_now().await;
        assert_eq!(upstream.calls().len(), total_after_second_flush, "a flush with nothing queued must not push again");
    }

    #[tokio::test]
    async fn status_queue_overflow_drops_oldest_entries() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(
            upstream.clone(),
            ProviderConfig::default().with_disable_auto_uploads(true).with_max_status_queue(2),
        );

        for i in 0..4 {
            provider.enqueue_status_change(
                EvseId::new(format!("E{i}")),
                OperatorId::new("OP1"),
                OperationalStatus::Unspecified,
                OperationalStatus::Available,
            );
        }
        provider.flush_now().await;
        if let Some(Call::Status(records, _)) = upstream.calls().into_iter().find(|c| matches!(c, Call::Status(_, _))) {
            assert_eq!(records.len(), 2, "only the newest max_status_queue entries should survive");
        } else {
            panic!("expected a status push");
        }
    }

    #[tokio::test]
    async fn include_evse_filter_excludes_non_matching_evses() {
        let upstream = Arc::new(MockUpstream::default());
        let config = ProviderConfig::default()
            .with_disable_auto_uploads(true)
            .with_include_evse(Arc::new(|snapshot: &EvseSnapshot| snapshot.evse_id.as_str() != "EXCLUDED"));
        let provider = provider(upstream.clone(), config);

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("EXCLUDED"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        assert!(provider.is_idle(), "filtered-out EVSE must never reach the queues");
    }

    #[tokio::test]
    async fn timer_arms_and_flushes_once_per_cycle() {
        let upstream = Arc::new(MockUpstream::default());
        let provider = provider(
            upstream.clone(),
            ProviderConfig::default().with_service_check_every(Duration::from_millis(20)),
        );

        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E1"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.enqueue_add(EvseSnapshot {
            evse_id: EvseId::new("E2"),
            operator_id: OperatorId::new("OP1"),
            status: OperationalStatus::Available,
        });
        provider.enqueue_status_change(
            EvseId::new("E1"),
            OperatorId::new("OP1"),
            OperationalStatus::Unspecified,
            OperationalStatus::Available,
        );

        tokio::time::sleep(Duration::from_millis(80)).await;

        let calls = upstream.calls();
        let data_calls = calls.iter().filter(|c| matches!(c, Call::Data(_, PushAction::FullLoad))).count();
        let status_calls = calls.iter().filter(|c| matches!(c, Call::Status(_, PushAction::FullLoad))).count();
        assert_eq!(data_calls, 1, "exactly one full-load data push expected");
        assert_eq!(status_calls, 1, "exactly one full-load status push expected");
    }
}
