//! A recording mock [`wwcp_core::UpstreamService`] for integration tests and
//! demos that don't speak any real roaming-partner wire protocol.
//!
//! Every call is appended to an in-memory log a test can inspect afterward;
//! nothing is pushed anywhere. This plays the role the teacher crate's
//! `roj-adapter-ocpp` plays for its distributed-consensus core, generalized
//! to this crate's abstract upstream boundary (SPEC_FULL.md §6).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;
use wwcp_core::{
    AuthStartResult, AuthStopResult, AuthTarget, AuthToken, ChargeDetailRecord, EvseDataRecord, EvseStatusRecord,
    OperatorId, PushAction, UpstreamService,
};
pub use wwcp_core::Acknowledgement;

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    PushEvseData { evses: Vec<EvseDataRecord>, action: PushAction },
    PushEvseStatus { statuses: Vec<EvseStatusRecord>, action: PushAction },
    AuthorizeStart { operator: OperatorId, target: AuthTarget },
    AuthorizeStop { operator: OperatorId, target: AuthTarget },
    SendChargeDetailRecord { record: ChargeDetailRecord },
}

/// How the mock should answer the next (or every) authorize/data/status
/// call — lets a test exercise upstream rejection without a real backend.
#[derive(Debug, Clone)]
pub struct MockResponses {
    pub push_data_ack: Acknowledgement,
    pub push_status_ack: Acknowledgement,
    pub cdr_ack: Acknowledgement,
}

impl Default for MockResponses {
    fn default() -> Self {
        Self {
            push_data_ack: Acknowledgement::ok(),
            push_status_ack: Acknowledgement::ok(),
            cdr_ack: Acknowledgement::ok(),
        }
    }
}

/// A recording, always-authorizing-by-default mock of the abstract upstream
/// roaming-partner boundary.
#[derive(Default)]
pub struct MockUpstreamService {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<MockResponses>,
}

impl MockUpstreamService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the canned responses returned by subsequent calls.
    pub fn set_responses(&self, responses: MockResponses) {
        *self.responses.lock() = responses;
    }

    /// A newest-last snapshot of every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl UpstreamService for MockUpstreamService {
    async fn push_evse_data(&self, evses: Vec<EvseDataRecord>, action: PushAction, _timeout: Duration) -> Acknowledgement {
        debug!(count = evses.len(), ?action, "mock upstream: push_evse_data");
        self.calls.lock().push(RecordedCall::PushEvseData { evses, action });
        self.responses.lock().push_data_ack.clone()
    }

    async fn push_evse_status(
        &self,
        statuses: Vec<EvseStatusRecord>,
        action: PushAction,
        _timeout: Duration,
    ) -> Acknowledgement {
        debug!(count = statuses.len(), ?action, "mock upstream: push_evse_status");
        self.calls.lock().push(RecordedCall::PushEvseStatus { statuses, action });
        self.responses.lock().push_status_ack.clone()
    }

    async fn authorize_start(
        &self,
        operator: OperatorId,
        _token: AuthToken,
        target: AuthTarget,
        _timeout: Duration,
    ) -> AuthStartResult {
        self.calls.lock().push(RecordedCall::AuthorizeStart {
            operator,
            target: target.clone(),
        });
        AuthStartResult::Authorized {
            session_id: wwcp_core::SessionId::new(format!("MOCK-{}", target.evse_id)),
        }
    }

    async fn authorize_stop(
        &self,
        operator: OperatorId,
        _token: AuthToken,
        target: AuthTarget,
        _timeout: Duration,
    ) -> AuthStopResult {
        self.calls.lock().push(RecordedCall::AuthorizeStop { operator, target });
        AuthStopResult::Authorized
    }

    async fn send_charge_detail_record(&self, record: ChargeDetailRecord, _timeout: Duration) -> Acknowledgement {
        debug!(session_id = %record.session_id, "mock upstream: send_charge_detail_record");
        let ack = self.responses.lock().cdr_ack.clone();
        self.calls.lock().push(RecordedCall::SendChargeDetailRecord { record });
        ack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wwcp_core::EvseId;

    #[tokio::test]
    async fn records_every_call_it_receives() {
        let mock = MockUpstreamService::new();
        mock.push_evse_data(
            vec![EvseDataRecord {
                evse_id: EvseId::new("E1"),
                operator_id: OperatorId::new("OP1"),
            }],
            PushAction::FullLoad,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(mock.call_count(), 1);
        assert!(matches!(mock.calls()[0], RecordedCall::PushEvseData { .. }));
    }

    #[tokio::test]
    async fn canned_rejection_is_returned_verbatim() {
        let mock = MockUpstreamService::new();
        mock.set_responses(MockResponses {
            push_data_ack: Acknowledgement::rejected("quota exceeded"),
            ..Default::default()
        });
        let ack = mock
            .push_evse_data(vec![], PushAction::Insert, Duration::from_secs(1))
            .await;
        assert!(!ack.ok);
        assert_eq!(ack.message.as_deref(), Some("quota exceeded"));
    }
}
