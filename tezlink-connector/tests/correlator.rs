use std::{future::IntoFuture, time::Duration};
use tezlink_connector::{
    correlator::Correlator,
    error::RequestError,
    pending::{PendingRequest, Resolution},
    types::{OperationKind, OperationRecord, RequestKind, SignResult, SigningType},
};
use tokio::time::Instant;

fn record(request_id: u64, hash: &str) -> OperationRecord {
    OperationRecord {
        transaction_hash: hash.to_string(),
        request_id,
        kind: RequestKind::Operation,
        error_message: None,
    }
}

#[tokio::test(start_paused = true)]
async fn one_slot_per_kind() {
    let mut correlator = Correlator::new();

    let first: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(5));
    let second: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(60));

    assert_eq!(first.id(), second.id());
    assert_eq!(second.timeout(), Duration::from_secs(5));
    assert_eq!(correlator.len(), 1);

    correlator.resolve_with(RequestKind::Operation, |id| {
        Ok(Resolution::Operation(record(id, "ooShared")))
    });
    let (a, b) = tokio::join!(first.into_future(), second.into_future());
    assert_eq!(a.unwrap(), b.unwrap());
    assert!(correlator.is_empty());
}

#[tokio::test(start_paused = true)]
async fn different_kinds_are_independent() {
    let mut correlator = Correlator::new();

    let op: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(5));
    let sign: PendingRequest<SignResult> =
        correlator.register(RequestKind::SignPayload, Duration::from_secs(5));
    assert_ne!(op.id(), sign.id());

    let signed = SignResult {
        signature: "edsigABC".to_string(),
        signing_type: SigningType::Raw,
        payload: "05".to_string(),
    };
    correlator.resolve(RequestKind::SignPayload, Ok(Resolution::Signed(signed.clone())));

    assert_eq!(sign.await.unwrap(), signed);
    assert!(correlator.is_pending(RequestKind::Operation));
}

#[tokio::test(start_paused = true)]
async fn late_results_are_discarded() {
    let mut correlator = Correlator::new();
    let pending: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(5));

    correlator.resolve(RequestKind::Operation, Err(RequestError::SessionLost));
    let late = correlator.resolve(
        RequestKind::Operation,
        Ok(Resolution::Operation(record(pending.id(), "ooLate"))),
    );

    assert_eq!(late, None);
    assert_eq!(pending.await, Err(RequestError::SessionLost));
}

#[tokio::test(start_paused = true)]
async fn expires_only_due_requests() {
    let mut correlator = Correlator::new();
    let start = Instant::now();
    let disconnect: PendingRequest<bool> =
        correlator.register(RequestKind::Disconnect, Duration::from_secs(10));
    let _op: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(2));

    assert_eq!(correlator.next_deadline(), Some(start + Duration::from_secs(2)));
    assert!(correlator.expire(start + Duration::from_secs(1)).is_empty());

    let expired = correlator.expire(start + Duration::from_secs(2));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].0, RequestKind::Operation);
    assert_eq!(correlator.next_deadline(), Some(start + Duration::from_secs(10)));

    correlator.expire(start + Duration::from_secs(10));
    assert_eq!(
        disconnect.await,
        Err(RequestError::Timeout {
            kind: RequestKind::Disconnect,
            after: Duration::from_secs(10),
        })
    );
    assert_eq!(correlator.next_deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn fail_all_except_keeps_one_kind() {
    let mut correlator = Correlator::new();
    let op: PendingRequest<OperationRecord> =
        correlator.register(RequestKind::Operation, Duration::from_secs(5));
    let _sign: PendingRequest<SignResult> =
        correlator.register(RequestKind::SignPayload, Duration::from_secs(5));
    let _disconnect: PendingRequest<bool> =
        correlator.register(RequestKind::Disconnect, Duration::from_secs(5));

    let failed = correlator.fail_all_except(Some(RequestKind::Disconnect), RequestError::SessionLost);

    assert_eq!(failed, 2);
    assert_eq!(op.await, Err(RequestError::SessionLost));
    assert!(correlator.is_pending(RequestKind::Disconnect));
    assert_eq!(correlator.fail_all(RequestError::SessionLost), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_handles_occupy_no_slot() {
    let mut correlator = Correlator::new();

    let done: PendingRequest<bool> =
        correlator.ready(RequestKind::Disconnect, Ok(Resolution::Disconnected(false)));

    assert!(correlator.is_empty());
    assert_eq!(done.timeout(), Duration::ZERO);
    assert_eq!(done.await, Ok(false));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_correlator_loses_the_session() {
    let mut correlator = Correlator::new();
    let pending: PendingRequest<SignResult> =
        correlator.register(RequestKind::SignPayload, Duration::from_secs(5));

    drop(correlator);

    assert_eq!(pending.await, Err(RequestError::SessionLost));
}

#[tokio::test(start_paused = true)]
async fn operation_events_prefer_the_hinted_slot() {
    let mut correlator = Correlator::new();
    assert_eq!(correlator.operation_target(None), RequestKind::Operation);

    let _orig: PendingRequest<()> =
        correlator.register(RequestKind::Originate, Duration::from_secs(5));
    assert_eq!(correlator.operation_target(None), RequestKind::Originate);
    assert_eq!(
        correlator.operation_target(Some(OperationKind::Operation)),
        RequestKind::Operation
    );
}

#[tokio::test(start_paused = true)]
async fn settlements_never_guess_an_origination() {
    let mut correlator = Correlator::new();
    let _orig: PendingRequest<()> =
        correlator.register(RequestKind::Originate, Duration::from_secs(5));

    assert_eq!(correlator.settlement_target(None), RequestKind::Operation);
    assert_eq!(
        correlator.settlement_target(Some(OperationKind::Originate)),
        RequestKind::Originate
    );
}
