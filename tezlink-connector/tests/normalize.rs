use serde_json::json;
use std::sync::{Arc, Mutex};
use tezlink_connector::{
    error::{NormalizeError, TransportError},
    events::{EventType, OperationData, WalletEvent},
    inbound::EventNormalizer,
    transport::{
        BeaconHost, BeaconNormalizer, BeaconRequest, BeaconTransport, BridgeNormalizer,
        DeepLinkNormalizer, WalletTransport,
    },
    types::{ActiveAccount, ContractCall, OperationKind, OriginationRequest},
};

fn event(normalizer: &dyn EventNormalizer, raw: &str) -> WalletEvent {
    let envelope = normalizer.normalize(raw).unwrap().unwrap();
    WalletEvent::from_envelope(&envelope).unwrap()
}

#[test]
fn bridge_accepts_string_encoded_data() {
    let raw = json!({
        "EventType": "WalletConnected",
        "Data": json!({ "address": "tz1Abc", "publicKey": "edpkXYZ" }).to_string(),
    });

    assert_eq!(
        event(&BridgeNormalizer, &raw.to_string()),
        WalletEvent::Connected(ActiveAccount::new("tz1Abc", "edpkXYZ"))
    );
}

#[test]
fn bridge_accepts_inline_data_and_lowercase_keys() {
    let raw = json!({
        "eventType": "OperationInjected",
        "data": { "opHash": "ooInline" },
    });

    assert_eq!(
        event(&BridgeNormalizer, &raw.to_string()),
        WalletEvent::OperationInjected(OperationData {
            transaction_hash: "ooInline".to_string(),
            kind: None,
        })
    );
}

#[test]
fn bridge_maps_legacy_names() {
    let raw = json!({ "EventType": "AccountDisconnected", "Data": "" });

    let envelope = BridgeNormalizer.normalize(&raw.to_string()).unwrap().unwrap();
    assert_eq!(envelope.event_type, EventType::WalletDisconnected);
    assert_eq!(envelope.data, "{}");
}

#[test]
fn bridge_rejects_unknown_event_types() {
    let raw = json!({ "EventType": "SomethingElse", "Data": "{}" });

    assert!(matches!(
        BridgeNormalizer.normalize(&raw.to_string()),
        Err(NormalizeError::UnknownEventType(name)) if name == "SomethingElse"
    ));
}

#[test]
fn bridge_rejects_missing_required_fields() {
    let raw = json!({ "EventType": "OperationInjected", "Data": { "transactionHash": "" } });

    assert!(matches!(
        BridgeNormalizer.normalize(&raw.to_string()),
        Err(NormalizeError::MissingField("transactionHash"))
    ));
    assert!(matches!(
        BridgeNormalizer.normalize("{not json"),
        Err(NormalizeError::InvalidJson(_))
    ));
}

#[test]
fn failure_events_tolerate_unreadable_details() {
    let raw = json!({ "EventType": "OperationFailed", "Data": "oops" });

    match event(&BridgeNormalizer, &raw.to_string()) {
        WalletEvent::OperationFailed(info) => assert_eq!(info.error_id, None),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn deep_link_login_becomes_a_connection() {
    let raw = "tezlink://callback?type=login&address=tz1Abc&publicKey=edpkXYZ&walletName=Kukai";

    let mut account = ActiveAccount::new("tz1Abc", "edpkXYZ");
    account.wallet_name = Some("Kukai".to_string());
    assert_eq!(event(&DeepLinkNormalizer, raw), WalletEvent::Connected(account));
}

#[test]
fn deep_link_results_carry_their_kind() {
    let originated = event(
        &DeepLinkNormalizer,
        "tezlink://callback?type=originate&transactionHash=ooOrig",
    );
    assert_eq!(
        originated,
        WalletEvent::OperationInjected(OperationData {
            transaction_hash: "ooOrig".to_string(),
            kind: Some(OperationKind::Originate),
        })
    );

    let signed = event(
        &DeepLinkNormalizer,
        "tezlink://callback?type=sign&signature=edsigABC&signingType=micheline",
    );
    assert!(matches!(signed, WalletEvent::PayloadSigned(data) if data.signature == "edsigABC"));
}

#[test]
fn deep_link_errors_become_failures() {
    let failed = event(
        &DeepLinkNormalizer,
        "tezlink://callback?type=operation&errorId=ABORTED_ERROR",
    );

    match failed {
        WalletEvent::OperationFailed(info) => {
            assert_eq!(info.kind, Some(OperationKind::Operation));
            assert_eq!(info.error_id.as_deref(), Some("ABORTED_ERROR"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn deep_link_rejects_incomplete_links() {
    assert!(matches!(
        DeepLinkNormalizer.normalize("tezlink://callback?type=login"),
        Err(NormalizeError::MissingField("address"))
    ));
    assert!(matches!(
        DeepLinkNormalizer.normalize("tezlink://callback?type=teleport"),
        Err(NormalizeError::Unsupported(_))
    ));
    assert!(matches!(
        DeepLinkNormalizer.normalize("no link here"),
        Err(NormalizeError::InvalidDeepLink)
    ));
}

/// A Beacon host that keeps every posted message.
#[derive(Default)]
struct RecordingHost {
    posted: Mutex<Vec<BeaconRequest>>,
}

impl RecordingHost {
    fn last_id(&self) -> String {
        let posted = self.posted.lock().unwrap();
        match posted.last() {
            Some(BeaconRequest::OperationRequest { id, .. })
            | Some(BeaconRequest::SignPayloadRequest { id, .. })
            | Some(BeaconRequest::PermissionRequest { id, .. }) => id.clone(),
            other => panic!("no request id in {other:?}"),
        }
    }
}

impl BeaconHost for RecordingHost {
    fn post(&self, message: &BeaconRequest) -> Result<(), TransportError> {
        self.posted.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn active_account(&self) -> Option<ActiveAccount> {
        None
    }
}

#[tokio::test]
async fn beacon_routes_responses_by_request_id() {
    let host = Arc::new(RecordingHost::default());
    let transport = BeaconTransport::new(host.clone(), "ghostnet");
    let normalizer = transport.normalizer();

    transport
        .originate_contract(&OriginationRequest {
            script: "{}".to_string(),
            delegate_address: None,
        })
        .await
        .unwrap();
    let id = host.last_id();
    let raw = json!({ "type": "operation_response", "id": id, "transactionHash": "ooOrig" });

    assert_eq!(
        event(normalizer.as_ref(), &raw.to_string()),
        WalletEvent::OperationInjected(OperationData {
            transaction_hash: "ooOrig".to_string(),
            kind: Some(OperationKind::Originate),
        })
    );
}

#[tokio::test]
async fn beacon_errors_fail_the_request_they_answer() {
    let host = Arc::new(RecordingHost::default());
    let transport = BeaconTransport::new(host.clone(), "ghostnet");
    let normalizer = transport.normalizer();

    transport
        .send_contract_call(&ContractCall {
            destination: "KT1PWx2mnDueood7fEmfbBDKx1D9BAnnXitn".to_string(),
            amount: 0,
            entrypoint: "default".to_string(),
            parameter: "Unit".to_string(),
        })
        .await
        .unwrap();
    let raw = json!({ "type": "error", "id": host.last_id(), "errorType": "ABORTED_ERROR" });

    match event(normalizer.as_ref(), &raw.to_string()) {
        WalletEvent::OperationFailed(info) => {
            assert_eq!(info.kind, Some(OperationKind::Operation));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn beacon_errors_without_an_id_fail_the_connection() {
    let raw = json!({ "type": "error", "errorType": "NOT_GRANTED_ERROR" });

    assert!(matches!(
        event(&BeaconNormalizer::default(), &raw.to_string()),
        WalletEvent::ConnectionFailed(_)
    ));
}

#[test]
fn beacon_acknowledgements_are_ignored() {
    let raw = json!({ "type": "acknowledge", "id": "tezlink-1" });

    assert_eq!(BeaconNormalizer::default().normalize(&raw.to_string()).unwrap(), None);
}

#[test]
fn beacon_pairing_messages_are_normalized() {
    let normalizer = BeaconNormalizer::default();
    let requested = json!({ "type": "pairing_requested", "pairingUri": "beacon:pair" });

    assert_eq!(
        event(&normalizer, &requested.to_string()),
        WalletEvent::PairingRequested {
            pairing_uri: "beacon:pair".to_string()
        }
    );
    assert_eq!(
        event(&normalizer, &json!({ "type": "pairing_done" }).to_string()),
        WalletEvent::PairingDone
    );
}
