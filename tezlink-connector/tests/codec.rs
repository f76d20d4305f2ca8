use proptest::prelude::*;
use tezlink_connector::codec::{self, DeepLinkCodec, DeepLinkKind};

fn codec() -> DeepLinkCodec {
    DeepLinkCodec::new("tezos://wallet/").unwrap()
}

#[test]
fn encodes_the_kind_first() {
    let link = codec().encode(DeepLinkKind::Login, [("appName", "Demo")]);

    assert_eq!(link, "tezos://wallet/?type=login&appName=Demo");
}

#[test]
fn decodes_what_it_encodes() {
    let fields = [
        ("destination", "KT1PWx2mnDueood7fEmfbBDKx1D9BAnnXitn"),
        ("amount", "1500"),
        ("parameter", r#"{"prim":"Pair","args":[{"int":"1"},{"string":"a b&c=d"}]}"#),
    ];
    let link = codec().encode(DeepLinkKind::Operation, fields);

    let params = codec::decode(&link).unwrap();
    assert_eq!(params.kind(), Some(DeepLinkKind::Operation));
    for (key, value) in fields {
        assert_eq!(params.get(key), value);
    }
    assert_eq!(params.len(), 4);
}

#[test]
fn reserved_characters_are_escaped() {
    let link = codec().encode(DeepLinkKind::Sign, [("payload", "x&type=login")]);

    assert!(!link.contains("x&type=login"));
    let params = codec::decode(&link).unwrap();
    assert_eq!(params.kind(), Some(DeepLinkKind::Sign));
    assert_eq!(params.get("payload"), "x&type=login");
}

#[test]
fn a_type_field_cannot_override_the_kind() {
    let link = codec().encode(DeepLinkKind::Sign, [("type", "login"), ("payload", "05")]);

    let params = codec::decode(&link).unwrap();
    assert_eq!(params.raw_type(), "sign");
    assert_eq!(params.len(), 2);
}

#[test]
fn absent_parameters_read_as_empty() {
    let params = codec::decode("tezlink://callback?type=login").unwrap();

    assert_eq!(params.get("address"), "");
    assert_eq!(params.non_empty("address"), None);
    assert!(!params.contains("address"));
    assert_eq!(params.error(), None);
}

#[test]
fn error_parameters_are_extracted() {
    let params = codec::decode(
        "tezlink://callback?type=operation&errorId=ABORTED_ERROR&errorMessage=User+declined",
    )
    .unwrap();

    let error = params.error().unwrap();
    assert_eq!(error.error_id.as_deref(), Some("ABORTED_ERROR"));
    assert_eq!(error.error_message.as_deref(), Some("User declined"));
}

#[test]
fn unknown_kinds_decode_without_a_kind() {
    let params = codec::decode("tezlink://callback?type=teleport&x=1").unwrap();

    assert_eq!(params.kind(), None);
    assert_eq!(params.raw_type(), "teleport");
}

#[test]
fn text_that_is_not_a_url_does_not_decode() {
    assert!(codec::decode("not a link").is_none());
    assert!(codec::decode("").is_none());
}

#[test]
fn rejects_an_invalid_base() {
    assert!(DeepLinkCodec::new("wallet without scheme").is_err());
}

fn any_kind() -> impl Strategy<Value = DeepLinkKind> {
    prop_oneof![
        Just(DeepLinkKind::Login),
        Just(DeepLinkKind::Operation),
        Just(DeepLinkKind::Sign),
        Just(DeepLinkKind::Originate),
    ]
}

fn any_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[&=+% #?/a-z]{1,16}",
        "\\PC{0,24}",
    ]
}

proptest! {
    #[test]
    fn decode_reproduces_every_encoded_field(
        kind in any_kind(),
        fields in prop::collection::btree_map(
            "\\PC{1,12}".prop_filter("reserved key", |k| k != "type"),
            any_value(),
            0..8,
        ),
    ) {
        let link = codec().encode(kind, &fields);

        let params = codec::decode(&link).unwrap();
        prop_assert_eq!(params.kind(), Some(kind));
        prop_assert_eq!(params.len(), fields.len() + 1);
        for (key, value) in &fields {
            prop_assert_eq!(params.get(key), value.as_str());
        }
    }
}
