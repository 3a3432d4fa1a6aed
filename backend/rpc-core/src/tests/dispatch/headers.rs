use super::parse;
use crate::dispatch::headers::{
    CLIENT_TOKEN_HEADER, MESSAGE_SEQUENCE_HEADER, MESSAGE_SIGNATURE_HEADER, REQUEST_METHOD_HEADER,
};
use crate::dispatch::{RejectReason, RequestKind};

/// **VALUE**: The liveness probe needs nothing beyond its method name.
#[test]
fn given_only_service_ready_method_when_parsing_then_liveness_kind() {
    let headers = parse(&[(REQUEST_METHOD_HEADER, "SERVICE-READY")]).expect("parse");

    assert_eq!(headers.kind, RequestKind::Liveness);
    assert!(headers.token.is_none());
}

/// **VALUE**: Method names select the authentication branch by exact match.
///
/// **BUG THIS CATCHES**: Would catch case-insensitive matching letting `keyexchange`
/// skip the token check.
#[test]
fn given_method_names_when_classifying_then_only_exact_names_are_special() {
    assert_eq!(RequestKind::for_method("SERVICE-READY"), RequestKind::Liveness);
    assert_eq!(RequestKind::for_method("KeyExchange"), RequestKind::Handshake);
    assert_eq!(
        RequestKind::for_method("keyexchange"),
        RequestKind::Authenticated
    );
    assert_eq!(
        RequestKind::for_method("GetRecipes"),
        RequestKind::Authenticated
    );
}

/// **VALUE**: The handshake is parsed without a token; other methods require one.
#[test]
fn given_missing_token_when_parsing_then_only_handshake_passes() {
    let common = [(MESSAGE_SIGNATURE_HEADER, "00ff"), (MESSAGE_SEQUENCE_HEADER, "1")];

    let mut handshake = vec![(REQUEST_METHOD_HEADER, "KeyExchange")];
    handshake.extend(common);
    let parsed = parse(&handshake).expect("handshake parses");
    assert_eq!(parsed.kind, RequestKind::Handshake);
    assert_eq!(parsed.signature, vec![0x00, 0xff]);
    assert_eq!(parsed.sequence, 1);

    let mut call = vec![(REQUEST_METHOD_HEADER, "Echo")];
    call.extend(common);
    assert!(matches!(
        parse(&call),
        Err(RejectReason::MissingHeader {
            header: CLIENT_TOKEN_HEADER
        })
    ));
}

/// **VALUE**: Missing, empty and malformed headers are all rejected.
///
/// **BUG THIS CATCHES**: Would catch an empty method defaulting to some handler, a
/// non-hex signature being passed through, or sequences outside `i32` wrapping.
#[test]
fn given_bad_headers_when_parsing_then_rejects() {
    // Missing method
    assert!(matches!(
        parse(&[]),
        Err(RejectReason::MissingHeader {
            header: REQUEST_METHOD_HEADER
        })
    ));

    // Empty method
    assert!(matches!(
        parse(&[(REQUEST_METHOD_HEADER, "")]),
        Err(RejectReason::MissingHeader { .. })
    ));

    // Signature not hex
    assert!(matches!(
        parse(&[
            (REQUEST_METHOD_HEADER, "KeyExchange"),
            (MESSAGE_SIGNATURE_HEADER, "zz"),
            (MESSAGE_SEQUENCE_HEADER, "1"),
        ]),
        Err(RejectReason::MalformedHeader {
            header: MESSAGE_SIGNATURE_HEADER,
            ..
        })
    ));

    // Sequence missing, non-numeric, overflowing
    for sequence in [None, Some("two"), Some("2147483648")] {
        let mut headers = vec![
            (REQUEST_METHOD_HEADER, "Echo"),
            (CLIENT_TOKEN_HEADER, "token"),
            (MESSAGE_SIGNATURE_HEADER, "00"),
        ];
        if let Some(sequence) = sequence {
            headers.push((MESSAGE_SEQUENCE_HEADER, sequence));
        }
        assert!(parse(&headers).is_err(), "sequence {sequence:?} must be rejected");
    }
}

/// **VALUE**: Negative sequences parse; the counter comparison rejects them later.
#[test]
fn given_negative_sequence_when_parsing_then_value_is_kept() {
    let parsed = parse(&[
        (REQUEST_METHOD_HEADER, "Echo"),
        (CLIENT_TOKEN_HEADER, "token"),
        (MESSAGE_SIGNATURE_HEADER, "00"),
        (MESSAGE_SEQUENCE_HEADER, "-3"),
    ])
    .expect("parse");

    assert_eq!(parsed.sequence, -3);
    assert_eq!(parsed.token.expect("token").as_str(), "token");
}
