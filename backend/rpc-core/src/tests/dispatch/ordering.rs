use super::{ECHO_METHOD, TestClient, header, id_payload, open, test_dispatcher};
use crate::dispatch::headers::MESSAGE_SEQUENCE_HEADER;

use models::IdResponse;

use std::sync::Arc;
use std::time::{Duration, Instant};

use prost::Message;

/// **VALUE**: Concurrent requests N and N+1 are both accepted whatever order they arrive in.
///
/// **WHY THIS MATTERS**: The front-end issues requests in parallel over separate
/// connections; the network may deliver N+1 first. Without ordered admission the later
/// one would fail the exact sequence check and the call would be lost.
///
/// **BUG THIS CATCHES**: Would catch a race where both requests read the same counter, or
/// an early request being rejected instead of waiting for its predecessor.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_n_plus_one_arriving_first_when_dispatching_concurrently_then_both_accepted() {
    // GIVEN: A session and two prepared requests
    let dispatcher = Arc::new(test_dispatcher(Duration::from_secs(2)));
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;
    let first = client.request_with_sequence(ECHO_METHOD, &id_payload("first"), 2);
    let second = client.request_with_sequence(ECHO_METHOD, &id_payload("second"), 3);

    // WHEN: N+1 is dispatched before N
    let late = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.dispatch(second).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let early = dispatcher.dispatch(first).await;
    let late = late.await.expect("dispatch task");

    // THEN: Both are answered, each exactly once and in sequence order
    let (early_headers, early_payload) = open(early.expect("N accepted")).await;
    let (late_headers, late_payload) = open(late.expect("N+1 accepted")).await;

    assert_eq!(header(&early_headers, MESSAGE_SEQUENCE_HEADER), "2");
    assert_eq!(header(&late_headers, MESSAGE_SEQUENCE_HEADER), "3");
    assert_eq!(
        IdResponse::decode(early_payload.as_slice()).expect("decode").id,
        "first"
    );
    assert_eq!(
        IdResponse::decode(late_payload.as_slice()).expect("decode").id,
        "second"
    );
}

/// **VALUE**: A burst of requests dispatched in reverse order all succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_reversed_burst_when_dispatching_then_every_request_accepted_once() {
    // GIVEN
    let dispatcher = Arc::new(test_dispatcher(Duration::from_secs(2)));
    let mut client = TestClient::new();
    client.handshake(&dispatcher).await;

    // WHEN: Sequences 11 down to 2 are spawned
    let tasks: Vec<_> = (2..=11)
        .rev()
        .map(|sequence| {
            let request = client.request_with_sequence(
                ECHO_METHOD,
                &id_payload(&sequence.to_string()),
                sequence,
            );
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(request).await })
        })
        .collect();

    // THEN
    for task in tasks {
        assert!(task.await.expect("dispatch task").is_ok());
    }

    let token = client.token.clone().expect("token");
    let session_ref = dispatcher.registry().lookup(&token).await.expect("session");
    assert_eq!(session_ref.lock().await.recv_counter, 11);
}

/// **VALUE**: A request waiting for its turn does not hold up other sessions.
///
/// **BUG THIS CATCHES**: Would catch the registry lock or a global lock being held
/// while a session waits in its reorder window.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_waiting_request_on_one_session_when_other_session_calls_then_not_blocked() {
    // GIVEN: Two sessions
    let dispatcher = Arc::new(test_dispatcher(Duration::from_secs(2)));
    let mut blocked = TestClient::new();
    let mut free = TestClient::new();
    blocked.handshake(&dispatcher).await;
    free.handshake(&dispatcher).await;

    // GIVEN: Session A has a request waiting on a gap
    let gap = blocked.request_with_sequence(ECHO_METHOD, &id_payload("gap"), 5);
    let waiting = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.dispatch(gap).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // WHEN: Session B calls
    let started = Instant::now();
    let result = dispatcher
        .dispatch(free.request(ECHO_METHOD, &id_payload("free")))
        .await;

    // THEN: B completes well inside A's window, and A eventually fails
    assert!(result.is_ok());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(waiting.await.expect("dispatch task").is_err());
}
