//! Mock beacon node shared by the integration tests.

#![allow(dead_code)]

use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    body::{Body, Bytes},
    http::header,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use beacon_client::BeaconClient;
use futures::{Stream, StreamExt, stream};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// URL of a local port nothing listens on.
pub async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

pub fn client(url: Url) -> BeaconClient {
    BeaconClient::new("mock", url, Duration::from_secs(2)).unwrap()
}

/// 32-byte hex string filled with `byte`.
pub fn root(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(32))
}

/// 20-byte hex address filled with `byte`.
pub fn address(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(20))
}

pub fn head_event_json(slot: u64) -> Value {
    json!({
        "slot": slot.to_string(),
        "block": root(slot as u8),
        "state": root(slot as u8 ^ 0xff),
        "epoch_transition": false,
        "execution_optimistic": false,
    })
}

/// SSE `head` event for `slot`.
pub fn head_event(slot: u64) -> Event {
    Event::default()
        .event("head")
        .data(head_event_json(slot).to_string())
}

/// SSE event with arbitrary type and data.
pub fn raw_event(event_type: &str, data: &str) -> Event {
    Event::default().event(event_type).data(data)
}

type EventStream = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// SSE response that sends `events` and then closes the connection.
pub fn sse_then_close(events: Vec<Event>) -> EventStream {
    Sse::new(stream::iter(events.into_iter().map(Ok)).boxed())
}

/// SSE response that sends `events` and then keeps the connection open.
pub fn sse_then_hold(events: Vec<Event>) -> EventStream {
    Sse::new(
        stream::iter(events.into_iter().map(Ok))
            .chain(stream::pending())
            .boxed(),
    )
}

/// `text/event-stream` response writing each chunk as-is after `gap`, then holding the
/// connection open. Chunks may contain bytes an SSE encoder would refuse to produce.
pub fn raw_sse_then_hold(chunks: Vec<Vec<u8>>, gap: Duration) -> Response {
    let body = stream::iter(chunks)
        .then(move |chunk| async move {
            tokio::time::sleep(gap).await;
            Ok::<_, Infallible>(Bytes::from(chunk))
        })
        .chain(stream::pending());
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(body),
    )
        .into_response()
}

/// Wire encoding of a `head` event for `slot`.
pub fn head_event_bytes(slot: u64) -> Vec<u8> {
    format!("event: head\ndata: {}\n\n", head_event_json(slot)).into_bytes()
}

pub fn execution_payload_json() -> Value {
    json!({
        "parent_hash": root(0x01),
        "fee_recipient": address(0x02),
        "state_root": root(0x03),
        "receipts_root": root(0x04),
        "logs_bloom": format!("0x{}", "00".repeat(256)),
        "prev_randao": root(0x05),
        "block_number": "17000000",
        "gas_limit": "30000000",
        "gas_used": "12000000",
        "timestamp": "1700000000",
        "extra_data": "0x",
        "base_fee_per_gas": "7000000000",
        "block_hash": root(0x09),
        "transactions": ["0x02f8"],
        "withdrawals": [
            { "index": "1", "validator_index": "2", "address": address(0x0a), "amount": "3" }
        ],
    })
}
