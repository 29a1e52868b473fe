//! Wire-level tests for the outbound strategies: what framing each one
//! actually produces, observed by a raw socket backend.

mod common;

use std::net::SocketAddr;

use bytes::Bytes;
use futures_util::stream;
use http_conduit::body::{BodyError, BodySource, BufferSettings, OutboundRequest, RequestError};
use http_conduit::client::ClientHandle;
use http_conduit::config::{Authentication, ClientConfig, UserCredentialsConfig};
use http_conduit::{ExecutionStrategy, StreamingMode};
use reqwest::{Method, Url};

fn request(addr: SocketAddr, method: Method, path: &str, body: BodySource) -> OutboundRequest {
    let url = Url::parse(&format!("http://{addr}{path}")).unwrap();
    OutboundRequest {
        method,
        url,
        headers: reqwest::header::HeaderMap::new(),
        body,
    }
}

async fn observe(
    addr: SocketAddr,
    method: Method,
    mode: StreamingMode,
    body: BodySource,
) -> serde_json::Value {
    let client = ClientHandle::build_default().unwrap();
    let strategy =
        ExecutionStrategy::select(&method, mode, &BufferSettings::default()).unwrap();
    let response = strategy
        .execute(&client, request(addr, method, "/echo", body))
        .await
        .unwrap();
    let bytes = response.into_bytes().await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_sends_no_body_in_any_mode() {
    let addr = common::start_introspect_backend().await;

    for mode in [StreamingMode::None, StreamingMode::Always, StreamingMode::Auto] {
        let seen = observe(
            addr,
            Method::GET,
            mode,
            BodySource::from_bytes("must not be sent"),
        )
        .await;
        assert_eq!(seen["method"], "GET");
        assert_eq!(seen["body_len"], 0, "mode {:?} leaked a body", mode);
        assert!(seen["transfer_encoding"].is_null());
    }
}

#[tokio::test]
async fn buffered_post_sends_content_length() {
    let addr = common::start_introspect_backend().await;

    let seen = observe(
        addr,
        Method::POST,
        StreamingMode::None,
        BodySource::from_bytes("hello world"),
    )
    .await;
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["content_length"], "11");
    assert!(seen["transfer_encoding"].is_null());
    assert_eq!(seen["body_len"], 11);
}

#[tokio::test]
async fn buffered_post_materializes_a_stream_before_sending() {
    let addr = common::start_introspect_backend().await;

    let chunks: Vec<Result<Bytes, BodyError>> = vec![
        Ok(Bytes::from_static(b"part one ")),
        Ok(Bytes::from_static(b"part two")),
    ];
    let seen = observe(
        addr,
        Method::POST,
        StreamingMode::None,
        BodySource::stream(Box::pin(stream::iter(chunks))),
    )
    .await;
    assert_eq!(seen["content_length"], "17");
    assert!(seen["transfer_encoding"].is_null());
    assert_eq!(seen["body_len"], 17);
}

#[tokio::test]
async fn always_streaming_chunks_even_an_empty_body() {
    let addr = common::start_introspect_backend().await;

    let seen = observe(addr, Method::PUT, StreamingMode::Always, BodySource::Empty).await;
    assert_eq!(seen["method"], "PUT");
    assert_eq!(seen["transfer_encoding"], "chunked");
    assert!(seen["content_length"].is_null());
    assert_eq!(seen["body_len"], 0);
}

#[tokio::test]
async fn always_streaming_chunks_a_known_size_body() {
    let addr = common::start_introspect_backend().await;

    let seen = observe(
        addr,
        Method::POST,
        StreamingMode::Always,
        BodySource::from_bytes("payload"),
    )
    .await;
    assert_eq!(seen["transfer_encoding"], "chunked");
    assert!(seen["content_length"].is_null());
    assert_eq!(seen["body_len"], 7);
}

#[tokio::test]
async fn auto_streaming_prefers_content_length_for_known_sizes() {
    let addr = common::start_introspect_backend().await;

    let seen = observe(
        addr,
        Method::POST,
        StreamingMode::Auto,
        BodySource::from_bytes("sized body"),
    )
    .await;
    assert_eq!(seen["content_length"], "10");
    assert!(seen["transfer_encoding"].is_null());
}

#[tokio::test]
async fn auto_streaming_chunks_open_ended_streams() {
    let addr = common::start_introspect_backend().await;

    let chunks: Vec<Result<Bytes, BodyError>> = vec![
        Ok(Bytes::from_static(b"first")),
        Ok(Bytes::from_static(b"second")),
    ];
    let seen = observe(
        addr,
        Method::POST,
        StreamingMode::Auto,
        BodySource::stream(Box::pin(stream::iter(chunks))),
    )
    .await;
    assert_eq!(seen["transfer_encoding"], "chunked");
    assert!(seen["content_length"].is_null());
    assert_eq!(seen["body_len"], 11);
}

#[tokio::test]
async fn non_success_status_surfaces_with_body() {
    let addr = common::start_introspect_backend().await;

    let client = ClientHandle::build_default().unwrap();
    let strategy = ExecutionStrategy::select(
        &Method::GET,
        StreamingMode::Auto,
        &BufferSettings::default(),
    )
    .unwrap();
    let err = strategy
        .execute(&client, request(addr, Method::GET, "/fail", BodySource::Empty))
        .await
        .unwrap_err();

    match err {
        RequestError::Status { status, body, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, Bytes::from_static(b"boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failed_body_evaluation_never_reaches_the_wire() {
    let addr = common::start_introspect_backend().await;

    let client = ClientHandle::build_default().unwrap();
    let strategy = ExecutionStrategy::select(
        &Method::POST,
        StreamingMode::None,
        &BufferSettings::default(),
    )
    .unwrap();
    let chunks: Vec<Result<Bytes, BodyError>> = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(BodyError::Other("evaluation failed".into())),
    ];
    let err = strategy
        .execute(
            &client,
            request(
                addr,
                Method::POST,
                "/echo",
                BodySource::stream(Box::pin(stream::iter(chunks))),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::BeforeSend(_)));
}

#[tokio::test]
async fn digest_challenge_is_answered_on_retry() {
    let addr = common::start_introspect_backend().await;

    let config = ClientConfig {
        id: "protected-backend".into(),
        host: "127.0.0.1".into(),
        port: addr.port(),
        authentication: Authentication::Digest,
        digest_authentication: Some(UserCredentialsConfig {
            username: "mufasa".into(),
            password: "circle".into(),
        }),
        ..ClientConfig::default()
    };
    let client = ClientHandle::build(&config).unwrap();
    let strategy = ExecutionStrategy::select(
        &Method::GET,
        StreamingMode::Auto,
        &BufferSettings::default(),
    )
    .unwrap();

    let response = strategy
        .execute(
            &client,
            request(addr, Method::GET, "/protected", BodySource::Empty),
        )
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 200);

    let seen: serde_json::Value =
        serde_json::from_slice(&response.into_bytes().await.unwrap()).unwrap();
    let authorization = seen["authorization"].as_str().unwrap();
    assert!(authorization.starts_with("Digest "));
    assert!(authorization.contains("username=\"mufasa\""));
    assert!(authorization.contains("nonce=\"f3a9b2\""));
    assert!(authorization.contains("response="));
}
