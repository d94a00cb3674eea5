// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};

use datadog_log_shipper::{
    Config, LogLine, LogShipper, Options, RetryStrategy, ShipperError, TransportError,
};
use flate2::read::GzDecoder;
use mockito::{Matcher, Request, Server};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

type Received = Arc<Mutex<Vec<Vec<LogLine>>>>;

/// Decodes every request body the mock sees, one entry per request.
fn capture(received: &Received) -> impl Fn(&Request) -> Vec<u8> + Send + Sync + 'static {
    let received = Arc::clone(received);
    move |request: &Request| {
        let body = request.body().expect("request has a body");
        let mut json = Vec::new();
        GzDecoder::new(&body[..])
            .read_to_end(&mut json)
            .expect("body is gzip encoded");
        let lines: Vec<LogLine> = serde_json::from_slice(&json).expect("body is a JSON array");
        received.lock().expect("lock poisoned").push(lines);
        Vec::new()
    }
}

fn flatten(received: &Received) -> Vec<LogLine> {
    received
        .lock()
        .expect("lock poisoned")
        .iter()
        .flatten()
        .cloned()
        .collect()
}

fn config(host: String) -> Config {
    Config {
        retry_strategy: RetryStrategy::Immediate(1),
        ..Config::new(
            "mock-api-key",
            Options {
                host: Some(host),
                ..Default::default()
            },
        )
    }
}

fn messages(n: usize) -> Vec<LogLine> {
    (0..n).map(|i| LogLine::new(format!("Message {i}"))).collect()
}

#[tokio::test]
async fn sync_posts_buffered_lines() {
    let mut server = Server::new_async().await;
    let received = Received::default();
    let mock = server
        .mock("POST", "/")
        .match_header("DD-API-KEY", "mock-api-key")
        .match_header("Content-Type", "application/json")
        .match_header("Content-Encoding", "gzip")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .create_async()
        .await;

    let shipper = LogShipper::new(config(server.url())).expect("failed to create shipper");
    assert_eq!(shipper.write(b"Message one"), 11);
    shipper.sync().await.expect("sync failed");

    mock.assert_async().await;
    assert_eq!(flatten(&received), vec![LogLine::new("Message one")]);
    assert!(shipper.is_empty());
}

#[tokio::test]
async fn sync_sends_options_as_query_parameters() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/logs")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ddsource".into(), "rust".into()),
            Matcher::UrlEncoded("ddtags".into(), "env:test,team:logs".into()),
            Matcher::UrlEncoded("hostname".into(), "unittest-hostname".into()),
            Matcher::UrlEncoded("service".into(), "unittest".into()),
        ]))
        .with_status(202)
        .create_async()
        .await;

    let shipper = LogShipper::new(Config {
        retry_strategy: RetryStrategy::Immediate(1),
        ..Config::new(
            "mock-api-key",
            Options {
                host: Some(format!("{}/api/v2/logs", server.url())),
                source: Some("rust".to_string()),
                service: Some("unittest".to_string()),
                hostname: Some("unittest-hostname".to_string()),
                tags: vec!["env:test".to_string(), "team:logs".to_string()],
            },
        )
    })
    .expect("failed to create shipper");
    shipper.write(b"tagged");
    shipper.sync().await.expect("sync failed");

    mock.assert_async().await;
}

#[tokio::test]
async fn sync_chunks_by_max_line_count() {
    let mut server = Server::new_async().await;
    let received = Received::default();
    let mock = server
        .mock("POST", "/")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .expect(3)
        .create_async()
        .await;

    let shipper = LogShipper::new(config(server.url())).expect("failed to create shipper");
    let written = messages(2500);
    for line in &written {
        shipper.write(line.message.as_bytes());
    }
    shipper.sync().await.expect("sync failed");

    mock.assert_async().await;
    let sizes: Vec<usize> = received
        .lock()
        .expect("lock poisoned")
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    assert_eq!(flatten(&received), written);
}

#[tokio::test]
async fn sync_splits_oversized_batches() {
    let mut server = Server::new_async().await;
    let received = Received::default();
    let _mock = server
        .mock("POST", "/")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .expect_at_least(2)
        .create_async()
        .await;

    let shipper = LogShipper::new(Config {
        max_content_size_bytes: 1024,
        ..config(server.url())
    })
    .expect("failed to create shipper");
    let written = messages(200);
    for line in &written {
        shipper.write(line.message.as_bytes());
    }
    shipper.sync().await.expect("sync failed");

    let requests = received.lock().expect("lock poisoned").clone();
    assert!(requests.len() >= 2);
    for lines in &requests {
        let json = serde_json::to_vec(lines).expect("serialize");
        assert!(json.len() <= 1024);
    }
    assert_eq!(flatten(&received), written);
}

#[tokio::test]
async fn sync_reports_api_response_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(400)
        .create_async()
        .await;

    let shipper = LogShipper::new(config(server.url())).expect("failed to create shipper");
    shipper.write(b"rejected");
    let err = shipper.sync().await.expect_err("sync should fail");

    assert!(matches!(err, ShipperError::ApiResponse(StatusCode::BAD_REQUEST)));
}

#[tokio::test]
async fn failed_sync_keeps_unsent_lines_in_order() {
    let mut server = Server::new_async().await;
    let received = Received::default();
    let _accepted = server
        .mock("POST", "/")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .expect(1)
        .create_async()
        .await;
    let failing = server
        .mock("POST", "/")
        .with_status(500)
        .create_async()
        .await;

    let shipper = LogShipper::new(Config {
        max_batch_lines: 2,
        ..config(server.url())
    })
    .expect("failed to create shipper");
    let written = messages(5);
    for line in &written {
        shipper.write(line.message.as_bytes());
    }

    let err = shipper.sync().await.expect_err("second payload should fail");
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    // the first payload made it, everything after it is still buffered
    assert_eq!(flatten(&received), written[..2].to_vec());
    assert_eq!(shipper.lines(), written[2..].to_vec());

    shipper.write(b"late");
    failing.remove_async().await;
    let _recovered = server
        .mock("POST", "/")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .create_async()
        .await;

    shipper.sync().await.expect("retry sync failed");

    let mut expected = written;
    expected.push(LogLine::new("late"));
    assert_eq!(flatten(&received), expected);
    assert!(shipper.is_empty());
}

#[tokio::test]
async fn rejected_line_does_not_block_later_lines() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("bad-line".to_string()))
        .with_status(413)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("good-".to_string()))
        .with_status(202)
        .expect(3)
        .create_async()
        .await;

    // one line per payload, plain JSON so the mocks can match on the body
    let shipper = LogShipper::new(Config {
        max_batch_lines: 1,
        use_compression: false,
        ..config(server.url())
    })
    .expect("failed to create shipper");

    shipper.write(b"bad-line");
    shipper.write(b"good-0");
    let err = shipper.sync().await.expect_err("bad line should be rejected");
    assert_eq!(err.status(), Some(StatusCode::PAYLOAD_TOO_LARGE));
    assert_eq!(shipper.lines(), vec![LogLine::new("good-0")]);

    shipper.write(b"good-1");
    shipper.sync().await.expect("good lines should be accepted");
    assert!(shipper.is_empty());

    shipper.write(b"good-2");
    shipper.sync().await.expect("good lines should be accepted");
    assert!(shipper.is_empty());

    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn cancelled_sync_keeps_lines() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(202)
        .expect(0)
        .create_async()
        .await;

    let cancel_token = CancellationToken::new();
    let shipper = LogShipper::new(Config {
        cancel_token: cancel_token.clone(),
        ..config(server.url())
    })
    .expect("failed to create shipper");
    shipper.write(b"never sent");
    cancel_token.cancel();

    let err = shipper.sync().await.expect_err("sync should be cancelled");

    assert!(matches!(
        err,
        ShipperError::Transport(TransportError::Cancelled)
    ));
    assert_eq!(shipper.lines(), vec![LogLine::new("never sent")]);
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_and_syncs_deliver_every_line_once() {
    let mut server = Server::new_async().await;
    let received = Received::default();
    let _mock = server
        .mock("POST", "/")
        .with_status(202)
        .with_body_from_request(capture(&received))
        .expect_at_least(1)
        .create_async()
        .await;

    let shipper = Arc::new(LogShipper::new(config(server.url())).expect("failed to create shipper"));

    let mut tasks = Vec::new();
    for writer in 0..4 {
        let shipper = Arc::clone(&shipper);
        tasks.push(tokio::spawn(async move {
            for i in 0..200 {
                shipper.write(format!("{writer}-{i}").as_bytes());
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for _ in 0..3 {
        let shipper = Arc::clone(&shipper);
        tasks.push(tokio::spawn(async move {
            shipper.sync().await.expect("sync failed");
        }));
    }
    for task in tasks {
        task.await.expect("task panicked");
    }
    shipper.sync().await.expect("final sync failed");

    let delivered = flatten(&received);
    assert_eq!(delivered.len(), 800);
    let unique: HashSet<String> = delivered.into_iter().map(|l| l.message).collect();
    assert_eq!(unique.len(), 800);
    assert!(shipper.is_empty());
}
