//! End-to-end tests for the dispatch engine
//!
//! These tests drive complete command streams through both execution modes:
//! - Feed ordering for shuffled inserts
//! - Empty-feed queries and remove/contains sequences
//! - Exactly-once answers with many consumers
//! - Malformed input and end of input without DONE

use feed_dispatch::{Engine, EngineConfig, EngineError, ExecutionMode, Request, Response, RunReport};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Modes whose responses come back in input order.
fn sequential_configs() -> [EngineConfig; 2] {
    [EngineConfig::new(), EngineConfig::new().with_consumers(1)]
}

fn encode(requests: &[Request]) -> Vec<u8> {
    let mut input = String::new();
    for request in requests {
        input.push_str(&serde_json::to_string(request).unwrap());
        input.push('\n');
    }
    input.into_bytes()
}

fn parse_lines(output: &[u8]) -> Vec<Response> {
    std::str::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn run(config: &EngineConfig, requests: &[Request]) -> (RunReport, Vec<Response>) {
    let mut output = Vec::new();
    let report = Engine::new(config.clone())
        .unwrap()
        .run(&encode(requests)[..], &mut output)
        .unwrap();
    (report, parse_lines(&output))
}

/// Run on a separate thread so a hang fails the test instead of stalling it.
fn run_with_deadline(
    config: EngineConfig,
    input: Vec<u8>,
) -> (Result<RunReport, EngineError>, Vec<u8>) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut output = Vec::new();
        let result = Engine::new(config).unwrap().run(&input[..], &mut output);
        let _ = tx.send((result, output));
    });
    rx.recv_timeout(Duration::from_secs(30))
        .expect("engine did not finish in time")
}

fn add(id: i64, timestamp: f64) -> Request {
    Request::Add {
        id,
        timestamp,
        body: format!("post {timestamp}"),
    }
}

fn ack(success: bool, id: i64) -> Response {
    Response::Ack { success, id }
}

fn feed_timestamps(response: &Response) -> Vec<f64> {
    match response {
        Response::Feed { feed, .. } => feed.iter().map(|p| p.timestamp).collect(),
        other => panic!("expected feed response, got {other:?}"),
    }
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn test_feed_orders_twenty_timestamps() {
    let timestamps = [
        1, 2, 18, 9, 8, 20, 16, 10, 6, 14, 17, 15, 19, 5, 13, 11, 7, 4, 3, 12,
    ];

    for config in sequential_configs() {
        let mut requests: Vec<Request> = timestamps
            .iter()
            .zip(1..)
            .map(|(&ts, id)| add(id, f64::from(ts)))
            .collect();
        requests.push(Request::Feed { id: 100 });
        requests.push(Request::Done);

        let (report, responses) = run(&config, &requests);
        assert_eq!(report.responses, 21);
        assert!(responses[..20].iter().all(|r| matches!(r, Response::Ack { success: true, .. })));

        let Response::Feed { id, feed } = &responses[20] else {
            panic!("expected feed response, got {:?}", responses[20]);
        };
        assert_eq!(*id, 100);
        let expected: Vec<f64> = (1..=20).rev().map(f64::from).collect();
        let got: Vec<f64> = feed.iter().map(|p| p.timestamp).collect();
        assert_eq!(got, expected, "mode {:?}", config.mode);
        for post in feed {
            assert_eq!(post.body, format!("post {}", post.timestamp));
        }
    }
}

#[test]
fn test_shuffled_inserts_are_sorted() {
    let mut rng = rand::rng();
    let mut timestamps: Vec<u32> = (1..=200).collect();
    timestamps.shuffle(&mut rng);

    for config in sequential_configs() {
        let mut requests: Vec<Request> = timestamps
            .iter()
            .zip(1..)
            .map(|(&ts, id)| add(id, f64::from(ts) + 0.5))
            .collect();
        requests.push(Request::Feed { id: 0 });
        requests.push(Request::Done);

        let (_, responses) = run(&config, &requests);
        let got = feed_timestamps(responses.last().unwrap());
        assert_eq!(got.len(), 200);
        assert!(got.windows(2).all(|w| w[0] > w[1]));
    }
}

// ============================================================================
// EMPTY FEED AND REMOVAL
// ============================================================================

#[test]
fn test_empty_feed_queries() {
    for config in sequential_configs() {
        let requests = [
            Request::Contains { id: 1, timestamp: 7.0 },
            Request::Remove { id: 2, timestamp: 7.0 },
            Request::Feed { id: 3 },
            Request::Done,
        ];
        let (_, responses) = run(&config, &requests);
        assert_eq!(
            responses,
            vec![
                ack(false, 1),
                ack(false, 2),
                Response::Feed { id: 3, feed: Vec::new() },
            ]
        );
    }
}

#[test]
fn test_remove_evens_then_odds() {
    const N: u32 = 40;

    for config in sequential_configs() {
        let mut requests = Vec::new();
        let mut next_id = 0_i64;
        let mut id = || {
            next_id += 1;
            next_id
        };

        for ts in 1..=N {
            requests.push(add(id(), f64::from(ts)));
        }
        for ts in (2..=N).step_by(2) {
            requests.push(Request::Remove { id: id(), timestamp: f64::from(ts) });
        }
        let contains_from = requests.len();
        for ts in 1..=N {
            requests.push(Request::Contains { id: id(), timestamp: f64::from(ts) });
        }
        let odd_removes_from = requests.len();
        for ts in (1..=N).step_by(2) {
            requests.push(Request::Remove { id: id(), timestamp: f64::from(ts) });
        }
        requests.push(Request::Remove { id: id(), timestamp: 1.0 });
        requests.push(Request::Feed { id: id() });
        requests.push(Request::Done);

        let (_, responses) = run(&config, &requests);

        for (offset, ts) in (1..=N).enumerate() {
            match &responses[contains_from + offset] {
                Response::Ack { success, .. } => assert_eq!(*success, ts % 2 == 1, "contains {ts}"),
                other => panic!("expected ack, got {other:?}"),
            }
        }
        let odd_count = (N / 2) as usize;
        assert!(responses[odd_removes_from..odd_removes_from + odd_count]
            .iter()
            .all(|r| matches!(r, Response::Ack { success: true, .. })));
        // Second removal of the same timestamp.
        assert!(matches!(
            responses[odd_removes_from + odd_count],
            Response::Ack { success: false, .. }
        ));
        assert!(feed_timestamps(responses.last().unwrap()).is_empty());
    }
}

// ============================================================================
// POOLED MODE WITH MANY CONSUMERS
// ============================================================================

#[test]
fn test_every_request_answered_once_with_many_consumers() {
    const POSTS: i64 = 2_000;
    let mut requests = Vec::new();
    for i in 0..POSTS {
        requests.push(add(i, i as f64));
        requests.push(Request::Contains { id: POSTS + i, timestamp: -1.0 - i as f64 });
        if i % 100 == 0 {
            requests.push(Request::Feed { id: 2 * POSTS + i });
        }
    }
    requests.push(Request::Done);
    let expected = requests.len() - 1;

    let (result, output) =
        run_with_deadline(EngineConfig::new().with_consumers(8), encode(&requests));
    let report = result.unwrap();
    assert_eq!(report.mode, ExecutionMode::Pooled { consumers: 8 });
    assert_eq!(report.responses as usize, expected);
    assert_eq!(report.requests.add as i64, POSTS);
    assert_eq!(report.requests.done, 1);

    let text = String::from_utf8(output).unwrap();
    let mut seen = HashSet::new();
    for line in text.lines() {
        let response: Response = serde_json::from_str(line).expect("each line is one JSON record");
        assert!(seen.insert(response.id()), "id {} answered twice", response.id());
        match response {
            Response::Ack { success, id } if id < POSTS => assert!(success),
            Response::Ack { success, .. } => assert!(!success, "contains of a never-added post"),
            Response::Feed { feed, .. } => {
                assert!(feed.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
            }
        }
    }
    assert_eq!(seen.len(), expected);
}

#[test]
fn test_pooled_disjoint_add_remove() {
    let mut requests = Vec::new();
    for i in 0..500_i64 {
        requests.push(add(i, i as f64));
    }
    // Removes race with adds of other timestamps, never their own.
    for i in 0..250_i64 {
        requests.push(Request::Remove { id: 1_000 + i, timestamp: i as f64 });
        requests.push(add(2_000 + i, 10_000.0 + i as f64));
    }
    requests.push(Request::Done);

    for consumers in [1, 2, 16] {
        let (result, output) =
            run_with_deadline(EngineConfig::new().with_consumers(consumers), encode(&requests));
        result.unwrap();
        let responses = parse_lines(&output);
        assert_eq!(responses.len(), requests.len() - 1);
        assert!(responses.iter().all(|r| matches!(r, Response::Ack { .. })));
    }
}

#[test]
fn test_consumer_count_above_request_count() {
    let requests = [add(1, 1.0), Request::Done];
    let (result, output) =
        run_with_deadline(EngineConfig::new().with_consumers(32), encode(&requests));
    let report = result.unwrap();
    assert_eq!(report.responses, 1);
    assert_eq!(parse_lines(&output), vec![ack(true, 1)]);
}

// ============================================================================
// SHUTDOWN AND FAILURE
// ============================================================================

#[test]
fn test_done_only_produces_no_output() {
    for config in [EngineConfig::new(), EngineConfig::new().with_consumers(4)] {
        let (result, output) = run_with_deadline(config, encode(&[Request::Done]));
        let report = result.unwrap();
        assert_eq!(report.responses, 0);
        assert_eq!(report.requests.done, 1);
        assert!(output.is_empty());
    }
}

#[test]
fn test_requests_after_done_are_ignored() {
    for config in sequential_configs() {
        let requests = [add(1, 1.0), Request::Done, add(2, 2.0), Request::Feed { id: 3 }];
        let (report, responses) = run(&config, &requests);
        assert_eq!(responses, vec![ack(true, 1)]);
        assert_eq!(report.requests.total(), 2);
    }
}

#[test]
fn test_end_of_input_without_done() {
    for config in [EngineConfig::new(), EngineConfig::new().with_consumers(4)] {
        let requests = [add(1, 1.0), add(2, 2.0), Request::Contains { id: 3, timestamp: 2.0 }];
        let (result, output) = run_with_deadline(config, encode(&requests));
        let report = result.unwrap();
        assert!(report.implicit_done);
        assert_eq!(report.requests.done, 0);
        assert_eq!(parse_lines(&output).len(), 3);
    }
}

#[test]
fn test_malformed_input_fails_without_hanging() {
    let input = br#"{"command":"ADD","id":1,"timestamp":1,"body":"ok"}
{"command":"CONTAINS","id":2,"timestamp":1}
{"command":"SHUFFLE","id":3}
{"command":"DONE"}"#
        .to_vec();

    for config in [
        EngineConfig::new(),
        EngineConfig::new().with_consumers(1),
        EngineConfig::new().with_consumers(6),
    ] {
        let (result, output) = run_with_deadline(config, input.clone());
        match result {
            Err(EngineError::Decode { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected decode error, got {other:?}"),
        }
        // Requests before the bad record were still answered.
        let mut ids: Vec<i64> = parse_lines(&output).iter().map(Response::id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}

#[test]
fn test_truncated_input_fails() {
    let input = br#"{"command":"ADD","id":1,"timestamp":1,"body":"ok"}{"command":"FE"#.to_vec();
    let (result, _) = run_with_deadline(EngineConfig::new().with_consumers(3), input);
    assert!(matches!(result, Err(EngineError::Decode { index: 1, .. })));
}

#[test]
fn test_records_without_separators() {
    let input = concat!(
        r#"{"command":"ADD","id":1,"timestamp":3,"body":"a"}"#,
        r#"{"command":"ADD","id":2,"timestamp":4,"body":"b"}"#,
        r#"{"command":"FEED","id":3}{"command":"DONE"}"#,
    )
    .as_bytes();
    let mut output = Vec::new();
    Engine::new(EngineConfig::new()).unwrap().run(&input[..], &mut output).unwrap();

    let responses = parse_lines(&output);
    assert_eq!(feed_timestamps(&responses[2]), vec![4.0, 3.0]);
}
