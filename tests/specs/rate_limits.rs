//! S4: rate limit denial and recovery.

use crate::prelude::*;
use masc_core::RoomConfig;
use masc_daemon::protocol::{Command, Request, Response};
use std::time::Duration;

fn limited_stack() -> Stack {
    stack_with(RoomConfig {
        rate: 1.0,
        burst: 2.0,
        ..RoomConfig::default()
    })
}

fn status_as(s: &Stack, session: &str) -> Response {
    let mut request = Request::bare(Command::Status);
    request.session = Some(session.to_string());
    s.gate.dispatch(request).response
}

#[test]
fn third_rapid_call_is_denied_then_recovers() {
    let s = limited_stack();

    assert!(matches!(status_as(&s, "mcp_s1"), Response::Status { .. }));
    assert!(matches!(status_as(&s, "mcp_s1"), Response::Status { .. }));

    let (kind, _) = expect_error(status_as(&s, "mcp_s1"));
    assert_eq!(kind, "rate_limited");

    s.clock.advance(Duration::from_secs(1));
    assert!(matches!(status_as(&s, "mcp_s1"), Response::Status { .. }));
    // Only one token refilled
    let (kind, _) = expect_error(status_as(&s, "mcp_s1"));
    assert_eq!(kind, "rate_limited");
}

#[test]
fn rate_limit_denial_reports_retry_after() {
    let s = limited_stack();
    status_as(&s, "mcp_s1");
    status_as(&s, "mcp_s1");

    match status_as(&s, "mcp_s1") {
        Response::Error {
            kind,
            retry_after_secs,
            ..
        } => {
            assert_eq!(kind, "rate_limited");
            assert_eq!(retry_after_secs, Some(1));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn sessions_are_limited_independently() {
    let s = limited_stack();
    status_as(&s, "mcp_s1");
    status_as(&s, "mcp_s1");
    assert!(matches!(
        expect_error(status_as(&s, "mcp_s1")).0.as_str(),
        "rate_limited"
    ));

    // A different session still has its burst
    assert!(matches!(status_as(&s, "mcp_s2"), Response::Status { .. }));
}

#[test]
fn grant_rate_never_exceeds_burst_plus_rate_times_window() {
    let s = limited_stack();

    let mut granted = 0u64;
    // Hammer for 10 seconds of fake time
    for _ in 0..100 {
        loop {
            match status_as(&s, "mcp_hammer") {
                Response::Status { .. } => granted += 1,
                _ => break,
            }
        }
        s.clock.advance(Duration::from_millis(100));
    }

    // burst 2 + 1/s over 10s
    assert!(granted <= 12, "granted {granted} > 12");
}
