// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    not_initialized = { Error::NotInitialized, "not_initialized" },
    task_claimed = { Error::TaskClaimed { id: "task-1".into(), by: "a1".into() }, "task_claimed" },
    rate_limited = { Error::RateLimited { retry_after_secs: 2 }, "rate_limited" },
    io = { Error::Io { detail: "disk".into() }, "io_error" },
    schema = { Error::Schema { detail: "bad".into() }, "schema_error" },
)]
fn kind_strings(err: Error, kind: &str) {
    assert_eq!(err.kind(), kind);
}

#[test]
fn only_io_and_backend_are_retryable() {
    assert!(Error::Io { detail: "x".into() }.is_retryable());
    assert!(Error::Backend { detail: "x".into() }.is_retryable());
    assert!(!Error::Timeout.is_retryable());
    assert!(!Error::NoAvailableTasks.is_retryable());
    assert!(!Error::NotInitialized.is_retryable());
}

#[test]
fn messages_name_the_offender() {
    let err = Error::TaskNotAssignedToYou {
        id: "task-3".into(),
        by: "a2".into(),
    };
    assert_eq!(err.to_string(), "task task-3 is assigned to a2, not you");
}
