// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn codes_round_trip() {
    for err in [ReqError::Nomem, ReqError::Aborted, ReqError::Invalid] {
        assert_eq!(ReqError::from_code(err.code()), Some(err));
    }
}

#[test]
fn ok_code_is_not_an_error() {
    assert_eq!(ReqError::from_code(RESULT_OK), None);
}

#[test]
fn display_is_human_readable() {
    assert_eq!(ReqError::Nomem.to_string(), "out of memory");
    assert_eq!(ReqError::Aborted.to_string(), "aborted");
    assert_eq!(ReqError::Invalid.to_string(), "invalid request");
}
