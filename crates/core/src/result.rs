// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request result codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire code of a successful request.
pub const RESULT_OK: u8 = 0x00;

/// Failure codes delivered through a request's completion.
///
/// Allocation-style refusals that happen before a completion exists are
/// reported as synchronous errors instead and never use these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReqError {
    #[error("out of memory")]
    Nomem,
    #[error("aborted")]
    Aborted,
    #[error("invalid request")]
    Invalid,
}

impl ReqError {
    /// 8-bit wire code (`RESULT_OK` is the success code).
    pub fn code(self) -> u8 {
        match self {
            ReqError::Nomem => 0x01,
            ReqError::Aborted => 0x02,
            ReqError::Invalid => 0x03,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => ReqError::Nomem,
            0x02 => ReqError::Aborted,
            0x03 => ReqError::Invalid,
            _ => return None,
        })
    }
}

/// Outcome of a dispatched request.
pub type ReqResult<T> = Result<T, ReqError>;

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
