// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for file creation

use thiserror::Error;

/// A driver refused to initialise a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver init failed: {0}")]
pub struct InitError(pub String);

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur while creating a file.
///
/// Creation failures roll back all registry state; the id consumed by the
/// attempt is never handed out again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewFileError {
    #[error("isolate has panicked")]
    Panicked,
    #[error(transparent)]
    Init(#[from] InitError),
}
