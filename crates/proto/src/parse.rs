// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol command parser
//!
//! Validates an inbound MessagePack object against the command grammar:
//! a map with `interface` and `command` strings plus an optional `param`
//! map. The interface is matched case-insensitively against the caller's
//! allowed set; commands are per-interface. File references in the
//! payload are resolved to live handles - a positive integer directly,
//! a string through the pathfind walker - and held by the message until
//! it is dropped.

use crate::msgpack::Fields;
use fil_core::{FileId, IsoStatus};
use fil_runtime::{pathfind, FileHandle, Isolate, PathfindSpec};
use rmpv::Value;
use thiserror::Error;

/// Most file references one message can hold.
pub const HOLD_MAX: usize = 4;

/// Protocol interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iface {
    Encoder,
    Object,
}

impl Iface {
    pub fn code(self) -> u16 {
        match self {
            Iface::Encoder => 0x0001,
            Iface::Object => 0x0002,
        }
    }
}

/// The set of interfaces a parser invocation accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfaceSet {
    pub encoder: bool,
    pub object: bool,
}

impl IfaceSet {
    pub fn all() -> Self {
        Self {
            encoder: true,
            object: true,
        }
    }

    pub fn encoder() -> Self {
        Self {
            encoder: true,
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self {
            object: true,
            ..Self::default()
        }
    }

    pub fn contains(self, iface: Iface) -> bool {
        match iface {
            Iface::Encoder => self.encoder,
            Iface::Object => self.object,
        }
    }
}

/// Protocol commands, by interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    EncoderInfo,
    EncoderInit,
    EncoderFrame,
    EncoderFinalize,
    ObjectLock,
    ObjectLockEx,
    ObjectUnlock,
    ObjectGet,
    ObjectSet,
}

/// Per-command payload carried by a parsed message.
#[derive(Debug, Clone)]
pub enum Payload {
    None,
    EncoderFrame { file: FileHandle },
    Object {
        path: Option<Vec<Value>>,
        value: Option<Value>,
    },
}

/// A validated command message.
///
/// Holds strong references to every file resolved during parsing; they
/// are released when the message is dropped.
#[derive(Debug)]
pub struct ProtoMsg {
    pub iface: Iface,
    pub cmd: Cmd,
    pub param: Option<Vec<(Value, Value)>>,
    pub payload: Payload,
    holds: Vec<FileHandle>,
}

impl ProtoMsg {
    fn new(iface: Iface, cmd: Cmd, param: Option<&[(Value, Value)]>) -> Self {
        Self {
            iface,
            cmd,
            param: param.map(<[(Value, Value)]>::to_vec),
            payload: Payload::None,
            holds: Vec::new(),
        }
    }

    fn hold(&mut self, file: FileHandle) {
        if self.holds.len() < HOLD_MAX {
            self.holds.push(file);
        }
    }

    /// Files kept alive for this message's lifetime.
    pub fn holds(&self) -> &[FileHandle] {
        &self.holds
    }
}

/// Parse failures, surfaced as the protocol's error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtoError {
    #[error("root must be a map")]
    RootNotMap,
    #[error("invalid msg")]
    InvalidMsg,
    #[error("unknown interface")]
    UnknownInterface,
    #[error("unknown command")]
    UnknownCommand,
    #[error("invalid param")]
    InvalidParam,
    #[error("file not found")]
    FileNotFound,
    #[error("subreq failure")]
    SubreqFailure,
}

/// Validate a command message and resolve its file references.
///
/// Completes exactly once, after any pathfind sub-request has finished.
pub async fn parse(
    iso: &Isolate,
    src: &Value,
    allowed: IfaceSet,
) -> Result<ProtoMsg, ProtoError> {
    let root = Fields::new(src).ok_or(ProtoError::RootNotMap)?;
    let iface = root
        .req_str("interface")
        .map_err(|_| ProtoError::InvalidMsg)?;
    let command = root
        .req_str("command")
        .map_err(|_| ProtoError::InvalidMsg)?;
    let param = root.opt_map("param").map_err(|_| ProtoError::InvalidMsg)?;

    if allowed.encoder && iface.eq_ignore_ascii_case("encoder") {
        let cmd = match command {
            "info" => Cmd::EncoderInfo,
            "init" => Cmd::EncoderInit,
            "frame" => Cmd::EncoderFrame,
            "finalize" => Cmd::EncoderFinalize,
            _ => return Err(ProtoError::UnknownCommand),
        };
        let mut msg = ProtoMsg::new(Iface::Encoder, cmd, param);
        if cmd == Cmd::EncoderFrame {
            resolve_frame_file(iso, param, &mut msg).await?;
        }
        return Ok(msg);
    }

    if allowed.object && iface.eq_ignore_ascii_case("object") {
        let cmd = match command {
            "lock" => Cmd::ObjectLock,
            "lockex" => Cmd::ObjectLockEx,
            "unlock" => Cmd::ObjectUnlock,
            "get" => Cmd::ObjectGet,
            "set" => Cmd::ObjectSet,
            _ => return Err(ProtoError::UnknownCommand),
        };
        let mut msg = ProtoMsg::new(Iface::Object, cmd, param);
        if matches!(cmd, Cmd::ObjectGet | Cmd::ObjectSet) {
            msg.payload = object_payload(param)?;
        }
        return Ok(msg);
    }

    Err(ProtoError::UnknownInterface)
}

async fn resolve_frame_file(
    iso: &Isolate,
    param: Option<&[(Value, Value)]>,
    msg: &mut ProtoMsg,
) -> Result<(), ProtoError> {
    let param = Fields::from_entries(param.ok_or(ProtoError::InvalidParam)?);
    let reference = param.any("file").ok_or(ProtoError::InvalidParam)?;

    let file = match reference {
        Value::Integer(_) => {
            let id = reference.as_u64().ok_or(ProtoError::InvalidParam)?;
            iso.file_get(FileId::new(id))
                .ok_or(ProtoError::FileNotFound)?
        }
        Value::String(_) => {
            let path = reference.as_str().ok_or(ProtoError::InvalidParam)?;
            if iso.status() == IsoStatus::Panic {
                return Err(ProtoError::SubreqFailure);
            }
            let res = pathfind(iso, PathfindSpec::new(path)).await;
            if !res.resolved() {
                return Err(ProtoError::FileNotFound);
            }
            res.base
        }
        _ => return Err(ProtoError::InvalidParam),
    };

    msg.payload = Payload::EncoderFrame { file: file.clone() };
    msg.hold(file);
    Ok(())
}

fn object_payload(param: Option<&[(Value, Value)]>) -> Result<Payload, ProtoError> {
    let Some(param) = param else {
        return Ok(Payload::Object {
            path: None,
            value: None,
        });
    };
    let fields = Fields::from_entries(param);
    let path = fields
        .opt_array("path")
        .map_err(|_| ProtoError::InvalidParam)?;
    let value = fields.any("value");
    Ok(Payload::Object {
        path: path.map(<[Value]>::to_vec),
        value: value.cloned(),
    })
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
