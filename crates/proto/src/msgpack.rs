// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MessagePack framing and field lookup
//!
//! The framing pairs an unpacker with a packer. Inbound bytes are staged
//! under a memory ceiling and decoded into an in-order queue of whole
//! objects; truncated values wait for more bytes, while malformed bytes
//! flip the terminal `broken` bit. Outbound values serialise into a byte
//! buffer that readers drain whole. `pop` transfers ownership of the
//! oldest decoded object to the caller.

use rmpv::Value;
use std::collections::VecDeque;
use std::io::ErrorKind;
use thiserror::Error;

/// Errors that can occur against a framing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("memory ceiling exceeded")]
    Nomem,
    #[error("inbound backlog full")]
    Backlog,
    #[error("framing broken")]
    Broken,
    #[error("direction closed")]
    Closed,
}

impl FramingError {
    /// The result code a driver reports for this refusal.
    pub fn req_error(self) -> fil_core::ReqError {
        match self {
            FramingError::Nomem | FramingError::Backlog => fil_core::ReqError::Nomem,
            FramingError::Broken | FramingError::Closed => fil_core::ReqError::Aborted,
        }
    }
}

/// Framing limits.
#[derive(Debug, Clone)]
pub struct FramingConfig {
    /// Byte ceiling on buffered inbound data (staged and queued).
    pub maxmem: usize,
    /// Cap on fully decoded objects waiting to be popped.
    pub backlog: Option<usize>,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            maxmem: usize::MAX,
            backlog: None,
        }
    }
}

/// A MessagePack unpacker/packer pair.
#[derive(Debug, Default)]
pub struct Framing {
    config: FramingConfig,
    mem: usize,
    stage: Vec<u8>,
    queue: VecDeque<(Value, usize)>,
    out: Vec<u8>,
    broken: bool,
    input_closed: bool,
    output_closed: bool,
}

fn is_truncation(err: &rmpv::decode::Error) -> bool {
    use rmpv::decode::Error;
    match err {
        Error::InvalidMarkerRead(io) | Error::InvalidDataRead(io) => {
            io.kind() == ErrorKind::UnexpectedEof
        }
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

impl Framing {
    pub fn new(config: FramingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Stage inbound bytes and decode any objects they complete.
    ///
    /// The whole chunk is refused when it would exceed the memory
    /// ceiling or when the decoded backlog is full; nothing is consumed
    /// on refusal. Returns the number of objects decoded by this call.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<usize, FramingError> {
        if self.broken {
            return Err(FramingError::Broken);
        }
        if self.input_closed {
            return Err(FramingError::Closed);
        }
        if self.mem.saturating_add(bytes.len()) > self.config.maxmem {
            return Err(FramingError::Nomem);
        }
        if let Some(cap) = self.config.backlog {
            if self.queue.len() >= cap {
                return Err(FramingError::Backlog);
            }
        }

        self.stage.extend_from_slice(bytes);
        self.mem += bytes.len();
        self.drain_stage()
    }

    fn drain_stage(&mut self) -> Result<usize, FramingError> {
        let mut decoded = 0;
        let mut consumed_total = 0;
        while consumed_total < self.stage.len() {
            if let Some(cap) = self.config.backlog {
                if self.queue.len() >= cap {
                    break;
                }
            }
            let mut cursor = std::io::Cursor::new(&self.stage[consumed_total..]);
            match rmpv::decode::read_value(&mut cursor) {
                Ok(value) => {
                    let consumed = cursor.position() as usize;
                    self.queue.push_back((value, consumed));
                    consumed_total += consumed;
                    decoded += 1;
                }
                Err(ref err) if is_truncation(err) => break,
                Err(_) => {
                    self.broken = true;
                    self.stage.clear();
                    return Err(FramingError::Broken);
                }
            }
        }
        self.stage.drain(..consumed_total);
        Ok(decoded)
    }

    /// Take ownership of the oldest fully decoded object.
    pub fn pop(&mut self) -> Option<Value> {
        let (value, consumed) = self.queue.pop_front()?;
        self.mem = self.mem.saturating_sub(consumed);
        Some(value)
    }

    /// Decoded objects waiting to be popped.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Bytes currently buffered against the memory ceiling.
    pub fn mem(&self) -> usize {
        self.mem
    }

    /// Serialise a value onto the outbound buffer.
    pub fn pack(&mut self, value: &Value) -> Result<(), FramingError> {
        if self.broken {
            return Err(FramingError::Broken);
        }
        if self.output_closed {
            return Err(FramingError::Closed);
        }
        if rmpv::encode::write_value(&mut self.out, value).is_err() {
            self.broken = true;
            return Err(FramingError::Broken);
        }
        Ok(())
    }

    /// Drain the outbound buffer whole. Partial reads are unsupported.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    pub fn output_len(&self) -> usize {
        self.out.len()
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn input_open(&self) -> bool {
        !self.input_closed && !self.broken
    }

    pub fn output_open(&self) -> bool {
        !self.output_closed && !self.broken
    }

    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    pub fn close_output(&mut self) {
        self.output_closed = true;
    }
}

/// A field lookup failed: required-and-missing, or present with an
/// incompatible type. Carries the offending field's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid field: {0}")]
pub struct FieldsError(pub &'static str);

impl FieldsError {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Typed accessors over a decoded MessagePack map.
///
/// `req_*` accessors fail on a missing field; `opt_*` accessors accept
/// absence but still fail on a type mismatch. `any` hands out the raw
/// value. Keys that are not strings are ignored during lookup.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    entries: &'a [(Value, Value)],
}

impl<'a> Fields<'a> {
    /// View `root` as a map; `None` when it is anything else.
    pub fn new(root: &'a Value) -> Option<Self> {
        root.as_map().map(|entries| Self { entries })
    }

    pub fn from_entries(entries: &'a [(Value, Value)]) -> Self {
        Self { entries }
    }

    /// Raw lookup by string key.
    pub fn any(&self, name: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_str() == Some(name))
            .map(|(_, value)| value)
    }

    pub fn req_any(&self, name: &'static str) -> Result<&'a Value, FieldsError> {
        self.any(name).ok_or(FieldsError(name))
    }

    fn opt<T>(
        &self,
        name: &'static str,
        cast: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, FieldsError> {
        match self.any(name) {
            None => Ok(None),
            Some(value) => cast(value).map(Some).ok_or(FieldsError(name)),
        }
    }

    fn req<T>(
        &self,
        name: &'static str,
        cast: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<T, FieldsError> {
        self.opt(name, cast)?.ok_or(FieldsError(name))
    }

    pub fn req_str(&self, name: &'static str) -> Result<&'a str, FieldsError> {
        self.req(name, Value::as_str)
    }

    pub fn opt_str(&self, name: &'static str) -> Result<Option<&'a str>, FieldsError> {
        self.opt(name, Value::as_str)
    }

    pub fn req_uint(&self, name: &'static str) -> Result<u64, FieldsError> {
        self.req(name, Value::as_u64)
    }

    pub fn opt_uint(&self, name: &'static str) -> Result<Option<u64>, FieldsError> {
        self.opt(name, Value::as_u64)
    }

    pub fn req_int(&self, name: &'static str) -> Result<i64, FieldsError> {
        self.req(name, Value::as_i64)
    }

    pub fn opt_int(&self, name: &'static str) -> Result<Option<i64>, FieldsError> {
        self.opt(name, Value::as_i64)
    }

    pub fn req_float(&self, name: &'static str) -> Result<f64, FieldsError> {
        self.req(name, as_float)
    }

    pub fn opt_float(&self, name: &'static str) -> Result<Option<f64>, FieldsError> {
        self.opt(name, as_float)
    }

    pub fn req_bool(&self, name: &'static str) -> Result<bool, FieldsError> {
        self.req(name, Value::as_bool)
    }

    pub fn opt_bool(&self, name: &'static str) -> Result<Option<bool>, FieldsError> {
        self.opt(name, Value::as_bool)
    }

    pub fn req_map(&self, name: &'static str) -> Result<&'a [(Value, Value)], FieldsError> {
        self.req(name, |v| v.as_map().map(Vec::as_slice))
    }

    pub fn opt_map(&self, name: &'static str) -> Result<Option<&'a [(Value, Value)]>, FieldsError> {
        self.opt(name, |v| v.as_map().map(Vec::as_slice))
    }

    pub fn req_array(&self, name: &'static str) -> Result<&'a [Value], FieldsError> {
        self.req(name, |v| v.as_array().map(Vec::as_slice))
    }

    pub fn opt_array(&self, name: &'static str) -> Result<Option<&'a [Value]>, FieldsError> {
        self.opt(name, |v| v.as_array().map(Vec::as_slice))
    }
}

/// Floats only; integers do not coerce.
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::F32(v) => Some(f64::from(*v)),
        Value::F64(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
#[path = "msgpack_tests.rs"]
mod tests;
