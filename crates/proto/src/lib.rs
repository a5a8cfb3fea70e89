// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fil-proto: the MessagePack protocol front-end
//!
//! Turns byte streams into structured command messages: a framing layer
//! that decodes whole MessagePack objects out of dstream traffic, a field
//! lookup helper over decoded maps, a receive pump that follows a file's
//! updates, and the parser that validates command messages and resolves
//! their file references into live handles.

pub mod channel;
pub mod msgpack;
pub mod parse;
pub mod recv;

pub use channel::{ChannelDriver, CHANNEL_DRIVER_NAME};
pub use msgpack::{Fields, FieldsError, Framing, FramingConfig, FramingError};
pub use parse::{parse, Cmd, Iface, IfaceSet, Payload, ProtoError, ProtoMsg, HOLD_MAX};
pub use recv::Receiver;
