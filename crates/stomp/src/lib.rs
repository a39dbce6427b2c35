//! STOMP 1.2 frame model and text codec.
//!
//! This crate is transport-agnostic: it only turns [`Frame`] values into wire text and back.
//! Socket handling lives with the caller.
//! * [`Command`]: closed set of client and server frame commands
//! * [`Frame`]: command, ordered headers, and body, with builders for the frames a client sends
//! * [`encode`] / [`decode`]: the text codec, including header escaping and heartbeats

#![warn(missing_docs)]

mod codec;
mod command;
mod error;
mod frame;

pub use codec::{decode, encode};
pub use command::Command;
pub use error::{Error, Result};
pub use frame::{Frame, header};
