//! MeshCore Companion Protocol
//!
//! Synchronous core of a client for MeshCore companion radios. The device
//! speaks a length-framed binary protocol over BLE, serial or TCP; this crate
//! turns the raw byte stream into typed events and typed commands into bytes.
//! It performs no I/O.
//!
//! # Protocol Overview
//!
//! Messages are either:
//!
//! - **Commands** (host → firmware): Start with a `CMD_*` byte
//! - **Responses** (firmware → host): Start with a `RESP_CODE_*` byte
//! - **Push notifications** (firmware → host): Start with a `PUSH_CODE_*` byte (0x80+)
//!
//! # Example
//!
//! ```rust
//! use meshcore_companion_protocol::{encode_frame, Command, EventPayload, FrameReassembler, PacketReader};
//!
//! // Build a command
//! let frame = encode_frame(&Command::GetBattery.encode());
//! assert_eq!(frame, vec![b'<', 1, 0, 0x14]);
//!
//! // Decode what the device sends back
//! let mut reassembler = FrameReassembler::new();
//! let mut reader = PacketReader::new();
//! for payload in reassembler.push(&[b'>', 3, 0, 12, 0x10, 0x0e]) {
//!     let event = reader.decode(&payload).unwrap();
//!     assert_eq!(event.payload, EventPayload::Battery(3600));
//! }
//! ```

mod commands;
mod constants;
mod destination;
mod error;
mod events;
mod frame;
mod reader;
mod types;

pub use commands::*;
pub use constants::*;
pub use destination::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use reader::*;
pub use types::*;
