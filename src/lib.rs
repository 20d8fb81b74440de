//! # isotp-rs
//!
//! A segmentation-and-reassembly engine for ISO 15765-2 (ISO-TP): it carries
//! payloads of up to several kilobytes over a CAN bus whose native frame
//! carries at most eight payload bytes.
//!
//! The crate is organized the way the protocol itself is: a stateless
//! [`codec`] mapping bytes to PDUs, a [`link`] value object holding both
//! directions' substates, a sender and a receiver state machine implemented
//! as methods on [`Link`], and a `poll` entry point that advances pending
//! work on a timing cadence. The three capabilities a [`Link`] needs from
//! its environment — send one CAN frame, read a microsecond clock, emit a
//! debug message — are the [`host::CanHost`] trait, injected at
//! construction.
//!
//! ## Example
//! ```
//! use isotp_rs::{CanHost, Link};
//! use std::cell::RefCell;
//!
//! /// An in-process loopback bus, used here just to exercise the API.
//! struct LoopbackBus {
//!     queue: RefCell<Vec<Vec<u8>>>,
//! }
//!
//! impl CanHost for LoopbackBus {
//!     fn send_can(&self, _id: u32, data: &[u8]) -> Result<(), isotp_rs::HwNotReady> {
//!         self.queue.borrow_mut().push(data.to_vec());
//!         Ok(())
//!     }
//!     fn microseconds(&self) -> u32 {
//!         0
//!     }
//!     fn debug(&self, message: &str) {
//!         eprintln!("isotp: {message}");
//!     }
//! }
//!
//! let bus = LoopbackBus { queue: RefCell::new(Vec::new()) };
//! let mut send_buf = [0u8; 64];
//! let mut recv_buf = [0u8; 64];
//! let mut link = Link::new(&bus, 0x7E0, &mut send_buf, &mut recv_buf);
//!
//! link.send(0x7E0, b"hi").unwrap();
//! assert_eq!(bus.queue.borrow().len(), 1);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod host;
pub mod link;
mod poll;
mod receiver;
mod sender;

pub use config::LinkConfig;
pub use error::{IsoTpError, ProtocolResult};
pub use host::{CanHost, HwNotReady};
pub use link::{Link, ReceiveStatus, SendStatus};
