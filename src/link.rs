//! The per-link value object: identity, buffers, and both directions'
//! substates. `sender.rs`, `receiver.rs`, and `poll.rs` add the methods
//! that actually drive these fields; this module only owns the type, its
//! invariants, and construction.

use crate::config::LinkConfig;
use crate::error::ProtocolResult;
use crate::host::CanHost;

/// Sender-direction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// No send in progress.
    Idle,
    /// A multi-frame send is underway (First Frame sent, Consecutive Frames
    /// pending or being gated by flow control).
    InProgress,
    /// The in-progress send ended abnormally (overflow from peer, or Wait
    /// frame count exceeded); the host must inspect and start a new send.
    Error,
}

/// Receiver-direction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// No reassembly in progress; a completed message, if any, has already
    /// been taken via [`crate::Link::receive`].
    Idle,
    /// A multi-frame reassembly is underway.
    InProgress,
    /// A complete message is buffered and waiting for [`crate::Link::receive`].
    Full,
}

/// Remaining consecutive frames a sender may emit before the next flow
/// control frame is required. `Unlimited` is the sentinel for `BS == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockCount {
    Limited(u16),
    Unlimited,
}

impl BlockCount {
    pub(crate) fn is_open(self) -> bool {
        !matches!(self, BlockCount::Limited(0))
    }

    pub(crate) fn decrement(self) -> Self {
        match self {
            BlockCount::Limited(n) => BlockCount::Limited(n.saturating_sub(1)),
            BlockCount::Unlimited => BlockCount::Unlimited,
        }
    }
}

/// Returns whether `now` is at or after `deadline`, tolerating wrap-around
/// of the underlying 32-bit microsecond counter: `(i32)(now - deadline) >= 0`.
pub(crate) fn time_after(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// One logical ISO-TP endpoint pair: a sender state machine and a receiver
/// state machine sharing a pair of CAN arbitration IDs, each with its own
/// caller-owned staging buffer.
pub struct Link<'a, H: CanHost> {
    pub(crate) hw: &'a H,
    pub(crate) config: LinkConfig,

    pub(crate) send_arbitration_id: u32,
    pub(crate) receive_arbitration_id: u32,

    pub(crate) send_buffer: &'a mut [u8],
    pub(crate) receive_buffer: &'a mut [u8],

    pub(crate) send_status: SendStatus,
    pub(crate) send_size: u16,
    pub(crate) send_offset: u16,
    pub(crate) send_sn: u8,
    pub(crate) send_bs_remain: BlockCount,
    pub(crate) send_st_min_us: u32,
    pub(crate) send_wtf_count: u8,
    pub(crate) send_timer_st: u32,
    pub(crate) send_timer_bs: u32,
    pub(crate) send_protocol_result: ProtocolResult,

    pub(crate) receive_status: ReceiveStatus,
    pub(crate) receive_size: u16,
    pub(crate) receive_offset: u16,
    pub(crate) receive_sn: u8,
    pub(crate) receive_bs_count: u8,
    pub(crate) receive_timer_cr: u32,
    pub(crate) receive_protocol_result: ProtocolResult,
}

impl<'a, H: CanHost> Link<'a, H> {
    /// Construct a link with default tunables (see [`LinkConfig::default`]).
    ///
    /// Both buffers must be at least 8 bytes; this is a programmer-error
    /// contract, checked with a `debug_assert!` rather than a runtime error
    /// since a buffer too small to hold even a Single Frame is a
    /// construction-time mistake, not a protocol event.
    pub fn new(
        hw: &'a H,
        send_id: u32,
        send_buffer: &'a mut [u8],
        receive_buffer: &'a mut [u8],
    ) -> Self {
        Self::with_config(hw, send_id, send_buffer, receive_buffer, LinkConfig::default())
    }

    /// Construct a link with explicit tunables.
    pub fn with_config(
        hw: &'a H,
        send_id: u32,
        send_buffer: &'a mut [u8],
        receive_buffer: &'a mut [u8],
        config: LinkConfig,
    ) -> Self {
        debug_assert!(send_buffer.len() >= 8 && receive_buffer.len() >= 8);
        Link {
            hw,
            config,
            send_arbitration_id: send_id,
            receive_arbitration_id: 0,
            send_buffer,
            receive_buffer,
            send_status: SendStatus::Idle,
            send_size: 0,
            send_offset: 0,
            send_sn: 0,
            send_bs_remain: BlockCount::Limited(0),
            send_st_min_us: 0,
            send_wtf_count: 0,
            send_timer_st: 0,
            send_timer_bs: 0,
            send_protocol_result: ProtocolResult::Ok,
            receive_status: ReceiveStatus::Idle,
            receive_size: 0,
            receive_offset: 0,
            receive_sn: 0,
            receive_bs_count: 0,
            receive_timer_cr: 0,
            receive_protocol_result: ProtocolResult::Ok,
        }
    }
}
