//! Construction-time tunables for a [`crate::Link`].
//!
//! Mirrors the `ISO_TP_DEFAULT_*` / `ISO_TP_MAX_WFT_NUMBER` macros of the
//! reference C implementation: nothing here is read from a config file, it
//! is all baked in at `Link::new` / `Link::with_config` time.

/// Default number of consecutive frames a receiver accepts before demanding
/// a fresh flow-control frame (the `BS` field of an FC).
pub const DEFAULT_BLOCK_SIZE: u8 = 8;

/// Default minimum separation time requested between consecutive frames, in
/// milliseconds (encoded into the wire `STmin` byte by [`crate::codec::StMin`]
/// via [`crate::codec::StMin::from_micros`]).
pub const DEFAULT_ST_MIN_MS: u8 = 0;

/// Response timeout, in microseconds, shared by both directions: the sender
/// waits this long for a flow-control frame (`N_Bs`), the receiver waits this
/// long for the next consecutive frame (`N_Cr`).
pub const DEFAULT_RESPONSE_TIMEOUT_US: u32 = 1_000_000;

/// Maximum number of consecutive Wait flow-control frames a sender tolerates
/// before giving up with [`crate::error::ProtocolResult::WftOverrun`].
pub const MAX_WFT_NUMBER: u8 = 16;

/// Byte used to pad frames up to 8 bytes when [`LinkConfig::padding`] is set.
pub const DEFAULT_PAD_BYTE: u8 = 0x00;

/// Construction-time configuration for a [`crate::Link`].
///
/// All fields have defaults matching the reference implementation; callers
/// typically start from [`LinkConfig::default`] and override only what they
/// need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Block size advertised in this link's own flow-control frames.
    pub block_size: u8,
    /// Minimum separation time (ms-domain) advertised in this link's own
    /// flow-control frames.
    pub st_min_ms: u8,
    /// Shared response timeout for Bs (sender awaiting FC) and Cr (receiver
    /// awaiting CF), in microseconds.
    pub response_timeout_us: u32,
    /// Maximum tolerated count of Wait flow-control frames during one send.
    pub max_wft: u8,
    /// Whether outbound frames are padded to 8 bytes.
    pub padding: bool,
    /// Pad byte used when `padding` is enabled.
    pub pad_byte: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            st_min_ms: DEFAULT_ST_MIN_MS,
            response_timeout_us: DEFAULT_RESPONSE_TIMEOUT_US,
            max_wft: MAX_WFT_NUMBER,
            padding: false,
            pad_byte: DEFAULT_PAD_BYTE,
        }
    }
}
