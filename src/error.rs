//! The two error planes described by the protocol: synchronous call
//! results (`IsoTpError`) and the per-direction diagnostic left behind on
//! the link after an abnormal end to a transfer (`ProtocolResult`).

use thiserror::Error;

/// Outcome of a synchronous API call (`send`, `on_frame`, `receive`).
///
/// This is the return-code plane from the protocol: it tells the caller
/// whether *their* call was accepted, not why a past transfer failed (that
/// is [`ProtocolResult`], read off the link separately).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IsoTpError {
    /// Generic failure with no more specific code.
    #[error("isotp error")]
    Error,
    /// A send was attempted while another send is already in progress.
    #[error("send already in progress")]
    InProgress,
    /// The payload does not fit the relevant buffer.
    #[error("buffer overflow")]
    Overflow,
    /// A consecutive frame arrived with an unexpected sequence number.
    #[error("wrong sequence number")]
    WrongSn,
    /// An inbound frame had an invalid length for its PCI type.
    #[error("invalid frame length")]
    Length,
    /// `receive` was called with no completed message waiting.
    #[error("no data available")]
    NoData,
    /// The host's CAN-send primitive reported failure.
    #[error("hardware not ready")]
    HwNotReady,
}

/// Diagnostic recorded on a [`crate::Link`] explaining why the last transfer
/// in one direction ended abnormally.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolResult {
    /// The direction completed (or has not yet failed) normally.
    #[error("ok")]
    Ok,
    /// No flow-control frame arrived before the Bs timeout during a send.
    #[error("timeout waiting for flow control (Bs)")]
    TimeoutBs,
    /// No consecutive frame arrived before the Cr timeout during a receive.
    #[error("timeout waiting for consecutive frame (Cr)")]
    TimeoutCr,
    /// A consecutive frame carried a sequence number other than expected.
    #[error("wrong sequence number")]
    WrongSn,
    /// A PDU arrived that is incompatible with the direction's current state.
    #[error("unexpected PDU for current state")]
    UnexpectedPdu,
    /// A First Frame announced a size exceeding the receive buffer, or the
    /// peer signalled overflow in a flow-control frame.
    #[error("buffer overflow")]
    BufferOverflow,
    /// The peer sent more Wait flow-control frames than permitted.
    #[error("wait-frame count exceeded")]
    WftOverrun,
    /// Generic protocol error (e.g. malformed inbound frame).
    #[error("protocol error")]
    Error,
}
