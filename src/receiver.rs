//! The receiver state machine: Single Frame acceptance, First Frame
//! reassembly start + flow-control emission, Consecutive Frame reassembly
//! with sequence-number checking, and the Cr timeout.

use crate::codec::{self, FlowStatus, Pdu, StMin};
use crate::error::{IsoTpError, ProtocolResult};
use crate::host::CanHost;
use crate::link::{time_after, Link, ReceiveStatus};

impl<'a, H: CanHost> Link<'a, H> {
    /// Feed one inbound CAN frame (arbitration ID already filtered by the
    /// host; the core does not itself match on `receive_arbitration_id`).
    ///
    /// `receive_protocol_result` is reset to [`ProtocolResult::Error`] at
    /// the top of every call and only overwritten on the Single Frame,
    /// First Frame, and Consecutive Frame paths; a Flow Control frame (or
    /// an unrecognized/malformed PDU) leaves it at `Error`. This is
    /// intentional (see DESIGN.md) rather than an oversight.
    pub fn on_frame(&mut self, bytes: &[u8]) -> Result<(), IsoTpError> {
        self.receive_protocol_result = ProtocolResult::Error;
        let pdu = codec::decode(bytes).inspect_err(|_| {
            let msg = "frame length not valid for any PCI type";
            log::debug!("{msg}");
            self.hw.debug(msg);
        })?;

        match pdu {
            Pdu::Single { data } => self.on_single_frame(data),
            Pdu::First { ff_dl, data } => self.on_first_frame(ff_dl, data),
            Pdu::Consecutive { sn, data } => self.on_consecutive_frame(sn, data),
            Pdu::FlowControl {
                status,
                block_size,
                st_min,
            } => {
                self.on_flow_control(status, block_size, st_min);
                Ok(())
            }
        }
    }

    fn on_single_frame(&mut self, data: &[u8]) -> Result<(), IsoTpError> {
        if self.receive_status == ReceiveStatus::InProgress {
            let msg = "unexpected single frame while reassembly is in progress";
            log::debug!("{msg}");
            self.hw.debug(msg);
            self.receive_protocol_result = ProtocolResult::UnexpectedPdu;
            return Err(IsoTpError::Error);
        }
        self.receive_protocol_result = ProtocolResult::Ok;

        self.receive_buffer[..data.len()].copy_from_slice(data);
        self.receive_size = data.len() as u16;
        self.receive_offset = self.receive_size;
        self.receive_status = ReceiveStatus::Full;
        log::trace!("received single frame, {} bytes", data.len());
        self.hw.debug("received single frame");
        Ok(())
    }

    fn on_first_frame(&mut self, ff_dl: u16, data: &[u8; 6]) -> Result<(), IsoTpError> {
        if self.receive_status == ReceiveStatus::InProgress {
            let msg = "unexpected first frame while reassembly is in progress";
            log::debug!("{msg}");
            self.hw.debug(msg);
            self.receive_protocol_result = ProtocolResult::UnexpectedPdu;
            return Err(IsoTpError::Error);
        }
        self.receive_protocol_result = ProtocolResult::Ok;

        if ff_dl as usize > self.receive_buffer.len() {
            let msg = format!("first frame announces {ff_dl} bytes, too large for receive buffer");
            log::warn!("{msg}");
            self.hw.debug(&msg);
            self.receive_protocol_result = ProtocolResult::BufferOverflow;
            let frame = codec::encode_flow_control(
                FlowStatus::Overflow,
                0,
                StMin::from_raw(0),
                self.config.padding,
                self.config.pad_byte,
            );
            return self
                .hw
                .send_can(self.send_arbitration_id, frame.as_bytes())
                .map_err(|_| IsoTpError::HwNotReady);
        }

        self.receive_buffer[..6].copy_from_slice(data);
        self.receive_size = ff_dl;
        self.receive_offset = 6;
        self.receive_sn = 1;
        self.receive_bs_count = self.config.block_size;
        self.receive_status = ReceiveStatus::InProgress;
        log::trace!("received first frame, {ff_dl} bytes announced");
        self.hw.debug("received first frame");

        let frame = codec::encode_flow_control(
            FlowStatus::Continue,
            self.config.block_size,
            StMin::from_raw(self.config.st_min_ms),
            self.config.padding,
            self.config.pad_byte,
        );
        self.receive_timer_cr = self
            .hw
            .microseconds()
            .wrapping_add(self.config.response_timeout_us);
        self.hw
            .send_can(self.send_arbitration_id, frame.as_bytes())
            .map_err(|_| IsoTpError::HwNotReady)?;
        log::trace!("sent flow control (continue)");
        self.hw.debug("sent flow control (continue)");
        Ok(())
    }

    fn on_consecutive_frame(&mut self, sn: u8, data: &[u8]) -> Result<(), IsoTpError> {
        if self.receive_status != ReceiveStatus::InProgress {
            let msg = "unexpected consecutive frame, no reassembly in progress";
            log::debug!("{msg}");
            self.hw.debug(msg);
            self.receive_protocol_result = ProtocolResult::UnexpectedPdu;
            return Err(IsoTpError::Error);
        }
        self.receive_protocol_result = ProtocolResult::Ok;

        if sn != self.receive_sn {
            let msg = format!("wrong sequence number: expected {}, got {sn}", self.receive_sn);
            log::warn!("{msg}");
            self.hw.debug(&msg);
            self.receive_protocol_result = ProtocolResult::WrongSn;
            self.receive_status = ReceiveStatus::Idle;
            return Err(IsoTpError::WrongSn);
        }

        let remaining = (self.receive_size - self.receive_offset) as usize;
        let n = remaining.min(data.len());
        let start = self.receive_offset as usize;
        self.receive_buffer[start..start + n].copy_from_slice(&data[..n]);
        self.receive_offset += n as u16;
        self.receive_sn = (self.receive_sn + 1) & 0x0F;
        self.receive_timer_cr = self
            .hw
            .microseconds()
            .wrapping_add(self.config.response_timeout_us);
        log::trace!("received consecutive frame sn={sn}");
        self.hw.debug("received consecutive frame");

        if self.receive_offset >= self.receive_size {
            self.receive_status = ReceiveStatus::Full;
            return Ok(());
        }

        self.receive_bs_count = self.receive_bs_count.saturating_sub(1);
        if self.receive_bs_count == 0 {
            self.receive_bs_count = self.config.block_size;
            let frame = codec::encode_flow_control(
                FlowStatus::Continue,
                self.config.block_size,
                StMin::from_raw(self.config.st_min_ms),
                self.config.padding,
                self.config.pad_byte,
            );
            self.hw
                .send_can(self.send_arbitration_id, frame.as_bytes())
                .map_err(|_| IsoTpError::HwNotReady)?;
            log::trace!("sent flow control (continue)");
            self.hw.debug("sent flow control (continue)");
        }
        Ok(())
    }

    /// Enforce the Cr timeout: no Consecutive Frame within the response
    /// timeout discards the partial reassembly.
    pub(crate) fn poll_receiver(&mut self) {
        if self.receive_status == ReceiveStatus::InProgress {
            let now = self.hw.microseconds();
            if time_after(now, self.receive_timer_cr) {
                let msg = "timed out waiting for consecutive frame";
                log::warn!("{msg}");
                self.hw.debug(msg);
                self.receive_protocol_result = ProtocolResult::TimeoutCr;
                self.receive_status = ReceiveStatus::Idle;
            }
        }
    }

    /// Take the completed message, if any, into `out`.
    ///
    /// Regardless of outcome, a completed message's slot is freed and the
    /// receiver returns to `Idle`: a message too large for
    /// `out` is dropped, not left buffered for a retry with a bigger
    /// buffer.
    pub fn receive(&mut self, out: &mut [u8]) -> Result<usize, IsoTpError> {
        if self.receive_status != ReceiveStatus::Full {
            return Err(IsoTpError::NoData);
        }

        let size = self.receive_size as usize;
        self.receive_status = ReceiveStatus::Idle;
        self.receive_size = 0;
        self.receive_offset = 0;

        if size > out.len() {
            return Err(IsoTpError::Overflow);
        }
        out[..size].copy_from_slice(&self.receive_buffer[..size]);
        Ok(size)
    }

    /// The receiver's current status.
    pub fn receive_status(&self) -> ReceiveStatus {
        self.receive_status
    }

    /// The diagnostic left behind by the last completed or aborted receive.
    pub fn receive_protocol_result(&self) -> ProtocolResult {
        self.receive_protocol_result
    }

    /// Set (or learn) the arbitration ID this link accepts inbound frames
    /// on. The core itself never filters on this; it is informational for
    /// hosts that want to ask the link rather than track it separately.
    pub fn set_receive_arbitration_id(&mut self, id: u32) {
        self.receive_arbitration_id = id;
    }

    /// The arbitration ID this link accepts inbound frames on.
    pub fn receive_arbitration_id(&self) -> u32 {
        self.receive_arbitration_id
    }
}
