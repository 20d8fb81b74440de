//! The sender state machine: single-frame send, first-frame + flow-control-
//! gated consecutive-frame cadence, wait-frame counting, and the Bs timeout.

use crate::codec::{self, FlowStatus, StMin};
use crate::error::{IsoTpError, ProtocolResult};
use crate::host::CanHost;
use crate::link::{time_after, BlockCount, Link, SendStatus};

impl<'a, H: CanHost> Link<'a, H> {
    /// Stage `payload` for transmission under `id`.
    ///
    /// Payloads of 7 bytes or fewer are sent immediately as a Single Frame
    /// and the sender stays `Idle`. Larger payloads emit a First Frame and
    /// move the sender to `InProgress`; the rest is sent by [`Link::poll`]
    /// once a flow-control frame arrives (via [`Link::on_frame`]).
    pub fn send(&mut self, id: u32, payload: &[u8]) -> Result<(), IsoTpError> {
        if payload.len() > self.send_buffer.len() {
            return Err(IsoTpError::Overflow);
        }
        if self.send_status == SendStatus::InProgress {
            let msg = "abort send: transmission already in progress";
            log::debug!("{msg}");
            self.hw.debug(msg);
            return Err(IsoTpError::InProgress);
        }

        let size = payload.len() as u16;
        self.send_buffer[..payload.len()].copy_from_slice(payload);
        self.send_size = size;
        self.send_offset = 0;
        self.send_arbitration_id = id;

        if size <= 7 {
            let frame = codec::encode_single(payload, self.config.padding, self.config.pad_byte);
            self.hw
                .send_can(id, frame.as_bytes())
                .map_err(|_| IsoTpError::HwNotReady)?;
            log::trace!("sent single frame, {size} bytes");
            self.hw.debug("sent single frame");
            return Ok(());
        }

        let frame = codec::encode_first(size, &self.send_buffer[..6]);
        self.hw
            .send_can(id, frame.as_bytes())
            .map_err(|_| IsoTpError::HwNotReady)?;
        log::trace!("sent first frame, {size} bytes announced");
        self.hw.debug("sent first frame");

        let now = self.hw.microseconds();
        self.send_offset = 6;
        self.send_sn = 1;
        self.send_bs_remain = BlockCount::Limited(0);
        self.send_st_min_us = 0;
        self.send_wtf_count = 0;
        self.send_timer_st = now;
        self.send_timer_bs = now.wrapping_add(self.config.response_timeout_us);
        self.send_protocol_result = ProtocolResult::Ok;
        self.send_status = SendStatus::InProgress;
        Ok(())
    }

    /// Handle an inbound Flow Control frame (dispatched from [`Link::on_frame`]).
    ///
    /// An FC received while no send is in progress is logged and ignored.
    pub(crate) fn on_flow_control(&mut self, status: FlowStatus, block_size: u8, st_min: StMin) {
        if self.send_status != SendStatus::InProgress {
            let msg = "flow control received with no send in progress, ignoring";
            log::debug!("{msg}");
            self.hw.debug(msg);
            return;
        }

        self.send_timer_bs = self
            .hw
            .microseconds()
            .wrapping_add(self.config.response_timeout_us);

        match status {
            FlowStatus::Overflow => {
                let msg = "peer signalled buffer overflow, aborting send";
                log::warn!("{msg}");
                self.hw.debug(msg);
                self.send_protocol_result = ProtocolResult::BufferOverflow;
                self.send_status = SendStatus::Error;
            }
            FlowStatus::Wait => {
                self.send_wtf_count += 1;
                if self.send_wtf_count > self.config.max_wft {
                    let msg = "peer sent too many wait frames, aborting send";
                    log::warn!("{msg}");
                    self.hw.debug(msg);
                    self.send_protocol_result = ProtocolResult::WftOverrun;
                    self.send_status = SendStatus::Error;
                }
            }
            FlowStatus::Continue => {
                self.send_bs_remain = if block_size == 0 {
                    BlockCount::Unlimited
                } else {
                    BlockCount::Limited(block_size as u16)
                };
                let requested_us = st_min.to_micros().unwrap_or_else(|| {
                    let msg = format!(
                        "reserved STmin byte {:#04x} from peer, treating as 0",
                        st_min.raw()
                    );
                    log::debug!("{msg}");
                    self.hw.debug(&msg);
                    0
                });
                let default_us = self.config.st_min_ms as u32 * 1000;
                self.send_st_min_us = requested_us.max(default_us);
                self.send_wtf_count = 0;
            }
            FlowStatus::Reserved(v) => {
                let msg = format!("reserved flow status {v} from peer, ignoring");
                log::debug!("{msg}");
                self.hw.debug(&msg);
            }
        }
    }

    /// Advance the sender: emit the next Consecutive Frame if the
    /// block-size/separation-time gate is open, and enforce the Bs timeout.
    pub(crate) fn poll_sender(&mut self) {
        if self.send_status != SendStatus::InProgress {
            return;
        }

        let now = self.hw.microseconds();
        let gate_open = self.send_bs_remain.is_open()
            && (self.send_st_min_us == 0 || time_after(now, self.send_timer_st));

        if gate_open {
            let remaining = self.send_size - self.send_offset;
            let n = remaining.min(7) as usize;
            let start = self.send_offset as usize;
            let frame = codec::encode_consecutive(
                self.send_sn,
                &self.send_buffer[start..start + n],
                self.config.padding,
                self.config.pad_byte,
            );
            match self.hw.send_can(self.send_arbitration_id, frame.as_bytes()) {
                Ok(()) => {
                    log::trace!("sent consecutive frame sn={}", self.send_sn);
                    self.hw.debug("sent consecutive frame");
                    self.send_offset += n as u16;
                    self.send_sn = (self.send_sn + 1) & 0x0F;
                    self.send_bs_remain = self.send_bs_remain.decrement();
                    self.send_timer_bs = now.wrapping_add(self.config.response_timeout_us);
                    self.send_timer_st = now.wrapping_add(self.send_st_min_us);
                    if self.send_offset >= self.send_size {
                        self.send_status = SendStatus::Idle;
                    }
                }
                Err(_) => {
                    let msg = "hardware send failed while sending consecutive frame";
                    log::warn!("{msg}");
                    self.hw.debug(msg);
                    self.send_protocol_result = ProtocolResult::Error;
                    self.send_status = SendStatus::Error;
                }
            }
        }

        if self.send_status == SendStatus::InProgress && time_after(now, self.send_timer_bs) {
            let msg = "timed out waiting for flow control";
            log::warn!("{msg}");
            self.hw.debug(msg);
            self.send_protocol_result = ProtocolResult::TimeoutBs;
            self.send_status = SendStatus::Idle;
        }
    }

    /// The sender's current status.
    pub fn send_status(&self) -> SendStatus {
        self.send_status
    }

    /// The diagnostic left behind by the last completed or aborted send.
    pub fn send_protocol_result(&self) -> ProtocolResult {
        self.send_protocol_result
    }
}
