//! Integration tests exercising the concrete scenarios and quantified
//! invariants from the specification's testable-properties section, using
//! a shared in-memory `CanHost` test double.

use isotp_rs::{CanHost, HwNotReady, IsoTpError, Link, ProtocolResult, ReceiveStatus, SendStatus};
use std::cell::{Cell, RefCell};

/// A host with a controllable clock and a single outbound frame queue,
/// useful for driving one side of a link directly against hand-built bytes.
struct TestHost {
    clock_us: Cell<u32>,
    sent: RefCell<Vec<(u32, Vec<u8>)>>,
    fail_next_send: Cell<bool>,
}

impl TestHost {
    fn new() -> Self {
        TestHost {
            clock_us: Cell::new(0),
            sent: RefCell::new(Vec::new()),
            fail_next_send: Cell::new(false),
        }
    }

    fn advance(&self, us: u32) {
        self.clock_us.set(self.clock_us.get().wrapping_add(us));
    }

    fn take_sent(&self) -> Vec<(u32, Vec<u8>)> {
        std::mem::take(&mut self.sent.borrow_mut())
    }
}

impl CanHost for TestHost {
    fn send_can(&self, id: u32, data: &[u8]) -> Result<(), HwNotReady> {
        if self.fail_next_send.replace(false) {
            return Err(HwNotReady);
        }
        self.sent.borrow_mut().push((id, data.to_vec()));
        Ok(())
    }
    fn microseconds(&self) -> u32 {
        self.clock_us.get()
    }
    fn debug(&self, message: &str) {
        eprintln!("isotp: {message}");
    }
}

#[test]
fn sf_receive() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.on_frame(&[0x05, 0x0A, 0x05, 0x04, 0x03, 0x05, 0x0A, 0x00])
        .unwrap();
    assert_eq!(link.receive_status(), ReceiveStatus::Full);

    let mut out = [0u8; 7];
    let n = link.receive(&mut out).unwrap();
    assert_eq!(&out[..n], &[0x0A, 0x05, 0x04, 0x03, 0x05]);
}

#[test]
fn sf_too_short_is_a_length_error_and_leaves_receiver_idle() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    let err = link.on_frame(&[0x07]).unwrap_err();
    assert_eq!(err, IsoTpError::Length);
    assert_eq!(link.receive_status(), ReceiveStatus::Idle);
}

#[test]
fn multi_frame_receive() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.on_frame(&[0x10, 0x0A, 0x0A, 0x05, 0x04, 0x03, 0x0A, 0x05])
        .unwrap();
    assert_eq!(link.receive_status(), ReceiveStatus::InProgress);
    let fc_sent = host.take_sent();
    assert_eq!(fc_sent.len(), 1);
    assert_eq!(fc_sent[0].1[0] >> 4, 0x3); // flow control PCI type

    link.on_frame(&[0x21, 0x0A, 0x0A, 0x05, 0x04]).unwrap();
    assert_eq!(link.receive_status(), ReceiveStatus::Full);

    let mut out = [0u8; 16];
    let n = link.receive(&mut out).unwrap();
    assert_eq!(
        &out[..n],
        &[0x0A, 0x05, 0x04, 0x03, 0x0A, 0x05, 0x0A, 0x0A, 0x05, 0x04]
    );
}

#[test]
fn multi_frame_send() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    let payload = [0x0A, 0x05, 0x04, 0x03, 0x0A, 0x05, 0x01, 0x08, 0x0F, 0x0A];
    link.send(0x7E0, &payload).unwrap();
    assert_eq!(link.send_status(), SendStatus::InProgress);
    let ff_sent = host.take_sent();
    assert_eq!(ff_sent.len(), 1);
    assert_eq!(ff_sent[0].1, [0x10, 0x0A, 0x0A, 0x05, 0x04, 0x03, 0x0A, 0x05]);

    link.on_frame(&[0x30, 0x03, 0x0A]).unwrap();
    link.poll();

    assert_eq!(link.send_status(), SendStatus::Idle);
    let cf_sent = host.take_sent();
    assert_eq!(cf_sent.len(), 1);
    assert_eq!(cf_sent[0].1[0] & 0x0F, 1); // first consecutive frame has SN=1
    assert_eq!(&cf_sent[0].1[1..5], &[0x01, 0x08, 0x0F, 0x0A]);
}

#[test]
fn send_timeout_without_flow_control() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.send(0x7E0, &[0u8; 10]).unwrap();
    assert_eq!(link.send_status(), SendStatus::InProgress);

    host.advance(isotp_rs::config::DEFAULT_RESPONSE_TIMEOUT_US + 1);
    link.poll();

    assert_eq!(link.send_status(), SendStatus::Idle);
    assert_eq!(link.send_protocol_result(), ProtocolResult::TimeoutBs);
}

#[test]
fn receive_overflow_on_extract_discards_and_returns_to_idle() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.on_frame(&[0x07, 1, 2, 3, 4, 5, 6, 7]).unwrap();
    assert_eq!(link.receive_status(), ReceiveStatus::Full);

    let mut small = [0u8; 5];
    let err = link.receive(&mut small).unwrap_err();
    assert_eq!(err, IsoTpError::Overflow);
    assert_eq!(link.receive_status(), ReceiveStatus::Idle);
}

#[test]
fn sequence_number_enforcement() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 32];
    let mut recv_buf = [0u8; 32];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.on_frame(&[0x10, 0x0A, 1, 2, 3, 4, 5, 6]).unwrap();
    host.take_sent();
    assert_eq!(link.receive_status(), ReceiveStatus::InProgress);

    // SN should be 1, feed 2 instead.
    let err = link.on_frame(&[0x22, 7, 8, 9, 10]).unwrap_err();
    assert_eq!(err, IsoTpError::WrongSn);
    assert_eq!(link.receive_status(), ReceiveStatus::Idle);
    assert_eq!(link.receive_protocol_result(), ProtocolResult::WrongSn);
}

#[test]
fn receive_cr_timeout_discards_partial_reassembly() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.on_frame(&[0x10, 0x0A, 1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(link.receive_status(), ReceiveStatus::InProgress);

    host.advance(isotp_rs::config::DEFAULT_RESPONSE_TIMEOUT_US + 1);
    link.poll();

    assert_eq!(link.receive_status(), ReceiveStatus::Idle);
    assert_eq!(link.receive_protocol_result(), ProtocolResult::TimeoutCr);
}

#[test]
fn poll_on_idle_link_is_a_no_op() {
    let host = TestHost::new();
    let mut send_buf = [0u8; 16];
    let mut recv_buf = [0u8; 16];
    let mut link = Link::new(&host, 0x7E0, &mut send_buf, &mut recv_buf);

    link.poll();
    assert!(host.take_sent().is_empty());
    assert_eq!(link.send_status(), SendStatus::Idle);
    assert_eq!(link.receive_status(), ReceiveStatus::Idle);
}

#[test]
fn round_trip_through_two_linked_hosts() {
    struct Bus {
        clock: Cell<u32>,
        a_to_b: RefCell<Vec<Vec<u8>>>,
        b_to_a: RefCell<Vec<Vec<u8>>>,
    }
    struct SideA<'a>(&'a Bus);
    struct SideB<'a>(&'a Bus);

    impl CanHost for SideA<'_> {
        fn send_can(&self, _id: u32, data: &[u8]) -> Result<(), HwNotReady> {
            self.0.a_to_b.borrow_mut().push(data.to_vec());
            Ok(())
        }
        fn microseconds(&self) -> u32 {
            self.0.clock.get()
        }
        fn debug(&self, _message: &str) {}
    }
    impl CanHost for SideB<'_> {
        fn send_can(&self, _id: u32, data: &[u8]) -> Result<(), HwNotReady> {
            self.0.b_to_a.borrow_mut().push(data.to_vec());
            Ok(())
        }
        fn microseconds(&self) -> u32 {
            self.0.clock.get()
        }
        fn debug(&self, _message: &str) {}
    }

    let bus = Bus {
        clock: Cell::new(0),
        a_to_b: RefCell::new(Vec::new()),
        b_to_a: RefCell::new(Vec::new()),
    };
    let host_a = SideA(&bus);
    let host_b = SideB(&bus);

    let mut a_send = [0u8; 512];
    let mut a_recv = [0u8; 512];
    let mut a = Link::new(&host_a, 0x700, &mut a_send, &mut a_recv);

    let mut b_send = [0u8; 512];
    let mut b_recv = [0u8; 512];
    let mut b = Link::new(&host_b, 0x701, &mut b_send, &mut b_recv);

    let payload: Vec<u8> = (0u16..300).map(|i| (i % 256) as u8).collect();
    a.send(0x700, &payload).unwrap();

    for _ in 0..200 {
        bus.clock.set(bus.clock.get() + 50);
        for f in std::mem::take(&mut *bus.a_to_b.borrow_mut()) {
            b.on_frame(&f).ok();
        }
        for f in std::mem::take(&mut *bus.b_to_a.borrow_mut()) {
            a.on_frame(&f).ok();
        }
        a.poll();
        b.poll();
        if b.receive_status() == ReceiveStatus::Full {
            break;
        }
    }

    let mut out = vec![0u8; 512];
    let n = b.receive(&mut out).unwrap();
    assert_eq!(&out[..n], payload.as_slice());
}
