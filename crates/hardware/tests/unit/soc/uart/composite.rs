//! Multi-channel package tests.
//!
//! Address-bit channel select, 3-bit local offset passthrough, child tags,
//! and the independence of sibling channels.

use pretty_assertions::assert_eq;

use crate::common::harness;
use z280sim_core::soc::traits::IoDevice;
use z280sim_core::{DualUart, QuadUart, UartType};

fn dual() -> (
    DualUart,
    std::rc::Rc<std::cell::RefCell<harness::TestHost>>,
) {
    let host = harness::host();
    let duart = DualUart::new(
        "duart",
        harness::TEST_CLOCK,
        UartType::Ns16550A,
        host.clone(),
        false,
    );
    (duart, host)
}

fn quad() -> (
    QuadUart,
    std::rc::Rc<std::cell::RefCell<harness::TestHost>>,
) {
    let host = harness::host();
    let quart = QuadUart::new(
        "quart",
        harness::TEST_CLOCK,
        UartType::Ns16550A,
        host.clone(),
        false,
    );
    (quart, host)
}

// ══════════════════════════════════════════════════════════
// Address Decode
// ══════════════════════════════════════════════════════════

#[test]
fn dual_selects_on_bit_three() {
    let (mut duart, _host) = dual();

    duart.write(3, 0x03); // channel 0 line control
    duart.write(8 + 3, 0x1B); // channel 1 line control

    assert_eq!(duart.read(3), 0x03);
    assert_eq!(duart.read(8 + 3), 0x1B);
}

#[test]
fn dual_scratch_registers_are_distinct() {
    let (mut duart, _host) = dual();
    duart.write(7, 0x11);
    duart.write(15, 0x22);
    assert_eq!(duart.read(7), 0x11);
    assert_eq!(duart.read(15), 0x22);
}

#[test]
fn quad_selects_on_bits_three_and_four() {
    let (mut quart, _host) = quad();

    for (channel, value) in [(0u16, 0xA0u8), (1, 0xA1), (2, 0xA2), (3, 0xA3)] {
        quart.write(channel * 8 + 7, value);
    }
    for (channel, value) in [(0u16, 0xA0u8), (1, 0xA1), (2, 0xA2), (3, 0xA3)] {
        assert_eq!(quart.read(channel * 8 + 7), value, "channel {channel}");
    }
}

// ══════════════════════════════════════════════════════════
// Channel Independence
// ══════════════════════════════════════════════════════════

#[test]
fn divisor_programming_is_per_channel() {
    let (mut duart, _host) = dual();

    duart.write(3, 0x80);
    duart.write(0, 0x0C);
    duart.write(1, 0x00);

    // channel 1 never saw a divisor write
    duart.write(8 + 3, 0x80);
    assert_eq!(duart.read(8), 0x01);
    assert_eq!(duart.read(0), 0x0C);
}

#[test]
fn children_report_suffixed_tags() {
    let (mut duart, host) = dual();

    duart.write(8 + 1, 0x02); // idle transmitter: raises at once

    assert_eq!(host.borrow().raise_count("duart.1"), 1);
    assert_eq!(host.borrow().raise_count("duart.0"), 0);
    assert!(host.borrow().line("duart.1"));
    assert!(!host.borrow().line("duart.0"));
}

#[test]
fn transmit_carries_the_subchannel_ordinal() {
    let (mut duart, host) = dual();

    duart.write(8 + 3, 0x03);
    duart.write(8, 0x41);
    for _ in 0..10 {
        duart.tick();
    }

    assert_eq!(host.borrow().transmitted, vec![(1, 0x41)]);
}

#[test]
fn quad_transmit_on_the_last_channel() {
    let (mut quart, host) = quad();

    quart.write(24 + 3, 0x03);
    quart.write(24, 0x5A);
    for _ in 0..10 {
        quart.tick();
    }

    assert_eq!(host.borrow().transmitted, vec![(3, 0x5A)]);
    assert_eq!(quart.channel(3).tag(), "quart.3");
}

// ══════════════════════════════════════════════════════════
// Package Reset
// ══════════════════════════════════════════════════════════

#[test]
fn reset_restores_every_child() {
    let (mut duart, _host) = dual();

    duart.write(3, 0x80);
    duart.write(0, 0x0C);
    duart.write(8 + 3, 0x80);
    duart.write(8, 0x30);

    duart.reset();

    for base in [0u16, 8] {
        assert_eq!(duart.read(base + 5), 0x60, "channel at base {base}");
        duart.write(base + 3, 0x80);
        assert_eq!(duart.read(base), 0x01);
    }
}
