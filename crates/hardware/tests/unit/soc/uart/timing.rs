//! Baud-rate and timeout timing tests.
//!
//! Character-granular transmit timing, divisor reprogramming, the receive
//! character timeout, and the clock prescaler of the richest part.

use pretty_assertions::assert_eq;

use crate::common::harness;
use z280sim_core::UartType;

// ══════════════════════════════════════════════════════════
// Transmit Timing
// ══════════════════════════════════════════════════════════

#[test]
fn eight_n_one_frame_takes_ten_bit_times() {
    harness::init_tracing();
    let (mut uart, host) = harness::uart(UartType::Ins8250);

    uart.write(3, 0x03); // 8N1: start + eight data + stop
    uart.write(0, 0x41);

    harness::tick_n(&mut uart, 9);
    assert!(host.borrow().transmitted.is_empty());

    uart.tick();
    assert_eq!(host.borrow().transmitted, vec![(0, 0x41)]);
    // both transmitter-empty flags once nothing else is queued
    assert_eq!(uart.read(5) & 0x60, 0x60);
}

#[test]
fn transmit_fires_exactly_once() {
    let (mut uart, host) = harness::uart(UartType::Ns16450);

    uart.write(3, 0x03);
    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 50);

    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
}

#[test]
fn frame_length_follows_line_control() {
    // 7 data bits, even parity, one stop: 1 + 7 + 1 + 1 = 10 bit times;
    // 5 data bits, long stop: 1 + 5 + 2 = 8 bit times
    for (lcr, bits) in [(0x1A, 10), (0x04, 8)] {
        let (mut uart, host) = harness::uart(UartType::Ns16450);
        uart.write(3, lcr);
        uart.write(0, 0x55);
        harness::tick_n(&mut uart, bits - 1);
        assert!(host.borrow().transmitted.is_empty(), "lcr {lcr:#04x}");
        uart.tick();
        assert_eq!(host.borrow().tx_bytes(), vec![0x55], "lcr {lcr:#04x}");
    }
}

#[test]
fn divisor_scales_the_bit_time() {
    let (mut uart, host) = harness::uart(UartType::Ns16450);

    uart.write(3, 0x80);
    uart.write(0, 0x04); // divisor 4
    uart.write(1, 0x00);
    uart.write(3, 0x03);

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 39);
    assert!(host.borrow().transmitted.is_empty());
    uart.tick();
    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
}

#[test]
fn back_to_back_bytes() {
    let (mut uart, host) = harness::uart(UartType::Ns16450);
    uart.write(3, 0x03);

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 10);
    uart.write(0, 0x42);
    harness::tick_n(&mut uart, 10);

    assert_eq!(host.borrow().tx_bytes(), vec![0x41, 0x42]);
}

// ══════════════════════════════════════════════════════════
// Divisor Reprogramming
// ══════════════════════════════════════════════════════════

#[test]
fn divisor_write_flushes_a_byte_in_flight() {
    let (mut uart, host) = harness::uart(UartType::Ns16450);
    uart.write(3, 0x03);

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 3); // mid-character
    assert!(host.borrow().transmitted.is_empty());

    uart.write(3, 0x83);
    uart.write(0, 0x08); // the generator restart completes the character

    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
    uart.write(3, 0x03);
    assert_eq!(uart.read(5) & 0x60, 0x60);
}

#[test]
fn zero_divisor_is_degenerate_but_defined() {
    let (mut uart, host) = harness::uart(UartType::Ns16450);
    uart.write(3, 0x83);
    uart.write(0, 0x00);
    uart.write(1, 0x00);
    uart.write(3, 0x03);

    uart.write(0, 0x41);
    // the wrapped countdown makes a bit time 65536 ticks; nothing moves in
    // any plausible window
    harness::tick_n(&mut uart, 60_000);
    assert!(host.borrow().transmitted.is_empty());
}

// ══════════════════════════════════════════════════════════
// Receive Character Timeout
// ══════════════════════════════════════════════════════════

/// Ticks of receive silence before the timeout: four 8N1 character times on
/// the test clock (4 * 10 * 16 / 16).
const TIMEOUT_TICKS: usize = 40;

#[test]
fn character_timeout_raises_received_data_once() {
    let (mut uart, host) = harness::uart(UartType::Ns16550A);
    uart.write(3, 0x03);
    uart.write(2, 0x81); // FIFOs on, trigger level 8
    uart.write(1, 0x01);

    host.borrow_mut().rx_script.push_back(0x77);
    harness::tick_n(&mut uart, 11); // byte accepted, far below the trigger
    assert!(!host.borrow().line("uart0"));

    harness::tick_n(&mut uart, TIMEOUT_TICKS);
    assert!(host.borrow().line("uart0"));
    // identified as the timeout form of received-data-available
    assert_eq!(uart.read(2), 0xCC);
    assert_eq!(host.borrow().raise_count("uart0"), 1);

    // parked after firing: no retrigger however long the silence
    harness::tick_n(&mut uart, TIMEOUT_TICKS * 3);
    assert_eq!(host.borrow().raise_count("uart0"), 1);
}

#[test]
fn reading_the_buffer_clears_the_timeout_condition() {
    let (mut uart, host) = harness::uart(UartType::Ns16550A);
    uart.write(3, 0x03);
    uart.write(2, 0x81);
    uart.write(1, 0x01);

    host.borrow_mut().rx_script.push_back(0x77);
    harness::tick_n(&mut uart, 11 + TIMEOUT_TICKS);
    assert!(host.borrow().line("uart0"));

    assert_eq!(uart.read(0), 0x77);
    assert!(!host.borrow().line("uart0"));
    assert_eq!(uart.read(2), 0xC1);
}

#[test]
fn received_byte_rearms_the_timeout() {
    let (mut uart, host) = harness::uart(UartType::Ns16550A);
    uart.write(3, 0x03);
    uart.write(2, 0x81);
    uart.write(1, 0x01);

    host.borrow_mut().rx_script.push_back(0x01);
    harness::tick_n(&mut uart, 11);
    harness::tick_n(&mut uart, 20); // part of the silence window

    host.borrow_mut().rx_script.push_back(0x02);
    harness::tick_n(&mut uart, 11); // second byte re-arms the countdown
    assert!(!host.borrow().line("uart0"));

    harness::tick_n(&mut uart, TIMEOUT_TICKS - 2);
    assert!(!host.borrow().line("uart0"));
    uart.tick();
    assert!(host.borrow().line("uart0"));
}

// ══════════════════════════════════════════════════════════
// Prescaler and Service Gates (950 class)
// ══════════════════════════════════════════════════════════

#[test]
fn prescaler_stretches_the_bit_time() {
    // clock-select low seeds the prescale bit; the default prescaler of
    // 0x20 divides by 8 into a factor of four
    let (mut uart, host) = harness::uart_with_clksel(UartType::Ox16950, false);
    uart.write(3, 0x03);

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 39);
    assert!(host.borrow().transmitted.is_empty());
    uart.tick();
    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
}

#[test]
fn prescaler_register_rescales_on_write() {
    let (mut uart, host) = harness::uart_with_clksel(UartType::Ox16950, false);
    uart.write(3, 0x03);
    uart.write(7, 0x01); // prescaler index
    uart.write(5, 0x10); // divide by 8 into a factor of two

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 19);
    assert!(host.borrow().transmitted.is_empty());
    uart.tick();
    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
}

#[test]
fn service_gates_stall_the_transmitter() {
    let (mut uart, host) = harness::uart_with_clksel(UartType::Ox16950, true);
    uart.write(3, 0x03);
    uart.write(7, 0x00);
    uart.write(5, 0x02); // ACR: transmit service disabled

    uart.write(0, 0x41);
    harness::tick_n(&mut uart, 100);
    assert!(host.borrow().transmitted.is_empty());

    uart.write(5, 0x00); // re-enable
    harness::tick_n(&mut uart, 10);
    assert_eq!(host.borrow().tx_bytes(), vec![0x41]);
}

#[test]
fn service_gates_stall_the_receiver() {
    let (mut uart, host) = harness::uart_with_clksel(UartType::Ox16950, true);
    uart.write(3, 0x03);
    uart.write(1, 0x01);
    uart.write(7, 0x00);
    uart.write(5, 0x01); // ACR: receive service disabled

    host.borrow_mut().rx_script.push_back(0x5A);
    harness::tick_n(&mut uart, 100);
    assert!(!host.borrow().line("uart0"));

    uart.write(5, 0x00);
    harness::tick_n(&mut uart, 11);
    assert!(host.borrow().line("uart0"));
    assert_eq!(uart.read(0), 0x5A);
}
