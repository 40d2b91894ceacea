//! Host-facing traits for bus-attached devices.
//!
//! This module defines the seams between the emulation core and the machine
//! that owns it. It provides:
//! 1. **Byte transport:** `SerialHost`, the synchronous callback surface a
//!    channel uses to move bytes and drive its interrupt line.
//! 2. **Bus access:** `IoDevice`, the port-decoded read/write/reset/tick shape
//!    shared by single channels and multi-channel packages.
//!
//! The whole engine is single-threaded and cooperative: host callbacks are
//! invoked synchronously from inside register handlers and tick processing and
//! must not block.

use std::cell::RefCell;
use std::rc::Rc;

/// Callback surface supplied by the surrounding machine.
///
/// One host object serves every channel of a package; calls carry the channel
/// tag and, for the byte transport, the sub-channel ordinal so a shared
/// console multiplexer can route them.
pub trait SerialHost {
    /// Drives the channel's interrupt output. Called on every arbitration
    /// pass, asserted or not; the host latches edges if it needs them.
    fn interrupt_line(&mut self, channel: &str, asserted: bool);

    /// Polls for an incoming byte. `None` means no data this tick; the
    /// channel simply polls again on the next one.
    fn receive_byte(&mut self, channel: &str, subchannel: usize) -> Option<u8>;

    /// Delivers one completed outgoing byte. Fires exactly once per byte.
    fn transmit_byte(&mut self, channel: &str, subchannel: usize, byte: u8);
}

/// Shared handle to the host callback object.
///
/// Channels of a composite package hold clones of the same handle, matching
/// the hardware wiring of one interrupt/transport harness per package.
pub type HostHandle = Rc<RefCell<dyn SerialHost>>;

/// Trait for devices mounted behind the machine's I/O port decode.
///
/// Offsets are device-relative; out-of-range reads float high (`0xFF`) and
/// out-of-range writes are ignored, as on the real bus.
pub trait IoDevice {
    /// Returns the device's identity tag (e.g. `"uart0"`, `"duart.1"`).
    fn tag(&self) -> &str;
    /// Reads one byte at the given device-relative offset.
    fn read(&mut self, offset: u16) -> u8;
    /// Writes one byte at the given device-relative offset.
    fn write(&mut self, offset: u16, data: u8);
    /// Restores power-on register state.
    fn reset(&mut self);
    /// Advances device state by one base-clock unit.
    fn tick(&mut self);
}
