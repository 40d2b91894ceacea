//! Interrupt source arbitration.
//!
//! Four sources with a fixed hardware priority, gated by the enable register
//! and encoded into the identification register on every state change. The
//! external interrupt line is recomputed and reported to the host on every
//! pass; there is no queueing or edge latching here.

use tracing::trace;

use super::Uart;

/// Pending source: received data available.
pub(super) const INT_RX_AVAILABLE: u8 = 0x01;
/// Pending source: transmitter holding register empty.
pub(super) const INT_TX_EMPTY: u8 = 0x02;
/// Pending source: receiver line status.
pub(super) const INT_LINE_STATUS: u8 = 0x04;
/// Pending source: modem status change.
pub(super) const INT_MODEM_STATUS: u8 = 0x08;
/// Pending source: receive character timeout.
///
/// The encoding deliberately overlaps [`INT_RX_AVAILABLE`]: the timeout is a
/// flavor of "received data available" and both bits of this pattern must be
/// pending for the identification register to report the timeout form.
pub(super) const INT_CHAR_TIMEOUT: u8 = 0x11;

impl Uart {
    /// Adds pending sources and re-arbitrates.
    pub(super) fn trigger_int(&mut self, sources: u8) {
        self.int_pending |= sources;
        self.update_interrupt();
        trace!(channel = %self.tag, sources, "interrupt sources set");
    }

    /// Removes pending sources and re-arbitrates; a lower-priority source
    /// left pending keeps the line asserted.
    pub(super) fn clear_int(&mut self, sources: u8) {
        self.int_pending &= !sources;
        self.update_interrupt();
        trace!(channel = %self.tag, sources, "interrupt sources cleared");
    }

    /// Encodes the highest-priority pending-and-enabled source into the
    /// identification register and drives the interrupt output.
    pub(super) fn update_interrupt(&mut self) {
        let asserted;
        if self.int_pending & self.regs.ier & 0x0F != 0 {
            asserted = true;
            self.regs.iir &= !(0x08 | 0x04 | 0x02);

            // highest to lowest
            if self.regs.ier & self.int_pending & INT_LINE_STATUS != 0 {
                self.regs.iir |= 0x04 | 0x02;
            } else if self.regs.ier & self.int_pending & INT_RX_AVAILABLE != 0 {
                self.regs.iir |= 0x04;
                if self.int_pending & INT_CHAR_TIMEOUT == INT_CHAR_TIMEOUT {
                    self.regs.iir |= 0x08;
                }
            } else if self.regs.ier & self.int_pending & INT_TX_EMPTY != 0 {
                self.regs.iir |= 0x02;
            }

            self.regs.iir &= !0x01;
        } else {
            asserted = false;
            self.regs.iir |= 0x01;
            self.regs.iir &= !(0x08 | 0x04 | 0x02);
        }

        trace!(channel = %self.tag, asserted, "interrupt line");
        self.host.borrow_mut().interrupt_line(&self.tag, asserted);
    }
}
