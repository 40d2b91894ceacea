//! Receive/transmit pipeline.
//!
//! Two disciplines, selected by the FIFO-enable bit on the parts that have
//! buffers: the single-byte holding-register path and the ring-buffered path
//! with trigger levels and a receive idle timeout. Overrun and buffer-full are
//! ordinary operating states here, surfaced as status bits and interrupt
//! sources rather than errors.

use tracing::trace;

use super::interrupt::{
    INT_CHAR_TIMEOUT, INT_LINE_STATUS, INT_RX_AVAILABLE, INT_TX_EMPTY,
};
use super::{FCR_CLEAR_RX, FCR_CLEAR_TX, FCR_ENABLE, LSR_DR, LSR_OE, LSR_THRE, LSR_TSRE, Uart};

/// Receive FIFO occupancies that raise the data-available interrupt, indexed
/// by the trigger-select field of the FIFO control register.
const TRIGGER_LEVELS: [usize; 4] = [1, 4, 8, 14];

impl Uart {
    /// Whether the buffered discipline is in effect.
    pub(super) fn fifo_enabled(&self) -> bool {
        self.uart_type.has_fifo() && self.regs.fcr & FCR_ENABLE != 0
    }

    /// One receive service step at the baud cadence: counts down the frame in
    /// flight, or polls the host for the next character.
    pub(super) fn rcv_step(&mut self) {
        if self.rx_bits_rem > 0 {
            self.rx_bits_rem -= 1;
            if self.rx_bits_rem == 0 {
                self.rcv_complete();
            }
        } else {
            let polled = self
                .host
                .borrow_mut()
                .receive_byte(&self.tag, self.subchannel);
            if let Some(byte) = polled {
                self.rx_data = byte;
                self.rx_bits_rem = self.bit_count;
            }
        }
    }

    /// One transmit service step at the baud cadence.
    pub(super) fn tra_step(&mut self) {
        if self.tx_bits_rem > 0 {
            self.tx_bits_rem -= 1;
            if self.tx_bits_rem == 0 {
                self.tra_complete();
            }
        }
    }

    /// A received character has finished assembling.
    fn rcv_complete(&mut self) {
        trace!(channel = %self.tag, byte = self.rx_data, "receive complete");
        if !self.fifo_enabled() {
            return self.rcv_complete_unbuffered();
        }

        if self.rx_fifo.len() == self.uart_type.fifo_depth() {
            // ring full: the incoming character is dropped
            self.regs.lsr |= LSR_OE;
            self.trigger_int(INT_LINE_STATUS);
            return;
        }

        self.regs.lsr |= LSR_DR;
        self.rx_fifo.push(self.rx_data);
        if self.rx_fifo.len() >= self.rx_trigger {
            self.trigger_int(INT_RX_AVAILABLE);
        }
        self.arm_timeout();
    }

    /// Holding-register receive: an unread character means overrun, and the
    /// unread byte survives while the new one is lost.
    fn rcv_complete_unbuffered(&mut self) {
        if self.regs.lsr & LSR_DR != 0 {
            self.regs.lsr |= LSR_OE;
            self.trigger_int(INT_LINE_STATUS);
            self.rx_bits_rem = 0;
        } else {
            self.regs.lsr |= LSR_DR;
            self.regs.rbr = self.rx_data;
            self.trigger_int(INT_RX_AVAILABLE);
        }
    }

    /// Loads the transmit shift register with the next character, from the
    /// FIFO or the holding register.
    pub(super) fn tra_load(&mut self) {
        if !self.fifo_enabled() {
            return self.tra_load_unbuffered();
        }

        if let Some(byte) = self.tx_fifo.pop() {
            self.load_shift_register(byte);
            self.regs.lsr &= !LSR_TSRE;
            if self.tx_fifo.is_empty() {
                self.regs.lsr |= LSR_THRE;
                self.trigger_int(INT_TX_EMPTY);
            }
        } else {
            self.regs.lsr |= LSR_TSRE;
        }
    }

    fn tra_load_unbuffered(&mut self) {
        if self.regs.lsr & LSR_THRE == 0 {
            self.load_shift_register(self.regs.thr);
            self.regs.lsr &= !LSR_TSRE;
            self.regs.lsr |= LSR_THRE;
            self.trigger_int(INT_TX_EMPTY);
        } else {
            self.regs.lsr |= LSR_TSRE;
        }
    }

    fn load_shift_register(&mut self, byte: u8) {
        self.tx_data = byte;
        self.tx_bits_rem = self.bit_count;
    }

    /// The character in the shift register has finished; deliver it and
    /// reload.
    pub(super) fn tra_complete(&mut self) {
        trace!(channel = %self.tag, byte = self.tx_data, "transmit complete");
        let byte = self.tx_data;
        self.host
            .borrow_mut()
            .transmit_byte(&self.tag, self.subchannel, byte);
        self.tra_load();
    }

    /// Queues a byte into the transmit ring.
    pub(super) fn push_tx(&mut self, byte: u8) {
        trace!(channel = %self.tag, byte, "tx fifo push");
        self.tx_fifo.push(byte);
    }

    /// Unqueues the oldest received byte, maintaining the timeout, the
    /// trigger-level source, and data-ready.
    pub(super) fn pop_rx(&mut self) -> u8 {
        // leave the data-available half of the timeout pattern for the
        // trigger-level check below
        self.clear_int(INT_CHAR_TIMEOUT & !INT_RX_AVAILABLE);

        let data = self.rx_fifo.pop().unwrap_or(0);

        if self.rx_fifo.len() < self.rx_trigger {
            self.clear_int(INT_RX_AVAILABLE);
        }

        if self.rx_fifo.is_empty() {
            self.timeout = 0;
            self.regs.lsr &= !LSR_DR;
        } else {
            self.arm_timeout();
        }

        trace!(channel = %self.tag, byte = data, "rx fifo pop");
        data
    }

    /// FIFO control write: enable/disable, selective clears, trigger level.
    /// Latched on every part; the buffered paths only engage where FIFOs
    /// exist.
    pub(super) fn set_fcr(&mut self, data: u8) {
        if data & FCR_ENABLE == 0 {
            self.regs.fcr = 0;
            self.regs.iir &= !0xC8;
            return;
        }

        let mut data = data;
        if self.regs.fcr & FCR_ENABLE == 0 {
            // enabling forces both rings clear
            data |= FCR_CLEAR_RX | FCR_CLEAR_TX;
        }
        if data & FCR_CLEAR_RX != 0 {
            self.rx_fifo.clear();
            self.clear_int(INT_CHAR_TIMEOUT | INT_RX_AVAILABLE);
            self.timeout = 0;
        }
        if data & FCR_CLEAR_TX != 0 {
            self.tx_fifo.clear();
            self.regs.lsr |= LSR_THRE;
            self.trigger_int(INT_TX_EMPTY);
        }

        self.rx_trigger = TRIGGER_LEVELS[usize::from(data >> 6) & 3];
        self.regs.iir |= 0xC0;
        self.regs.fcr = data & 0xC9;
    }
}
