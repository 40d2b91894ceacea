//! Baud-rate generation and tick-driven timing.
//!
//! The host calls [`Uart::tick`] once per base-clock unit. A 16-bit countdown
//! seeded from the baud constant (divisor, optionally prescaled) paces the
//! receive/transmit service steps; a second countdown, live only while the
//! receive ring holds unread data, raises the character timeout after four
//! character times of bus silence.

use tracing::trace;

use super::interrupt::INT_CHAR_TIMEOUT;
use super::{
    ACR_RX_DISABLE, ACR_TX_DISABLE, ICR_ACR, ICR_CPR, LCR_LONG_STOP, LCR_PARITY_ENABLE,
    LCR_WORD_LEN_MASK, LSR_TSRE, MCR_BAUD_PRESCALE, Uart,
};

impl Uart {
    /// Advances the channel by one base-clock unit.
    ///
    /// Drives the baud countdown, the service steps it gates, and the receive
    /// character timeout.
    pub fn tick(&mut self) {
        self.tick_countdown = self.tick_countdown.wrapping_sub(1);
        if self.tick_countdown == 0 {
            if self.uart_type.has_service_gates() {
                if self.regs.icr[ICR_ACR] & ACR_RX_DISABLE == 0 {
                    self.rcv_step();
                }
                if self.regs.icr[ICR_ACR] & ACR_TX_DISABLE == 0 {
                    self.tra_step();
                }
            } else {
                self.rcv_step();
                self.tra_step();
            }
            self.tick_countdown = self.baud_const;
        }

        if self.uart_type.has_fifo() {
            // zero parks the countdown: the decrement wraps it far away
            // instead of firing
            self.timeout = self.timeout.wrapping_sub(1);
            if self.timeout == 0 {
                self.trigger_int(INT_CHAR_TIMEOUT);
            }
        }
    }

    /// Re-derives the baud constant after a divisor, prescaler, or reset
    /// write, and reloads the service countdown.
    pub(super) fn update_baud_rate(&mut self) {
        if self.uart_type.prescaler_capable() && self.regs.mcr & MCR_BAUD_PRESCALE != 0 {
            let prescaler = f64::from(self.regs.icr[ICR_CPR]) / 8.0;
            self.baud_const = (f64::from(self.regs.dl) * prescaler) as u16;
            trace!(
                channel = %self.tag,
                divisor = self.regs.dl,
                prescaler,
                constant = self.baud_const,
                "baud rate set"
            );
        } else {
            self.baud_const = self.regs.dl;
            trace!(channel = %self.tag, divisor = self.regs.dl, "baud rate set");
        }
        self.tick_countdown = self.baud_const;

        // a character mid-shift would be stranded by the generator restart;
        // finish it before the new rate takes effect
        if self.regs.lsr & LSR_TSRE == 0 {
            self.tra_complete();
        }
    }

    /// Arms the receive idle countdown: four character times of silence.
    pub(super) fn arm_timeout(&mut self) {
        let baud = u64::from(self.baud_const).max(1);
        self.timeout =
            4 * u64::from(self.bit_count) * u64::from(self.clock) / (baud * 16);
    }

    /// Re-derives the frame bit count from the line-control register:
    /// start + data + optional parity + stop, with 5-bit long-stop frames
    /// rounded up to two stop bits.
    pub(super) fn update_data_frame(&mut self) {
        let data_bits = (self.regs.lcr & LCR_WORD_LEN_MASK) + 5;
        let parity_bits = u8::from(self.regs.lcr & LCR_PARITY_ENABLE != 0);
        let stop_bits = if self.regs.lcr & LCR_LONG_STOP == 0 { 1 } else { 2 };
        self.bit_count = 1 + data_bits + parity_bits + stop_bits;
    }
}
