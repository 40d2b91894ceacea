//! 8250-family UART emulation.
//!
//! Emulates the programmable serial chips of the 8250 lineage, from the
//! original INS8250 through the FIFO-capable NS16550 to the extended
//! TL16650/TL16750/OX16950 parts, behind one byte-addressable register
//! window. The module provides:
//! 1. **Register file:** The eight-offset decode with every cross-register
//!    side effect (divisor latch, bank latches, read-to-clear status).
//! 2. **Interrupt arbiter:** Priority encoding of pending sources into the
//!    identification register and the external interrupt line.
//! 3. **RX/TX pipeline:** Holding-register and FIFO disciplines with overrun
//!    and trigger-level semantics.
//! 4. **Timing:** Divisor/prescaler-driven service cadence and the receive
//!    character timeout, advanced one host tick at a time.
//! 5. **Packages:** Dual and quad multi-channel composites.
//!
//! Timing is byte-granular: a character in flight is a countdown of its frame
//! bits at the baud cadence, not a sampled serial line.

/// Dual- and quad-channel packages.
pub mod composite;
/// FIFO ring storage.
pub mod fifo;
/// Chip model capability table.
pub mod variant;

mod interrupt;
mod pipeline;
mod timer;

use std::fmt;

use tracing::trace;

use crate::soc::traits::{HostHandle, IoDevice};
pub use composite::{DualUart, QuadUart};
use fifo::{RxFifo, TxFifo};
use interrupt::{INT_MODEM_STATUS, INT_RX_AVAILABLE, INT_TX_EMPTY};
pub use variant::UartType;

/// Line status: transmitter shift register empty.
const LSR_TSRE: u8 = 0x40;
/// Line status: transmitter holding register empty.
const LSR_THRE: u8 = 0x20;
/// Line status: receiver overrun.
const LSR_OE: u8 = 0x02;
/// Line status: received data ready.
const LSR_DR: u8 = 0x01;

/// Modem control: data terminal ready.
const MCR_DTR: u8 = 0x01;
/// Modem control: request to send.
const MCR_RTS: u8 = 0x02;
/// Modem control: auxiliary output 1.
const MCR_OUT1: u8 = 0x04;
/// Modem control: auxiliary output 2.
const MCR_OUT2: u8 = 0x08;
/// Modem control: local loopback.
const MCR_LOOPBACK: u8 = 0x10;
/// Modem control: route the divisor through the clock prescaler
/// (prescaler-capable parts only).
const MCR_BAUD_PRESCALE: u8 = 0x80;

/// Line control: word length select mask (5 + n data bits).
const LCR_WORD_LEN_MASK: u8 = 0x03;
/// Line control: long stop (2 bits, or 1.5 with 5-bit words).
const LCR_LONG_STOP: u8 = 0x04;
/// Line control: parity enable.
const LCR_PARITY_ENABLE: u8 = 0x08;
/// Line control: divisor latch access bit.
const LCR_DLAB: u8 = 0x80;
/// The line-control value that latches the enhanced register bank open on
/// capable parts instead of being stored.
const LCR_EXTENDED_KEY: u8 = 0xBF;

/// Enhanced feature register: enhanced-mode enable (widens writable MCR).
const EFR_ENHANCED: u8 = 0x10;

/// Interrupt enable: transmitter holding register empty.
const IER_TX_EMPTY: u8 = 0x02;

/// Interrupt identification: no interrupt pending.
const IIR_NO_INT: u8 = 0x01;

/// FIFO control: FIFO enable.
const FCR_ENABLE: u8 = 0x01;
/// FIFO control: receive FIFO clear.
const FCR_CLEAR_RX: u8 = 0x02;
/// FIFO control: transmit FIFO clear.
const FCR_CLEAR_TX: u8 = 0x04;

/// Indexed bank: additional control register index.
const ICR_ACR: usize = 0x00;
/// Indexed bank: clock prescaler register index.
const ICR_CPR: usize = 0x01;
/// Indexed bank length.
const ICR_LEN: usize = 0x14;

/// Additional control: disable the receive service step.
const ACR_RX_DISABLE: u8 = 0x01;
/// Additional control: disable the transmit service step.
const ACR_TX_DISABLE: u8 = 0x02;
/// Additional control: enable indexed-register reads.
const ACR_ICR_READ: u8 = 0x40;
/// Additional control: overlay the additional status register on offset 1.
const ACR_ASR_ENABLE: u8 = 0x80;

/// Raw register block backing one channel.
#[derive(Debug, Default, Clone)]
struct Registers {
    /// Transmitter holding register (offset 0, write).
    thr: u8,
    /// Receiver buffer register (offset 0, read).
    rbr: u8,
    /// Interrupt enable register (offset 1).
    ier: u8,
    /// 16-bit divisor latch (offsets 0/1 under DLAB).
    dl: u16,
    /// Interrupt identification register (offset 2, read).
    iir: u8,
    /// FIFO control register (offset 2, write).
    fcr: u8,
    /// Line control register (offset 3).
    lcr: u8,
    /// Modem control register (offset 4).
    mcr: u8,
    /// Line status register (offset 5).
    lsr: u8,
    /// Modem status register (offset 6).
    msr: u8,
    /// Scratch register (offset 7); index into the 950 bank when unlocked.
    scr: u8,
    /// Enhanced feature register (650 bank).
    efr: u8,
    /// Software flow-control match bytes (650 bank).
    xon1: u8,
    xon2: u8,
    xoff1: u8,
    xoff2: u8,
    /// Additional status register (950 bank).
    asr: u8,
    /// Indexed control-register array (950 bank).
    icr: [u8; ICR_LEN],
}

/// One emulated serial channel.
///
/// Created with an immutable model/clock/host configuration; all mutable
/// register and FIFO state is reinitialized by [`Uart::reset`]. Drive it with
/// [`Uart::read`]/[`Uart::write`] from the bus and one [`Uart::tick`] per host
/// base-clock unit.
pub struct Uart {
    /// Identity tag reported through host callbacks.
    tag: String,
    /// Chip model; fixes FIFO depth and optional register banks.
    uart_type: UartType,
    /// Baud-rate generator reference clock in Hz.
    clock: u32,
    /// Clock-select strap sampled at reset on the parts that have one.
    clock_select: bool,
    /// Ordinal under a multi-channel package (0 when standalone).
    subchannel: usize,
    /// Shared host callback object.
    host: HostHandle,

    regs: Registers,
    /// Enhanced-bank latch (set by the 0xBF line-control write).
    extended_bank: bool,
    /// Pending interrupt source mask.
    int_pending: u8,

    // Modem input lines, electrically idle when `true`.
    dcd: bool,
    dsr: bool,
    ri: bool,
    cts: bool,

    /// Bits per character frame (start + data + parity + stop).
    bit_count: u8,
    /// Remaining bit times of the character being received.
    rx_bits_rem: u8,
    /// Character being assembled by the receiver.
    rx_data: u8,
    /// Remaining bit times of the character being transmitted.
    tx_bits_rem: u8,
    /// Character in the transmit shift register.
    tx_data: u8,

    /// Baud-rate generator constant (divisor, optionally prescaled).
    baud_const: u16,
    /// Ticks until the next receive/transmit service step.
    tick_countdown: u16,
    /// Ticks until the receive character timeout; zero parks it.
    timeout: u64,

    /// Receive FIFO occupancy that raises the data-available interrupt.
    rx_trigger: usize,
    rx_fifo: RxFifo,
    tx_fifo: TxFifo,
}

impl Uart {
    /// Creates a standalone channel and performs a power-on reset.
    ///
    /// # Arguments
    ///
    /// * `tag` - Identity reported through host callbacks.
    /// * `clock` - Baud-rate generator reference clock in Hz.
    /// * `uart_type` - Chip model to emulate.
    /// * `host` - Shared callback object (interrupt line, byte transport).
    /// * `clock_select` - Baud reference strap; only affects reset defaults
    ///   on the parts with a clock-select pin.
    pub fn new(
        tag: impl Into<String>,
        clock: u32,
        uart_type: UartType,
        host: HostHandle,
        clock_select: bool,
    ) -> Self {
        Self::with_subchannel(tag, clock, uart_type, host, clock_select, 0)
    }

    /// Creates a channel bound to a package ordinal.
    pub(crate) fn with_subchannel(
        tag: impl Into<String>,
        clock: u32,
        uart_type: UartType,
        host: HostHandle,
        clock_select: bool,
        subchannel: usize,
    ) -> Self {
        let mut uart = Self {
            tag: tag.into(),
            uart_type,
            clock,
            clock_select,
            subchannel,
            host,
            regs: Registers::default(),
            extended_bank: false,
            int_pending: 0,
            dcd: true,
            dsr: true,
            ri: true,
            cts: true,
            bit_count: 0,
            rx_bits_rem: 0,
            rx_data: 0,
            tx_bits_rem: 0,
            tx_data: 0,
            baud_const: 0,
            tick_countdown: 0,
            timeout: 0,
            rx_trigger: 0,
            rx_fifo: RxFifo::new(uart_type.fifo_depth()),
            tx_fifo: TxFifo::new(uart_type.fifo_depth()),
        };
        uart.reset();
        uart
    }

    /// Returns the channel's identity tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the emulated chip model.
    pub const fn uart_type(&self) -> UartType {
        self.uart_type
    }

    /// Restores power-on register state.
    ///
    /// Power-on and soft reset are the same routine; the extended parts
    /// additionally restore their identification/default blocks.
    pub fn reset(&mut self) {
        trace!(channel = %self.tag, "reset");
        if self.uart_type.has_fifo() {
            self.rx_fifo.clear();
            self.tx_fifo.clear();
            self.timeout = 0;
        }

        self.regs.ier = 0;
        self.regs.iir = IIR_NO_INT;
        self.regs.lcr = 0;
        self.regs.mcr = 0;
        self.regs.lsr = LSR_THRE | LSR_TSRE;
        self.regs.dl = 1;
        self.update_msr();
        self.regs.msr &= 0xF0;
        self.int_pending = 0;
        self.rx_bits_rem = 0;
        self.tx_bits_rem = 0;

        if self.uart_type.has_indexed_bank() {
            self.regs.asr = 0x80;
            self.regs.icr = [0; ICR_LEN];
            self.regs.icr[ICR_CPR] = 0x20;
            // identification block
            self.regs.icr[0x08] = 0x16;
            self.regs.icr[0x09] = 0xC9;
            self.regs.icr[0x0A] = 0x54;
            self.regs.icr[0x0B] = 0x04;
            // good-data status and DMA mode defaults
            self.regs.icr[0x10] = 1;
            self.regs.icr[0x11] = 2;
        }
        if self.uart_type.clksel_mcr_default() && !self.clock_select {
            self.regs.mcr |= MCR_BAUD_PRESCALE;
        }
        if self.uart_type.resets_fcr() {
            self.regs.fcr = 0;
        }
        if self.uart_type.has_extended_bank() {
            self.regs.efr = 0;
            self.regs.xon1 = 0;
            self.regs.xon2 = 0;
            self.regs.xoff1 = 0;
            self.regs.xoff2 = 0;
        }
        self.update_baud_rate();
    }

    /// Reads one byte from the register window.
    ///
    /// Several offsets clear state as a side effect of the read (received
    /// data, pending interrupt sources, latched status bits), exactly as the
    /// hardware documents.
    pub fn read(&mut self, offset: u16) -> u8 {
        let data = match offset {
            0 => {
                if self.dlab() {
                    (self.regs.dl & 0xFF) as u8
                } else {
                    if self.fifo_enabled() {
                        self.regs.rbr = self.pop_rx();
                    } else {
                        self.clear_int(INT_RX_AVAILABLE);
                        if self.regs.lsr & LSR_DR != 0 {
                            self.regs.lsr &= !LSR_DR;
                        }
                    }
                    self.regs.rbr
                }
            }
            1 => {
                if self.dlab() {
                    (self.regs.dl >> 8) as u8
                } else if self.asr_overlay() {
                    self.regs.asr
                } else {
                    self.regs.ier & 0x0F
                }
            }
            2 => {
                if self.extended_bank_active() {
                    self.regs.efr
                } else {
                    let iir = self.regs.iir;
                    // a transmit-empty identification is cleared by being read
                    if iir & 0x0F == 0x02 {
                        self.clear_int(INT_TX_EMPTY);
                    }
                    iir
                }
            }
            3 => {
                if self.asr_overlay() {
                    self.rx_fifo.len() as u8
                } else {
                    self.regs.lcr
                }
            }
            4 => {
                if self.extended_bank_active() {
                    self.regs.xon1
                } else if self.uart_type.has_indexed_bank() {
                    self.tx_fifo.fill_level()
                } else {
                    self.regs.mcr
                }
            }
            5 => {
                if self.extended_bank_active() {
                    self.regs.xon2
                } else if self.uart_type.has_extended_bank()
                    && self.regs.icr[ICR_ACR] & ACR_ICR_READ != 0
                {
                    trace!(channel = %self.tag, index = self.regs.scr, "indexed register read");
                    if self.regs.scr == 0x0F {
                        self.regs.fcr
                    } else {
                        // the indexed window is 0x14 bytes; reads past it float high
                        self.regs
                            .icr
                            .get(usize::from(self.regs.scr))
                            .copied()
                            .unwrap_or(0xFF)
                    }
                } else {
                    self.read_lsr()
                }
            }
            6 => {
                if self.extended_bank_active() {
                    self.regs.xoff1
                } else {
                    let msr = self.regs.msr;
                    self.regs.msr &= 0xF0;
                    self.clear_int(INT_MODEM_STATUS);
                    msr
                }
            }
            7 => {
                if self.extended_bank_active() {
                    self.regs.xoff2
                } else {
                    self.regs.scr
                }
            }
            _ => 0xFF,
        };
        trace!(channel = %self.tag, offset, data, "register read");
        data
    }

    /// Writes one byte into the register window, applying all side effects
    /// synchronously (interrupts, FIFO control, baud reprogramming).
    pub fn write(&mut self, offset: u16, data: u8) {
        trace!(channel = %self.tag, offset, data, "register write");
        match offset {
            0 => {
                if self.dlab() {
                    self.regs.dl = (self.regs.dl & 0xFF00) | u16::from(data);
                    self.update_baud_rate();
                } else {
                    self.regs.thr = data;
                    self.regs.lsr &= !LSR_THRE;
                    if self.fifo_enabled() {
                        self.push_tx(data);
                    }
                    self.clear_int(INT_TX_EMPTY);
                    if self.regs.lsr & LSR_TSRE != 0 {
                        self.tra_load();
                    }
                }
            }
            1 => {
                if self.dlab() {
                    self.regs.dl = (self.regs.dl & 0x00FF) | (u16::from(data) << 8);
                    self.update_baud_rate();
                } else if self.asr_overlay() {
                    self.regs.asr = data & 0x03;
                } else {
                    // enabling the TX-empty interrupt while the holding
                    // register is already empty re-raises that source
                    if self.regs.lsr & LSR_THRE != 0 && data & IER_TX_EMPTY != 0 {
                        self.trigger_int(INT_TX_EMPTY);
                    }
                    self.regs.ier = data;
                    self.update_interrupt();
                }
            }
            2 => {
                if self.extended_bank_active() {
                    trace!(channel = %self.tag, data, "enhanced feature register write");
                    self.regs.efr = data;
                } else {
                    self.set_fcr(data);
                }
            }
            3 => {
                if self.uart_type.has_extended_bank() && data == LCR_EXTENDED_KEY {
                    self.regs.lcr |= LCR_DLAB;
                    self.extended_bank = true;
                    trace!(channel = %self.tag, "enhanced bank unlocked");
                } else {
                    self.regs.lcr = data;
                    self.extended_bank = false;
                    self.update_data_frame();
                }
            }
            4 => {
                if self.extended_bank_active() {
                    self.regs.xon1 = data;
                } else {
                    self.write_mcr(data);
                }
            }
            5 => {
                if self.uart_type.has_extended_bank() {
                    if self.extended_bank {
                        self.regs.xon2 = data;
                    } else {
                        self.write_indexed(data);
                    }
                } else {
                    self.write_lsr(data);
                }
            }
            6 => {
                if self.extended_bank_active() {
                    self.regs.xoff1 = data;
                } else {
                    // forcing any low-nibble bit raises the modem interrupt
                    self.regs.msr = data;
                    if self.regs.msr & 0x0F != 0 {
                        self.trigger_int(INT_MODEM_STATUS);
                    }
                }
            }
            7 => {
                if self.extended_bank_active() {
                    self.regs.xoff2 = data;
                } else {
                    self.regs.scr = data;
                }
            }
            _ => {}
        }
    }

    /// Sets the carrier-detect input line (`true` = idle).
    pub fn set_dcd(&mut self, state: bool) {
        self.dcd = state;
        self.update_msr();
    }

    /// Sets the data-set-ready input line (`true` = idle).
    pub fn set_dsr(&mut self, state: bool) {
        self.dsr = state;
        self.update_msr();
    }

    /// Sets the ring-indicator input line (`true` = idle).
    pub fn set_ri(&mut self, state: bool) {
        self.ri = state;
        self.update_msr();
    }

    /// Sets the clear-to-send input line (`true` = idle).
    pub fn set_cts(&mut self, state: bool) {
        self.cts = state;
        self.update_msr();
    }

    fn dlab(&self) -> bool {
        self.regs.lcr & LCR_DLAB != 0
    }

    fn extended_bank_active(&self) -> bool {
        self.uart_type.has_extended_bank() && self.extended_bank
    }

    fn asr_overlay(&self) -> bool {
        self.uart_type.has_indexed_bank() && self.regs.icr[ICR_ACR] & ACR_ASR_ENABLE != 0
    }

    /// Line-status read: latched error bits clear, the line-status interrupt
    /// source clears, the transmitter bits survive.
    fn read_lsr(&mut self) -> u8 {
        let data = self.regs.lsr;
        if self.regs.lsr & 0x1F != 0 {
            self.regs.lsr &= 0xE1;
        }
        self.clear_int(interrupt::INT_LINE_STATUS);
        data
    }

    /// Line-status write: the auto-computed transmitter bits are preserved;
    /// forced one-bits raise the matching interrupt sources.
    fn write_lsr(&mut self, data: u8) {
        self.regs.lsr =
            (self.regs.lsr & (LSR_TSRE | LSR_THRE)) | (data & !(LSR_TSRE | LSR_THRE));

        let mut sources = 0;
        if self.regs.lsr & LSR_DR != 0 {
            sources |= INT_RX_AVAILABLE;
        }
        if self.regs.lsr & 0x1E != 0 {
            sources |= interrupt::INT_LINE_STATUS;
        }
        if self.regs.lsr & LSR_THRE != 0 {
            sources |= INT_TX_EMPTY;
        }
        self.trigger_int(sources);
    }

    /// Modem-control write with the enhanced-mode width rule: the low five
    /// bits unless enhanced mode unlocks the full register. An unchanged
    /// value skips the modem-status recomputation entirely.
    fn write_mcr(&mut self, data: u8) {
        let enhanced =
            self.uart_type.has_extended_bank() && self.regs.efr & EFR_ENHANCED != 0;
        if !enhanced && (self.regs.mcr & 0x1F) != (data & 0x1F) {
            self.regs.mcr = data & 0x1F;
        } else if self.regs.mcr != data {
            self.regs.mcr = data;
        } else {
            return;
        }
        self.update_msr();
    }

    /// Indexed control-register write through the scratch index, with the
    /// two live side effects: index 0x0C written zero resets the channel and
    /// a prescaler write reprograms the baud generator.
    fn write_indexed(&mut self, data: u8) {
        let index = self.regs.scr;
        if matches!(index, 0x00..=0x07 | 0x0C..=0x0E | 0x11 | 0x13) {
            self.regs.icr[usize::from(index)] = data;
            trace!(channel = %self.tag, index, data, "indexed register write");
        }
        if index == 0x0C && data == 0 {
            self.reset();
        } else if usize::from(index) == ICR_CPR {
            self.update_baud_rate();
        }
    }

    /// Recomputes the modem-status register from the input lines, or from the
    /// looped-back outputs, and raises the modem interrupt on any delta.
    fn update_msr(&mut self) {
        let data;
        let mut change;
        if self.regs.mcr & MCR_LOOPBACK != 0 {
            data = ((self.regs.mcr & (MCR_OUT1 | MCR_OUT2)) << 4)
                | ((self.regs.mcr & MCR_DTR) << 5)
                | ((self.regs.mcr & MCR_RTS) << 3);
            change = (self.regs.msr ^ data) >> 4;
            // the ring delta only reports the trailing edge in loopback
            if self.regs.msr & 0x40 == 0 && data & 0x40 != 0 {
                change &= !4;
            }
        } else {
            data = (u8::from(!self.dcd) << 7)
                | (u8::from(!self.ri) << 6)
                | (u8::from(!self.dsr) << 5)
                | (u8::from(!self.cts) << 4);
            change = (self.regs.msr ^ data) >> 4;
        }
        self.regs.msr = data | change;

        if change != 0 {
            self.trigger_int(INT_MODEM_STATUS);
        }
    }
}

impl fmt::Debug for Uart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart")
            .field("tag", &self.tag)
            .field("type", &self.uart_type)
            .field("ier", &format_args!("{:#04x}", self.regs.ier))
            .field("iir", &format_args!("{:#04x}", self.regs.iir))
            .field("fcr", &format_args!("{:#04x}", self.regs.fcr))
            .field("lcr", &format_args!("{:#04x}", self.regs.lcr))
            .field("mcr", &format_args!("{:#04x}", self.regs.mcr))
            .field("lsr", &format_args!("{:#04x}", self.regs.lsr))
            .field("msr", &format_args!("{:#04x}", self.regs.msr))
            .field("dl", &format_args!("{:#06x}", self.regs.dl))
            .field("pending", &format_args!("{:#04x}", self.int_pending))
            .finish_non_exhaustive()
    }
}

impl IoDevice for Uart {
    fn tag(&self) -> &str {
        Self::tag(self)
    }

    fn read(&mut self, offset: u16) -> u8 {
        Self::read(self, offset)
    }

    fn write(&mut self, offset: u16, data: u8) {
        Self::write(self, offset, data);
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn tick(&mut self) {
        Self::tick(self);
    }
}
