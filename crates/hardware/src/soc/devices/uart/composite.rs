//! Multi-channel UART packages.
//!
//! Two aggregates of independent channels behind one address window: a dual
//! package (one address bit selects the channel) and a quad package (two
//! bits). The low three offset bits pass through to the selected channel
//! unchanged. Children share the package clock, model, and host callback
//! object but are otherwise fully independent state machines.

use std::rc::Rc;

use crate::soc::traits::{HostHandle, IoDevice};

use super::{Uart, UartType};

/// Dual-channel package: two channels, channel select on address bit 3.
#[derive(Debug)]
pub struct DualUart {
    tag: String,
    channels: [Uart; 2],
}

impl DualUart {
    /// Creates the package; children are tagged `<tag>.0` and `<tag>.1` and
    /// share the host callback object.
    pub fn new(
        tag: impl Into<String>,
        clock: u32,
        uart_type: UartType,
        host: HostHandle,
        clock_select: bool,
    ) -> Self {
        let tag = tag.into();
        let channels = [
            Uart::with_subchannel(
                format!("{tag}.0"),
                clock,
                uart_type,
                Rc::clone(&host),
                clock_select,
                0,
            ),
            Uart::with_subchannel(format!("{tag}.1"), clock, uart_type, host, clock_select, 1),
        ];
        Self { tag, channels }
    }

    /// Borrows a child channel.
    pub fn channel(&self, index: usize) -> &Uart {
        &self.channels[index]
    }

    /// Mutably borrows a child channel (modem line inputs, direct access).
    pub fn channel_mut(&mut self, index: usize) -> &mut Uart {
        &mut self.channels[index]
    }

    fn select(&mut self, offset: u16) -> (&mut Uart, u16) {
        let index = usize::from(offset >> 3) & 1;
        (&mut self.channels[index], offset & 7)
    }
}

impl IoDevice for DualUart {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn read(&mut self, offset: u16) -> u8 {
        let (channel, local) = self.select(offset);
        channel.read(local)
    }

    fn write(&mut self, offset: u16, data: u8) {
        let (channel, local) = self.select(offset);
        channel.write(local, data);
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    fn tick(&mut self) {
        for channel in &mut self.channels {
            channel.tick();
        }
    }
}

/// Quad-channel package: four channels, channel select on address bits 3..4.
#[derive(Debug)]
pub struct QuadUart {
    tag: String,
    channels: [Uart; 4],
}

impl QuadUart {
    /// Creates the package; children are tagged `<tag>.0` through `<tag>.3`
    /// and share the host callback object.
    pub fn new(
        tag: impl Into<String>,
        clock: u32,
        uart_type: UartType,
        host: HostHandle,
        clock_select: bool,
    ) -> Self {
        let tag = tag.into();
        let make = |ordinal: usize| {
            Uart::with_subchannel(
                format!("{tag}.{ordinal}"),
                clock,
                uart_type,
                Rc::clone(&host),
                clock_select,
                ordinal,
            )
        };
        let channels = [make(0), make(1), make(2), make(3)];
        Self { tag, channels }
    }

    /// Borrows a child channel.
    pub fn channel(&self, index: usize) -> &Uart {
        &self.channels[index]
    }

    /// Mutably borrows a child channel (modem line inputs, direct access).
    pub fn channel_mut(&mut self, index: usize) -> &mut Uart {
        &mut self.channels[index]
    }

    fn select(&mut self, offset: u16) -> (&mut Uart, u16) {
        let index = usize::from(offset >> 3) & 3;
        (&mut self.channels[index], offset & 7)
    }
}

impl IoDevice for QuadUart {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn read(&mut self, offset: u16) -> u8 {
        let (channel, local) = self.select(offset);
        channel.read(local)
    }

    fn write(&mut self, offset: u16, data: u8) {
        let (channel, local) = self.select(offset);
        channel.write(local, data);
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    fn tick(&mut self) {
        for channel in &mut self.channels {
            channel.tick();
        }
    }
}
