//! Z280 single-board-computer emulation core.
//!
//! This crate implements the programmable peripherals of a Z280-based SBC with
//! the following:
//! 1. **Serial:** The 8250 UART family (8250 through 16450/16550/16650/16750/16950),
//!    including FIFO disciplines, interrupt arbitration, and baud-rate timing.
//! 2. **Composition:** Dual- and quad-channel UART packages behind a single
//!    address-decoded bus window.
//! 3. **Host seams:** Narrow traits for the byte transport, interrupt line, and
//!    port-decoded bus access supplied by the surrounding machine.
//! 4. **Configuration:** Board clock defaults and JSON-loadable machine config.
//!
//! Everything is driven cooperatively from the host CPU loop: bus reads/writes
//! and one `tick` per base-clock unit. Given a fixed sequence of those calls the
//! engine is fully deterministic.

/// Machine configuration (defaults, serial channel parameters).
pub mod config;
/// System-on-chip surface (host traits, bus-attached devices).
pub mod soc;

/// Root configuration type; use `Config::default()` or [`Config::from_json`].
pub use crate::config::Config;
/// Serial channel and multi-channel packages; construct with `Uart::new`.
pub use crate::soc::devices::uart::{DualUart, QuadUart, Uart, UartType};
/// Host-facing seams implemented by the surrounding machine.
pub use crate::soc::traits::{HostHandle, IoDevice, SerialHost};
