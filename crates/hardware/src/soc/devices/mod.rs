//! Bus-attached peripheral devices.
//!
//! Each device implements [`IoDevice`] and is mounted by the machine behind
//! its port decode.

/// 8250-family UART channels and dual/quad packages.
pub mod uart;

pub use uart::{DualUart, QuadUart, Uart};

pub use crate::soc::traits::IoDevice;
