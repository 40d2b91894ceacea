//! Configuration for the emulated machine.
//!
//! This module defines the configuration structures used to parameterize the
//! board. It provides:
//! 1. **Defaults:** Baseline hardware constants taken from the target board
//!    (oscillator, CPU and UART reference clocks).
//! 2. **Structures:** Hierarchical config for the machine and its serial
//!    channels, all fields individually defaultable.
//! 3. **Loading:** JSON deserialization with validation.
//!
//! Use `Config::default()` for the stock board, or [`Config::from_json`] when
//! the outer process supplies an override file.

use serde::Deserialize;
use thiserror::Error;

use crate::soc::devices::uart::UartType;

/// Default configuration constants for the emulated board.
pub mod defaults {
    /// Master oscillator frequency (29.4912 MHz).
    ///
    /// Every clock on the board is an integer division of this crystal.
    pub const OSC_HZ: u32 = 29_491_200;

    /// CPU core clock: oscillator / 2.
    pub const CPU_CLOCK_HZ: u32 = OSC_HZ / 2;

    /// UART reference clock: oscillator / 8 (3.6864 MHz).
    ///
    /// The standard baud-rate crystal frequency; divisor 24 yields 9600 baud
    /// with the fixed 16x oversampling divider.
    pub const UART_CLOCK_HZ: u32 = OSC_HZ / 8;

    /// Number of serial channels populated on the stock board.
    pub const SERIAL_CHANNELS: usize = 1;
}

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text was not valid JSON for the expected shape.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The serial channel count does not match any supported package.
    #[error("unsupported serial channel count {0} (expected 1, 2 or 4)")]
    ChannelCount(usize),
}

/// Serial subsystem configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Chip model emulated by every channel (e.g. `"16550A"`).
    pub model: UartType,
    /// Reference clock in Hz fed to the baud-rate generator.
    pub clock_hz: u32,
    /// Clock-select strap; only changes reset defaults on the richest parts.
    pub clock_select: bool,
    /// Channel count: 1 (single), 2 (dual package) or 4 (quad package).
    pub channels: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            model: UartType::Ns16550A,
            clock_hz: defaults::UART_CLOCK_HZ,
            clock_select: false,
            channels: defaults::SERIAL_CHANNELS,
        }
    }
}

/// Top-level machine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CPU core clock in Hz.
    pub cpu_clock_hz: u32,
    /// Serial subsystem parameters.
    pub serial: SerialConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_clock_hz: defaults::CPU_CLOCK_HZ,
            serial: SerialConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from JSON text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or an unknown UART
    /// model name, and [`ConfigError::ChannelCount`] for a channel count no
    /// package provides.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.serial.channels, 1 | 2 | 4) {
            Ok(())
        } else {
            Err(ConfigError::ChannelCount(self.serial.channels))
        }
    }
}
