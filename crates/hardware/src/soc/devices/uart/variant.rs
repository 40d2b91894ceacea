//! UART family membership and capabilities.
//!
//! Every behavioral difference between the emulated chips is answered by a
//! capability method on [`UartType`]: FIFO depth, optional register banks,
//! prescaler support, reset quirks. The register engine consults these
//! instead of comparing model identities, so adding a part is a matter of
//! extending the table.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Error returned when a chip model name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown UART model `{0}`")]
pub struct UnknownModel(String);

/// Chip family member emulated by a serial channel.
///
/// Selected once at channel creation and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum UartType {
    /// Original NMOS part from the IBM PC; one-byte buffers.
    Ins8250,
    /// XMOS revision with the original's race conditions fixed.
    Ins8250A,
    /// Faster-bus revision of the 8250A.
    Ns16450,
    /// First part with 16-byte FIFOs (flawed in real silicon).
    Ns16550,
    /// The 16550 with working FIFOs; the industry baseline.
    Ns16550A,
    /// 64-byte FIFOs, sleep mode, clock-select strap.
    Tl16750,
    /// 32-byte FIFOs plus the 0xBF-latched enhanced register bank.
    Tl16650,
    /// 128-byte FIFOs, indexed control registers, clock prescaler.
    Ox16950,
}

impl UartType {
    /// Whether the part has FIFO buffers at all (16550 and later).
    pub const fn has_fifo(self) -> bool {
        !matches!(self, Self::Ins8250 | Self::Ins8250A | Self::Ns16450)
    }

    /// Receive/transmit FIFO depth in bytes; 1 for holding-register parts.
    pub const fn fifo_depth(self) -> usize {
        match self {
            Self::Ins8250 | Self::Ins8250A | Self::Ns16450 => 1,
            Self::Ns16550 | Self::Ns16550A => 16,
            Self::Tl16650 => 32,
            Self::Tl16750 => 64,
            Self::Ox16950 => 128,
        }
    }

    /// Index wrap mask for the FIFO rings (depth is always a power of two).
    pub const fn fifo_mask(self) -> usize {
        self.fifo_depth() - 1
    }

    /// Whether the 0xBF line-control write unlocks the enhanced bank
    /// (EFR, XON1/2, XOFF1/2).
    pub const fn has_extended_bank(self) -> bool {
        matches!(self, Self::Tl16650 | Self::Ox16950)
    }

    /// Whether the part carries the indexed control-register array and the
    /// additional status register behind the scratch index.
    pub const fn has_indexed_bank(self) -> bool {
        matches!(self, Self::Ox16950)
    }

    /// Whether modem-control bit 7 routes the divisor through the clock
    /// prescaler register.
    pub const fn prescaler_capable(self) -> bool {
        matches!(self, Self::Tl16650 | Self::Ox16950)
    }

    /// Whether reset zeroes the FIFO control register.
    pub const fn resets_fcr(self) -> bool {
        matches!(self, Self::Tl16750 | Self::Tl16650 | Self::Ox16950)
    }

    /// Whether the clock-select strap seeds modem-control bit 7 at reset.
    pub const fn clksel_mcr_default(self) -> bool {
        matches!(self, Self::Tl16750 | Self::Ox16950)
    }

    /// Whether the additional-control register can gate the per-baud
    /// receive/transmit service steps.
    pub const fn has_service_gates(self) -> bool {
        matches!(self, Self::Ox16950)
    }
}

impl fmt::Display for UartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ins8250 => "INS8250",
            Self::Ins8250A => "INS8250A",
            Self::Ns16450 => "NS16450",
            Self::Ns16550 => "NS16550",
            Self::Ns16550A => "NS16550A",
            Self::Tl16750 => "TL16750",
            Self::Tl16650 => "TL16650",
            Self::Ox16950 => "OX16950",
        };
        f.write_str(name)
    }
}

impl FromStr for UartType {
    type Err = UnknownModel;

    /// Parses a chip model name, with or without the vendor prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "8250" | "INS8250" => Ok(Self::Ins8250),
            "8250A" | "INS8250A" => Ok(Self::Ins8250A),
            "16450" | "NS16450" => Ok(Self::Ns16450),
            "16550" | "NS16550" => Ok(Self::Ns16550),
            "16550A" | "NS16550A" => Ok(Self::Ns16550A),
            "16750" | "TL16750" => Ok(Self::Tl16750),
            "16650" | "TL16650" => Ok(Self::Tl16650),
            "16950" | "OX16950" => Ok(Self::Ox16950),
            _ => Err(UnknownModel(s.to_owned())),
        }
    }
}

impl TryFrom<String> for UartType {
    type Error = UnknownModel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
