//! This is an [embedded-hal] driver for serial NOR flash chips
//!
//! The driver talks to a single flash device over a four-wire SPI bus. The
//! chip-select, hold and write-protect lines are driven manually by the
//! driver instead of by the SPI peripheral, so every command is framed by
//! exactly one chip-select window.
//!
//! Supported operations are device initialization, the two-step software
//! reset, identity discovery (manufacturer, JEDEC and unique ID) and status
//! register inspection including busy polling. Program, erase and lock
//! commands are not implemented.
//!
//! # Quickstart
//!
//! * Implement [`SpiController`] and [`GpioController`] for your platform
//!   (or use a HAL that already provides them).
//! * Build a [`DriverContext`] with your [`PinAssignment`], wrap it in a
//!   [`Flash`] and call [`Flash::init`] once before anything else.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

mod command;
pub mod context;
pub mod device;
pub mod flash;
pub mod platform;
pub mod register;
#[cfg(test)]
mod sim;

pub use context::{DriverContext, PinAssignment};
pub use device::{DeviceInfo, ExpectedIdentity, JedecId};
pub use flash::{Flash, FlashConfig, RESET_SETTLE_US, TARGET_CLOCK_HZ};
pub use platform::{BitOrder, GpioController, SpiController, SpiFormat};
pub use register::{StatusRegister1, StatusRegister2, StatusRegister3};

use eh1::{digital, spi};

/// A GPIO number on the host microcontroller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pin(pub u8);

impl Pin {
    /// Highest GPIO number that still fits in a 32-bit pin mask.
    pub const MAX: u8 = 31;

    /// Bit of this pin in a bank-wide pin mask, 0 for pins above [`Pin::MAX`].
    pub const fn mask(self) -> u32 {
        match 1u32.checked_shl(self.0 as u32) {
            Some(mask) => mask,
            None => 0,
        }
    }
}

impl core::fmt::Display for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GP{}", self.0)
    }
}

/// What a pin is wired to on the flash chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    DataOut,
    Clock,
    DataIn,
    Hold,
    WriteProtect,
    ChipSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlashError {
    #[error("SPI transport fault: {0:?}")]
    /// A bus write, read, flush or configuration call failed.
    Transport(spi::ErrorKind),

    #[error("Pin control fault: {0:?}")]
    Pin(digital::ErrorKind),

    #[error("{pin} can not be used as {role:?}, only GP0-GP{max} are supported", max = Pin::MAX)]
    InvalidPin { pin: Pin, role: PinRole },

    #[error("{pin} can not be used as {role:?}, it is already used as {current:?}")]
    PinConflict {
        pin: Pin,
        role: PinRole,
        current: PinRole,
    },

    #[error("Device still busy after {polls} status polls")]
    StillBusy { polls: u32 },
}

impl FlashError {
    pub(crate) fn transport<E: spi::Error>(err: E) -> Self {
        log::error!("SPI transport fault: {err:?}");
        FlashError::Transport(err.kind())
    }

    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        log::error!("Pin control fault: {err:?}");
        FlashError::Pin(err.kind())
    }
}
