//! Platform collaborators the driver is built on.
//!
//! Data transfer goes through [`eh1::spi::SpiBus`]. What embedded-hal does
//! not cover (clock and frame configuration, handing pins to the SPI block,
//! manual pin control by GPIO number) is described by the two traits here.
use crate::Pin;
use eh1::{
    digital::{self, PinState},
    spi::{MODE_1, Mode, SpiBus},
};

/// Bit order of each transmitted word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// SPI frame format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiFormat {
    pub bits_per_word: u8,
    pub mode: Mode,
    pub bit_order: BitOrder,
}

impl SpiFormat {
    /// 8-bit words, clock idle low, data sampled on the second edge, MSB first.
    ///
    /// Sampling on the first edge (mode 0) drops the first bit of every
    /// transfer on the boards this driver was brought up on.
    pub const FLASH: SpiFormat = SpiFormat {
        bits_per_word: 8,
        mode: MODE_1,
        bit_order: BitOrder::MsbFirst,
    };
}

/// An SPI bus that can also be reconfigured.
pub trait SpiController: SpiBus<u8> {
    /// Set the bus clock.
    ///
    /// # Returns
    /// The clock rate actually reached, which may differ from `frequency_hz`
    /// because of clock divider limits.
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32, Self::Error>;

    /// Set the frame format.
    fn set_format(&mut self, format: SpiFormat) -> Result<(), Self::Error>;
}

impl<T: SpiController + ?Sized> SpiController for &mut T {
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32, Self::Error> {
        T::set_frequency(self, frequency_hz)
    }

    fn set_format(&mut self, format: SpiFormat) -> Result<(), Self::Error> {
        T::set_format(self, format)
    }
}

/// GPIO bank control by pin number.
pub trait GpioController {
    type Error: digital::Error;

    /// Route `pin` to the SPI peripheral.
    fn assign_bus_function(&mut self, pin: Pin) -> Result<(), Self::Error>;

    /// Turn every pin in `mask` into a software driven output.
    fn configure_outputs(&mut self, mask: u32) -> Result<(), Self::Error>;

    /// Drive an output pin.
    fn set(&mut self, pin: Pin, state: PinState) -> Result<(), Self::Error>;
}

impl<T: GpioController + ?Sized> GpioController for &mut T {
    type Error = T::Error;

    fn assign_bus_function(&mut self, pin: Pin) -> Result<(), Self::Error> {
        T::assign_bus_function(self, pin)
    }

    fn configure_outputs(&mut self, mask: u32) -> Result<(), Self::Error> {
        T::configure_outputs(self, mask)
    }

    fn set(&mut self, pin: Pin, state: PinState) -> Result<(), Self::Error> {
        T::set(self, pin, state)
    }
}
