use crate::{
    FlashError, Pin, PinRole,
    command::{Command, Response},
    platform::{GpioController, SpiController},
};
use eh1::digital::PinState;

/// Wiring between the host and the flash chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    /// MOSI, to the chip's DI.
    pub tx: Pin,
    pub clk: Pin,
    /// MISO, from the chip's DO.
    pub rx: Pin,
    /// Active low.
    pub hold: Pin,
    /// Active low.
    pub wp: Pin,
    /// Active low.
    pub cs: Pin,
}

impl PinAssignment {
    pub(crate) const fn roles(&self) -> [(Pin, PinRole); 6] {
        [
            (self.tx, PinRole::DataOut),
            (self.clk, PinRole::Clock),
            (self.rx, PinRole::DataIn),
            (self.hold, PinRole::Hold),
            (self.wp, PinRole::WriteProtect),
            (self.cs, PinRole::ChipSelect),
        ]
    }

    /// Pins handed to the SPI peripheral.
    pub const fn bus_pins(&self) -> [Pin; 3] {
        [self.tx, self.clk, self.rx]
    }

    /// Pins driven by software: hold, write protect and chip select.
    pub const fn manual_pins(&self) -> [Pin; 3] {
        [self.hold, self.wp, self.cs]
    }

    pub const fn manual_pin_mask(&self) -> u32 {
        self.hold.mask() | self.wp.mask() | self.cs.mask()
    }

    /// Check every pin is addressable and used for one role only.
    pub fn validate(&self) -> Result<(), FlashError> {
        let roles = self.roles();
        let mut used = [None::<PinRole>; Pin::MAX as usize + 1];
        for (pin, role) in roles {
            log::trace!("assign {pin} to {role:?}");
            let slot = used
                .get_mut(pin.0 as usize)
                .ok_or(FlashError::InvalidPin { pin, role })?;
            if let Some(current) = *slot {
                return Err(FlashError::PinConflict {
                    pin,
                    role,
                    current,
                });
            }
            *slot = Some(role);
        }
        Ok(())
    }
}

/// The SPI bus, the GPIO bank and the wiring of one flash chip.
///
/// The context keeps no state of its own between calls. `SPI` and `GPIO` may
/// be owned values or `&mut` borrows of caller owned peripherals.
pub struct DriverContext<SPI, GPIO> {
    pub(crate) spi: SPI,
    pub(crate) gpio: GPIO,
    pins: PinAssignment,
}

impl<SPI, GPIO> DriverContext<SPI, GPIO>
where
    SPI: SpiController,
    GPIO: GpioController,
{
    pub fn new(spi: SPI, gpio: GPIO, pins: PinAssignment) -> Result<Self, FlashError> {
        pins.validate()?;
        Ok(Self { spi, gpio, pins })
    }

    pub fn pins(&self) -> &PinAssignment {
        &self.pins
    }

    /// Give back the peripherals.
    pub fn release(self) -> (SPI, GPIO) {
        (self.spi, self.gpio)
    }

    pub(crate) fn set_pin(&mut self, pin: Pin, state: PinState) -> Result<(), FlashError> {
        log::trace!("{pin} -> {state:?}");
        self.gpio.set(pin, state).map_err(FlashError::pin)
    }

    /// Run one transaction inside a single chip-select window.
    ///
    /// `write` is clocked out in one go, then `read.len()` bytes are clocked
    /// in without releasing chip select. Chip select is released on every
    /// path, including a failed assert; a transport fault wins over a fault
    /// while releasing it.
    pub(crate) fn run_transaction(
        &mut self,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), FlashError> {
        let cs = self.pins.cs;
        if let Err(err) = self.set_pin(cs, PinState::Low) {
            // The line may have moved anyway.
            let _ = self.set_pin(cs, PinState::High);
            return Err(err);
        }
        let transfer = self.transfer(write, read);
        let release = self.set_pin(cs, PinState::High);
        transfer.and(release)
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), FlashError> {
        self.spi.write(write).map_err(FlashError::transport)?;
        if !read.is_empty() {
            self.spi.read(read).map_err(FlashError::transport)?;
        }
        // All clocking has to finish before chip select goes back up.
        self.spi.flush().map_err(FlashError::transport)
    }

    /// Encode `command`, run it and hand back the decoded reply bytes.
    pub(crate) fn execute(&mut self, command: Command) -> Result<Response, FlashError> {
        let mut frame = command.frame();
        log::debug!("{command:?}");
        log::trace!("write {:02x?}", frame.as_slice());
        let (write, response) = frame.split();
        self.run_transaction(write, response.as_mut_slice())?;
        let response = frame.into_response();
        if !response.as_slice().is_empty() {
            log::trace!("read {:02x?}", response.as_slice());
        }
        Ok(response)
    }
}
