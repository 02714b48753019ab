use crate::{
    FlashError,
    command::Command,
    context::DriverContext,
    device::{DeviceInfo, ExpectedIdentity, JedecId},
    platform::{GpioController, SpiController, SpiFormat},
    register::{StatusRegister1, StatusRegister2, StatusRegister3},
};
use eh1::{delay::DelayNs, digital::PinState};

/// Requested SPI clock. The bus may settle on a lower rate.
pub const TARGET_CLOCK_HZ: u32 = 100_000_000;

/// Time the device needs after a software reset before it accepts commands.
pub const RESET_SETTLE_US: u32 = 30;

/// Driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    clock_hz: u32,
    reset_settle_us: u32,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            clock_hz: TARGET_CLOCK_HZ,
            reset_settle_us: RESET_SETTLE_US,
        }
    }
}

impl FlashConfig {
    pub fn with_clock_hz(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    /// Values below [`RESET_SETTLE_US`] are raised to it.
    pub fn with_reset_settle_us(mut self, reset_settle_us: u32) -> Self {
        self.reset_settle_us = reset_settle_us.max(RESET_SETTLE_US);
        self
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn reset_settle_us(&self) -> u32 {
        self.reset_settle_us
    }
}

/// Serial NOR flash driver.
///
/// Every method is one or more complete chip-select framed transactions;
/// nothing about the device is cached between calls.
pub struct Flash<SPI, GPIO, D> {
    ctx: DriverContext<SPI, GPIO>,
    delay: D,
    config: FlashConfig,
}

impl<SPI, GPIO, D> Flash<SPI, GPIO, D>
where
    SPI: SpiController,
    GPIO: GpioController,
    D: DelayNs,
{
    pub fn new(ctx: DriverContext<SPI, GPIO>, delay: D) -> Self {
        Self::with_config(ctx, delay, FlashConfig::default())
    }

    pub fn with_config(ctx: DriverContext<SPI, GPIO>, delay: D, config: FlashConfig) -> Self {
        Self { ctx, delay, config }
    }

    pub fn context(&self) -> &DriverContext<SPI, GPIO> {
        &self.ctx
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Hand back the context and the delay.
    pub fn release(self) -> (DriverContext<SPI, GPIO>, D) {
        (self.ctx, self.delay)
    }

    /// Prepare the bus and the control pins.
    ///
    /// Sets the clock and frame format, routes the data and clock pins to
    /// the SPI block and drives chip select, hold and write protect high.
    /// Nothing is sent to the device.
    ///
    /// # Returns
    /// The clock rate the bus actually runs at.
    pub fn init(&mut self) -> Result<u32, FlashError> {
        let speed = self
            .ctx
            .spi
            .set_frequency(self.config.clock_hz)
            .map_err(FlashError::transport)?;
        self.ctx
            .spi
            .set_format(SpiFormat::FLASH)
            .map_err(FlashError::transport)?;
        log::info!("SPI init at {speed}Hz");

        let pins = *self.ctx.pins();
        for pin in pins.bus_pins() {
            self.ctx
                .gpio
                .assign_bus_function(pin)
                .map_err(FlashError::pin)?;
        }
        log::debug!("SPI pins configured");

        // All three are active low.
        self.ctx
            .gpio
            .configure_outputs(pins.manual_pin_mask())
            .map_err(FlashError::pin)?;
        for pin in [pins.cs, pins.hold, pins.wp] {
            self.ctx.set_pin(pin, PinState::High)?;
        }
        log::debug!("Control pins configured");

        Ok(speed)
    }

    /// Software reset: enable reset, reset, then wait for the device to
    /// settle.
    ///
    /// The two commands go out in separate chip-select windows. The device
    /// ignores a reset that does not directly follow an enable reset.
    pub fn reset(&mut self) -> Result<(), FlashError> {
        self.ctx.execute(Command::EnableReset)?;
        self.ctx.execute(Command::Reset)?;
        self.delay.delay_us(self.config.reset_settle_us);
        log::info!("Flash reset");
        Ok(())
    }

    /// Release power-down and read the manufacturer ID.
    pub fn release_power_down(&mut self) -> Result<u8, FlashError> {
        Ok(self.ctx.execute(Command::ReleasePowerDown)?.byte())
    }

    pub fn read_jedec_id(&mut self) -> Result<JedecId, FlashError> {
        let response = self.ctx.execute(Command::JedecId)?;
        Ok(JedecId::from(response.array::<3>()))
    }

    pub fn read_unique_id(&mut self) -> Result<[u8; 8], FlashError> {
        Ok(self.ctx.execute(Command::UniqueId)?.array::<8>())
    }

    pub fn read_status_register_1(&mut self) -> Result<StatusRegister1, FlashError> {
        let response = self.ctx.execute(Command::ReadStatusRegister1)?;
        Ok(StatusRegister1::from_bits(response.byte()))
    }

    pub fn read_status_register_2(&mut self) -> Result<StatusRegister2, FlashError> {
        let response = self.ctx.execute(Command::ReadStatusRegister2)?;
        Ok(StatusRegister2::from_bits(response.byte()))
    }

    pub fn read_status_register_3(&mut self) -> Result<StatusRegister3, FlashError> {
        let response = self.ctx.execute(Command::ReadStatusRegister3)?;
        Ok(StatusRegister3::from_bits(response.byte()))
    }

    /// Read identity and status in six separate transactions.
    pub fn load_device_info(&mut self) -> Result<DeviceInfo, FlashError> {
        let manufacturer_id = self.release_power_down()?;
        let jedec_id = self.read_jedec_id()?;
        let unique_id = self.read_unique_id()?;
        let status_register_1 = self.read_status_register_1()?;
        let status_register_2 = self.read_status_register_2()?;
        let status_register_3 = self.read_status_register_3()?;
        Ok(DeviceInfo {
            manufacturer_id,
            device_id: 0,
            jedec_id,
            unique_id,
            status_register_1,
            status_register_2,
            status_register_3,
        })
    }

    /// Whether an erase or program is still running.
    ///
    /// No write or erase command may be issued while this returns `true`.
    pub fn is_busy(&mut self) -> Result<bool, FlashError> {
        Ok(self.read_status_register_1()?.busy())
    }

    /// Poll [`Flash::is_busy`] up to `max_polls` times, sleeping
    /// `poll_interval_us` between polls. The device is always polled at
    /// least once, even for a `max_polls` of 0.
    pub fn wait_while_busy(
        &mut self,
        poll_interval_us: u32,
        max_polls: u32,
    ) -> Result<(), FlashError> {
        let max_polls = max_polls.max(1);
        for poll in 1..=max_polls {
            if !self.is_busy()? {
                log::trace!("ready after {poll} polls");
                return Ok(());
            }
            if poll < max_polls {
                self.delay.delay_us(poll_interval_us);
            }
        }
        Err(FlashError::StillBusy { polls: max_polls })
    }

    /// Check the device answers with the expected identity and is idle.
    ///
    /// Meant to run right after [`Flash::reset`]. A mismatch is reported as
    /// `Ok(false)`; only bus faults are errors.
    pub fn post_reset_test(
        &mut self,
        expected: &ExpectedIdentity,
    ) -> Result<bool, FlashError> {
        let info = self.load_device_info()?;
        let mut ok = expected.matches(&info);
        if info.is_busy() {
            log::warn!("Device busy after reset");
            ok = false;
        }
        Ok(ok)
    }
}
