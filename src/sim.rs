//! Simulated flash chip for tests.
//!
//! [`SimSpi`], [`SimGpio`] and [`SimDelay`] share one [`SimState`], the same
//! way the real peripherals share the chip: chip select decides whether bus
//! traffic reaches the device, and every pin change, transfer and delay is
//! recorded in order.
use crate::{
    Pin,
    context::PinAssignment,
    platform::{GpioController, SpiController, SpiFormat},
};
use eh1::{
    delay::DelayNs,
    digital::{self, PinState},
    spi::{self, ErrorType, SpiBus},
};
use std::sync::{Arc, Mutex};

pub(crate) const PINS: PinAssignment = PinAssignment {
    tx: Pin(19),
    clk: Pin(18),
    rx: Pin(16),
    hold: Pin(21),
    wp: Pin(20),
    cs: Pin(17),
};

/// Fastest clock the simulated SPI block can divide down to.
pub(crate) const SIM_MAX_FREQUENCY: u32 = 62_500_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Cs(PinState),
    Hold(PinState),
    Wp(PinState),
    Write(Vec<u8>),
    Read(usize),
    Flush,
    Frequency(u32),
    Format(SpiFormat),
    BusFunction(Pin),
    Outputs(u32),
    DelayNs(u32),
}

/// Bytes seen by the device during one chip-select window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) write: Vec<u8>,
    pub(crate) read: usize,
}

#[derive(Debug)]
pub(crate) struct SimState {
    events: Vec<Event>,
    windows: Vec<Window>,
    /// Window in progress while chip select is low.
    current: Option<Window>,
    manufacturer_id: u8,
    jedec_id: [u8; 3],
    unique_id: [u8; 8],
    status: [u8; 3],
    /// Status register 1 reads left that report busy.
    busy_reads: u32,
    reset_enabled: bool,
    resets: u32,
    /// SPI calls left before the bus starts failing.
    spi_budget: Option<usize>,
    /// GPIO calls left that fail.
    gpio_faults: u32,
}

impl SimState {
    fn spi_call(&mut self) -> Result<(), SimError> {
        match self.spi_budget {
            Some(0) => Err(SimError),
            Some(ref mut left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn gpio_call(&mut self) -> Result<(), SimError> {
        match self.gpio_faults {
            0 => Ok(()),
            u32::MAX => Err(SimError),
            _ => {
                self.gpio_faults -= 1;
                Err(SimError)
            }
        }
    }

    fn response(&mut self, len: usize) -> Vec<u8> {
        let opcode = self
            .current
            .as_ref()
            .and_then(|w| w.write.first().copied());
        let data: Vec<u8> = match opcode {
            Some(0xAB) => vec![self.manufacturer_id],
            Some(0x9F) => self.jedec_id.to_vec(),
            Some(0x4B) => self.unique_id.to_vec(),
            Some(0x05) => {
                let mut sr1 = self.status[0];
                if self.busy_reads > 0 {
                    self.busy_reads -= 1;
                    sr1 |= 0x01;
                }
                vec![sr1]
            }
            Some(0x35) => vec![self.status[1]],
            Some(0x15) => vec![self.status[2]],
            _ => vec![],
        };
        // The data line floats high once the device stops driving it.
        data.into_iter().chain(std::iter::repeat(0xFF)).take(len).collect()
    }

    fn chip_select(&mut self, state: PinState) {
        match state {
            PinState::Low => {
                if self.current.is_none() {
                    self.current = Some(Window::default());
                }
            }
            PinState::High => {
                if let Some(window) = self.current.take() {
                    match window.write.as_slice() {
                        [0x66] => self.reset_enabled = true,
                        [0x99] if self.reset_enabled => {
                            self.reset_enabled = false;
                            self.resets += 1;
                        }
                        _ => self.reset_enabled = false,
                    }
                    self.windows.push(window);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for SimError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Handle used by tests to set up and inspect the simulated chip.
#[derive(Clone)]
pub(crate) struct SimFlash {
    mtx: Arc<Mutex<SimState>>,
}

impl SimFlash {
    pub(crate) fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let state = SimState {
            events: Vec::new(),
            windows: Vec::new(),
            current: None,
            manufacturer_id: 0xEF,
            jedec_id: [0xEF, 0x40, 0x18],
            unique_id: [0xE6, 0x60, 0x58, 0x38, 0x83, 0x4F, 0x2B, 0x2F],
            status: [0x00, 0x02, 0x60],
            busy_reads: 0,
            reset_enabled: false,
            resets: 0,
            spi_budget: None,
            gpio_faults: 0,
        };
        Self {
            mtx: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn peripherals(&self) -> (SimSpi, SimGpio) {
        (
            SimSpi {
                mtx: self.mtx.clone(),
            },
            SimGpio {
                mtx: self.mtx.clone(),
            },
        )
    }

    pub(crate) fn delay(&self) -> SimDelay {
        SimDelay {
            mtx: self.mtx.clone(),
        }
    }

    pub(crate) fn set_status(&self, index: usize, value: u8) {
        self.mtx.lock().unwrap().status[index] = value;
    }

    /// Report busy for the next `reads` status register 1 reads.
    pub(crate) fn set_busy_for(&self, reads: u32) {
        self.mtx.lock().unwrap().busy_reads = reads;
    }

    pub(crate) fn set_identity(&self, manufacturer_id: u8, jedec_id: [u8; 3]) {
        let mut lock = self.mtx.lock().unwrap();
        lock.manufacturer_id = manufacturer_id;
        lock.jedec_id = jedec_id;
    }

    /// Let `calls` SPI calls succeed, then fail every one after that.
    pub(crate) fn fail_spi_after(&self, calls: usize) {
        self.mtx.lock().unwrap().spi_budget = Some(calls);
    }

    pub(crate) fn fail_gpio(&self) {
        self.mtx.lock().unwrap().gpio_faults = u32::MAX;
    }

    /// Fail the next `calls` GPIO calls only.
    pub(crate) fn fail_gpio_next(&self, calls: u32) {
        self.mtx.lock().unwrap().gpio_faults = calls;
    }

    pub(crate) fn clear_events(&self) {
        let mut lock = self.mtx.lock().unwrap();
        lock.events.clear();
        lock.windows.clear();
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.mtx.lock().unwrap().events.clone()
    }

    pub(crate) fn windows(&self) -> Vec<Window> {
        self.mtx.lock().unwrap().windows.clone()
    }

    /// Number of times chip select went low.
    pub(crate) fn cs_windows(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Cs(PinState::Low))
            .count()
    }

    /// Chip select is high, or has never been driven.
    pub(crate) fn cs_high(&self) -> bool {
        let lock = self.mtx.lock().unwrap();
        lock.current.is_none()
            && lock
                .events
                .iter()
                .rev()
                .find(|e| matches!(e, Event::Cs(_)))
                .is_none_or(|e| *e == Event::Cs(PinState::High))
    }

    pub(crate) fn resets(&self) -> u32 {
        self.mtx.lock().unwrap().resets
    }

    pub(crate) fn manufacturer_id(&self) -> u8 {
        self.mtx.lock().unwrap().manufacturer_id
    }

    pub(crate) fn jedec_id(&self) -> [u8; 3] {
        self.mtx.lock().unwrap().jedec_id
    }

    pub(crate) fn unique_id(&self) -> [u8; 8] {
        self.mtx.lock().unwrap().unique_id
    }

    pub(crate) fn status(&self) -> [u8; 3] {
        self.mtx.lock().unwrap().status
    }
}

pub(crate) struct SimSpi {
    mtx: Arc<Mutex<SimState>>,
}

impl ErrorType for SimSpi {
    type Error = SimError;
}

impl SpiBus<u8> for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.spi_call()?;
        lock.events.push(Event::Read(words.len()));
        let response = if lock.current.is_some() {
            lock.response(words.len())
        } else {
            vec![0xFF; words.len()]
        };
        if let Some(window) = lock.current.as_mut() {
            window.read += words.len();
        }
        words.copy_from_slice(&response);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.spi_call()?;
        lock.events.push(Event::Write(words.to_vec()));
        if let Some(window) = lock.current.as_mut() {
            window.write.extend_from_slice(words);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.write(words)?;
        self.read(words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.spi_call()?;
        lock.events.push(Event::Flush);
        Ok(())
    }
}

impl SpiController for SimSpi {
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32, Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.spi_call()?;
        let actual = frequency_hz.min(SIM_MAX_FREQUENCY);
        lock.events.push(Event::Frequency(actual));
        Ok(actual)
    }

    fn set_format(&mut self, format: SpiFormat) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.spi_call()?;
        lock.events.push(Event::Format(format));
        Ok(())
    }
}

pub(crate) struct SimGpio {
    mtx: Arc<Mutex<SimState>>,
}

impl GpioController for SimGpio {
    type Error = SimError;

    fn assign_bus_function(&mut self, pin: Pin) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.gpio_call()?;
        lock.events.push(Event::BusFunction(pin));
        Ok(())
    }

    fn configure_outputs(&mut self, mask: u32) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.gpio_call()?;
        lock.events.push(Event::Outputs(mask));
        Ok(())
    }

    fn set(&mut self, pin: Pin, state: PinState) -> Result<(), Self::Error> {
        let mut lock = self.mtx.lock().unwrap();
        lock.gpio_call()?;
        let event = match pin {
            p if p == PINS.cs => {
                lock.chip_select(state);
                Event::Cs(state)
            }
            p if p == PINS.hold => Event::Hold(state),
            p if p == PINS.wp => Event::Wp(state),
            _ => return Err(SimError),
        };
        lock.events.push(event);
        Ok(())
    }
}

pub(crate) struct SimDelay {
    mtx: Arc<Mutex<SimState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.mtx.lock().unwrap().events.push(Event::DelayNs(ns));
    }
}
