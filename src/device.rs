//! Identity and status snapshots read from the device.
use crate::register::{StatusRegister1, StatusRegister2, StatusRegister3};
use core::fmt;

/// JEDEC identification (opcode 0x9F).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JedecId {
    pub manufacturer: u8,
    pub memory_type: u8,
    pub capacity: u8,
}

impl From<[u8; 3]> for JedecId {
    fn from(value: [u8; 3]) -> Self {
        let [manufacturer, memory_type, capacity] = value;
        JedecId {
            manufacturer,
            memory_type,
            capacity,
        }
    }
}

impl From<JedecId> for [u8; 3] {
    fn from(value: JedecId) -> Self {
        [value.manufacturer, value.memory_type, value.capacity]
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x} {:02x} {:02x}",
            self.manufacturer, self.memory_type, self.capacity
        )
    }
}

/// Snapshot of everything [`Flash::load_device_info`] reads.
///
/// [`Flash::load_device_info`]: crate::Flash::load_device_info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Answer to release power-down (0xAB) with three dummy bytes.
    pub manufacturer_id: u8,
    /// Reserved. No command the driver issues fills it, so it is always 0.
    pub device_id: u8,
    pub jedec_id: JedecId,
    pub unique_id: [u8; 8],
    pub status_register_1: StatusRegister1,
    pub status_register_2: StatusRegister2,
    pub status_register_3: StatusRegister3,
}

impl DeviceInfo {
    pub fn unique_id_u64(&self) -> u64 {
        u64::from_be_bytes(self.unique_id)
    }

    pub fn is_busy(&self) -> bool {
        self.status_register_1.busy()
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manufacturer ID: {:#04x}", self.manufacturer_id)?;
        writeln!(f, "Device ID: {:#04x}", self.device_id)?;
        writeln!(f, "JEDEC ID: {}", self.jedec_id)?;
        writeln!(f, "Unique ID: {:016x}", self.unique_id_u64())?;
        writeln!(
            f,
            "Status Register 1: {:#010b}",
            self.status_register_1.into_bits()
        )?;
        writeln!(
            f,
            "Status Register 2: {:#010b}",
            self.status_register_2.into_bits()
        )?;
        write!(
            f,
            "Status Register 3: {:#010b}",
            self.status_register_3.into_bits()
        )
    }
}

/// Identity a specific flash part is expected to report.
///
/// The values are part specific, so callers supply them for the chip that is
/// actually fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedIdentity {
    pub manufacturer_id: u8,
    /// Compared against [`DeviceInfo::device_id`] only when set.
    pub device_id: Option<u8>,
    pub memory_type: u8,
    pub capacity: u8,
}

impl ExpectedIdentity {
    /// Compare against a snapshot, logging every field that differs.
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        let mut ok = true;
        let mut check = |name: &str, expected: u8, actual: u8| {
            if expected != actual {
                log::warn!("{name} mismatch: expected {expected:#04x}, got {actual:#04x}");
                ok = false;
            }
        };
        check(
            "Manufacturer ID",
            self.manufacturer_id,
            info.manufacturer_id,
        );
        if let Some(device_id) = self.device_id {
            check("Device ID", device_id, info.device_id);
        }
        check("Memory type", self.memory_type, info.jedec_id.memory_type);
        check("Capacity", self.capacity, info.jedec_id.capacity);
        ok
    }
}
