//! Status register views.
//!
//! The registers are only ever built from a byte the device returned for a
//! status read. Bit layouts follow the common 25-series layout.
use bitfield_struct::bitfield;

/// Status register 1 (opcode 0x05).
#[bitfield(u8, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct StatusRegister1 {
    /// (BUSY) an erase, program or status write is in progress.
    pub busy: bool,
    /// (WEL) write enable latch is set.
    pub write_enable_latch: bool,
    /// (BP0..BP2) block protect bits.
    #[bits(3)]
    pub block_protect: u8,
    /// (TB) block protect counts from the bottom of the array.
    pub top_bottom_protect: bool,
    /// (SEC) block protect works on 4KB sectors instead of 64KB blocks.
    pub sector_protect: bool,
    /// (SRP) status register protect.
    pub status_register_protect: bool,
}

impl StatusRegister1 {
    pub const BUSY_MASK: u8 = 1 << 0;
}

/// Status register 2 (opcode 0x35).
#[bitfield(u8, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct StatusRegister2 {
    /// (SRL) status register lock.
    pub status_register_lock: bool,
    /// (QE) quad enable.
    pub quad_enable: bool,
    #[bits(1)]
    __reserved: u8,
    /// (LB1..LB3) security register lock bits.
    #[bits(3)]
    pub security_lock: u8,
    /// (CMP) complement protect.
    pub complement_protect: bool,
    /// (SUS) an erase or program is suspended.
    pub suspended: bool,
}

/// Status register 3 (opcode 0x15).
#[bitfield(u8, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct StatusRegister3 {
    #[bits(2)]
    __reserved_low: u8,
    /// (WPS) individual block/sector write protect scheme.
    pub write_protect_selection: bool,
    #[bits(2)]
    __reserved_mid: u8,
    /// (DRV0, DRV1) output driver strength.
    #[bits(2)]
    pub driver_strength: u8,
    #[bits(1)]
    __reserved_high: u8,
}
