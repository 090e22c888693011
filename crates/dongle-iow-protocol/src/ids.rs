//! IO-Warrior USB identifiers and per-product report layout.

use crate::report::ReportCapacity;

/// Code Mercenaries USB Vendor ID.
pub const IOW_VENDOR_ID: u16 = 0x07C0;

/// Known IO-Warrior product IDs.
pub mod product_ids {
    pub const IOW40: u16 = 0x1500;
    pub const IOW24: u16 = 0x1501;
    pub const IOW24_SENSIRION: u16 = 0x158A;
    pub const IOW28: u16 = 0x1504;
    pub const IOW56: u16 = 0x1503;
    pub const IOW56_ALPHA: u16 = 0x158B;
    pub const POWER_VAMPIRE_1: u16 = 0x1511;
    pub const POWER_VAMPIRE_2: u16 = 0x1512;
}

/// Logical pipes (USB interfaces) of an IO-Warrior.
pub mod pipes {
    pub const IO_PINS: u8 = 0;
    /// Special-mode functions, I2C on most models.
    pub const SPECIAL_MODE: u8 = 1;
    /// Dedicated I2C interface of the IOW28.
    pub const I2C_MODE: u8 = 2;
    pub const ADC_MODE: u8 = 3;
}

pub fn device_name(product_id: u16) -> &'static str {
    match product_id {
        product_ids::IOW24 => "IO-Warrior24",
        product_ids::IOW24_SENSIRION => "IO-Warrior24-Sensirion",
        product_ids::IOW28 => "IO-Warrior28",
        product_ids::IOW40 => "IO-Warrior40",
        product_ids::IOW56 => "IO-Warrior56",
        _ => "IO-Warrior (unknown)",
    }
}

/// Report size and pipe used for I2C on a given product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLayout {
    pub capacity: ReportCapacity,
    pub pipe: u8,
}

impl ReportLayout {
    pub fn for_product(product_id: u16) -> Self {
        let capacity = match product_id {
            product_ids::IOW28 | product_ids::IOW56 => ReportCapacity::Long,
            _ => ReportCapacity::Short,
        };
        let pipe = if product_id == product_ids::IOW28 {
            pipes::I2C_MODE
        } else {
            pipes::SPECIAL_MODE
        };
        Self { capacity, pipe }
    }
}
