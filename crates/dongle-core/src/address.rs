//! 7-bit I2C slave addresses.

use crate::error::{DongleError, DongleResult};
use std::fmt;

/// A 7-bit I2C slave address.
///
/// Address 0 is reserved as a sentinel for the non-addressed Sensibus
/// protocol spoken by Sensirion SHT7x sensors: adapters emit no address byte
/// and skip the acknowledgment wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlaveAddress(u8);

impl SlaveAddress {
    pub const MAX: u8 = 0x7F;

    /// Sentinel for Sensibus transactions.
    pub const SENSIBUS: Self = Self(0);

    pub fn new(raw: u8) -> DongleResult<Self> {
        if raw > Self::MAX {
            return Err(DongleError::InvalidAddress(raw));
        }
        Ok(Self(raw))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_sensibus(self) -> bool {
        self.0 == 0
    }

    /// Address byte with the R/W bit cleared.
    pub const fn write_byte(self) -> u8 {
        self.0 << 1
    }

    /// Address byte with the R/W bit set.
    pub const fn read_byte(self) -> u8 {
        (self.0 << 1) | 1
    }
}

impl TryFrom<u8> for SlaveAddress {
    type Error = DongleError;

    fn try_from(raw: u8) -> DongleResult<Self> {
        Self::new(raw)
    }
}

impl fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_bytes() -> Result<(), DongleError> {
        let addr = SlaveAddress::new(0x48)?;
        assert_eq!(addr.write_byte(), 0x90);
        assert_eq!(addr.read_byte(), 0x91);
        assert_eq!(addr.to_string(), "0x48");
        Ok(())
    }

    #[test]
    fn test_rejects_eight_bit_address() {
        assert!(matches!(
            SlaveAddress::new(0x80),
            Err(DongleError::InvalidAddress(0x80))
        ));
        assert!(SlaveAddress::try_from(SlaveAddress::MAX).is_ok());
    }

    #[test]
    fn test_sensibus_sentinel() -> Result<(), DongleError> {
        assert!(SlaveAddress::new(0)?.is_sensibus());
        assert_eq!(SlaveAddress::SENSIBUS.read_byte(), 0x01);
        assert!(!SlaveAddress::new(0x44)?.is_sensibus());
        Ok(())
    }
}
