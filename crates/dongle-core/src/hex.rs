//! Hex formatting for wire dumps.

use std::fmt;

/// Displays bytes as space-separated two-digit uppercase hex (`90 00`).
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for byte in self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
            first = false;
        }
        Ok(())
    }
}
