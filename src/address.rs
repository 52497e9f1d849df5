use core::fmt;

use crate::{SinkError, constants::ADDRESS_STRING_LENGTH};

/// A Bluetooth Device Address (`BD_ADDR`) identifying a remote sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BluetoothAddress(pub [u8; 6]);

/// Textual form of an address as it travels through requests and events
pub type AddressText = heapless::String<ADDRESS_STRING_LENGTH>;

impl BluetoothAddress {
    /// Create a new Bluetooth address from bytes
    #[must_use]
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    /// Get the raw address bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Format the address as a colon-separated upper-case hex string
    #[must_use]
    pub fn format_hex(&self) -> AddressText {
        const HEX_CHARS: [char; 16] = [
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F',
        ];
        let mut result = AddressText::new();
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                result.push(':').ok();
            }
            result.push(HEX_CHARS[(byte >> 4) as usize]).ok();
            result.push(HEX_CHARS[(byte & 0x0F) as usize]).ok();
        }
        result
    }

    /// Parse a Bluetooth address from a colon-separated hex string
    ///
    /// Both upper and lower case digits are accepted.
    ///
    /// # Errors
    /// Returns [`SinkError::InvalidAddress`] unless the string is exactly six
    /// colon-separated pairs of hex digits.
    pub fn from_hex(hex: &str) -> Result<Self, SinkError> {
        if hex.len() != ADDRESS_STRING_LENGTH {
            return Err(SinkError::InvalidAddress);
        }

        let mut bytes = [0u8; 6];
        let mut count = 0;
        for (i, pair) in hex.split(':').enumerate() {
            if i >= 6 || pair.len() != 2 || !pair.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(SinkError::InvalidAddress);
            }
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| SinkError::InvalidAddress)?;
            count += 1;
        }
        if count != 6 {
            return Err(SinkError::InvalidAddress);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_hex())
    }
}

impl From<[u8; 6]> for BluetoothAddress {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl From<BluetoothAddress> for [u8; 6] {
    fn from(addr: BluetoothAddress) -> Self {
        addr.0
    }
}

impl From<BluetoothAddress> for bt_hci::param::BdAddr {
    fn from(addr: BluetoothAddress) -> Self {
        bt_hci::param::BdAddr::new(addr.0)
    }
}

impl From<BluetoothAddress> for AddressText {
    fn from(addr: BluetoothAddress) -> Self {
        addr.format_hex()
    }
}

impl TryFrom<&str> for BluetoothAddress {
    type Error = SinkError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        BluetoothAddress::from_hex(hex)
    }
}

impl TryFrom<&[u8]> for BluetoothAddress {
    type Error = SinkError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let addr: [u8; 6] = bytes.try_into().map_err(|_| SinkError::InvalidAddress)?;
        Ok(BluetoothAddress(addr))
    }
}

impl TryFrom<bt_hci::param::BdAddr> for BluetoothAddress {
    type Error = SinkError;

    fn try_from(bd_addr: bt_hci::param::BdAddr) -> Result<Self, Self::Error> {
        bd_addr.raw().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn test_bluetooth_address_format_hex() {
        let addr = BluetoothAddress::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(addr.format_hex().as_str(), "12:34:56:78:9A:BC");

        let addr_mixed = BluetoothAddress::new([0x0A, 0xB1, 0x2C, 0xD3, 0x4E, 0xF5]);
        assert_eq!(addr_mixed.format_hex().as_str(), "0A:B1:2C:D3:4E:F5");
    }

    #[test]
    fn test_bluetooth_address_display_matches_hex() {
        let addr = BluetoothAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let mut out: heapless::String<32> = heapless::String::new();
        write!(out, "{addr}").unwrap();
        assert_eq!(out.as_str(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_bluetooth_address_parse_accepts_both_cases() {
        let upper = BluetoothAddress::from_hex("AA:BB:CC:DD:EE:FF").unwrap();
        let lower = BluetoothAddress::from_hex("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_bluetooth_address_rejects_malformed() {
        for bad in [
            "",
            "AA:BB:CC:DD:EE",
            "AA:BB:CC:DD:EE:FF:00",
            "AA-BB-CC-DD-EE-FF",
            "AABB:CC:DD:EE:FF:0",
            "GG:BB:CC:DD:EE:FF",
            "AA:BB:CC:DD:EE:+F",
            "AA::BBCC:DD:EE:FF",
        ] {
            assert_eq!(
                BluetoothAddress::from_hex(bad),
                Err(SinkError::InvalidAddress),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_bluetooth_address_conversions() {
        let bytes = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];

        let addr: BluetoothAddress = bytes.into();
        assert_eq!(addr.as_bytes(), &bytes);

        let converted_bytes: [u8; 6] = addr.into();
        assert_eq!(converted_bytes, bytes);

        let bd_addr: bt_hci::param::BdAddr = addr.into();
        assert_eq!(bd_addr.raw(), bytes);
        assert_eq!(BluetoothAddress::try_from(bd_addr), Ok(addr));

        let hex_string: AddressText = addr.into();
        assert_eq!(hex_string.as_str(), "12:34:56:78:9A:BC");
    }

    #[test]
    fn test_bluetooth_address_try_from_slice() {
        let bytes = &[0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC][..];
        let addr = BluetoothAddress::try_from(bytes).unwrap();
        assert_eq!(addr.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert!(BluetoothAddress::try_from(&[0x12u8, 0x34, 0x56][..]).is_err());
        assert!(BluetoothAddress::try_from(&[0u8; 8][..]).is_err());
    }
}
