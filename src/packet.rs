use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAC_REPETITIONS: usize = 16;

/// A magic packet is a 6-byte sync header followed by the target MAC
/// repeated 16 times.
pub const MAGIC_PACKET_LEN: usize = 6 + 6 * MAC_REPETITIONS;

const SYNC_HEADER: [u8; 6] = [ 0xff, 0xff, 0xff, 0xff, 0xff, 0xff ];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MacParseError {
    #[error("expected 6 bytes, got {0}")]
    InvalidMacLength(usize),

    #[error("'{0}' is not a valid MAC address")]
    InvalidFormat(String),
}

/// An EUI-48 hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Fails on anything other than exactly 6 bytes, never truncates or
    /// pads.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MacParseError> {
        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| MacParseError::InvalidMacLength(bytes.len()))?;
        Ok(Self(octets))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Parses EUI-48 notation with either colons or hyphens as the
    /// separator, e.g. `aa:bb:cc:dd:ee:ff` or `AA-BB-CC-DD-EE-FF`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MacParseError::InvalidFormat(s.to_string());

        let mut octets = Vec::with_capacity(6);
        for group in s.split([':', '-']) {
            if group.len() != 2 {
                return Err(invalid());
            }
            octets.push(u8::from_str_radix(group, 16).map_err(|_| invalid())?);
        }

        Self::from_bytes(&octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

/// The Wake-on-LAN payload for one target.
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(mac: MacAddress) -> Self {
        let mut packet = [0u8; MAGIC_PACKET_LEN];
        packet[..6].copy_from_slice(&SYNC_HEADER);
        for block in packet[6..].chunks_exact_mut(6) {
            block.copy_from_slice(mac.as_bytes());
        }
        Self(packet)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[test]
fn test_packet_layout() {
    let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
    let pkt = MagicPacket::new(mac);

    assert_eq!(pkt.as_bytes().len(), 102);
    assert_eq!(&pkt.as_bytes()[..6], &[0xff; 6]);
    for i in 0..16 {
        let start = 6 + i * 6;
        assert_eq!(
            &pkt.as_bytes()[start..start + 6],
            &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff],
        );
    }
}

#[test]
fn test_packet_deterministic() {
    let mac: MacAddress = "12:34:56:78:9a:bc".parse().unwrap();
    assert_eq!(MagicPacket::new(mac).as_bytes(), MagicPacket::new(mac).as_bytes());
}

#[test]
fn test_from_bytes_wrong_length() {
    assert_eq!(
        MacAddress::from_bytes(&[0xaa; 5]),
        Err(MacParseError::InvalidMacLength(5)),
    );
    assert_eq!(
        MacAddress::from_bytes(&[0xaa; 7]),
        Err(MacParseError::InvalidMacLength(7)),
    );
    assert!(MacAddress::from_bytes(&[0xaa; 6]).is_ok());
}

#[test]
fn test_parse_gibberish() {
    assert!("hello".parse::<MacAddress>().is_err());
    assert!("he:js:an:cc:dd:ee".parse::<MacAddress>().is_err());
}

#[test]
fn test_parse_wrong_length() {
    assert!("ab:cd".parse::<MacAddress>().is_err());
    assert!("ab:cd:ab:cd:ab:cd:ab".parse::<MacAddress>().is_err());
    assert!("aab:cd:ab:cd:ab:cd".parse::<MacAddress>().is_err());
}

#[test]
fn test_parse_separators() {
    let colons: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
    let hyphens: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
    let mixed: MacAddress = "aa-bb:cc-dd-ee-ff".parse().unwrap();
    assert_eq!(colons, hyphens);
    assert_eq!(colons, mixed);
}

#[test]
fn test_display_lowercase_colons() {
    let mac: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
    assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
}
