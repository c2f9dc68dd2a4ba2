use core::fmt;

use bytes::Bytes;
use hmac::{Hmac, Mac};
use nexum_tag_core::{PAGE_SIZE, Page};
use sha2::Sha256;

/// Length of every key stored on or derived for a card
pub const KEY_LEN: usize = 16;

/// Length of the MAC stored on the card
pub const TICKET_MAC_LEN: usize = PAGE_SIZE;

/// Errors raised by the MAC primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MacError {
    /// The primitive refused the key
    #[error("MAC key rejected: {0} bytes")]
    InvalidKeyLength(usize),

    /// The primitive produced less output than the caller needs
    #[error("MAC output too short: need {needed} bytes, got {actual}")]
    OutputTooShort {
        /// Bytes required
        needed: usize,
        /// Bytes produced
        actual: usize,
    },
}

/// Keyed, deterministic MAC over a byte sequence
///
/// Implementations must return at least [`KEY_LEN`] bytes, the longest prefix the
/// ticket protocol uses.
pub trait MacPrimitive: fmt::Debug {
    /// Compute the MAC of `message` under `key`
    fn compute_mac(&self, key: &[u8], message: &[u8]) -> Result<Bytes, MacError>;
}

/// HMAC-SHA256
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256;

impl MacPrimitive for HmacSha256 {
    fn compute_mac(&self, key: &[u8], message: &[u8]) -> Result<Bytes, MacError> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
            .map_err(|_| MacError::InvalidKeyLength(key.len()))?;
        mac.update(message);
        Ok(Bytes::copy_from_slice(&mac.finalize().into_bytes()))
    }
}

/// Keep the first `N` bytes of a MAC output
pub(crate) fn truncate<const N: usize>(output: &[u8]) -> Result<[u8; N], MacError> {
    output
        .get(..N)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or(MacError::OutputTooShort {
            needed: N,
            actual: output.len(),
        })
}

/// Truncated MAC as stored in a single tag page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketMac([u8; TICKET_MAC_LEN]);

impl TicketMac {
    /// Wrap a MAC read from the tag
    pub const fn from_page(page: Page) -> Self {
        Self(page)
    }

    /// Page encoding
    pub const fn to_page(self) -> Page {
        self.0
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; TICKET_MAC_LEN] {
        &self.0
    }
}

impl fmt::Display for TicketMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Compute the MAC stored on the card for a record
///
/// # Arguments
/// * `mac` - The MAC primitive
/// * `key` - The card's diversified MAC key
/// * `record` - The record bytes exactly as they sit on the tag
///
/// # Returns
/// The first four bytes of the primitive's output.
pub fn ticket_mac<M: MacPrimitive + ?Sized>(
    mac: &M,
    key: &[u8],
    record: &[u8],
) -> Result<TicketMac, MacError> {
    let output = mac.compute_mac(key, record)?;
    truncate(&output).map(TicketMac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_vector() {
        let mac = HmacSha256
            .compute_mac(b"key", b"The quick brown fox jumps over the lazy dog")
            .unwrap();
        assert_eq!(
            hex::encode(&mac),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_ticket_mac_is_prefix() {
        let mac = ticket_mac(&HmacSha256, b"key", b"The quick brown fox jumps over the lazy dog")
            .unwrap();
        assert_eq!(mac.to_page(), [0xf7, 0xbc, 0x83, 0xf4]);
        assert_eq!(mac.to_string(), "f7bc83f4");
    }

    #[test]
    fn test_single_byte_flip_changes_mac() {
        let key = [0x42; KEY_LEN];
        let record = hex::decode("0700000005000000").unwrap();
        let expected = ticket_mac(&HmacSha256, &key, &record).unwrap();

        for i in 0..record.len() {
            let mut flipped = record.clone();
            flipped[i] ^= 0x01;
            assert_ne!(ticket_mac(&HmacSha256, &key, &flipped).unwrap(), expected);
        }
    }

    #[test]
    fn test_short_output_is_an_error() {
        #[derive(Debug)]
        struct Crc8;

        impl MacPrimitive for Crc8 {
            fn compute_mac(&self, _key: &[u8], _message: &[u8]) -> Result<Bytes, MacError> {
                Ok(Bytes::from_static(&[0xAB]))
            }
        }

        assert_eq!(
            ticket_mac(&Crc8, &[0; KEY_LEN], b"record"),
            Err(MacError::OutputTooShort {
                needed: 4,
                actual: 1
            })
        );
    }
}
