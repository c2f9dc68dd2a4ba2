//! Card keys and per-card key diversification

use core::fmt;
use core::str::FromStr;

use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::ConfigError;
use crate::crypto::{KEY_LEN, MacError, MacPrimitive, truncate};

/// A 16-byte key: factory key, master key or diversified card key
///
/// Parsed from either 16 ASCII characters or 32 hex digits. Cleared on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardKey([u8; KEY_LEN]);

impl CardKey {
    /// Wrap raw key bytes
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Hex encoding of the key
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CardKey(<redacted>)")
    }
}

impl AsRef<[u8]> for CardKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for CardKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut key = [0u8; KEY_LEN];
        match s.len() {
            KEY_LEN if s.is_ascii() => key.copy_from_slice(s.as_bytes()),
            len if len == KEY_LEN * 2 => {
                hex::decode_to_slice(s, &mut key).map_err(|_| ConfigError::InvalidKey)?
            }
            _ => return Err(ConfigError::InvalidKey),
        }
        Ok(Self(key))
    }
}

impl TryFrom<String> for CardKey {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardKey> for String {
    fn from(key: CardKey) -> Self {
        match core::str::from_utf8(&key.0) {
            Ok(text) if key.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') => {
                text.to_string()
            }
            _ => key.to_hex(),
        }
    }
}

/// Card serial number as read from pages 0 and 1, check byte included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid([u8; 8]);

impl Uid {
    /// Wrap the 8 bytes read from the UID pages
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Uid {
    type Error = crate::Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        value
            .try_into()
            .map(Self)
            .map_err(|_| crate::Error::MissingUid)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Derives per-card keys from master keys and the card UID
///
/// `key = first 16 bytes of MAC(hash_key, master || uid)`
#[derive(Debug, Clone)]
pub struct KeyDiversifier {
    hash_key: CardKey,
}

impl KeyDiversifier {
    /// Create a diversifier keyed with `hash_key`
    pub const fn new(hash_key: CardKey) -> Self {
        Self { hash_key }
    }

    /// Derive the key for the card with `uid` from `master`
    pub fn diversify<M: MacPrimitive + ?Sized>(
        &self,
        mac: &M,
        master: &CardKey,
        uid: &Uid,
    ) -> Result<CardKey, MacError> {
        let mut message = [0u8; KEY_LEN + 8];
        message[..KEY_LEN].copy_from_slice(master.as_bytes());
        message[KEY_LEN..].copy_from_slice(uid.as_bytes());

        let output = mac.compute_mac(self.hash_key.as_bytes(), &message);
        message.zeroize();
        let key = truncate::<KEY_LEN>(&output?).map(CardKey)?;
        trace!(%uid, "Diversified card key");
        Ok(key)
    }
}
