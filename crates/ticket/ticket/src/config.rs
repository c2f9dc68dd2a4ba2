//! Ticket machine configuration

use serde::{Deserialize, Serialize};

use crate::keys::CardKey;

/// Development master keys shipped as defaults
///
/// Any deployment must override them; [`TicketConfig::uses_development_keys`]
/// reports when it has not.
pub mod dev {
    use crate::keys::CardKey;

    /// Master key for the diversified authentication key
    pub const AUTH_MASTER_KEY: CardKey = CardKey::new(*b"nxm-ticket-auth0");
    /// Master key for the diversified MAC key
    pub const MAC_MASTER_KEY: CardKey = CardKey::new(*b"nxm-ticket-mac00");
    /// Key of the diversification MAC
    pub const HASH_KEY: CardKey = CardKey::new(*b"nxm-ticket-hash0");
}

/// Errors in the ticket configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A key is neither 16 ASCII characters nor 32 hex digits
    #[error("Keys must be 16 ASCII characters or 32 hex digits")]
    InvalidKey,

    /// Two roles share the same key
    #[error("{0} and {1} must differ")]
    SharedKey(&'static str, &'static str),

    /// Issuing zero rides
    #[error("At least one ride must be issued")]
    NoRides,

    /// A zero-length validity window
    #[error("The validity period must be at least 1 minute")]
    NoValidity,

    /// Issuing with a validity period other than the configured one
    #[error("Validity period of {requested} minutes requested, the machine is configured for {configured}")]
    ValidityMismatch {
        /// Minutes asked for
        requested: u32,
        /// Minutes in the configuration
        configured: u32,
    },
}

/// Keys and policy values of a ticket machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    /// Key a blank card answers to
    pub default_auth_key: CardKey,
    /// Master key for the per-card authentication key
    pub auth_master_key: CardKey,
    /// Master key for the per-card MAC key
    pub mac_master_key: CardKey,
    /// Key of the diversification MAC
    pub hash_key: CardKey,
    /// Rides added by an issue when the operator gives no count
    pub rides_per_issue: u16,
    /// Minutes a ticket stays valid after its first use
    pub validity_period: u32,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            default_auth_key: CardKey::new(nexum_tag_core::FACTORY_KEY),
            auth_master_key: dev::AUTH_MASTER_KEY,
            mac_master_key: dev::MAC_MASTER_KEY,
            hash_key: dev::HASH_KEY,
            rides_per_issue: 5,
            validity_period: 1,
        }
    }
}

impl TicketConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_master_key == self.mac_master_key {
            return Err(ConfigError::SharedKey("auth_master_key", "mac_master_key"));
        }
        if self.auth_master_key == self.default_auth_key {
            return Err(ConfigError::SharedKey("auth_master_key", "default_auth_key"));
        }
        if self.rides_per_issue == 0 {
            return Err(ConfigError::NoRides);
        }
        if self.validity_period == 0 {
            return Err(ConfigError::NoValidity);
        }
        Ok(())
    }

    /// Whether any master key is still a development default
    pub fn uses_development_keys(&self) -> bool {
        self.auth_master_key == dev::AUTH_MASTER_KEY
            || self.mac_master_key == dev::MAC_MASTER_KEY
            || self.hash_key == dev::HASH_KEY
    }
}
