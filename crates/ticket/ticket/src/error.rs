use derive_more::Display;
use nexum_tag_core::TagError;

use crate::clock::Expiry;
use crate::config::ConfigError;
use crate::crypto::MacError;
use crate::record::RecordKind;

/// Result type for ticket operations
pub type Result<T> = std::result::Result<T, Error>;

/// The protocol step during which a tag operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Step {
    /// Reading the serial number pages
    #[display("reading the UID")]
    ReadUid,
    /// Writing the diversified key into the key pages
    #[display("writing the authentication key")]
    WriteKey,
    /// Reading AUTH0 or AUTH1
    #[display("reading the page protection")]
    ReadProtection,
    /// Writing AUTH0 and AUTH1
    #[display("enabling page protection")]
    ConfigureProtection,
    /// Reading the one-way counter
    #[display("reading the counter")]
    ReadCounter,
    /// Reading the counter snapshot taken at issue
    #[display("reading the counter init state")]
    ReadCounterInitState,
    /// Reading the pages a MAC covers
    #[display("reading the {_0} record")]
    ReadRecord(RecordKind),
    /// Reading a stored MAC
    #[display("reading the {_0} MAC")]
    ReadMac(RecordKind),
    /// Writing the ride ceiling
    #[display("writing max rides")]
    WriteMaxRides,
    /// Snapshotting the counter at issue
    #[display("writing the counter init state")]
    WriteCounterInitState,
    /// Writing the expiry on activation
    #[display("writing the expiry time")]
    WriteExpiry,
    /// Writing a MAC
    #[display("writing the {_0} MAC")]
    WriteMac(RecordKind),
}

/// Error type for ticket operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Neither the diversified key nor the factory key was accepted
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// A tag read failed
    #[error("Failed {step}: {source}")]
    TagRead {
        /// Step that was running
        step: Step,
        /// Underlying tag error
        #[source]
        source: TagError,
    },

    /// A tag write failed
    #[error("Failed {step}: {source}")]
    TagWrite {
        /// Step that was running
        step: Step,
        /// Underlying tag error
        #[source]
        source: TagError,
    },

    /// The stored MAC does not match the record
    #[error("Invalid card data")]
    MacMismatch {
        /// Record kind that was checked
        kind: RecordKind,
    },

    /// All rides on the ticket have been used
    #[error("No rides left")]
    NoUsesRemaining,

    /// The validity window has passed
    #[error("Expiry time exceeded ({expiry})")]
    Expired {
        /// Stored expiry
        expiry: Expiry,
    },

    /// Keys were requested before the UID was read
    #[error("Card UID has not been read")]
    MissingUid,

    /// Validation was attempted before the named data was loaded
    #[error("Ticket data not loaded: {0}")]
    NotLoaded(&'static str),

    /// The record read from the tag has the wrong size
    #[error("Malformed {kind} record: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        /// Record kind being decoded
        kind: RecordKind,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// The new ride ceiling does not fit the 16-bit max-rides field
    #[error("Ride ceiling would exceed {}", u16::MAX)]
    RideCeilingOverflow,

    /// MAC primitive failure
    #[error(transparent)]
    Mac(#[from] MacError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Check if the error comes from talking to the tag rather than from its content
    pub const fn is_tag_failure(&self) -> bool {
        matches!(self, Self::TagRead { .. } | Self::TagWrite { .. })
    }

    /// Check if the error is a verdict on the ticket itself
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MacMismatch { .. } | Self::NoUsesRemaining | Self::Expired { .. }
        )
    }
}

/// Attach the running protocol step to tag results
pub(crate) trait TagResultExt<T> {
    /// Map a failed read to [`Error::TagRead`]
    fn read_step(self, step: Step) -> Result<T>;

    /// Map a failed write to [`Error::TagWrite`]
    fn write_step(self, step: Step) -> Result<T>;
}

impl<T> TagResultExt<T> for std::result::Result<T, TagError> {
    fn read_step(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::TagRead { step, source })
    }

    fn write_step(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::TagWrite { step, source })
    }
}
