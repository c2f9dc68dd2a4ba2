//! Error types for tag memory access

/// Result type for tag operations
pub type Result<T> = core::result::Result<T, TagError>;

/// Tag error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The tag left the field (or the reader lost it)
    #[error("Tag removed from the field")]
    Removed,

    /// The tag did not answer in time
    #[error("Operation timed out")]
    Timeout,

    /// Access outside of the tag's page space
    #[error("Page range {start}..{end} is outside of the tag memory ({capacity} pages)")]
    OutOfRange {
        /// First page requested
        start: usize,
        /// One past the last page requested
        end: usize,
        /// Number of pages on the tag
        capacity: usize,
    },

    /// Write to a page that is read-only by construction (UID, serial number)
    #[error("Page {0} is read-only")]
    ReadOnly(u8),

    /// Write to a page protected by AUTH0/AUTH1 without prior authentication
    #[error("Page {0} is write-protected, authentication required")]
    WriteProtected(u8),

    /// Read of a page protected by AUTH0/AUTH1 without prior authentication
    #[error("Page {0} is read-protected, authentication required")]
    ReadProtected(u8),

    /// The tag rejected the key
    #[error("Authentication rejected by tag")]
    AuthenticationRejected,

    /// Incrementing the one-way counter would overflow it
    #[error("One-way counter overflow")]
    CounterOverflow,

    /// Data buffer does not match the number of pages to write
    #[error("Invalid data length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes
        expected: usize,
        /// Provided number of bytes
        actual: usize,
    },

    /// Negative acknowledgement with the raw NAK code
    #[error("Tag answered NAK {0:#04X}")]
    Nak(u8),
}

impl TagError {
    /// Check if this error means the tag is no longer reachable
    pub const fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Removed | Self::Timeout)
    }

    /// Check if this error is an access-control refusal that authentication would lift
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::WriteProtected(_) | Self::ReadProtected(_))
    }
}
