use core::fmt;

use derive_more::Display;
use nexum_tag_core::TagError;

use crate::clock::Expiry;
use crate::crypto::TicketMac;
use crate::keys::Uid;
use crate::record::RecordKind;

/// Outcome of a successful issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("Successfully issued\nNew amount of rides available: {remaining}")]
pub struct IssueReceipt {
    /// Rides available on the card after issuing
    pub remaining: u16,
    /// Rides left over from the previous ticket and added to the new one
    pub carried_forward: u16,
    /// Whether the card was blank before this issue
    pub fresh_card: bool,
}

/// Outcome of a successful ride validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideReceipt {
    /// Rides left after this one
    pub remaining: u16,
    /// End of the validity window
    pub expiry: Expiry,
    /// Whether this ride started the validity window
    pub activated: bool,
    /// Set when the ride was granted but the counter could not be advanced
    pub counter_error: Option<TagError>,
}

impl RideReceipt {
    /// Whether the ride was recorded on the card
    pub const fn is_recorded(&self) -> bool {
        self.counter_error.is_none()
    }
}

impl fmt::Display for RideReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rides left: {}\nExpiry time: {}",
            self.remaining, self.expiry
        )?;
        if let Some(error) = &self.counter_error {
            write!(f, "\nFailed to increment counter: {error}")?;
        }
        Ok(())
    }
}

/// Read-only view of a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSnapshot {
    /// Card UID
    pub uid: Uid,
    /// One-way counter
    pub counter: u16,
    /// Record kind the counter snapshot points to
    pub kind: RecordKind,
    /// Ride ceiling
    pub max_rides: u16,
    /// Expiry, once activated
    pub expiry: Option<Expiry>,
    /// MAC stored for the current kind
    pub mac: TicketMac,
    /// Whether the stored MAC matches the record
    pub mac_valid: bool,
    /// First page requiring authentication for writes
    pub auth0: u8,
}

impl TicketSnapshot {
    /// Rides left according to the card, whether or not the MAC holds
    pub const fn remaining(&self) -> u16 {
        self.max_rides.saturating_sub(self.counter)
    }

    /// Whether the card has been issued by a ticket machine
    pub const fn is_issued(&self) -> bool {
        self.auth0 <= crate::layout::PageLayout::FIRST_PROTECTED_PAGE
    }
}
