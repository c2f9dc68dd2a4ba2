//! Page layout of an issued ticket
//!
//! Every ticket page is placed relative to [`RECORD_ANCHOR_PAGE`]. Moving the
//! anchor moves the MACs, the record and the protection boundary together.

use nexum_tag_core::{PageSpan, ultralight_c};

/// Page holding the ride ceiling, the highest page of the ticket record
pub const RECORD_ANCHOR_PAGE: u8 = 39;

/// Page addresses of the ticket fields
#[derive(Debug, Clone, Copy)]
pub struct PageLayout;

impl PageLayout {
    /// Card serial number, read as 8 bytes
    pub const UID: PageSpan = ultralight_c::UID;

    /// Ride ceiling: u16 little endian, bytes 2..4 zero
    pub const MAX_RIDES: PageSpan = PageSpan::single(RECORD_ANCHOR_PAGE);

    /// Copy of the counter page taken at issue time
    pub const COUNTER_INIT_STATE: PageSpan = PageSpan::single(RECORD_ANCHOR_PAGE - 1);

    /// Expiry in minutes since the Unix epoch, u32 big endian
    ///
    /// Shares its page with [`Self::COUNTER_INIT_STATE`]: activation overwrites the
    /// snapshot.
    pub const EXPIRY_TIME: PageSpan = PageSpan::single(RECORD_ANCHOR_PAGE - 1);

    /// Truncated MAC over the unactivated record
    pub const MAC_UNACTIVATED: PageSpan = PageSpan::single(RECORD_ANCHOR_PAGE - 2);

    /// Truncated MAC over the activated record
    pub const MAC_ACTIVATED: PageSpan = PageSpan::single(RECORD_ANCHOR_PAGE - 3);

    /// Pages covered by the record MAC, for both record kinds
    pub const RECORD: PageSpan = PageSpan::new(RECORD_ANCHOR_PAGE - 1, 2);

    /// Lowest page written by the ticket; writes from here up require authentication
    pub const FIRST_PROTECTED_PAGE: u8 = Self::MAC_ACTIVATED.start();

    /// One-way hardware counter
    pub const COUNTER: PageSpan = PageSpan::single(ultralight_c::COUNTER_PAGE);

    /// Authentication key slot
    pub const KEY: PageSpan = ultralight_c::KEY;

    /// Protection boundary page
    pub const AUTH0: PageSpan = PageSpan::single(ultralight_c::AUTH0_PAGE);

    /// Protection mode page
    pub const AUTH1: PageSpan = PageSpan::single(ultralight_c::AUTH1_PAGE);
}
