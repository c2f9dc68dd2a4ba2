//! Wall clock and expiry timestamps
//!
//! Tickets store time at minute resolution: a 32-bit count of minutes since the
//! Unix epoch, big endian on the tag.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use nexum_tag_core::Page;

/// Source of the current time in minutes since the Unix epoch
pub trait Clock: fmt::Debug {
    /// Minutes elapsed since 1970-01-01T00:00Z
    fn now_minutes(&self) -> u32;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_minutes(&self) -> u32 {
        u32::try_from(Utc::now().timestamp() / 60).unwrap_or_default()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a handle kept outside a `TicketMachine` can
/// advance the machine's clock.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU32>);

impl ManualClock {
    /// Create a clock stopped at `minutes`
    pub fn new(minutes: u32) -> Self {
        Self(Arc::new(AtomicU32::new(minutes)))
    }

    /// Set the current time
    pub fn set(&self, minutes: u32) {
        self.0.store(minutes, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, minutes: u32) {
        self.0.fetch_add(minutes, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_minutes(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Expiry time of an activated ticket, in minutes since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expiry(u32);

impl Expiry {
    /// Wrap a raw minute count
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Expiry `period` minutes after `now`, saturating at the end of the 32-bit range
    pub const fn after(now: u32, period: u32) -> Self {
        Self(now.saturating_add(period))
    }

    /// Raw minute count
    pub const fn minutes(&self) -> u32 {
        self.0
    }

    /// Whether the ticket is still valid at `now`
    pub const fn is_valid_at(&self, now: u32) -> bool {
        self.0 >= now
    }

    /// Page encoding, big endian
    pub const fn to_page(self) -> Page {
        self.0.to_be_bytes()
    }

    /// Decode from the page encoding
    pub const fn from_page(page: Page) -> Self {
        Self(u32::from_be_bytes(page))
    }

    /// Expiry as a UTC timestamp
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.0) * 60, 0)
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M UTC")),
            None => write!(f, "{} minutes after the epoch", self.0),
        }
    }
}
