//! Transit ticket protocol for page-addressable NFC tags
//!
//! A ticket lives in a handful of pages of a MIFARE Ultralight C: a ride ceiling,
//! a counter snapshot that becomes an expiry time on first use, and a truncated
//! MAC for each of the two record kinds. The tag's one-way counter counts rides.
//!
//! - [`TicketMachine`] runs the issue and use flows against any [`TagMemory`].
//! - [`KeyDiversifier`] derives the per-card authentication and MAC keys from
//!   master keys and the card UID, so a key read off one card is useless on another.
//! - [`PageLayout`] fixes where every field lives on the tag.
//!
//! ```no_run
//! use nexum_tag_core::UltralightC;
//! use nexum_ticket::{TicketConfig, TicketMachine};
//!
//! let config = TicketConfig::default();
//! let mut machine = TicketMachine::new(UltralightC::random(), &config)?;
//! machine.issue(config.rides_per_issue, config.validity_period)?;
//! let ride = machine.use_ticket()?;
//! println!("{ride}");
//! # Ok::<(), nexum_ticket::Error>(())
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use nexum_tag_core::{TagError, TagMemory};

pub mod clock;
pub mod config;
pub mod crypto;
mod error;
pub mod keys;
pub mod layout;
pub mod record;
pub mod state;
mod ticket;
mod types;

pub use clock::{Clock, Expiry, ManualClock, SystemClock};
pub use config::{ConfigError, TicketConfig};
pub use crypto::{HmacSha256, MacError, MacPrimitive, TicketMac};
pub use error::{Error, Result, Step};
pub use keys::{CardKey, KeyDiversifier, Uid};
pub use layout::{PageLayout, RECORD_ANCHOR_PAGE};
pub use record::{Record, RecordKind};
pub use state::TicketState;
pub use ticket::TicketMachine;
pub use types::{IssueReceipt, RideReceipt, TicketSnapshot};
