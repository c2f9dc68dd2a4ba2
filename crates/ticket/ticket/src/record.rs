//! Ticket records and their two kinds
//!
//! A record is the byte range covered by the ticket MAC. Issuing writes an
//! unactivated record (counter snapshot and ride ceiling); the first use turns it
//! into an activated record by replacing the snapshot with an expiry time.

use bytes::Bytes;
use derive_more::Display;
use nexum_tag_core::{PAGE_SIZE, Page, PageSpan};

use crate::clock::Expiry;
use crate::error::{Error, Result};
use crate::layout::PageLayout;

/// Lifecycle stage of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RecordKind {
    /// Issued, never used
    #[display("unactivated")]
    Unactivated,
    /// Used at least once, validity window running
    #[display("activated")]
    Activated,
}

impl RecordKind {
    /// Pages covered by the MAC of this kind
    pub const fn record_span(self) -> PageSpan {
        PageLayout::RECORD
    }

    /// Page holding the MAC of this kind
    pub const fn mac_span(self) -> PageSpan {
        match self {
            Self::Unactivated => PageLayout::MAC_UNACTIVATED,
            Self::Activated => PageLayout::MAC_ACTIVATED,
        }
    }
}

/// A record read from the tag, with its fields decoded for its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    kind: RecordKind,
    bytes: Bytes,
    max_rides: u16,
    expiry: Option<Expiry>,
    counter_init_state: Option<u16>,
}

impl Record {
    /// Decode `bytes` read from [`RecordKind::record_span`]
    pub fn decode(kind: RecordKind, bytes: Bytes) -> Result<Self> {
        let expected = kind.record_span().byte_len();
        if bytes.len() != expected {
            return Err(Error::MalformedRecord {
                kind,
                expected,
                actual: bytes.len(),
            });
        }

        let first = page_at(&bytes, 0);
        let last = page_at(&bytes, expected - PAGE_SIZE);

        let (expiry, counter_init_state) = match kind {
            RecordKind::Unactivated => (None, Some(decode_u16(first))),
            RecordKind::Activated => (Some(Expiry::from_page(first)), None),
        };

        Ok(Self {
            kind,
            bytes,
            max_rides: decode_u16(last),
            expiry,
            counter_init_state,
        })
    }

    /// Kind the record was decoded as
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Bytes covered by the MAC
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Ride ceiling
    pub const fn max_rides(&self) -> u16 {
        self.max_rides
    }

    /// Expiry, activated records only
    pub const fn expiry(&self) -> Option<Expiry> {
        self.expiry
    }

    /// Counter snapshot taken at issue time, unactivated records only
    pub const fn counter_init_state(&self) -> Option<u16> {
        self.counter_init_state
    }
}

fn page_at(bytes: &[u8], offset: usize) -> Page {
    let mut page = [0u8; PAGE_SIZE];
    page.copy_from_slice(&bytes[offset..offset + PAGE_SIZE]);
    page
}

/// Little-endian u16 from bytes 0..2 of a page (ride ceiling, counter)
pub const fn decode_u16(page: Page) -> u16 {
    u16::from_le_bytes([page[0], page[1]])
}

/// Page encoding of the ride ceiling
pub const fn encode_max_rides(max_rides: u16) -> Page {
    let [lo, hi] = max_rides.to_le_bytes();
    [lo, hi, 0x00, 0x00]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unactivated_decoding() {
        let bytes = Bytes::from(hex::decode("0300000008000000").unwrap());
        let record = Record::decode(RecordKind::Unactivated, bytes).unwrap();
        assert_eq!(record.counter_init_state(), Some(3));
        assert_eq!(record.max_rides(), 8);
        assert_eq!(record.expiry(), None);
    }

    #[test]
    fn test_activated_decoding() {
        let bytes = Bytes::from(hex::decode("01b2c3d40a010000").unwrap());
        let record = Record::decode(RecordKind::Activated, bytes).unwrap();
        assert_eq!(record.expiry(), Some(Expiry::from_minutes(0x01B2_C3D4)));
        assert_eq!(record.max_rides(), 0x010A);
        assert_eq!(record.counter_init_state(), None);
    }

    #[test]
    fn test_wrong_length() {
        let err = Record::decode(RecordKind::Activated, Bytes::from_static(&[0; 4])).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedRecord {
                kind: RecordKind::Activated,
                expected: 8,
                actual: 4
            }
        );
    }

    #[test]
    fn test_kinds_use_distinct_mac_pages() {
        assert_eq!(RecordKind::Unactivated.mac_span().start(), 37);
        assert_eq!(RecordKind::Activated.mac_span().start(), 36);
        assert_eq!(
            RecordKind::Unactivated.record_span(),
            RecordKind::Activated.record_span()
        );
    }

    #[test]
    fn test_max_rides_encoding() {
        assert_eq!(encode_max_rides(0x0102), [0x02, 0x01, 0x00, 0x00]);
        assert_eq!(decode_u16(encode_max_rides(513)), 513);
    }
}
