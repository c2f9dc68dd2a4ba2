//! Per-transaction ticket state

use tracing::warn;

use crate::clock::Expiry;
use crate::crypto::{MacPrimitive, TicketMac, ticket_mac};
use crate::error::{Error, Result};
use crate::keys::{CardKey, KeyDiversifier, Uid};
use crate::record::{Record, RecordKind};

/// What one `issue` or `use` has learned about the card so far
///
/// Created empty at the start of every transaction and dropped at its end.
#[derive(Debug, Default)]
pub struct TicketState {
    /// Card UID, read once
    pub uid: Option<Uid>,
    /// Last record read
    pub record: Option<Record>,
    /// MAC read alongside the record
    pub mac: Option<TicketMac>,
    /// One-way counter
    pub counter: Option<u16>,
    /// Expiry of the activated record, or the one just written
    pub expiry: Option<Expiry>,
    /// Ride ceiling of the last record read
    pub max_rides: Option<u16>,
    /// Diversified MAC key, derived at most once
    pub mac_key: Option<CardKey>,
}

impl TicketState {
    /// Fresh, empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and the fields it carries
    pub fn load_record(&mut self, record: Record, mac: TicketMac) {
        self.max_rides = Some(record.max_rides());
        self.expiry = record.expiry();
        self.record = Some(record);
        self.mac = Some(mac);
    }

    /// Drop the loaded record so the next validation needs a fresh read
    pub fn clear_record(&mut self) {
        self.record = None;
        self.mac = None;
    }

    /// Derive a key for this card from `master`
    ///
    /// Fails with [`Error::MissingUid`] until the UID has been read.
    pub fn diversify<M: MacPrimitive + ?Sized>(
        &self,
        diversifier: &KeyDiversifier,
        mac: &M,
        master: &CardKey,
    ) -> Result<CardKey> {
        let uid = self.uid.as_ref().ok_or(Error::MissingUid)?;
        Ok(diversifier.diversify(mac, master, uid)?)
    }

    /// Remaining rides, `max_rides - counter`, negative when overdrawn
    pub fn remaining(&self) -> Option<i32> {
        Some(i32::from(self.max_rides?) - i32::from(self.counter?))
    }

    /// Check the loaded MAC against the loaded record of `kind`
    pub fn verify_mac<M: MacPrimitive + ?Sized>(
        &self,
        kind: RecordKind,
        mac: &M,
        key: &CardKey,
    ) -> Result<()> {
        let record = self.record.as_ref().ok_or(Error::NotLoaded("record"))?;
        let stored = self.mac.ok_or(Error::NotLoaded("MAC"))?;

        if record.kind() != kind || ticket_mac(mac, key.as_bytes(), record.bytes())? != stored {
            warn!(%kind, "Ticket MAC does not match its record");
            return Err(Error::MacMismatch { kind });
        }
        Ok(())
    }

    /// Validate the loaded record as `kind` and return the remaining rides
    ///
    /// # Arguments
    /// * `kind` - Which record the caller expects to be loaded
    /// * `mac` - The MAC primitive
    /// * `key` - The card's diversified MAC key
    /// * `now` - Current time in minutes since the Unix epoch
    pub fn validate<M: MacPrimitive + ?Sized>(
        &self,
        kind: RecordKind,
        mac: &M,
        key: &CardKey,
        now: u32,
    ) -> Result<u16> {
        self.verify_mac(kind, mac, key)?;

        let remaining = self.remaining().ok_or(Error::NotLoaded("counter"))?;
        if remaining <= 0 {
            warn!(remaining, "Ticket has no rides left");
            return Err(Error::NoUsesRemaining);
        }
        let remaining = u16::try_from(remaining).map_err(|_| Error::NoUsesRemaining)?;

        if kind == RecordKind::Unactivated {
            return Ok(remaining);
        }

        let expiry = self.expiry.ok_or(Error::NotLoaded("expiry"))?;
        if !expiry.is_valid_at(now) {
            warn!(%expiry, now, "Ticket expired");
            return Err(Error::Expired { expiry });
        }
        Ok(remaining)
    }

    /// Remaining rides if the loaded record validates as `kind`, 0 otherwise
    pub fn remaining_uses<M: MacPrimitive + ?Sized>(
        &self,
        kind: RecordKind,
        mac: &M,
        key: &CardKey,
        now: u32,
    ) -> u16 {
        self.validate(kind, mac, key, now).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::crypto::HmacSha256;

    const KEY: CardKey = CardKey::new(*b"diversified-mac!");
    const NOW: u32 = 28_486_834;

    fn loaded(kind: RecordKind, first: [u8; 4], max_rides: u16, counter: u16) -> TicketState {
        let mut bytes = first.to_vec();
        bytes.extend_from_slice(&crate::record::encode_max_rides(max_rides));
        let mac = ticket_mac(&HmacSha256, KEY.as_bytes(), &bytes).unwrap();

        let mut state = TicketState::new();
        state.counter = Some(counter);
        state.load_record(Record::decode(kind, Bytes::from(bytes)).unwrap(), mac);
        state
    }

    #[test]
    fn test_remaining_arithmetic() {
        for (max_rides, counter, expected) in [(5, 0, 5), (12, 7, 5), (7, 7, 0), (3, 9, 0)] {
            let state = loaded(RecordKind::Unactivated, [0; 4], max_rides, counter);
            assert_eq!(
                state.remaining_uses(RecordKind::Unactivated, &HmacSha256, &KEY, NOW),
                expected
            );
        }
    }

    #[test]
    fn test_no_rides_left() {
        let state = loaded(RecordKind::Unactivated, [0; 4], 4, 4);
        assert_eq!(
            state.validate(RecordKind::Unactivated, &HmacSha256, &KEY, NOW),
            Err(Error::NoUsesRemaining)
        );
    }

    #[test]
    fn test_fails_closed_without_record() {
        let mut state = TicketState::new();
        state.counter = Some(0);
        assert_eq!(
            state.validate(RecordKind::Activated, &HmacSha256, &KEY, NOW),
            Err(Error::NotLoaded("record"))
        );
        assert_eq!(
            state.remaining_uses(RecordKind::Activated, &HmacSha256, &KEY, NOW),
            0
        );
    }

    #[test]
    fn test_tampered_mac_is_rejected() {
        let mut state = loaded(RecordKind::Unactivated, [0; 4], 5, 0);
        let mut page = state.mac.unwrap().to_page();
        page[3] ^= 0x80;
        state.mac = Some(TicketMac::from_page(page));

        assert_eq!(
            state.validate(RecordKind::Unactivated, &HmacSha256, &KEY, NOW),
            Err(Error::MacMismatch {
                kind: RecordKind::Unactivated
            })
        );
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let state = loaded(RecordKind::Unactivated, [0; 4], 5, 0);
        let other = CardKey::new(*b"another-card-key");
        assert!(matches!(
            state.validate(RecordKind::Unactivated, &HmacSha256, &other, NOW),
            Err(Error::MacMismatch { .. })
        ));
    }

    #[test]
    fn test_expiry_only_checked_when_activated() {
        let expired = Expiry::from_minutes(NOW - 1).to_page();

        let unactivated = loaded(RecordKind::Unactivated, expired, 5, 0);
        assert_eq!(
            unactivated.validate(RecordKind::Unactivated, &HmacSha256, &KEY, NOW),
            Ok(5)
        );

        let activated = loaded(RecordKind::Activated, expired, 5, 0);
        assert_eq!(
            activated.validate(RecordKind::Activated, &HmacSha256, &KEY, NOW),
            Err(Error::Expired {
                expiry: Expiry::from_minutes(NOW - 1)
            })
        );
        assert_eq!(
            activated.validate(RecordKind::Activated, &HmacSha256, &KEY, NOW - 1),
            Ok(5)
        );
    }

    #[test]
    fn test_unactivated_record_never_validates_as_activated() {
        let state = loaded(RecordKind::Unactivated, [0; 4], 5, 0);
        assert!(matches!(
            state.validate(RecordKind::Activated, &HmacSha256, &KEY, NOW),
            Err(Error::MacMismatch { .. })
        ));
    }

    #[test]
    fn test_diversify_needs_uid() {
        let state = TicketState::new();
        let diversifier = KeyDiversifier::new(CardKey::new([7; 16]));
        assert_eq!(
            state
                .diversify(&diversifier, &HmacSha256, &KEY)
                .unwrap_err(),
            Error::MissingUid
        );
    }
}
