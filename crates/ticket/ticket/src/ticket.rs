use core::fmt;

use nexum_tag_core::{PAGE_SIZE, Page, TagError, TagMemory, ultralight_c};
use tracing::{debug, info, warn};

use crate::clock::{Clock, Expiry, SystemClock};
use crate::config::{ConfigError, TicketConfig};
use crate::crypto::{HmacSha256, MacPrimitive, TicketMac, ticket_mac};
use crate::error::{Error, Result, Step, TagResultExt};
use crate::keys::{CardKey, KeyDiversifier, Uid};
use crate::layout::PageLayout;
use crate::record::{Record, RecordKind, decode_u16, encode_max_rides};
use crate::state::TicketState;
use crate::types::{IssueReceipt, RideReceipt, TicketSnapshot};

/// Status shown before the first operation
const NO_STATUS: &str = "-";

/// Issues and validates transit tickets on a tag
///
/// One machine owns one tag handle. Every operation starts from an empty
/// [`TicketState`]; nothing learned about a card outlives the call.
#[derive(Debug)]
pub struct TicketMachine<T, M = HmacSha256, C = SystemClock> {
    tag: T,
    mac: M,
    clock: C,
    diversifier: KeyDiversifier,
    default_auth_key: CardKey,
    auth_master_key: CardKey,
    mac_master_key: CardKey,
    validity_period: u32,
    info: String,
}

impl<T: TagMemory> TicketMachine<T> {
    /// Create a machine using HMAC-SHA256 and the system clock
    pub fn new(tag: T, config: &TicketConfig) -> Result<Self> {
        Self::with_parts(tag, HmacSha256, SystemClock, config)
    }
}

impl<T, M, C> TicketMachine<T, M, C>
where
    T: TagMemory,
    M: MacPrimitive,
    C: Clock,
{
    /// Create a machine from its parts
    ///
    /// Fails if `config` does not pass [`TicketConfig::validate`].
    pub fn with_parts(tag: T, mac: M, clock: C, config: &TicketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tag,
            mac,
            clock,
            diversifier: KeyDiversifier::new(config.hash_key.clone()),
            default_auth_key: config.default_auth_key.clone(),
            auth_master_key: config.auth_master_key.clone(),
            mac_master_key: config.mac_master_key.clone(),
            validity_period: config.validity_period,
            info: NO_STATUS.to_string(),
        })
    }

    /// Issue `rides` rides, or top up an issued card
    ///
    /// A blank card is keyed with its diversified key and write protected. Rides
    /// still valid on an issued card are carried into the new ceiling, and the card
    /// goes back to the unactivated state.
    ///
    /// The tag has no room for a validity period, so the window opened by the
    /// first use is always the configured one. `validity_period` must match it.
    pub fn issue(&mut self, rides: u16, validity_period: u32) -> Result<IssueReceipt> {
        let result = self.run_issue(rides, validity_period);
        self.report(&result);
        result
    }

    /// Validate the card and consume one ride
    ///
    /// The first use after an issue activates the ticket and starts its validity
    /// window.
    pub fn use_ticket(&mut self) -> Result<RideReceipt> {
        let result = self.run_use();
        self.report(&result);
        result
    }

    /// Read the ticket without authenticating or writing
    pub fn inspect(&mut self) -> Result<TicketSnapshot> {
        let mut state = TicketState::new();
        let kind = self.load_current(&mut state)?;
        let key = self.mac_key(&mut state)?;
        let auth0 = self
            .read_page(PageLayout::AUTH0.start())
            .read_step(Step::ReadProtection)?;

        let record = state.record.as_ref().ok_or(Error::NotLoaded("record"))?;
        Ok(TicketSnapshot {
            uid: state.uid.ok_or(Error::MissingUid)?,
            counter: state.counter.unwrap_or_default(),
            kind,
            max_rides: record.max_rides(),
            expiry: record.expiry(),
            mac: state.mac.ok_or(Error::NotLoaded("MAC"))?,
            mac_valid: state.verify_mac(kind, &self.mac, &key).is_ok(),
            auth0: auth0[0],
        })
    }

    /// Rides the card would grant right now, 0 if it would be refused
    pub fn remaining_uses(&mut self) -> u16 {
        let now = self.clock.now_minutes();
        let mut state = TicketState::new();
        let result = self.load_current(&mut state).and_then(|kind| {
            let key = self.mac_key(&mut state)?;
            Ok(state.remaining_uses(kind, &self.mac, &key, now))
        });

        result.unwrap_or_else(|e| {
            debug!(error = %e, "Could not read the ticket");
            0
        })
    }

    /// Human-readable outcome of the last issue or use
    pub fn info_to_show(&self) -> &str {
        &self.info
    }

    /// Minutes a ticket stays valid after its first use, from the configuration
    pub const fn validity_period(&self) -> u32 {
        self.validity_period
    }

    /// Get a reference to the tag
    pub const fn tag(&self) -> &T {
        &self.tag
    }

    /// Get a mutable reference to the tag
    pub const fn tag_mut(&mut self) -> &mut T {
        &mut self.tag
    }

    /// Consume the machine and return the tag
    pub fn into_tag(self) -> T {
        self.tag
    }

    fn report<R: fmt::Display>(&mut self, result: &Result<R>) {
        self.info = match result {
            Ok(receipt) => receipt.to_string(),
            Err(e) => e.to_string(),
        };
    }

    fn run_issue(&mut self, rides: u16, validity_period: u32) -> Result<IssueReceipt> {
        if rides == 0 {
            return Err(ConfigError::NoRides.into());
        }
        if validity_period == 0 {
            return Err(ConfigError::NoValidity.into());
        }
        if validity_period != self.validity_period {
            return Err(ConfigError::ValidityMismatch {
                requested: validity_period,
                configured: self.validity_period,
            }
            .into());
        }
        debug!(rides, validity_period, "Issuing ticket");

        let mut state = TicketState::new();
        self.read_uid(&mut state)?;
        let auth_key = state.diversify(&self.diversifier, &self.mac, &self.auth_master_key)?;

        let (carried_forward, fresh_card) = match self.tag.authenticate(auth_key.as_bytes()) {
            Ok(()) => {
                self.ensure_protection()?;
                (self.carry_forward(&mut state)?, false)
            }
            Err(e) => {
                debug!(error = %e, "Card key rejected, trying the factory key");
                self.tag
                    .authenticate(self.default_auth_key.as_bytes())
                    .map_err(|_| Error::AuthenticationFailed)?;
                self.tag
                    .write_pages(
                        auth_key.as_bytes(),
                        PageLayout::KEY.start(),
                        PageLayout::KEY.count(),
                    )
                    .write_step(Step::WriteKey)?;
                self.tag
                    .configure_protection(PageLayout::FIRST_PROTECTED_PAGE)
                    .write_step(Step::ConfigureProtection)?;
                debug!(uid = ?state.uid, "Blank card keyed and protected");
                (0, true)
            }
        };

        let counter = self.read_counter()?;
        let max_rides = counter
            .checked_add(rides)
            .and_then(|max| max.checked_add(carried_forward))
            .ok_or(Error::RideCeilingOverflow)?;
        self.write_page(PageLayout::MAX_RIDES.start(), encode_max_rides(max_rides))
            .write_step(Step::WriteMaxRides)?;

        let snapshot = self.read_page(PageLayout::COUNTER.start()).read_step(Step::ReadCounter)?;
        self.write_page(PageLayout::COUNTER_INIT_STATE.start(), snapshot)
            .write_step(Step::WriteCounterInitState)?;

        state.clear_record();
        let mac_key = self.mac_key(&mut state)?;
        self.write_mac(&mut state, RecordKind::Unactivated, &mac_key)?;

        let remaining = max_rides - counter;
        info!(remaining, carried_forward, fresh_card, "Ticket issued");
        Ok(IssueReceipt {
            remaining,
            carried_forward,
            fresh_card,
        })
    }

    fn run_use(&mut self) -> Result<RideReceipt> {
        let mut state = TicketState::new();
        self.read_uid(&mut state)?;
        let auth_key = state.diversify(&self.diversifier, &self.mac, &self.auth_master_key)?;
        self.tag
            .authenticate(auth_key.as_bytes())
            .map_err(|_| Error::AuthenticationFailed)?;

        let kind = self.load_current(&mut state)?;
        let mac_key = self.mac_key(&mut state)?;
        let now = self.clock.now_minutes();

        let activated = kind == RecordKind::Unactivated;
        if activated {
            self.activate(&mut state, &mac_key, now)?;
        }

        let remaining = state.validate(RecordKind::Activated, &self.mac, &mac_key, now)?;
        let expiry = state.expiry.ok_or(Error::NotLoaded("expiry"))?;

        let counter_error = match self.tag.increment_counter(PageLayout::COUNTER.start()) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Ride granted but the counter was not advanced");
                Some(e)
            }
        };

        info!(remaining = remaining - 1, %expiry, activated, "Ride validated");
        Ok(RideReceipt {
            remaining: remaining - 1,
            expiry,
            activated,
            counter_error,
        })
    }

    /// Start the validity window of an unactivated ticket
    fn activate(&mut self, state: &mut TicketState, mac_key: &CardKey, now: u32) -> Result<()> {
        state.verify_mac(RecordKind::Unactivated, &self.mac, mac_key)?;

        let expiry = Expiry::after(now, self.validity_period);
        debug!(%expiry, "Activating ticket");
        self.write_page(PageLayout::EXPIRY_TIME.start(), expiry.to_page())
            .write_step(Step::WriteExpiry)?;

        self.write_mac(state, RecordKind::Activated, mac_key)?;
        self.load_record(state, RecordKind::Activated)
    }

    /// Rides left on the card being re-issued, 0 if its ticket is no longer good
    fn carry_forward(&mut self, state: &mut TicketState) -> Result<u16> {
        state.counter = Some(self.read_counter()?);
        let mac_key = self.mac_key(state)?;
        let now = self.clock.now_minutes();

        for kind in [RecordKind::Activated, RecordKind::Unactivated] {
            self.load_record(state, kind)?;
            match state.validate(kind, &self.mac, &mac_key, now) {
                Ok(remaining) => {
                    debug!(%kind, remaining, "Carrying rides forward");
                    return Ok(remaining);
                }
                Err(e) => debug!(%kind, error = %e, "Previous ticket not valid"),
            }
        }
        Ok(0)
    }

    /// Re-apply write protection if an earlier issue stopped before setting it
    fn ensure_protection(&mut self) -> Result<()> {
        let auth0 = self
            .read_page(PageLayout::AUTH0.start())
            .read_step(Step::ReadProtection)?[0];
        let auth1 = self
            .read_page(PageLayout::AUTH1.start())
            .read_step(Step::ReadProtection)?[0];

        if auth0 != PageLayout::FIRST_PROTECTED_PAGE
            || auth1 & ultralight_c::AUTH1_WRITE_ONLY == 0
        {
            warn!(auth0, auth1, "Issued card is not write protected, repairing");
            self.tag
                .configure_protection(PageLayout::FIRST_PROTECTED_PAGE)
                .write_step(Step::ConfigureProtection)?;
        }
        Ok(())
    }

    /// Read the counter and snapshot, then load the record of the kind they imply
    fn load_current(&mut self, state: &mut TicketState) -> Result<RecordKind> {
        self.read_uid(state)?;
        let counter = self.read_counter()?;
        state.counter = Some(counter);

        let init_state = self
            .read_page(PageLayout::COUNTER_INIT_STATE.start())
            .read_step(Step::ReadCounterInitState)?;
        let kind = if decode_u16(init_state) == counter {
            RecordKind::Unactivated
        } else {
            RecordKind::Activated
        };
        debug!(%kind, counter, "Ticket state");

        self.load_record(state, kind)?;
        Ok(kind)
    }

    fn load_record(&mut self, state: &mut TicketState, kind: RecordKind) -> Result<()> {
        let record = self.read_record(kind)?;
        let mac = self
            .read_page(kind.mac_span().start())
            .read_step(Step::ReadMac(kind))?;
        state.load_record(record, TicketMac::from_page(mac));
        Ok(())
    }

    /// MAC the record of `kind` as it now sits on the tag
    fn write_mac(
        &mut self,
        state: &mut TicketState,
        kind: RecordKind,
        mac_key: &CardKey,
    ) -> Result<()> {
        let record = self.read_record(kind)?;
        let mac = ticket_mac(&self.mac, mac_key.as_bytes(), record.bytes())?;
        self.write_page(kind.mac_span().start(), mac.to_page())
            .write_step(Step::WriteMac(kind))?;
        state.load_record(record, mac);
        Ok(())
    }

    fn read_record(&mut self, kind: RecordKind) -> Result<Record> {
        let span = kind.record_span();
        let bytes = self
            .tag
            .read_pages(span.start(), span.count())
            .read_step(Step::ReadRecord(kind))?;
        Record::decode(kind, bytes)
    }

    fn read_uid(&mut self, state: &mut TicketState) -> Result<Uid> {
        if let Some(uid) = state.uid {
            return Ok(uid);
        }
        let bytes = self
            .tag
            .read_pages(PageLayout::UID.start(), PageLayout::UID.count())
            .read_step(Step::ReadUid)?;
        let uid = Uid::try_from(bytes.as_ref())?;
        state.uid = Some(uid);
        Ok(uid)
    }

    fn read_counter(&mut self) -> Result<u16> {
        self.read_page(PageLayout::COUNTER.start())
            .read_step(Step::ReadCounter)
            .map(decode_u16)
    }

    fn mac_key(&self, state: &mut TicketState) -> Result<CardKey> {
        if let Some(key) = &state.mac_key {
            return Ok(key.clone());
        }
        let key = state.diversify(&self.diversifier, &self.mac, &self.mac_master_key)?;
        state.mac_key = Some(key.clone());
        Ok(key)
    }

    fn read_page(&mut self, page: u8) -> nexum_tag_core::Result<Page> {
        let bytes = self.tag.read_pages(page, 1)?;
        bytes
            .as_ref()
            .try_into()
            .map_err(|_| TagError::InvalidLength {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            })
    }

    fn write_page(&mut self, page: u8, data: Page) -> nexum_tag_core::Result<()> {
        self.tag.write_pages(&data, page, 1)
    }
}
