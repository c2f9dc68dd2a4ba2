//! In-memory MIFARE Ultralight C emulation
//!
//! The emulator follows the access rules of the real chip closely enough for the
//! ticket protocol to be exercised end to end:
//!
//! - pages 0 and 1 (serial number) are read-only, page 2 lock bytes and page 3 (OTP)
//!   can only have bits set
//! - a write to the counter page adds the written 16-bit value to the one-way counter
//! - pages at or above AUTH0 require a prior successful authentication for writes,
//!   and for reads too when AUTH1 selects read/write protection
//! - key pages can be written but never read back
//!
//! Lock bits are stored but not enforced. The key is stored and compared in the
//! byte order it was written in.

use core::fmt;

use bytes::{Bytes, BytesMut};
use rand::RngCore;
use tracing::{debug, trace};

use crate::error::{Result, TagError};
use crate::memory::TagMemory;
use crate::page::{PAGE_SIZE, Page, PageSpan, ultralight_c};

/// Factory default authentication key of the Ultralight C ("BREAKMEIFYOUCAN!")
pub const FACTORY_KEY: [u8; 16] = *b"BREAKMEIFYOUCAN!";

/// Cascade tag mixed into the first check byte of the serial number
const CASCADE_TAG: u8 = 0x88;

/// NXP manufacturer code, first byte of every serial number
const NXP_MANUFACTURER: u8 = 0x04;

/// A one-shot failure armed on the emulator
///
/// The next operation matching the fault fails with [`TagError::Timeout`], as if
/// the tag had been pulled away mid-operation, and the fault is disarmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the next read that touches this page
    Read(u8),
    /// Fail the next write that touches this page
    Write(u8),
    /// Fail the next authentication attempt
    Authenticate,
}

/// Emulated MIFARE Ultralight C
#[derive(Clone)]
pub struct UltralightC {
    pages: Vec<Page>,
    authenticated: bool,
    present: bool,
    faults: Vec<Fault>,
}

impl fmt::Debug for UltralightC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UltralightC")
            .field("uid", &hex::encode(self.uid()))
            .field("counter", &self.counter())
            .field("auth0", &self.auth0())
            .field("authenticated", &self.authenticated)
            .field("present", &self.present)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

impl UltralightC {
    /// Create a factory-fresh tag with the given 7-byte serial number
    pub fn blank(serial: [u8; 7]) -> Self {
        let mut pages = vec![[0u8; PAGE_SIZE]; ultralight_c::PAGE_COUNT];

        let bcc0 = CASCADE_TAG ^ serial[0] ^ serial[1] ^ serial[2];
        let bcc1 = serial[3] ^ serial[4] ^ serial[5] ^ serial[6];
        pages[0] = [serial[0], serial[1], serial[2], bcc0];
        pages[1] = [serial[3], serial[4], serial[5], serial[6]];
        pages[2] = [bcc1, 0x48, 0x00, 0x00];

        // No page requires authentication out of the factory
        pages[ultralight_c::AUTH0_PAGE as usize] = [ultralight_c::PAGE_COUNT as u8, 0, 0, 0];
        pages[ultralight_c::AUTH1_PAGE as usize] = [ultralight_c::AUTH1_READ_WRITE, 0, 0, 0];

        let mut tag = Self {
            pages,
            authenticated: false,
            present: true,
            faults: Vec::new(),
        };
        tag.store_key(&FACTORY_KEY);
        tag
    }

    /// Create a factory-fresh tag with a random NXP serial number
    pub fn random() -> Self {
        let mut serial = [0u8; 7];
        rand::rng().fill_bytes(&mut serial);
        serial[0] = NXP_MANUFACTURER;
        Self::blank(serial)
    }

    /// Restore a tag from a full memory image, key pages included
    pub fn from_pages(pages: Vec<Page>) -> Result<Self> {
        if pages.len() != ultralight_c::PAGE_COUNT {
            return Err(TagError::InvalidLength {
                expected: ultralight_c::PAGE_COUNT * PAGE_SIZE,
                actual: pages.len() * PAGE_SIZE,
            });
        }

        Ok(Self {
            pages,
            authenticated: false,
            present: true,
            faults: Vec::new(),
        })
    }

    /// Replace the authentication key, bypassing access control
    pub fn with_key(mut self, key: &[u8; 16]) -> Self {
        self.store_key(key);
        self
    }

    /// Full memory image, key pages included
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Raw content of a page, bypassing access control
    pub fn page(&self, page: u8) -> Page {
        self.pages[page as usize]
    }

    /// Overwrite a page, bypassing access control and counter semantics
    ///
    /// Models an attacker with direct access to the memory, or a card personalised
    /// before it was locked down.
    pub fn poke(&mut self, page: u8, data: Page) {
        self.pages[page as usize] = data;
    }

    /// Flip bits of a single byte, bypassing access control
    pub fn tamper(&mut self, page: u8, offset: usize, mask: u8) {
        self.pages[page as usize][offset] ^= mask;
    }

    /// The 7-byte serial number
    pub fn uid(&self) -> [u8; 7] {
        let [p0, p1] = [self.pages[0], self.pages[1]];
        [p0[0], p0[1], p0[2], p1[0], p1[1], p1[2], p1[3]]
    }

    /// Current value of the one-way counter
    pub fn counter(&self) -> u16 {
        let page = self.pages[ultralight_c::COUNTER_PAGE as usize];
        u16::from_le_bytes([page[0], page[1]])
    }

    /// First page that requires authentication
    pub fn auth0(&self) -> u8 {
        self.pages[ultralight_c::AUTH0_PAGE as usize][0]
    }

    /// Whether the current session is authenticated
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Arm a one-shot fault
    pub fn inject(&mut self, fault: Fault) {
        debug!(?fault, "Arming emulator fault");
        self.faults.push(fault);
    }

    /// Take the tag out of the field; every operation fails until [`Self::reinsert`]
    pub fn remove(&mut self) {
        self.present = false;
        self.authenticated = false;
    }

    /// Bring the tag back into the field with a fresh, unauthenticated session
    pub fn reinsert(&mut self) {
        self.present = true;
        self.authenticated = false;
    }

    fn store_key(&mut self, key: &[u8; 16]) {
        for (i, chunk) in key.chunks_exact(PAGE_SIZE).enumerate() {
            let page = ultralight_c::KEY.start() as usize + i;
            self.pages[page].copy_from_slice(chunk);
        }
    }

    fn stored_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        for (i, chunk) in key.chunks_exact_mut(PAGE_SIZE).enumerate() {
            chunk.copy_from_slice(&self.pages[ultralight_c::KEY.start() as usize + i]);
        }
        key
    }

    fn read_write_protected(&self) -> bool {
        self.pages[ultralight_c::AUTH1_PAGE as usize][0] & ultralight_c::AUTH1_WRITE_ONLY == 0
    }

    fn check_present(&self) -> Result<()> {
        if self.present {
            Ok(())
        } else {
            Err(TagError::Removed)
        }
    }

    fn check_range(&self, start: u8, count: u8) -> Result<PageSpan> {
        let span = PageSpan::new(start, count);
        if span.end() > self.pages.len() {
            return Err(TagError::OutOfRange {
                start: start as usize,
                end: span.end(),
                capacity: self.pages.len(),
            });
        }
        Ok(span)
    }

    fn take_fault(&mut self, fault: Fault) -> Result<()> {
        match self.faults.iter().position(|armed| *armed == fault) {
            Some(index) => {
                self.faults.remove(index);
                debug!(?fault, "Emulator fault triggered");
                Err(TagError::Timeout)
            }
            None => Ok(()),
        }
    }

    fn read_page(&mut self, page: u8) -> Result<Page> {
        self.take_fault(Fault::Read(page))?;

        if ultralight_c::KEY.contains(page) {
            return Err(TagError::Nak(0x00));
        }
        if !self.authenticated && page >= self.auth0() && self.read_write_protected() {
            return Err(TagError::ReadProtected(page));
        }

        Ok(self.pages[page as usize])
    }

    fn write_page(&mut self, page: u8, data: Page) -> Result<()> {
        self.take_fault(Fault::Write(page))?;

        if ultralight_c::UID.contains(page) {
            return Err(TagError::ReadOnly(page));
        }
        if !self.authenticated && page >= self.auth0() {
            return Err(TagError::WriteProtected(page));
        }

        let current = &mut self.pages[page as usize];
        match page {
            ultralight_c::LOCK_PAGE => {
                current[2] |= data[2];
                current[3] |= data[3];
            }
            ultralight_c::OTP_PAGE => {
                for (byte, bits) in current.iter_mut().zip(data) {
                    *byte |= bits;
                }
            }
            ultralight_c::COUNTER_PAGE => {
                let value = u16::from_le_bytes([current[0], current[1]]);
                let step = u16::from_le_bytes([data[0], data[1]]);
                let next = value.checked_add(step).ok_or(TagError::CounterOverflow)?;
                trace!(value, next, "Counter advanced");
                current[..2].copy_from_slice(&next.to_le_bytes());
            }
            _ => *current = data,
        }
        Ok(())
    }
}

impl TagMemory for UltralightC {
    fn do_read_pages(&mut self, start: u8, count: u8) -> Result<Bytes> {
        self.check_present()?;
        let span = self.check_range(start, count)?;

        let mut data = BytesMut::with_capacity(span.byte_len());
        for page in start..span.end() as u8 {
            data.extend_from_slice(&self.read_page(page)?);
        }
        Ok(data.freeze())
    }

    fn do_write_pages(&mut self, data: &[u8], start: u8, count: u8) -> Result<()> {
        self.check_present()?;
        self.check_range(start, count)?;

        // Pages are written one at a time, a failure leaves earlier pages written
        for (page, chunk) in (start..).zip(data.chunks_exact(PAGE_SIZE)) {
            let mut buf = [0u8; PAGE_SIZE];
            buf.copy_from_slice(chunk);
            self.write_page(page, buf)?;
        }
        Ok(())
    }

    fn do_authenticate(&mut self, key: &[u8]) -> Result<()> {
        self.check_present()?;
        self.take_fault(Fault::Authenticate)?;

        if key.len() != 16 {
            return Err(TagError::InvalidLength {
                expected: 16,
                actual: key.len(),
            });
        }

        self.authenticated = key == self.stored_key().as_slice();
        if self.authenticated {
            Ok(())
        } else {
            Err(TagError::AuthenticationRejected)
        }
    }
}
