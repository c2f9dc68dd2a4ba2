//! Tag memory trait
//!
//! This module provides the abstraction used to talk to a page-addressable tag,
//! independent of the reader hardware or the command framing behind it.

use core::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Result, TagError};
use crate::page::{PAGE_SIZE, ultralight_c};

/// Trait for page-addressable tag memory
///
/// An implementation is responsible for moving whole 4-byte pages to and from
/// the tag, and for the tag's native authentication. It has no knowledge of what
/// the pages mean.
pub trait TagMemory: fmt::Debug {
    /// Read `count` consecutive pages starting at `start`
    ///
    /// Returns exactly `count * PAGE_SIZE` bytes.
    fn read_pages(&mut self, start: u8, count: u8) -> Result<Bytes> {
        trace!(start, count, "Reading pages");
        let result = self.do_read_pages(start, count);
        match &result {
            Ok(data) => trace!(data = %hex::encode(data), "Read pages"),
            Err(e) => debug!(start, count, error = ?e, "Tag error during read"),
        }
        result
    }

    /// Write `count` consecutive pages starting at `start`
    ///
    /// `data` must hold exactly `count * PAGE_SIZE` bytes.
    fn write_pages(&mut self, data: &[u8], start: u8, count: u8) -> Result<()> {
        let expected = count as usize * PAGE_SIZE;
        if data.len() != expected {
            return Err(TagError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }

        trace!(start, count, data = %hex::encode(data), "Writing pages");
        let result = self.do_write_pages(data, start, count);
        if let Err(e) = &result {
            debug!(start, count, error = ?e, "Tag error during write");
        }
        result
    }

    /// Authenticate against the tag with `key`
    ///
    /// Until this succeeds, pages covered by the protection boundary reject writes.
    fn authenticate(&mut self, key: &[u8]) -> Result<()> {
        let result = self.do_authenticate(key);
        match &result {
            Ok(()) => debug!("Tag authentication succeeded"),
            Err(e) => debug!(error = ?e, "Tag authentication failed"),
        }
        result
    }

    /// Require authentication for writes to every page at or above `first_protected_page`
    ///
    /// The default implementation programs the Ultralight C AUTH0 page, then AUTH1
    /// with write-only protection.
    fn configure_protection(&mut self, first_protected_page: u8) -> Result<()> {
        debug!(first_protected_page, "Configuring page protection");
        self.write_pages(
            &[first_protected_page, 0x00, 0x00, 0x00],
            ultralight_c::AUTH0_PAGE,
            1,
        )?;
        self.write_pages(
            &[ultralight_c::AUTH1_WRITE_ONLY, 0x00, 0x00, 0x00],
            ultralight_c::AUTH1_PAGE,
            1,
        )
    }

    /// Advance the one-way counter at `counter_page` by one
    ///
    /// The default implementation relies on the Ultralight C counter semantics:
    /// a write to the counter page adds the written value to the counter.
    fn increment_counter(&mut self, counter_page: u8) -> Result<()> {
        debug!(counter_page, "Incrementing one-way counter");
        self.write_pages(&[0x01, 0x00, 0x00, 0x00], counter_page, 1)
    }

    /// Internal implementation of read_pages
    fn do_read_pages(&mut self, start: u8, count: u8) -> Result<Bytes>;

    /// Internal implementation of write_pages, called with a length-checked buffer
    fn do_write_pages(&mut self, data: &[u8], start: u8, count: u8) -> Result<()>;

    /// Internal implementation of authenticate
    fn do_authenticate(&mut self, key: &[u8]) -> Result<()>;
}

impl<T: TagMemory + ?Sized> TagMemory for &mut T {
    fn read_pages(&mut self, start: u8, count: u8) -> Result<Bytes> {
        (**self).read_pages(start, count)
    }

    fn write_pages(&mut self, data: &[u8], start: u8, count: u8) -> Result<()> {
        (**self).write_pages(data, start, count)
    }

    fn authenticate(&mut self, key: &[u8]) -> Result<()> {
        (**self).authenticate(key)
    }

    fn configure_protection(&mut self, first_protected_page: u8) -> Result<()> {
        (**self).configure_protection(first_protected_page)
    }

    fn increment_counter(&mut self, counter_page: u8) -> Result<()> {
        (**self).increment_counter(counter_page)
    }

    fn do_read_pages(&mut self, start: u8, count: u8) -> Result<Bytes> {
        (**self).do_read_pages(start, count)
    }

    fn do_write_pages(&mut self, data: &[u8], start: u8, count: u8) -> Result<()> {
        (**self).do_write_pages(data, start, count)
    }

    fn do_authenticate(&mut self, key: &[u8]) -> Result<()> {
        (**self).do_authenticate(key)
    }
}
