//! Page addressing primitives

use core::fmt;

/// Size of a single tag page in bytes
pub const PAGE_SIZE: usize = 4;

/// One page worth of data
pub type Page = [u8; PAGE_SIZE];

/// Fixed memory map of the MIFARE Ultralight C
pub mod ultralight_c {
    use super::PageSpan;

    /// Total number of pages (0x00..=0x2F)
    pub const PAGE_COUNT: usize = 48;
    /// 7-byte serial number plus check bytes, read-only
    pub const UID: PageSpan = PageSpan::new(0, 2);
    /// Lock bytes live in bytes 2..4 of this page
    pub const LOCK_PAGE: u8 = 2;
    /// One-time-programmable page
    pub const OTP_PAGE: u8 = 3;
    /// First freely writable user page
    pub const USER_MEMORY_START: u8 = 4;
    /// 16-bit one-way counter, little endian in bytes 0..2
    pub const COUNTER_PAGE: u8 = 41;
    /// Byte 0 holds the first page that requires authentication
    pub const AUTH0_PAGE: u8 = 42;
    /// Byte 0 bit 0 selects write-only (1) or read/write (0) protection
    pub const AUTH1_PAGE: u8 = 43;
    /// 16-byte 3DES authentication key, write-only
    pub const KEY: PageSpan = PageSpan::new(44, 4);
    /// AUTH1 value restricting only writes
    pub const AUTH1_WRITE_ONLY: u8 = 0x01;
    /// AUTH1 value restricting reads and writes
    pub const AUTH1_READ_WRITE: u8 = 0x00;
}

/// A contiguous run of pages, addressed by its first page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSpan {
    start: u8,
    count: u8,
}

impl PageSpan {
    /// Create a span of `count` pages starting at `start`
    pub const fn new(start: u8, count: u8) -> Self {
        Self { start, count }
    }

    /// Create a span covering a single page
    pub const fn single(page: u8) -> Self {
        Self::new(page, 1)
    }

    /// First page of the span
    pub const fn start(&self) -> u8 {
        self.start
    }

    /// Number of pages in the span
    pub const fn count(&self) -> u8 {
        self.count
    }

    /// One past the last page of the span
    pub const fn end(&self) -> usize {
        self.start as usize + self.count as usize
    }

    /// Number of bytes covered by the span
    pub const fn byte_len(&self) -> usize {
        self.count as usize * PAGE_SIZE
    }

    /// Check whether `page` falls inside the span
    pub const fn contains(&self, page: u8) -> bool {
        page >= self.start && (page as usize) < self.end()
    }
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            1 => write!(f, "page {}", self.start),
            _ => write!(f, "pages {}..={}", self.start, self.end() - 1),
        }
    }
}
