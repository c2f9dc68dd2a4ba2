//! Core traits and types for page-addressable tag memory
//!
//! This crate provides the foundational abstractions for talking to NFC tags whose
//! memory is organised in fixed-size 4-byte pages, such as the MIFARE Ultralight family.
//!
//! ## Overview
//!
//! - [`TagMemory`] is the contract a reader backend implements: page reads and writes,
//!   the tag's native key authentication, write-protection configuration and the
//!   one-way counter increment.
//! - [`TagError`] describes everything that can go wrong while talking to a tag.
//! - [`UltralightC`] is an in-memory emulation of a MIFARE Ultralight C that honours
//!   the access-control pages, the one-way counter and key authentication. It is used
//!   for tests and for virtual card images.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod emulator;
pub mod error;
pub mod memory;
pub mod page;

pub use emulator::{FACTORY_KEY, Fault, UltralightC};
pub use error::{Result, TagError};
pub use memory::TagMemory;
pub use page::{PAGE_SIZE, Page, PageSpan, ultralight_c};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Bytes, BytesMut};
    pub use crate::{PAGE_SIZE, Page, PageSpan};
    pub use crate::{TagError, TagMemory};
}
