//! Utility functions and types for the ticket CLI

pub(crate) mod display;
pub(crate) mod tag_file;
