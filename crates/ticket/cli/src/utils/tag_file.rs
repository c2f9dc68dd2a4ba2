//! Virtual card images
//!
//! A card is stored as JSON holding every page in hex, key pages included:
//!
//! ```json
//! { "uid": "045a217e9103c4", "pages": ["045a2100", "7e9103c4", ...] }
//! ```

use std::fs;
use std::path::Path;

use eyre::{WrapErr, bail, eyre};
use nexum_tag_core::{PAGE_SIZE, Page, UltralightC};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct TagImage {
    /// Serial number, informational only
    uid: String,
    pages: Vec<String>,
}

/// Load a card image
pub(crate) fn load_tag(path: &Path) -> eyre::Result<UltralightC> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading card image {}", path.display()))?;
    let image: TagImage = serde_json::from_str(&text)
        .wrap_err_with(|| format!("parsing card image {}", path.display()))?;

    let pages = image
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| parse_page(page).wrap_err_with(|| format!("page {index}")))
        .collect::<eyre::Result<Vec<Page>>>()?;

    let tag = UltralightC::from_pages(pages)?;
    debug!(path = %path.display(), uid = %hex::encode(tag.uid()), "Loaded card image");
    Ok(tag)
}

/// Write a card image
pub(crate) fn save_tag(path: &Path, tag: &UltralightC) -> eyre::Result<()> {
    let image = TagImage {
        uid: hex::encode(tag.uid()),
        pages: tag.pages().iter().map(hex::encode).collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&image)? + "\n")
        .wrap_err_with(|| format!("writing card image {}", path.display()))?;
    debug!(path = %path.display(), "Saved card image");
    Ok(())
}

/// Parse a 7-byte serial number given in hex
pub(crate) fn parse_serial(serial: &str) -> eyre::Result<[u8; 7]> {
    let mut bytes = [0u8; 7];
    hex::decode_to_slice(serial, &mut bytes)
        .map_err(|e| eyre!("serial number must be 14 hex digits: {e}"))?;
    Ok(bytes)
}

fn parse_page(page: &str) -> eyre::Result<Page> {
    let mut bytes = [0u8; PAGE_SIZE];
    hex::decode_to_slice(page, &mut bytes)?;
    Ok(bytes)
}

/// Check a path can receive a new image
pub(crate) fn ensure_writable(path: &Path, force: bool) -> eyre::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    Ok(())
}
