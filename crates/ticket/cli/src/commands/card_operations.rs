//! Commands that create or read card images

use std::path::Path;

use nexum_tag_core::{UltralightC, ultralight_c};
use nexum_ticket::{Clock, PageLayout, SystemClock, TicketConfig, TicketMachine};
use tracing::debug;

use crate::utils::display::{card_title, info, key_value_box, success, warning};
use crate::utils::tag_file::{ensure_writable, load_tag, parse_serial, save_tag};

/// Create a factory-fresh card image
pub(crate) fn blank_command(path: &Path, uid: Option<&str>, force: bool) -> eyre::Result<()> {
    ensure_writable(path, force)?;

    let tag = match uid {
        Some(serial) => UltralightC::blank(parse_serial(serial)?),
        None => UltralightC::random(),
    };
    save_tag(path, &tag)?;

    println!(
        "{}",
        success(&format!("Blank card written to {}", path.display()))
    );
    println!("{}", info(&format!("UID: {}", hex::encode_upper(tag.uid()))));
    Ok(())
}

/// Show the ticket stored on a card
pub(crate) fn inspect_command(path: &Path, config: &TicketConfig) -> eyre::Result<()> {
    let mut machine = TicketMachine::new(load_tag(path)?, config)?;
    let snapshot = machine.inspect()?;
    let granted = machine.remaining_uses();
    debug!(?snapshot, "Read ticket");
    println!("{}", card_title(path, &snapshot.uid.to_string()));

    if !snapshot.is_issued() {
        println!(
            "{}",
            key_value_box(
                "Card",
                vec![("State", "blank".to_string())]
            )
        );
        return Ok(());
    }

    let now = SystemClock.now_minutes();
    let expiry = match snapshot.expiry {
        Some(expiry) if expiry.is_valid_at(now) => expiry.to_string(),
        Some(expiry) => format!("{expiry} (expired)"),
        None => "starts on first use".to_string(),
    };
    let mac = if snapshot.mac_valid {
        format!("{} (valid)", snapshot.mac)
    } else {
        format!("{} (INVALID)", snapshot.mac)
    };

    println!(
        "{}",
        key_value_box(
            "Ticket",
            vec![
                ("State", snapshot.kind.to_string()),
                ("Counter", snapshot.counter.to_string()),
                ("Max rides", snapshot.max_rides.to_string()),
                ("Rides left", snapshot.remaining().to_string()),
                ("Rides granted now", granted.to_string()),
                ("Expiry", expiry),
                ("MAC", mac),
                ("Write protected from", format!("page {}", snapshot.auth0)),
            ]
        )
    );

    if !snapshot.mac_valid {
        println!(
            "{}",
            warning("Stored MAC does not match the ticket data")
        );
    }
    Ok(())
}

/// Print the raw memory of a card
pub(crate) fn dump_command(path: &Path) -> eyre::Result<()> {
    let tag = load_tag(path)?;

    println!("{}", card_title(path, &hex::encode_upper(tag.uid())));
    for (page, data) in (0u8..).zip(tag.pages()) {
        let bytes = if PageLayout::KEY.contains(page) {
            "** ** ** **".to_string()
        } else {
            data.iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        println!("  {page:02} ({page:#04x})  {bytes}  {}", page_role(page));
    }
    Ok(())
}

const fn page_role(page: u8) -> &'static str {
    match page {
        p if PageLayout::UID.contains(p) => "serial number",
        ultralight_c::LOCK_PAGE => "serial check byte, lock bytes",
        ultralight_c::OTP_PAGE => "OTP",
        p if p == PageLayout::MAC_ACTIVATED.start() => "MAC, activated",
        p if p == PageLayout::MAC_UNACTIVATED.start() => "MAC, unactivated",
        p if p == PageLayout::COUNTER_INIT_STATE.start() => "counter snapshot or expiry",
        p if p == PageLayout::MAX_RIDES.start() => "max rides",
        ultralight_c::COUNTER_PAGE => "one-way counter",
        ultralight_c::AUTH0_PAGE => "AUTH0",
        ultralight_c::AUTH1_PAGE => "AUTH1",
        p if PageLayout::KEY.contains(p) => "key",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_roles() {
        assert_eq!(page_role(0), "serial number");
        assert_eq!(page_role(36), "MAC, activated");
        assert_eq!(page_role(39), "max rides");
        assert_eq!(page_role(45), "key");
        assert_eq!(page_role(20), "");
    }
}
