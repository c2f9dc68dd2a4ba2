//! Commands that run the ticket machine

use std::path::Path;

use eyre::WrapErr;
use nexum_ticket::{TicketConfig, TicketMachine};
use tracing::info;

use super::warn_development_keys;
use crate::utils::display::{status, warning};
use crate::utils::tag_file::{load_tag, save_tag};

/// Issue rides onto a card
pub(crate) fn issue_command(
    path: &Path,
    config: &TicketConfig,
    rides: Option<u16>,
) -> eyre::Result<()> {
    warn_development_keys(config);

    let rides = rides.unwrap_or(config.rides_per_issue);
    info!(rides, validity = config.validity_period, "Issuing ticket");

    let mut machine = TicketMachine::new(load_tag(path)?, config)?;
    let result = machine.issue(rides, config.validity_period);
    let message = machine.info_to_show().to_string();

    // Writes that went through before a failure stay on the card
    save_tag(path, &machine.into_tag())?;

    println!("{}", status(result.is_ok(), &message));
    result.wrap_err("Issuing failed")?;
    Ok(())
}

/// Validate a card and consume one ride
pub(crate) fn use_command(path: &Path, config: &TicketConfig) -> eyre::Result<()> {
    warn_development_keys(config);

    let mut machine = TicketMachine::new(load_tag(path)?, config)?;
    let result = machine.use_ticket();
    let message = machine.info_to_show().to_string();
    save_tag(path, &machine.into_tag())?;

    println!("{}", status(result.is_ok(), &message));
    let ride = result.wrap_err("Ticket refused")?;
    if ride.counter_error.is_some() {
        println!(
            "{}",
            warning("Ride granted but not recorded on the card")
        );
    }
    Ok(())
}
