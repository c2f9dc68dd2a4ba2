//! Configuration commands

use nexum_ticket::TicketConfig;

use crate::utils::display::{info, warning};

/// Fields never printed
const SECRET_FIELDS: [&str; 3] = ["auth_master_key", "mac_master_key", "hash_key"];

/// Print the effective configuration, master keys redacted
pub(crate) fn config_command(config: &TicketConfig) -> eyre::Result<()> {
    let mut value = toml::Value::try_from(config)?;
    if let Some(table) = value.as_table_mut() {
        for field in SECRET_FIELDS {
            if let Some(entry) = table.get_mut(field) {
                *entry = toml::Value::String("<redacted>".to_string());
            }
        }
    }

    println!("{}", info("Effective configuration"));
    print!("{}", toml::to_string_pretty(&value)?);
    warn_development_keys(config);
    Ok(())
}

/// Warn when the configuration still holds development master keys
pub(crate) fn warn_development_keys(config: &TicketConfig) {
    if config.uses_development_keys() {
        println!(
            "{}",
            warning("Using development master keys, set them in ~/.nxm/ticket.toml")
        );
    }
}
