use std::path::{Path, PathBuf};

use eyre::OptionExt;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use nexum_ticket::TicketConfig;
use tracing::debug;

/// Configuration file name inside the config directory
const CONFIG_FILE: &str = "ticket.toml";

/// Prefix of the environment variables overriding the config file
const ENV_PREFIX: &str = "NXM_TICKET_";

/// Returns the base config directory for nexum
pub(crate) fn config_dir() -> eyre::Result<PathBuf> {
    Ok(std::env::home_dir()
        .ok_or_eyre("home directory not found")?
        .join(".nxm"))
}

/// Load the ticket configuration
///
/// Defaults, then the TOML file (`path`, or `~/.nxm/ticket.toml`), then
/// `NXM_TICKET_*` environment variables.
pub(crate) fn load_config(path: Option<&Path>) -> eyre::Result<TicketConfig> {
    let file = match path {
        Some(path) => path.to_path_buf(),
        None => config_dir()?.join(CONFIG_FILE),
    };
    debug!(file = %file.display(), "Loading configuration");

    let config: TicketConfig = figment(&file).extract()?;
    config.validate()?;
    Ok(config)
}

fn figment(file: &Path) -> Figment {
    Figment::from(Serialized::defaults(TicketConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX))
}
