use clap::Subcommand;

mod card_operations;
mod config_operations;
mod ticket_operations;

pub(crate) use card_operations::*;
pub(crate) use config_operations::*;
pub(crate) use ticket_operations::*;

/// Define subcommands for the CLI
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Create a factory-fresh card image
    Blank {
        /// 7-byte serial number in hex (random if not specified)
        #[arg(long)]
        uid: Option<String>,

        /// Overwrite an existing image
        #[arg(long)]
        force: bool,
    },

    /// Issue rides, or top up an issued card
    ///
    /// The validity window opened by the first ride is `validity_period` from the
    /// configuration of the machine validating the card.
    Issue {
        /// Rides to add (defaults to rides_per_issue from the config)
        #[arg(short, long)]
        rides: Option<u16>,
    },

    /// Validate the card and consume one ride
    Use,

    /// Show the ticket without modifying the card
    Inspect,

    /// Print the raw memory of the card
    Dump,

    /// Print the effective configuration
    Config,
}
