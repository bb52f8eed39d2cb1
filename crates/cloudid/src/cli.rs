//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Manage locally registered cloud server accounts.
#[derive(Debug, Parser)]
#[command(name = "cloudid", version, about)]
pub struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Account database, overriding the configured path.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by both provisioning commands.
#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    /// Username on the server.
    #[arg(long)]
    pub user: String,

    /// Server base URL.
    #[arg(long)]
    pub url: String,

    /// Server product version.
    #[arg(long, default_value = "")]
    pub server_version: String,

    /// Display name (defaults to the username).
    #[arg(long)]
    pub display_name: Option<String>,

    /// Previous server URL, used instead of --url when the server moved.
    #[arg(long)]
    pub prior_url: Option<String>,

    /// Update the account if it exists. The user must match the default account.
    #[arg(long)]
    pub update: bool,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register an account that authenticates with a password.
    AddBasic {
        #[command(flatten)]
        account: ProvisionArgs,

        /// Account password.
        #[arg(long, env = "CLOUDID_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Register an account that authenticates with `OAuth2` tokens.
    AddOauth {
        #[command(flatten)]
        account: ProvisionArgs,

        /// Access token.
        #[arg(long, env = "CLOUDID_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Refresh token.
        #[arg(long, env = "CLOUDID_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,

        /// Token type the access token is stored under.
        #[arg(long, default_value = "bearer")]
        token_type: String,

        /// Granted scope.
        #[arg(long)]
        scope: Option<String>,
    },

    /// List registered accounts.
    List,

    /// Print the default account.
    Default,

    /// Make an account the default.
    Switch {
        /// Account identity (`user@host[:port]`).
        identity: String,
    },

    /// Print an account's server base URL.
    BaseUrl {
        /// Account identity (`user@host[:port]`).
        identity: String,
    },

    /// Print whether an account uses `OAuth2`.
    SupportsOauth {
        /// Account identity (`user@host[:port]`).
        identity: String,
    },

    /// Print everything stored about an account as JSON.
    Show {
        /// Account identity (`user@host[:port]`).
        identity: String,
    },
}
