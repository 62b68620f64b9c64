use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the konut binary.
#[derive(Debug, Parser)]
#[command(
    name = "konut",
    version,
    about = "Istanbul listing map backend with a nearest-amenity cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "KONUT_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP services.
    Serve(Box<ServeArgs>),
    /// Recompute the proximity cache for every listing with a location.
    #[command(name = "proximity")]
    Proximity(ProximityArgs),
    /// Store the distance to the nearest amenity of each map layer.
    #[command(name = "distances")]
    Distances(DistancesArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ProximityArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Drop every cached row before recomputing.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub invalidate: bool,

    /// Drop every cached row and exit without recomputing.
    #[arg(long = "invalidate-only", action = clap::ArgAction::SetTrue, conflicts_with = "invalidate")]
    pub invalidate_only: bool,

    /// Maximum number of listings computed in parallel, capped at 64.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(usize))]
    pub concurrency: usize,
}

#[derive(Debug, Args, Clone)]
pub struct DistancesArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Update a single listing.
    #[arg(long = "listing-id", value_name = "ID", conflicts_with = "all")]
    pub listing_id: Option<i64>,

    /// Update every listing.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub all: bool,

    /// Number of most recently updated listings to refresh.
    #[arg(long, default_value_t = 200, value_name = "COUNT")]
    pub limit: u32,
}
