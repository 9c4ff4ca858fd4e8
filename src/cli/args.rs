//! CLI argument definitions.
//!
//! Global flags override the YAML config file; each one can also come from
//! its environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::AddressQuery;

/// geocode - Cached geocoding, reverse geocoding, distance, and routing.
#[derive(Debug, Parser)]
#[command(name = "geocode")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true, env = "GEOCODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provider API key
    #[arg(long, global = true, env = "GEOCODER_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Provider host
    #[arg(long, global = true, env = "GEOCODER_HOST")]
    pub host: Option<String>,

    /// Geocoding endpoint path
    #[arg(long, global = true, env = "GEOCODER_PATH")]
    pub path: Option<String>,

    /// Directory holding the cache file
    #[arg(long, global = true, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Bucket for the remote cache copy
    #[arg(long, global = true, env = "BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Use a local directory as object storage
    #[arg(long, global = true, env = "STORAGE_DIR", conflicts_with = "storage_url")]
    pub storage_dir: Option<PathBuf>,

    /// Use an HTTP object store at this base URL
    #[arg(long, global = true, env = "STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Disable the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Give up on lookups after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Geocode a postal code
    Postal {
        /// Postal code
        postal_code: String,

        /// Country code (defaults to the configured country)
        #[arg(long, default_value = "")]
        country: String,
    },

    /// Geocode a street address
    Address(AddressArgs),

    /// Reverse geocode a coordinate
    #[command(allow_negative_numbers = true)]
    Reverse {
        latitude: f64,
        longitude: f64,

        /// Prefer the result whose address contains this text
        #[arg(long, default_value = "")]
        hint: String,
    },

    /// Distance between two coordinates
    #[command(allow_negative_numbers = true)]
    Distance {
        from_latitude: f64,
        from_longitude: f64,
        to_latitude: f64,
        to_longitude: f64,

        /// KM, MILES, METERS, or FEET
        #[arg(short, long, default_value = "KM")]
        unit: String,
    },

    /// Route between two places
    Route {
        origin: String,
        destination: String,

        /// Treat origin and destination as `lat,lng`
        #[arg(long)]
        lat_long: bool,
    },

    /// Legs for every origin/destination pair
    Matrix {
        /// Origin (repeatable)
        #[arg(long = "origin", required = true)]
        origins: Vec<String>,

        /// Destination (repeatable)
        #[arg(long = "destination", required = true)]
        destinations: Vec<String>,

        /// Treat places as `lat,lng`
        #[arg(long)]
        lat_long: bool,
    },

    /// Inspect or maintain the local cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// Cache subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CacheCommand {
    /// Show cache statistics
    Stats,
    /// Drop expired entries
    Purge,
}

/// Arguments for the `address` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct AddressArgs {
    #[arg(long, default_value = "")]
    pub street: String,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long, default_value = "")]
    pub state: String,

    #[arg(long, default_value = "")]
    pub postal_code: String,

    #[arg(long, default_value = "")]
    pub country: String,
}

impl From<AddressArgs> for AddressQuery {
    fn from(args: AddressArgs) -> Self {
        AddressQuery {
            street: args.street,
            city: args.city,
            postal_code: args.postal_code,
            state: args.state,
            country: args.country,
        }
    }
}
