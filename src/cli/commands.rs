//! Command implementations.
//!
//! Every lookup command builds a [`GeocodeService`], runs one operation,
//! prints the result as pretty JSON on stdout, and finishes with
//! [`GeocodeService::clear`] so new cache entries are saved and uploaded.

use anyhow::{anyhow, Context as _, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::args::{CacheCommand, Cli, Commands};
use crate::config::GeocodeConfig;
use crate::context::Context;
use crate::distance::{self, DistanceUnit};
use crate::service::GeocodeService;
use crate::types::{AddressQuery, Point};

/// Run the parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    // distance needs no provider, key, or cache
    if let Commands::Distance { .. } = &cli.command {
        return print_json(&distance_output(&cli.command)?);
    }

    let config = load_config(cli)?;
    let ctx = match cli.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let mut service = GeocodeService::google(config).context("Failed to start geocode service")?;
    let output = execute(&mut service, &ctx, &cli.command);
    let cleared = service.clear().context("Failed to persist geocode cache");

    print_json(&output?)?;
    cleared
}

/// Build the effective configuration: YAML file, then flags and environment.
pub fn load_config(cli: &Cli) -> Result<GeocodeConfig> {
    let mut config = match &cli.config {
        Some(path) => GeocodeConfig::load(path)?,
        None => GeocodeConfig::default(),
    };

    if let Some(key) = &cli.key {
        config.geocoder_key = key.clone();
    }
    if let Some(host) = &cli.host {
        config.host = Some(host.clone());
    }
    if let Some(path) = &cli.path {
        config.path = Some(path.clone());
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(bucket) = &cli.bucket {
        config.bucket_name = Some(bucket.clone());
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = Some(dir.clone());
        config.storage_url = None;
    }
    if let Some(url) = &cli.storage_url {
        config.storage_url = Some(url.clone());
        config.storage_dir = None;
    }
    if cli.no_cache {
        config.cached = false;
    }

    Ok(config)
}

fn execute(service: &mut GeocodeService, ctx: &Context, command: &Commands) -> Result<Value> {
    let value = match command {
        Commands::Postal {
            postal_code,
            country,
        } => to_json(service.geocode(ctx, postal_code, country)?)?,
        Commands::Address(args) => {
            let query: AddressQuery = args.clone().into();
            to_json(service.geocode_address(ctx, &query)?)?
        }
        Commands::Reverse {
            latitude,
            longitude,
            hint,
        } => to_json(service.geocode_lat_long(ctx, *latitude, *longitude, hint)?)?,
        Commands::Route {
            origin,
            destination,
            lat_long: true,
        } => to_json(service.get_route_for_lat_long(
            ctx,
            &parse_lat_lng(origin)?,
            &parse_lat_lng(destination)?,
        )?)?,
        Commands::Route {
            origin,
            destination,
            lat_long: false,
        } => to_json(service.get_route_for_address(
            ctx,
            &free_form(origin),
            &free_form(destination),
        )?)?,
        Commands::Matrix {
            origins,
            destinations,
            lat_long: true,
        } => {
            let origins = origins
                .iter()
                .map(|s| parse_lat_lng(s))
                .collect::<Result<Vec<_>>>()?;
            let destinations = destinations
                .iter()
                .map(|s| parse_lat_lng(s))
                .collect::<Result<Vec<_>>>()?;
            to_json(service.get_route_matrix_for_lat_long(ctx, &origins, &destinations)?)?
        }
        Commands::Matrix {
            origins,
            destinations,
            lat_long: false,
        } => {
            let origins: Vec<_> = origins.iter().map(|s| free_form(s)).collect();
            let destinations: Vec<_> = destinations.iter().map(|s| free_form(s)).collect();
            to_json(service.get_route_matrix_for_address(ctx, &origins, &destinations)?)?
        }
        Commands::Cache {
            command: CacheCommand::Stats,
        } => {
            let stats = service
                .cache_stats()
                .ok_or_else(|| anyhow!("Cache is disabled"))?;
            to_json(stats)?
        }
        Commands::Cache {
            command: CacheCommand::Purge,
        } => json!({ "purged": service.purge_expired() }),
        Commands::Distance { .. } => distance_output(command)?,
    };
    Ok(value)
}

fn distance_output(command: &Commands) -> Result<Value> {
    let Commands::Distance {
        from_latitude,
        from_longitude,
        to_latitude,
        to_longitude,
        unit,
    } = command
    else {
        return Err(anyhow!("Not a distance command"));
    };

    let unit: DistanceUnit = unit.parse()?;
    let from = Point::new(*from_latitude, *from_longitude);
    let to = Point::new(*to_latitude, *to_longitude);
    let value = distance::distance(&from, &to, unit)?;
    Ok(json!({ "distance": value, "unit": unit }))
}

/// An address given as one line of text.
fn free_form(text: &str) -> AddressQuery {
    AddressQuery {
        street: text.to_string(),
        ..Default::default()
    }
}

/// Parse `lat,lng`.
fn parse_lat_lng(text: &str) -> Result<Point> {
    let (lat, lng) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected `lat,lng`, got `{}`", text))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude in `{}`", text))?;
    let longitude: f64 = lng
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude in `{}`", text))?;
    Ok(Point::new(latitude, longitude))
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
