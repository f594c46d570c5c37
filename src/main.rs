//! `azely <object> [location] [time]`
//!
//! Resolves the three queries and prints the records as TOML, along with the
//! first and last instants of the range on the location's clock. Location
//! and time may be omitted (or given as `""`) to use the IP-based location
//! and today's range.

use std::process::ExitCode;

use chrono::Utc;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use azely::AzelyError;
use azely::record::EntityKind;
use azely::resolve::Resolver;
use azely::settings::Settings;

#[derive(Serialize)]
struct Resolved {
    instants: usize,
    first: Option<String>,
    last: Option<String>,
    object: azely::record::Object,
    location: azely::record::Location,
    time: azely::time::Time,
}

fn run(args: &[String]) -> azely::Result<String> {
    let settings = Settings::load()?;
    settings.ensure_cache()?;
    let resolver = Resolver::online(&settings)?;
    let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
    let object = resolver.get_object(arg(0))?;
    let location = resolver.get_location(arg(1))?;
    let time = resolver.get_time(arg(2))?;
    let index = time
        .index(Utc::now(), &location.timezone)
        .map_err(|e| AzelyError::Resolution { key: arg(2).to_owned(), kind: EntityKind::Time, cause: e.into() })?;
    let resolved = Resolved {
        instants: index.len(),
        first: index.first().map(|t| t.to_rfc3339()),
        last: index.last().map(|t| t.to_rfc3339()),
        object,
        location,
        time,
    };
    toml::to_string(&resolved)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        eprintln!("usage: azely <object> [location] [time]");
        return ExitCode::from(2);
    }
    match run(&args) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, "resolution failed");
            ExitCode::FAILURE
        }
    }
}
