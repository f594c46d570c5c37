//! Dispatch of parsed queries to resolution strategies.
//!
//! Rules are tried in order and the first match wins:
//! 1. a location query that is empty or `here` is located by IP address
//! 2. an object query naming a solar-system body gets a solar record
//! 3. a query with a `source:` prefix is read from that user file, never
//!    cached and never sent to the network
//! 4. anything else goes to the network (or, for time, the calendar parser)
//!
//! Rules 1, 2 and 4 are memoized in the default cache.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::cache::{CachePolicy, CachedResolver, RecordCache};
use crate::error::{AzelyError, Cause, Result};
use crate::providers::{Place, Providers};
use crate::query::{self, ParsedQuery, Query};
use crate::record::{Entity, EntityKind, Location, Object, Record, SOLAR};
use crate::settings::Settings;
use crate::time::Time;

/// Location query answered by an IP address lookup.
pub const HERE: &str = "here";

/// Bodies whose positions come from an ephemeris rather than a catalog.
pub const SOLAR_BODIES: [&str; 12] = [
    "sun",
    "moon",
    "mercury",
    "venus",
    "earth",
    "earth-moon-barycenter",
    "mars",
    "jupiter",
    "saturn",
    "uranus",
    "neptune",
    "pluto",
];

const NOT_AVAILABLE: &str = "NaN";

pub fn is_solar(key: &str) -> bool {
    let key = key.to_lowercase();
    SOLAR_BODIES.contains(&key.as_str())
}

/// Per-call parameters of the strategies.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub timeout: Duration,
    pub frame: String,
    pub separator: Regex,
    /// Whether cache misses are stored.
    pub append: bool,
}

impl ResolveOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let separator = Regex::new(&settings.separator)
            .map_err(|e| AzelyError::Config(format!("invalid separator: {e}")))?;
        Ok(Self {
            timeout: settings.timeout()?,
            frame: settings.frame.clone(),
            separator,
            append: settings.append,
        })
    }
}

pub struct Resolver {
    dir: PathBuf,
    cache: RecordCache,
    providers: Providers,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(settings: &Settings, providers: Providers) -> Result<Self> {
        Ok(Self {
            dir: settings.dir.clone(),
            cache: RecordCache::new(settings.cache_path()),
            providers,
            options: ResolveOptions::from_settings(settings)?,
        })
    }
    /// A resolver backed by the online services.
    pub fn online(settings: &Settings) -> Result<Self> {
        Self::new(settings, Providers::online(settings))
    }
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn get_location(&self, query: impl Into<Query>) -> Result<Location> {
        Location::from_record(&self.resolve(&query.into(), EntityKind::Location)?)
    }
    pub fn get_object(&self, query: impl Into<Query>) -> Result<Object> {
        Object::from_record(&self.resolve(&query.into(), EntityKind::Object)?)
    }
    pub fn get_time(&self, query: impl Into<Query>) -> Result<Time> {
        Time::from_record(&self.resolve(&query.into(), EntityKind::Time)?)
    }

    pub fn resolve(&self, query: &Query, kind: EntityKind) -> Result<Record> {
        self.resolve_with(query, kind, &self.options)
    }

    pub fn resolve_with(&self, query: &Query, kind: EntityKind, options: &ResolveOptions) -> Result<Record> {
        match query {
            Query::Explicit(record) => {
                validate(kind, record)?;
                Ok(record.clone())
            }
            Query::Raw(raw) if raw.trim().is_empty() => match kind {
                EntityKind::Object => Err(AzelyError::Parse { query: raw.clone() }),
                _ => self.resolve_parsed(&ParsedQuery::empty(), kind, options),
            },
            Query::Raw(raw) => self.resolve_parsed(&query::parse(raw)?, kind, options),
        }
    }

    pub fn resolve_parsed(&self, parsed: &ParsedQuery, kind: EntityKind, options: &ResolveOptions) -> Result<Record> {
        // "00:00 today" is a time, not a file called "00"
        let parsed = match parsed.source() {
            Some(source) if kind == EntityKind::Time && query::locate_source(source, &self.dir).is_none() => {
                parsed.without_source()
            }
            _ => parsed.clone(),
        };
        let key = parsed.key();
        let cached = CachedResolver::new(
            &self.cache,
            CachePolicy { append: options.append, overwrite: parsed.force_update() },
        );
        if kind == EntityKind::Location && (key.is_empty() || key.eq_ignore_ascii_case(HERE)) {
            debug!(key, strategy = "ip", "dispatching");
            return cached.resolve(kind, key, || self.locate_by_ip(key, options));
        }
        if kind == EntityKind::Object && is_solar(key) {
            debug!(key, strategy = "solar", "dispatching");
            return cached.resolve(kind, key, || solar_record(key));
        }
        if let Some(source) = parsed.source() {
            debug!(key, source, strategy = "user-file", "dispatching");
            return self.from_user_file(source, key, kind);
        }
        debug!(key, %kind, strategy = "network", "dispatching");
        cached.resolve(kind, key, || match kind {
            EntityKind::Location => self.geocode(key, options),
            EntityKind::Object => self.resolve_name(key, options),
            EntityKind::Time => self.parse_time(key, options),
        })
    }

    // ------------- strategies -------------
    fn locate_by_ip(&self, key: &str, options: &ResolveOptions) -> Result<Record> {
        let fail = |cause: Cause| AzelyError::resolution(key, EntityKind::Location, cause);
        let place = self.providers.ip.locate(options.timeout).map_err(fail)?;
        self.location_record(place.name.clone(), place, key, options)
    }

    fn geocode(&self, key: &str, options: &ResolveOptions) -> Result<Record> {
        let fail = |cause: Cause| AzelyError::resolution(key, EntityKind::Location, cause);
        let place = self.providers.geocoder.geocode(key, options.timeout).map_err(fail)?;
        info!(key, address = %place.name, "geocoded");
        self.location_record(key.to_owned(), place, key, options)
    }

    fn location_record(&self, name: String, place: Place, key: &str, options: &ResolveOptions) -> Result<Record> {
        let timezone = match (place.timezone, &self.providers.timezone) {
            (Some(timezone), _) => timezone,
            (None, Some(lookup)) => lookup
                .timezone_at(place.longitude, place.latitude, options.timeout)
                .map_err(|cause| AzelyError::resolution(key, EntityKind::Location, cause))?,
            (None, None) => String::new(),
        };
        Location {
            name,
            longitude: place.longitude.to_string(),
            latitude: place.latitude.to_string(),
            altitude: String::from("0"),
            timezone,
        }
        .to_record()
    }

    fn resolve_name(&self, key: &str, options: &ResolveOptions) -> Result<Record> {
        let coordinates = self
            .providers
            .names
            .resolve_name(key, &options.frame, options.timeout)
            .map_err(|cause| AzelyError::resolution(key, EntityKind::Object, cause))?;
        Object {
            name: key.to_owned(),
            frame: options.frame.clone(),
            longitude: coordinates.longitude,
            latitude: coordinates.latitude,
        }
        .to_record()
    }

    fn parse_time(&self, key: &str, options: &ResolveOptions) -> Result<Record> {
        Time::from_query(key, &options.separator)
            .map_err(|cause| AzelyError::resolution(key, EntityKind::Time, cause))?
            .to_record()
    }

    fn from_user_file(&self, source: &str, key: &str, kind: EntityKind) -> Result<Record> {
        let not_found = |path: PathBuf| AzelyError::NotFound { key: key.to_owned(), path };
        let path = query::locate_source(source, &self.dir)
            .ok_or_else(|| not_found(self.dir.join(query::source_path(source))))?;
        let user_file = RecordCache::new(&path);
        let record = match user_file.get(kind.table(), key)? {
            Some(record) => record,
            None => user_file.get_top_level(key)?.ok_or_else(|| not_found(path.clone()))?,
        };
        validate(kind, &record)?;
        info!(key, path = %path.display(), "read from user file");
        Ok(record)
    }
}

fn solar_record(key: &str) -> Result<Record> {
    let mut chars = key.chars();
    let name = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    Object {
        name,
        frame: SOLAR.to_owned(),
        longitude: NOT_AVAILABLE.to_owned(),
        latitude: NOT_AVAILABLE.to_owned(),
    }
    .to_record()
}

fn validate(kind: EntityKind, record: &Record) -> Result<()> {
    match kind {
        EntityKind::Location => Location::from_record(record).map(drop),
        EntityKind::Object => Object::from_record(record).map(drop),
        EntityKind::Time => Time::from_record(record).map(drop),
    }
}
