//! External lookup services.
//!
//! The resolver only sees the traits below; the structs implementing them are
//! thin blocking HTTP adapters that issue one request each and map the
//! response. Tests swap them for in-memory fakes.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::Cause;
use crate::settings::Settings;

pub type ProviderResult<T> = std::result::Result<T, Cause>;

const USER_AGENT: &str = concat!("azely/", env!("CARGO_PKG_VERSION"));

const IPINFO_URL: &str = "https://ipinfo.io/json";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const GOOGLE_TIMEZONE_URL: &str = "https://maps.googleapis.com/maps/api/timezone/json";
const TIMEAPI_URL: &str = "https://timeapi.io/api/TimeZone/coordinate";
const SESAME_URL: &str = "https://cds.unistra.fr/cgi-bin/nph-sesame/-oI/A";

lazy_static! {
    // "%J 40.66962918 -00.01329306 = 02 42 40.71 -00 00 47.8"
    static ref SESAME_J2000: Regex =
        Regex::new(r"(?m)^%J\s+([+-]?\d+(?:\.\d+)?)\s+([+-]?\d+(?:\.\d+)?)").unwrap();
}

/// A point on Earth as reported by a geocoding or IP lookup service.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub timezone: Option<String>,
}

/// Celestial coordinates with units, e.g. `02h42m40.711s` / `-00d00m47.855s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub longitude: String,
    pub latitude: String,
}

pub trait IpLocator: Send + Sync {
    fn locate(&self, timeout: Duration) -> ProviderResult<Place>;
}

pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str, timeout: Duration) -> ProviderResult<Place>;
}

pub trait TimezoneLookup: Send + Sync {
    /// IANA timezone name at the given position (degrees).
    fn timezone_at(&self, longitude: f64, latitude: f64, timeout: Duration) -> ProviderResult<String>;
}

pub trait NameResolver: Send + Sync {
    fn resolve_name(&self, name: &str, frame: &str, timeout: Duration) -> ProviderResult<Coordinates>;
}

/// The set of services a resolver talks to.
pub struct Providers {
    pub ip: Box<dyn IpLocator>,
    pub geocoder: Box<dyn Geocoder>,
    pub timezone: Option<Box<dyn TimezoneLookup>>,
    pub names: Box<dyn NameResolver>,
}

impl Providers {
    /// Google services when an API key is configured, OpenStreetMap and
    /// timeapi.io otherwise.
    pub fn online(settings: &Settings) -> Self {
        let (geocoder, timezone): (Box<dyn Geocoder>, Box<dyn TimezoneLookup>) = match &settings.google_api {
            Some(key) => (Box::new(GoogleGeocoder::new(key)), Box::new(GoogleTimezone::new(key))),
            None => (Box::new(Nominatim), Box::new(TimeApi)),
        };
        Self {
            ip: Box::new(IpInfo::new(settings.ipinfo_api.clone())),
            geocoder,
            timezone: Some(timezone),
            names: Box::new(Sesame),
        }
    }
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

fn coordinate(text: &str) -> ProviderResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid coordinate {text:?}: {e}").into())
}

// ------------- ipinfo.io -------------
pub struct IpInfo {
    token: Option<String>,
}

#[derive(Deserialize)]
struct IpInfoResponse {
    city: Option<String>,
    loc: Option<String>,
    timezone: Option<String>,
}

impl IpInfo {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl IpLocator for IpInfo {
    fn locate(&self, timeout: Duration) -> ProviderResult<Place> {
        let agent = agent(timeout);
        let mut request = agent.get(IPINFO_URL).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.query("token", token);
        }
        let response: IpInfoResponse = request.call()?.body_mut().read_json()?;
        let loc = response.loc.ok_or("ipinfo response has no location")?;
        // "latitude,longitude"
        let (latitude, longitude) = loc
            .split_once(',')
            .ok_or_else(|| format!("malformed ipinfo location {loc:?}"))?;
        debug!(loc = %loc, "located by IP address");
        Ok(Place {
            name: response.city.unwrap_or_default(),
            longitude: coordinate(longitude)?,
            latitude: coordinate(latitude)?,
            timezone: response.timezone,
        })
    }
}

// ------------- OpenStreetMap Nominatim -------------
pub struct Nominatim;

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl Geocoder for Nominatim {
    fn geocode(&self, query: &str, timeout: Duration) -> ProviderResult<Place> {
        let places: Vec<NominatimPlace> = agent(timeout)
            .get(NOMINATIM_URL)
            .header("User-Agent", USER_AGENT)
            .query("q", query)
            .query("format", "jsonv2")
            .query("limit", "1")
            .call()?
            .body_mut()
            .read_json()?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| format!("no place matches {query:?}"))?;
        Ok(Place {
            name: place.display_name,
            longitude: coordinate(&place.lon)?,
            latitude: coordinate(&place.lat)?,
            timezone: None,
        })
    }
}

// ------------- Google Maps Platform -------------
#[derive(Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
}

#[derive(Deserialize)]
struct GoogleGeocodeResult {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTimezoneResponse {
    status: String,
    time_zone_id: Option<String>,
}

pub struct GoogleGeocoder {
    key: String,
}

impl GoogleGeocoder {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, query: &str, timeout: Duration) -> ProviderResult<Place> {
        let response: GoogleGeocodeResponse = agent(timeout)
            .get(GOOGLE_GEOCODE_URL)
            .query("address", query)
            .query("key", &self.key)
            .call()?
            .body_mut()
            .read_json()?;
        if response.status != "OK" {
            return Err(format!("geocoding returned {}", response.status).into());
        }
        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| format!("no place matches {query:?}"))?;
        Ok(Place {
            name: result.formatted_address,
            longitude: result.geometry.location.lng,
            latitude: result.geometry.location.lat,
            timezone: None,
        })
    }
}

pub struct GoogleTimezone {
    key: String,
}

impl GoogleTimezone {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl TimezoneLookup for GoogleTimezone {
    fn timezone_at(&self, longitude: f64, latitude: f64, timeout: Duration) -> ProviderResult<String> {
        let location = format!("{latitude},{longitude}");
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let response: GoogleTimezoneResponse = agent(timeout)
            .get(GOOGLE_TIMEZONE_URL)
            .query("location", &location)
            .query("timestamp", &timestamp)
            .query("key", &self.key)
            .call()?
            .body_mut()
            .read_json()?;
        match (response.status.as_str(), response.time_zone_id) {
            ("OK", Some(zone)) => Ok(zone),
            (status, _) => Err(format!("timezone lookup returned {status}").into()),
        }
    }
}

// ------------- timeapi.io -------------
/// Keyless timezone lookup by coordinates.
pub struct TimeApi;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeApiZone {
    time_zone: String,
}

impl TimezoneLookup for TimeApi {
    fn timezone_at(&self, longitude: f64, latitude: f64, timeout: Duration) -> ProviderResult<String> {
        let zone: TimeApiZone = agent(timeout)
            .get(TIMEAPI_URL)
            .header("User-Agent", USER_AGENT)
            .query("latitude", latitude.to_string())
            .query("longitude", longitude.to_string())
            .call()?
            .body_mut()
            .read_json()?;
        if zone.time_zone.is_empty() {
            return Err(format!("no timezone at {latitude},{longitude}").into());
        }
        Ok(zone.time_zone)
    }
}

// ------------- CDS Sesame -------------
/// Resolves object names through CDS Sesame (SIMBAD, NED, VizieR). Sesame
/// answers in ICRS (J2000) only.
pub struct Sesame;

impl NameResolver for Sesame {
    fn resolve_name(&self, name: &str, frame: &str, timeout: Duration) -> ProviderResult<Coordinates> {
        if !frame.eq_ignore_ascii_case("icrs") {
            return Err(format!("name resolution is only available in icrs, not {frame}").into());
        }
        let url = format!("{SESAME_URL}?{}", urlencoding::encode(name));
        let text = agent(timeout)
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .call()?
            .body_mut()
            .read_to_string()?;
        let captures = SESAME_J2000
            .captures(&text)
            .ok_or_else(|| format!("unknown object {name:?}"))?;
        let ra: f64 = captures[1].parse()?;
        let dec: f64 = captures[2].parse()?;
        Ok(Coordinates {
            longitude: hours(ra),
            latitude: degrees(dec),
        })
    }
}

const DAY_MILLIS: u64 = 24 * 3_600_000;

/// Right ascension in degrees as `HHhMMmSS.sss`, wrapped into `[0h, 24h)`.
pub fn hours(ra: f64) -> String {
    let (_, millis) = milliseconds(ra.rem_euclid(360.0) / 15.0);
    let (h, m, s, ms) = sexagesimal(millis % DAY_MILLIS);
    format!("{h:02}h{m:02}m{s:02}.{ms:03}s")
}

/// Declination in degrees as `±DDdMMmSS.sss`.
pub fn degrees(dec: f64) -> String {
    let (negative, millis) = milliseconds(dec);
    let (d, m, s, ms) = sexagesimal(millis);
    let sign = if negative { '-' } else { '+' };
    format!("{sign}{d:02}d{m:02}m{s:02}.{ms:03}s")
}

fn milliseconds(value: f64) -> (bool, u64) {
    let millis = (value.abs() * 3_600_000.0).round() as u64;
    (value < 0.0 && millis > 0, millis)
}

fn sexagesimal(millis: u64) -> (u64, u64, u64, u64) {
    (millis / 3_600_000, millis / 60_000 % 60, millis / 1000 % 60, millis % 1000)
}
