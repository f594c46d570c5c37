//! Records and the typed entities they carry.
//!
//! A [`Record`] is what the cache stores: a flat, ordered map of field name to
//! string value. Each [`EntityKind`] has its own table in the cache document and
//! its own schema, expressed by the typed [`Location`], [`Object`] and
//! [`crate::time::Time`] structs implementing [`Entity`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AzelyError, Result};

/// Frame tag given to solar-system bodies, whose coordinates depend on time.
pub const SOLAR: &str = "solar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Location,
    Object,
    Time,
}
impl EntityKind {
    /// Name of the cache table holding records of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Location => "location",
            EntityKind::Object => "object",
            EntityKind::Time => "time",
        }
    }
}
impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

// ------------- Record -------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
    /// Reads a TOML table entry. Scalars are kept in their TOML text form so
    /// hand-written user files may use `altitude = 0`; nested arrays or tables
    /// make the entry invalid.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        let table = value.as_table()?;
        let mut record = Record::new();
        for (field, value) in table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => return None,
            };
            record.insert(field.as_str(), text);
        }
        Some(record)
    }
    pub fn to_toml(&self) -> toml::Value {
        toml::Value::Table(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<String> = self.iter().map(|(k, v)| format!("{k} = {v:?}")).collect();
        write!(f, "{{ {} }}", fields.join(", "))
    }
}

/// A typed view of a [`Record`] with a fixed schema.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn from_record(record: &Record) -> Result<Self> {
        serde_json::to_value(record)
            .and_then(serde_json::from_value)
            .map_err(|e| AzelyError::Schema { kind: Self::KIND, message: e.to_string() })
    }
    fn to_record(&self) -> Result<Record> {
        serde_json::to_value(self)
            .and_then(serde_json::from_value)
            .map_err(|e| AzelyError::Schema { kind: Self::KIND, message: e.to_string() })
    }
}

// ------------- Location -------------
/// Longitude and latitude are in degrees, altitude in meters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub longitude: String,
    pub latitude: String,
    #[serde(default = "default_altitude")]
    pub altitude: String,
    /// IANA timezone name, empty when unknown.
    #[serde(default)]
    pub timezone: String,
}

fn default_altitude() -> String {
    String::from("0")
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;
}

// ------------- Object -------------
/// `frame` names the equatorial coordinates (e.g. `icrs`) the longitude and
/// latitude are written in, or is [`SOLAR`] for bodies of the solar system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub frame: String,
    pub longitude: String,
    pub latitude: String,
}

impl Object {
    pub fn is_solar(&self) -> bool {
        self.frame == SOLAR
    }
}

impl Entity for Object {
    const KIND: EntityKind = EntityKind::Object;
}
