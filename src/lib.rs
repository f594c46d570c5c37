//! Azely – resolve fuzzy location, object and time queries and cache the
//! answers.
//!
//! Computing where an astronomical object stands in the sky needs three
//! things: where the observer is, what is being observed and when. Azely
//! turns loose queries for each of them into flat records:
//! * a [`record::Location`] (`"ALMA AOS"`, `"here"`) from a geocoding or IP
//!   lookup service,
//! * a [`record::Object`] (`"NGC1068"`, `"Sun"`) from a catalog name resolver
//!   or the list of solar-system bodies,
//! * a [`time::Time`] range (`"2020-01-01; 2020-01-02; 5min"`) from a small
//!   calendar parser.
//!
//! Network answers are memoized in a TOML file so that a place or object is
//! only looked up once.
//!
//! ## Modules
//! * [`query`] – The `[<source>:]<body>[!]` query grammar.
//! * [`resolve`] – The [`resolve::Resolver`], dispatching a query to a strategy.
//! * [`cache`] – The [`cache::RecordCache`] and its get-or-create contract.
//! * [`providers`] – Traits for the external services plus HTTP adapters.
//! * [`record`] – Records, entity kinds and the typed entities.
//! * [`time`] – Time range queries and their expansion into instants.
//! * [`settings`] – Layered configuration.
//!
//! ## Queries
//! A query is an optional `source:` prefix naming a user TOML file, the lookup
//! text, and an optional trailing `!` forcing a cached answer to be refreshed:
//! ```
//! let parsed = azely::query::parse("observatories:ASTE!").unwrap();
//! assert_eq!(parsed.source(), Some("observatories"));
//! assert_eq!(parsed.key(), "ASTE");
//! assert!(parsed.force_update());
//! ```
//!
//! ## Cache
//! The cache file (`~/.config/azely/cache.toml` by default) has one table per
//! kind, keyed by the query text exactly as written:
//! ```toml
//! [object.NGC1068]
//! frame = "icrs"
//! latitude = "-00d00m47.855s"
//! longitude = "02h42m40.711s"
//! name = "NGC1068"
//! ```
//! User files use the same layout, or plain top-level tables (`[ASTE]`), and
//! are never written to.
//!
//! ## Quick Start
//! ```no_run
//! use azely::{resolve::Resolver, settings::Settings};
//! let settings = Settings::load().unwrap();
//! let resolver = Resolver::online(&settings).unwrap();
//! let object = resolver.get_object("NGC1068").unwrap();
//! let location = resolver.get_location("ALMA AOS").unwrap();
//! let time = resolver.get_time("2020-01-01; 2020-01-02").unwrap();
//! println!("{object:?} at {location:?} during {time:?}");
//! ```

pub mod cache;
pub mod error;
pub mod providers;
pub mod query;
pub mod record;
pub mod resolve;
pub mod settings;
pub mod time;

pub use error::{AzelyError, Result};
