#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Default geocoding collaborator for surplus.
//!
//! [`NominatimGeocoder`] implements both [`surplus_models::Geocoder`] and
//! [`surplus_models::Reverser`] against a Nominatim instance configured via
//! the TOML files in `services/`:
//!
//! - requests are spaced by the service's rate limit
//! - transient failures are retried with a fixed wait ([`retry`])
//! - identical lookups are answered from LRU caches
//! - the user agent carries a host fingerprint ([`user_agent`])

pub mod nominatim;
pub mod retry;
pub mod service_registry;
pub mod user_agent;

pub use nominatim::NominatimGeocoder;
pub use service_registry::GeocodingService;
pub use user_agent::{HostDetails, default_user_agent, fingerprinted_user_agent};
