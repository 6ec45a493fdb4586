//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows **1 request per second** at most; calls are
//! spaced by the service's `rate_limit_ms` and repeated lookups are served
//! from LRU caches.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/> and
//! <https://nominatim.org/release-docs/develop/api/Reverse/>.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use surplus_models::{AddressAttributes, BoundingBox, Coordinate, GeocodeError, Geocoder, Reverser};

use crate::retry::{self, RetryPolicy};
use crate::service_registry::GeocodingService;

/// Blocking Nominatim client implementing [`Geocoder`] and [`Reverser`].
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    base_url: String,
    rate_limit: Duration,
    policy: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
    search_cache: Mutex<LruCache<String, Coordinate>>,
    reverse_cache: Mutex<LruCache<(String, u8), AddressAttributes>>,
}

impl std::fmt::Debug for NominatimGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl NominatimGeocoder {
    /// Creates a client for `service`, identifying as `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(service: &GeocodingService, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(service.timeout())
            .build()
            .map_err(|e| GeocodeError::Http {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let capacity = NonZeroUsize::new(service.cache_capacity).unwrap_or(NonZeroUsize::MIN);

        log::debug!(
            "nominatim: base url {}, user agent {user_agent:?}",
            service.base_url
        );

        Ok(Self {
            client,
            base_url: service.base_url.trim_end_matches('/').to_string(),
            rate_limit: service.rate_limit(),
            policy: RetryPolicy::new(service.max_retries, service.retry_wait()),
            last_request: Mutex::new(None),
            search_cache: Mutex::new(LruCache::new(capacity)),
            reverse_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Sleeps until `rate_limit` has passed since the previous request.
    fn throttle(&self) {
        let mut last = lock(&self.last_request);
        let remaining = last.and_then(|at| self.rate_limit.checked_sub(at.elapsed()));
        if let Some(remaining) = remaining {
            log::debug!("nominatim: waiting {remaining:?} before next request");
            std::thread::sleep(remaining);
        }
        *last = Some(Instant::now());
    }

    fn search(&self, place: &str) -> Result<Coordinate, GeocodeError> {
        if let Some(hit) = lock(&self.search_cache).get(place) {
            log::debug!("nominatim: search cache hit for {place:?}");
            return Ok(*hit);
        }

        let url = format!("{}/search", self.base_url);
        self.throttle();
        let body = retry::send_json(
            || {
                self.client
                    .get(&url)
                    .query(&[("q", place), ("format", "jsonv2"), ("limit", "1")])
            },
            &self.policy,
        )?;

        let coordinate = parse_search_response(&body, place)?;
        lock(&self.search_cache).put(place.to_string(), coordinate);
        Ok(coordinate)
    }

    fn reverse_lookup(
        &self,
        coordinate: &Coordinate,
        level: u8,
    ) -> Result<AddressAttributes, GeocodeError> {
        let key = (coordinate.to_string(), level);
        if let Some(hit) = lock(&self.reverse_cache).get(&key) {
            log::debug!("nominatim: reverse cache hit for {} @ {level}", key.0);
            return Ok(hit.clone());
        }

        let url = format!("{}/reverse", self.base_url);
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        let zoom = level.to_string();

        self.throttle();
        let body = retry::send_json(
            || {
                self.client.get(&url).query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("zoom", zoom.as_str()),
                    ("format", "jsonv2"),
                    ("addressdetails", "1"),
                ])
            },
            &self.policy,
        )?;

        let attributes = parse_reverse_response(&body, coordinate)?;
        lock(&self.reverse_cache).put(key, attributes.clone());
        Ok(attributes)
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> Result<Coordinate, GeocodeError> {
        self.search(place)
    }
}

impl Reverser for NominatimGeocoder {
    fn reverse(&self, coordinate: &Coordinate, level: u8) -> Result<AddressAttributes, GeocodeError> {
        self.reverse_lookup(coordinate, level)
    }
}

/// Locks `mutex`, ignoring poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parse_degrees(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parses `boundingbox` (`[lat_lo, lat_hi, lon_lo, lon_hi]`). Anything but
/// four numbers yields `None`.
fn parse_bounding_box(value: &serde_json::Value) -> Option<BoundingBox> {
    let bounds = value.as_array()?;
    let [lat_lo, lat_hi, lon_lo, lon_hi] = bounds.as_slice() else {
        return None;
    };

    Some(BoundingBox {
        lat_lo: parse_degrees(lat_lo)?,
        lat_hi: parse_degrees(lat_hi)?,
        lon_lo: parse_degrees(lon_lo)?,
        lon_hi: parse_degrees(lon_hi)?,
    })
}

/// Parses a `/search` response for `place`.
///
/// # Errors
///
/// * [`GeocodeError::Parse`] if the body is not an array or the first hit
///   has no usable `lat`/`lon`
/// * [`GeocodeError::NoSuitableLocation`] if there are no hits
pub fn parse_search_response(
    body: &serde_json::Value,
    place: &str,
) -> Result<Coordinate, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim search response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Err(GeocodeError::NoSuitableLocation {
            query: place.to_string(),
        });
    };

    let lat = parse_degrees(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lon = parse_degrees(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let coordinate = Coordinate::new(lat, lon);

    Ok(match parse_bounding_box(&first["boundingbox"]) {
        Some(bounds) => coordinate.with_bounding_box(bounds),
        None => coordinate,
    })
}

/// Parses a `/reverse` response for `coordinate` into address attributes.
///
/// # Errors
///
/// Returns [`GeocodeError::NoSuitableLocation`] if Nominatim reports an
/// error or the response has no `address` object.
pub fn parse_reverse_response(
    body: &serde_json::Value,
    coordinate: &Coordinate,
) -> Result<AddressAttributes, GeocodeError> {
    let no_location = || GeocodeError::NoSuitableLocation {
        query: coordinate.to_string(),
    };

    if let Some(error) = body.get("error") {
        log::debug!("nominatim: reverse error {error}");
        return Err(no_location());
    }

    let address = body
        .get("address")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(no_location)?;

    let mut attributes: AddressAttributes = address
        .iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect();

    attributes.insert("latitude".to_string(), coordinate.latitude.to_string());
    attributes.insert("longitude".to_string(), coordinate.longitude.to_string());

    Ok(attributes)
}
