#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared value types for surplus.
//!
//! These types describe a location once it has been pinned down (a
//! [`Coordinate`], optionally with the [`BoundingBox`] of the feature it was
//! geocoded from) and the address information a reverse geocoder hands back
//! ([`AddressAttributes`]). The geocoding services themselves are external
//! collaborators, described here only through the [`Geocoder`] and
//! [`Reverser`] traits so that the core never depends on a particular
//! provider.

use std::collections::BTreeMap;
use std::fmt;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

/// Detail level used when reverse-geocoding for full shareable text
/// (building level).
pub const DEFAULT_REVERSE_LEVEL: u8 = 18;

/// Detail level used when reverse-geocoding a coordinate into the locality
/// of a shortened Plus Code.
pub const LOCALITY_GEOCODER_LEVEL: u8 = 13;

/// Address information keyed by semantic key (`"road"`, `"postcode"`,
/// `"ISO3166-2-lvl4"`, ...).
///
/// Keys are sparse and region-dependent; a missing key is not an error.
pub type AddressAttributes = BTreeMap<String, String>;

/// Bounds of a geocoded feature, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern latitude bound.
    pub lat_lo: f64,
    /// Northern latitude bound.
    pub lat_hi: f64,
    /// Western longitude bound.
    pub lon_lo: f64,
    /// Eastern longitude bound.
    pub lon_hi: f64,
}

impl BoundingBox {
    /// Height of the box in degrees latitude.
    #[must_use]
    pub fn height(&self) -> f64 {
        (self.lat_lo - self.lat_hi).abs()
    }

    /// Width of the box in degrees longitude.
    #[must_use]
    pub fn width(&self) -> f64 {
        (self.lon_lo - self.lon_hi).abs()
    }

    /// Returns `true` if every bound is a finite number.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat_lo.is_finite()
            && self.lat_hi.is_finite()
            && self.lon_lo.is_finite()
            && self.lon_hi.is_finite()
    }
}

/// A latitude/longitude pair (WGS84).
///
/// The bounding box is only populated when the coordinate comes out of a
/// forward-geocode lookup; it is what the Plus Code shortener measures the
/// locality against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Bounds of the feature this coordinate was geocoded from, if any.
    pub bounding_box: Option<BoundingBox>,
}

impl Coordinate {
    /// Creates a coordinate without a bounding box.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            bounding_box: None,
        }
    }

    /// Returns a copy of this coordinate carrying `bounding_box`.
    #[must_use]
    pub const fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}

/// Renders as `"<latitude>, <longitude>"`.
///
/// Whole-degree values keep their trailing `.0` (`"1.0, 103.0"`).
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}, {:?}", self.latitude, self.longitude)
    }
}

/// What a query should be converted into.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ConversionResultType {
    /// A full-length Plus Code, e.g. `6PH58QMF+FX`.
    PlusCode,
    /// A shortened Plus Code with a locality, e.g. `8QMF+FX Singapore`.
    LocalCode,
    /// A `"<latitude>, <longitude>"` pair.
    Latlong,
    /// Multi-line shareable address text.
    #[default]
    #[strum(serialize = "sharetext")]
    ShareableText,
}

/// Errors raised by geocoding collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The service found nothing for the given input.
    #[error("No suitable location could be geolocated from '{query}'")]
    NoSuitableLocation {
        /// The place name or coordinate text that was looked up.
        query: String,
    },

    /// The HTTP request failed (after any retries).
    #[error("HTTP error: {message}")]
    Http {
        /// Description of the transport failure.
        message: String,
    },

    /// The service responded with something that could not be understood.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded (after any retries).
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Forward geocoder: place name to coordinate.
///
/// Implementations used for Plus Code shortening **must** populate
/// [`Coordinate::bounding_box`]. Implementations should cache identical
/// lookups and apply their own rate limiting and retries; the caller treats
/// any returned error as final.
pub trait Geocoder {
    /// Looks up `place`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NoSuitableLocation`] if nothing matches, or
    /// another [`GeocodeError`] if the service could not be reached.
    fn geocode(&self, place: &str) -> Result<Coordinate, GeocodeError>;
}

/// Reverse geocoder: coordinate to address attributes.
///
/// `level` is the level of detail, 0 (country) to 18 (building). The
/// returned attributes should include a key starting with `ISO3166`
/// (case-insensitive) holding the ISO 3166-2 subdivision code.
pub trait Reverser {
    /// Reverses `coordinate` at the given detail `level`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::NoSuitableLocation`] if nothing reverses, or
    /// another [`GeocodeError`] if the service could not be reached.
    fn reverse(&self, coordinate: &Coordinate, level: u8)
    -> Result<AddressAttributes, GeocodeError>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Result<Coordinate, GeocodeError>,
{
    fn geocode(&self, place: &str) -> Result<Coordinate, GeocodeError> {
        self(place)
    }
}

impl<F> Reverser for F
where
    F: Fn(&Coordinate, u8) -> Result<AddressAttributes, GeocodeError>,
{
    fn reverse(
        &self,
        coordinate: &Coordinate,
        level: u8,
    ) -> Result<AddressAttributes, GeocodeError> {
        self(coordinate, level)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn coordinate_display_keeps_decimal_point() {
        assert_eq!(Coordinate::new(1.3521, 103.8198).to_string(), "1.3521, 103.8198");
        assert_eq!(Coordinate::new(1.0, -103.0).to_string(), "1.0, -103.0");
    }

    #[test]
    fn bounding_box_dimensions_ignore_bound_order() {
        let bbox = BoundingBox {
            lat_lo: 1.5,
            lat_hi: 1.2,
            lon_lo: 103.6,
            lon_hi: 104.1,
        };
        assert!((bbox.height() - 0.3).abs() < 1e-9);
        assert!((bbox.width() - 0.5).abs() < 1e-9);
        assert!(bbox.is_finite());
    }

    #[test]
    fn bounding_box_rejects_non_finite_bounds() {
        let bbox = BoundingBox {
            lat_lo: f64::NAN,
            lat_hi: 1.2,
            lon_lo: 103.6,
            lon_hi: 104.1,
        };
        assert!(!bbox.is_finite());
    }

    #[test]
    fn conversion_result_type_round_trips_cli_names() {
        let names: Vec<String> = ConversionResultType::iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(names, ["pluscode", "localcode", "latlong", "sharetext"]);

        for name in &names {
            let parsed = ConversionResultType::from_str(name).unwrap();
            assert_eq!(parsed.as_ref(), name);
        }
    }

    #[test]
    fn default_conversion_is_shareable_text() {
        assert_eq!(
            ConversionResultType::default(),
            ConversionResultType::ShareableText
        );
    }

    #[test]
    fn closures_act_as_collaborators() {
        let geocoder = |place: &str| -> Result<Coordinate, GeocodeError> {
            if place == "Singapore" {
                Ok(Coordinate::new(1.29, 103.85))
            } else {
                Err(GeocodeError::NoSuitableLocation {
                    query: place.to_string(),
                })
            }
        };

        assert_eq!(
            geocoder.geocode("Singapore").unwrap(),
            Coordinate::new(1.29, 103.85)
        );
        assert_eq!(
            geocoder.geocode("Atlantis").unwrap_err().to_string(),
            "No suitable location could be geolocated from 'Atlantis'"
        );
    }
}
