#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plus Code, coordinate and place name conversion.
//!
//! [`Surplus`] ties a forward [`Geocoder`] and a [`Reverser`] together and
//! converts any [`Query`] into one of the [`ConversionResultType`] forms:
//!
//! - shareable text, the default, e.g. `"Wisma Atria\n435 Orchard Road\n..."`
//! - a full Plus Code, e.g. `6PH58QMF+FX`
//! - a local code, e.g. `8QMF+FX Singapore`
//! - a latitude/longitude pair, e.g. `1.3521, 103.8198`

pub mod shorten;

use surplus_models::{
    ConversionResultType, Coordinate, DEFAULT_REVERSE_LEVEL, GeocodeError, Geocoder, Reverser,
};
use surplus_pluscode::{CODE_LENGTH_DEFAULT, PlusCodeError};
use surplus_query::{ParseOptions, Query, QueryError};
use thiserror::Error;

pub use shorten::{ShortenError, ShortenedCode, shorten, shorten_code};

/// Package version, as printed in the version header and user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Any failure of a conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurplusError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    PlusCode(#[from] PlusCodeError),

    #[error(transparent)]
    Shorten(#[from] ShortenError),
}

/// Coarse classification of a [`SurplusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// There was nothing to convert.
    Input,
    /// The query could not be classified.
    Parse,
    /// The query was understood but could not be resolved or rendered.
    Resolution,
}

impl SurplusError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Query(QueryError::EmptyQuery) => ErrorKind::Input,
            Self::Query(
                QueryError::PlusCodeNotFound
                | QueryError::IncompletePlusCode { .. }
                | QueryError::LatlongParse { .. },
            ) => ErrorKind::Parse,
            Self::Query(QueryError::Geocode(_) | QueryError::PlusCode(_))
            | Self::Geocode(_)
            | Self::PlusCode(_)
            | Self::Shorten(_) => ErrorKind::Resolution,
        }
    }
}

/// Converter over a pair of geocoding collaborators.
#[derive(Debug)]
pub struct Surplus<'a, G: ?Sized, R: ?Sized> {
    geocoder: &'a G,
    reverser: &'a R,
}

impl<G: ?Sized, R: ?Sized> Clone for Surplus<'_, G, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: ?Sized, R: ?Sized> Copy for Surplus<'_, G, R> {}

impl<'a, G, R> Surplus<'a, G, R>
where
    G: Geocoder + ?Sized,
    R: Reverser + ?Sized,
{
    #[must_use]
    pub const fn new(geocoder: &'a G, reverser: &'a R) -> Self {
        Self { geocoder, reverser }
    }

    fn resolve(&self, query: &Query) -> Result<Coordinate, SurplusError> {
        let coordinate = query.resolve(self.geocoder)?;
        log::debug!("resolved {query} to {coordinate:?}");
        Ok(coordinate)
    }

    /// Converts an already classified query.
    ///
    /// A query that is already in the requested form is returned as typed.
    ///
    /// # Errors
    ///
    /// * [`SurplusError::Query`] if the query cannot be resolved
    /// * [`SurplusError::Geocode`] if reverse geocoding fails
    /// * [`SurplusError::PlusCode`] if the coordinate cannot be encoded
    /// * [`SurplusError::Shorten`] if a local code locality is unusable
    pub fn convert(
        &self,
        query: &Query,
        result_type: ConversionResultType,
    ) -> Result<String, SurplusError> {
        match (result_type, query) {
            (ConversionResultType::PlusCode, Query::FullCode(_))
            | (ConversionResultType::LocalCode, Query::LocalCode(_))
            | (ConversionResultType::Latlong, Query::LatLong(_)) => Ok(query.to_string()),
            (ConversionResultType::PlusCode, _) => {
                let coordinate = self.resolve(query)?;
                Ok(surplus_pluscode::encode(
                    coordinate.latitude,
                    coordinate.longitude,
                    CODE_LENGTH_DEFAULT,
                )?)
            }
            (ConversionResultType::LocalCode, _) => {
                let coordinate = self.resolve(query)?;
                Ok(shorten(&coordinate, self.geocoder, self.reverser)?.to_string())
            }
            (ConversionResultType::Latlong, _) => Ok(self.resolve(query)?.to_string()),
            (ConversionResultType::ShareableText, _) => {
                let coordinate = self.resolve(query)?;
                let attributes = self.reverser.reverse(&coordinate, DEFAULT_REVERSE_LEVEL)?;
                log::debug!("reversed {coordinate} to {attributes:?}");

                Ok(surplus_text::shareable_text(&attributes))
            }
        }
    }

    /// Classifies `query` and converts it.
    ///
    /// # Errors
    ///
    /// * [`SurplusError::Query`] if the query cannot be classified
    /// * anything [`Self::convert`] returns
    pub fn convert_str(
        &self,
        query: &str,
        options: &ParseOptions,
        result_type: ConversionResultType,
    ) -> Result<String, SurplusError> {
        let query = surplus_query::parse_query(query, options)?;
        self.convert(&query, result_type)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use surplus_models::{AddressAttributes, BoundingBox};

    use super::*;

    fn geocoder(place: &str) -> Result<Coordinate, GeocodeError> {
        match place {
            "Singapore" => Ok(Coordinate::new(1.357_107, 103.819_499_2).with_bounding_box(
                BoundingBox {
                    lat_lo: 1.130_475_3,
                    lat_hi: 1.450_475_3,
                    lon_lo: 103.692_035_9,
                    lon_hi: 104.012_035_9,
                },
            )),
            "Wisma Atria" => Ok(Coordinate::new(1.3036, 103.8333)),
            _ => Err(GeocodeError::NoSuitableLocation {
                query: place.to_string(),
            }),
        }
    }

    fn reverser(_: &Coordinate, level: u8) -> Result<AddressAttributes, GeocodeError> {
        let pairs: &[(&str, &str)] = if level == DEFAULT_REVERSE_LEVEL {
            &[
                ("building", "Wisma Atria"),
                ("road", "Orchard Road"),
                ("house_number", "435"),
                ("postcode", "238877"),
                ("region", "Central"),
                ("country", "Singapore"),
                ("ISO3166-2", "SG-01"),
            ]
        } else {
            &[
                ("region", "Central"),
                ("country", "Singapore"),
                ("ISO3166-2", "SG-01"),
            ]
        };

        Ok(pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect())
    }

    fn convert(query: &str, result_type: ConversionResultType) -> Result<String, SurplusError> {
        Surplus::new(&geocoder, &reverser).convert_str(query, &ParseOptions::default(), result_type)
    }

    #[test]
    fn local_code_to_shareable_text() {
        assert_eq!(
            convert("8R3M+F8 Singapore", ConversionResultType::ShareableText).unwrap(),
            "Wisma Atria\n435 Orchard Road\n238877\nCentral, Singapore"
        );
    }

    #[test]
    fn empty_query_fails_for_every_result_type() {
        for result_type in [
            ConversionResultType::ShareableText,
            ConversionResultType::PlusCode,
            ConversionResultType::LocalCode,
            ConversionResultType::Latlong,
        ] {
            let error = convert("", result_type).unwrap_err();
            assert_eq!(error, SurplusError::Query(QueryError::EmptyQuery));
            assert_eq!(error.kind(), ErrorKind::Input);
        }
    }

    #[test]
    fn queries_already_in_the_requested_form_are_returned_as_typed() {
        let calls = Cell::new(0);
        let counting_geocoder = |place: &str| {
            calls.set(calls.get() + 1);
            geocoder(place)
        };
        let surplus = Surplus::new(&counting_geocoder, &reverser);
        let options = ParseOptions::default();

        assert_eq!(
            surplus
                .convert_str("6ph58qmf+fx", &options, ConversionResultType::PlusCode)
                .unwrap(),
            "6ph58qmf+fx"
        );
        assert_eq!(
            surplus
                .convert_str("8QMF+FX, Singapore", &options, ConversionResultType::LocalCode)
                .unwrap(),
            "8QMF+FX Singapore"
        );
        assert_eq!(
            surplus
                .convert_str("1.3521 103.8198", &options, ConversionResultType::Latlong)
                .unwrap(),
            "1.3521, 103.8198"
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn latlong_to_plus_code() {
        assert_eq!(
            convert("1.3336875, 103.7749375", ConversionResultType::PlusCode).unwrap(),
            "6PH58QMF+FX"
        );
    }

    #[test]
    fn local_code_to_plus_code() {
        assert_eq!(
            convert("8R3M+F8 Singapore", ConversionResultType::PlusCode).unwrap(),
            "6PH58R3M+F8"
        );
    }

    #[test]
    fn full_code_to_local_code() {
        assert_eq!(
            convert("6PH58QMF+FX", ConversionResultType::LocalCode).unwrap(),
            "8QMF+FX Singapore"
        );
    }

    #[test]
    fn free_text_to_latlong() {
        assert_eq!(
            convert("Wisma Atria", ConversionResultType::Latlong).unwrap(),
            "1.3036, 103.8333"
        );
    }

    #[test]
    fn full_code_to_latlong_is_cell_center() {
        let text = convert("6PH58R3M+F8", ConversionResultType::Latlong).unwrap();
        let (latitude, longitude) = text.split_once(", ").unwrap();

        assert!((latitude.parse::<f64>().unwrap() - 1.303_687_5).abs() < 1e-9);
        assert!((longitude.parse::<f64>().unwrap() - 103.833_312_5).abs() < 1e-9);
    }

    #[test]
    fn geocoder_failure_is_a_resolution_error() {
        let error = convert("Atlantis", ConversionResultType::ShareableText).unwrap_err();

        assert_eq!(
            error,
            SurplusError::Query(QueryError::Geocode(GeocodeError::NoSuitableLocation {
                query: "Atlantis".to_string()
            }))
        );
        assert_eq!(error.kind(), ErrorKind::Resolution);
        assert_eq!(
            error.to_string(),
            "No suitable location could be geolocated from 'Atlantis'"
        );
    }

    #[test]
    fn reverser_failure_propagates() {
        let failing = |_: &Coordinate, _: u8| -> Result<AddressAttributes, GeocodeError> {
            Err(GeocodeError::RateLimited)
        };
        let error = Surplus::new(&geocoder, &failing)
            .convert_str(
                "1.3521, 103.8198",
                &ParseOptions::default(),
                ConversionResultType::ShareableText,
            )
            .unwrap_err();

        assert_eq!(error, SurplusError::Geocode(GeocodeError::RateLimited));
        assert_eq!(error.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn incomplete_plus_code_is_a_parse_error() {
        let error = convert("8QMF+FX", ConversionResultType::ShareableText).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Parse);
    }

    #[test]
    fn locality_without_bounding_box_fails_shortening() {
        let no_bounds =
            |place: &str| geocoder(place).map(|c| Coordinate::new(c.latitude, c.longitude));
        let error = Surplus::new(&no_bounds, &reverser)
            .convert_str(
                "6PH58QMF+FX",
                &ParseOptions::default(),
                ConversionResultType::LocalCode,
            )
            .unwrap_err();

        assert_eq!(
            error,
            SurplusError::Shorten(ShortenError::MissingBoundingBox {
                locality: "Singapore".to_string()
            })
        );
    }
}
