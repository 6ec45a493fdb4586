//! Plus Code shortening.
//!
//! A full code can lose leading digits when a locality near the coordinate
//! pins them down. The locality comes from reverse-geocoding the coordinate
//! at [`LOCALITY_GEOCODER_LEVEL`] and is checked by forward-geocoding it back:
//!
//! - tight: reference within 0.4° and locality under 0.8° across, drop 4
//! - loose: reference within 8° and locality under 16° across, drop 2
//! - otherwise the full code is kept

use std::fmt;

use surplus_models::{BoundingBox, Coordinate, Geocoder, LOCALITY_GEOCODER_LEVEL, Reverser};
use surplus_pluscode::CODE_LENGTH_DEFAULT;
use thiserror::Error;

use crate::SurplusError;

/// Errors raised when the geocoder's answer cannot anchor a short code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenError {
    /// The geocoder returned no bounding box for the locality.
    #[error("geocoder returned no bounding box for locality '{locality}'")]
    MissingBoundingBox {
        /// The locality that was geocoded.
        locality: String,
    },

    /// The bounding box has non-numeric bounds.
    #[error("geocoder returned an invalid bounding box for locality '{locality}': {bounds}")]
    InvalidBoundingBox {
        /// The locality that was geocoded.
        locality: String,
        /// The bounds as received.
        bounds: String,
    },
}

/// Result of shortening a full code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenedCode {
    /// Leading digits dropped; the locality recovers them.
    Local { code: String, locality: String },
    /// No locality was close or small enough.
    Full { code: String },
}

impl fmt::Display for ShortenedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { code, locality } => write!(f, "{code} {locality}"),
            Self::Full { code } => f.write_str(code),
        }
    }
}

struct ShorteningTier {
    dropped: usize,
    max_offset: f64,
    max_extent: f64,
}

const TIERS: [ShorteningTier; 2] = [
    ShorteningTier {
        dropped: 4,
        max_offset: 0.4,
        max_extent: 0.8,
    },
    ShorteningTier {
        dropped: 2,
        max_offset: 8.0,
        max_extent: 16.0,
    },
];

impl ShorteningTier {
    fn accepts(&self, coordinate: &Coordinate, reference: &Coordinate, bounds: &BoundingBox) -> bool {
        (reference.latitude - coordinate.latitude).abs() <= self.max_offset
            && (reference.longitude - coordinate.longitude).abs() <= self.max_offset
            && bounds.height() < self.max_extent
            && bounds.width() < self.max_extent
    }
}

/// Shortens `full_code` (the code of `coordinate`) against a geocoded
/// `reference` for `locality`.
///
/// # Errors
///
/// * [`ShortenError::MissingBoundingBox`] if `reference` has no bounds
/// * [`ShortenError::InvalidBoundingBox`] if any bound is not finite
pub fn shorten_code(
    full_code: &str,
    coordinate: &Coordinate,
    reference: &Coordinate,
    locality: &str,
) -> Result<ShortenedCode, ShortenError> {
    let bounds = reference
        .bounding_box
        .ok_or_else(|| ShortenError::MissingBoundingBox {
            locality: locality.to_string(),
        })?;

    if !bounds.is_finite() {
        return Err(ShortenError::InvalidBoundingBox {
            locality: locality.to_string(),
            bounds: format!(
                "[{}, {}, {}, {}]",
                bounds.lat_lo, bounds.lat_hi, bounds.lon_lo, bounds.lon_hi
            ),
        });
    }

    let tier = TIERS
        .iter()
        .find(|tier| tier.accepts(coordinate, reference, &bounds));

    match tier.and_then(|tier| full_code.get(tier.dropped..)) {
        Some(code) => Ok(ShortenedCode::Local {
            code: code.to_string(),
            locality: locality.to_string(),
        }),
        None => {
            log::info!(
                "could not determine a suitable geographical feature to use as locality for shortening. full plus code is returned."
            );
            Ok(ShortenedCode::Full {
                code: full_code.to_string(),
            })
        }
    }
}

/// Shortens the Plus Code of `coordinate` using a locality found through
/// the collaborators.
///
/// # Errors
///
/// * [`SurplusError::Geocode`] if either collaborator fails
/// * [`SurplusError::Shorten`] if the locality has no usable bounding box
/// * [`SurplusError::PlusCode`] if the coordinate cannot be encoded
pub fn shorten<G, R>(
    coordinate: &Coordinate,
    geocoder: &G,
    reverser: &R,
) -> Result<ShortenedCode, SurplusError>
where
    G: Geocoder + ?Sized,
    R: Reverser + ?Sized,
{
    let attributes = reverser.reverse(coordinate, LOCALITY_GEOCODER_LEVEL)?;
    log::debug!("shorten: locality attributes {attributes:?}");

    let locality = surplus_text::locality_text(&attributes);
    log::debug!("shorten: locality {locality:?}");

    let reference = geocoder.geocode(&locality)?;
    log::debug!("shorten: reference {reference:?}");

    let full_code = surplus_pluscode::encode(
        coordinate.latitude,
        coordinate.longitude,
        CODE_LENGTH_DEFAULT,
    )?;

    Ok(shorten_code(&full_code, coordinate, &reference, &locality)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use surplus_models::{AddressAttributes, GeocodeError};

    use super::*;

    fn bounds(lat_lo: f64, lat_hi: f64, lon_lo: f64, lon_hi: f64) -> BoundingBox {
        BoundingBox {
            lat_lo,
            lat_hi,
            lon_lo,
            lon_hi,
        }
    }

    fn qmf_fx() -> Coordinate {
        Coordinate::new(1.333_687_5, 103.774_937_5)
    }

    fn singapore() -> Coordinate {
        Coordinate::new(1.357_107, 103.819_499_2)
            .with_bounding_box(bounds(1.130_475_3, 1.450_475_3, 103.692_035_9, 104.012_035_9))
    }

    #[test]
    fn tight_locality_drops_four_digits() {
        assert_eq!(
            shorten_code("6PH58QMF+FX", &qmf_fx(), &singapore(), "Singapore").unwrap(),
            ShortenedCode::Local {
                code: "8QMF+FX".to_string(),
                locality: "Singapore".to_string()
            }
        );
    }

    #[test]
    fn loose_locality_drops_two_digits() {
        let malaysia = Coordinate::new(4.569_375, 102.265_682_6)
            .with_bounding_box(bounds(0.855_001, 7.363_468, 99.640_573_2, 119.269_362_4));

        // Too wide for either tier.
        assert_eq!(
            shorten_code("6PH58QMF+FX", &qmf_fx(), &malaysia, "Malaysia").unwrap(),
            ShortenedCode::Full {
                code: "6PH58QMF+FX".to_string()
            }
        );

        let johor = Coordinate::new(2.0, 103.5)
            .with_bounding_box(bounds(1.2, 2.9, 102.5, 104.5));
        let shortened = shorten_code("6PH58QMF+FX", &qmf_fx(), &johor, "Johor").unwrap();

        assert_eq!(shortened.to_string(), "H58QMF+FX Johor");
    }

    #[test]
    fn distant_locality_keeps_full_code() {
        let far = Coordinate::new(30.0, 103.8).with_bounding_box(bounds(29.9, 30.1, 103.7, 103.9));
        let shortened = shorten_code("6PH58QMF+FX", &qmf_fx(), &far, "Elsewhere").unwrap();

        assert_eq!(shortened.to_string(), "6PH58QMF+FX");
    }

    #[test]
    fn tight_limits_are_inclusive_for_offset_and_exclusive_for_extent() {
        let origin = Coordinate::new(0.0, 0.0);
        let edge = Coordinate::new(0.4, -0.4).with_bounding_box(bounds(0.0, 0.79, 0.0, 0.79));
        assert!(TIERS[0].accepts(&origin, &edge, &edge.bounding_box.unwrap()));

        let wide = Coordinate::new(0.1, 0.1).with_bounding_box(bounds(0.0, 0.8, 0.0, 0.1));
        assert!(!TIERS[0].accepts(&origin, &wide, &wide.bounding_box.unwrap()));
    }

    #[test]
    fn missing_bounding_box_fails() {
        let reference = Coordinate::new(1.357_107, 103.819_499_2);
        assert_eq!(
            shorten_code("6PH58QMF+FX", &qmf_fx(), &reference, "Singapore").unwrap_err(),
            ShortenError::MissingBoundingBox {
                locality: "Singapore".to_string()
            }
        );
    }

    #[test]
    fn non_finite_bounding_box_fails() {
        let reference = Coordinate::new(1.357_107, 103.819_499_2)
            .with_bounding_box(bounds(f64::NAN, 1.45, 103.69, 104.01));
        assert!(matches!(
            shorten_code("6PH58QMF+FX", &qmf_fx(), &reference, "Singapore").unwrap_err(),
            ShortenError::InvalidBoundingBox { .. }
        ));
    }

    #[test]
    fn shorten_uses_locality_level_and_locality_line() {
        let reverser = |_: &Coordinate, level: u8| -> Result<AddressAttributes, GeocodeError> {
            assert_eq!(level, LOCALITY_GEOCODER_LEVEL);
            Ok([
                ("city_district", "Central"),
                ("country", "Singapore"),
                ("ISO3166-2-lvl6", "SG-05"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
        };
        let geocoder = |place: &str| -> Result<Coordinate, GeocodeError> {
            assert_eq!(place, "Singapore");
            Ok(singapore())
        };

        assert_eq!(
            shorten(&qmf_fx(), &geocoder, &reverser).unwrap().to_string(),
            "8QMF+FX Singapore"
        );
    }

    proptest! {
        #[test]
        fn shortened_codes_recover_from_their_reference(
            latitude in -80.0f64..80.0,
            longitude in -170.0f64..170.0,
            lat_offset in -0.4f64..0.4,
            lng_offset in -0.4f64..0.4,
        ) {
            let coordinate = Coordinate::new(latitude, longitude);
            let reference = Coordinate::new(latitude + lat_offset, longitude + lng_offset)
                .with_bounding_box(bounds(
                    latitude + lat_offset - 0.1,
                    latitude + lat_offset + 0.1,
                    longitude + lng_offset - 0.1,
                    longitude + lng_offset + 0.1,
                ));
            let full_code =
                surplus_pluscode::encode(latitude, longitude, CODE_LENGTH_DEFAULT).unwrap();

            let ShortenedCode::Local { code, .. } =
                shorten_code(&full_code, &coordinate, &reference, "Somewhere").unwrap()
            else {
                panic!("expected a local code");
            };

            prop_assert!(full_code.len() - code.len() <= 4);
            prop_assert_eq!(
                surplus_pluscode::recover_nearest(&code, reference.latitude, reference.longitude)
                    .unwrap(),
                full_code
            );
        }

        #[test]
        fn loosely_shortened_codes_recover_from_their_reference(
            latitude in -80.0f64..80.0,
            longitude in -170.0f64..170.0,
            lat_offset in -8.0f64..8.0,
            lng_offset in -8.0f64..8.0,
        ) {
            prop_assume!(lat_offset.abs() > 0.4 || lng_offset.abs() > 0.4);

            let coordinate = Coordinate::new(latitude, longitude);
            let reference = Coordinate::new(latitude + lat_offset, longitude + lng_offset)
                .with_bounding_box(bounds(
                    latitude + lat_offset - 1.0,
                    latitude + lat_offset + 1.0,
                    longitude + lng_offset - 1.0,
                    longitude + lng_offset + 1.0,
                ));
            let full_code =
                surplus_pluscode::encode(latitude, longitude, CODE_LENGTH_DEFAULT).unwrap();

            let ShortenedCode::Local { code, .. } =
                shorten_code(&full_code, &coordinate, &reference, "Somewhere").unwrap()
            else {
                panic!("expected a local code");
            };

            prop_assert_eq!(code.len(), full_code.len() - 2);
            prop_assert_eq!(
                surplus_pluscode::recover_nearest(&code, reference.latitude, reference.longitude)
                    .unwrap(),
                full_code
            );
        }
    }
}
