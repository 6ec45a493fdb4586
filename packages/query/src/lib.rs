#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location queries.
//!
//! A [`Query`] is one of four kinds of location reference a user can type:
//!
//! - [`FullCode`]: a complete Plus Code (`6PH58QMF+FX`)
//! - [`LocalCode`]: a short Plus Code plus locality (`8QMF+FX Singapore`)
//! - [`LatLong`]: a coordinate pair (`1.3521, 103.8198`)
//! - [`FreeText`]: anything else, resolved by forward geocoding
//!
//! [`parse_query`] classifies raw input into one of these, and
//! [`Query::resolve`] turns any of them into a [`Coordinate`].

mod parse;

use std::fmt;

use surplus_models::{Coordinate, GeocodeError, Geocoder};
use surplus_pluscode::PlusCodeError;
use thiserror::Error;

pub use parse::{ParseOptions, match_plus_code, parse_query, parse_query_tokens};

/// Errors raised while classifying or resolving a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Nothing (or only whitespace) was given.
    #[error("empty query string passed")]
    EmptyQuery,

    /// No token of the query is a Plus Code.
    #[error("unable to find a Plus Code")]
    PlusCodeNotFound,

    /// A short Plus Code was found but nothing anchors it.
    #[error("{message}")]
    IncompletePlusCode {
        /// Human-readable description.
        message: String,
    },

    /// Coordinate-looking input could not be read.
    #[error("{message}")]
    LatlongParse {
        /// Human-readable description.
        message: String,
    },

    /// The geocoder collaborator failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// A Plus Code primitive failed.
    #[error(transparent)]
    PlusCode(#[from] PlusCodeError),
}

/// A complete Plus Code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullCode {
    pub code: String,
}

impl FullCode {
    /// Decodes the code and returns the center of its grid cell.
    ///
    /// Never touches the network.
    ///
    /// # Errors
    ///
    /// * [`QueryError::IncompletePlusCode`] if the code lacks its area prefix
    pub fn resolve(&self) -> Result<Coordinate, QueryError> {
        let area = surplus_pluscode::decode(&self.code).map_err(|e| match e {
            PlusCodeError::NotFullCode { .. } => QueryError::IncompletePlusCode {
                message: "Plus Code is not full-length (e.g., 6PH58QMF+FX)".to_string(),
            },
            other => QueryError::PlusCode(other),
        })?;

        Ok(Coordinate::new(area.latitude_center, area.longitude_center))
    }
}

/// A short Plus Code anchored by a free-text locality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCode {
    pub code: String,
    pub locality: String,
}

impl LocalCode {
    /// Geocodes the locality and recovers the nearest matching full code.
    ///
    /// # Errors
    ///
    /// * [`QueryError::Geocode`] if the locality cannot be geocoded
    /// * [`QueryError::PlusCode`] if the code cannot be recovered
    pub fn to_full_code<G: Geocoder + ?Sized>(&self, geocoder: &G) -> Result<String, QueryError> {
        let reference = geocoder.geocode(&self.locality)?;
        let code =
            surplus_pluscode::recover_nearest(&self.code, reference.latitude, reference.longitude)?;

        log::debug!(
            "to_full_code: recovered {code} from '{}' near {reference}",
            self.code
        );

        Ok(code)
    }

    /// Recovers the full code (see [`Self::to_full_code`]) and resolves it.
    ///
    /// # Errors
    ///
    /// Propagates any failure of either step unchanged.
    pub fn resolve<G: Geocoder + ?Sized>(&self, geocoder: &G) -> Result<Coordinate, QueryError> {
        FullCode {
            code: self.to_full_code(geocoder)?,
        }
        .resolve()
    }
}

/// A coordinate typed in directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLong {
    pub coordinate: Coordinate,
}

/// A place name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeText {
    pub text: String,
}

/// A classified location reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    FullCode(FullCode),
    LocalCode(LocalCode),
    LatLong(LatLong),
    FreeText(FreeText),
}

impl Query {
    /// Resolves this query to a coordinate.
    ///
    /// Full codes and coordinates resolve offline; local codes and free
    /// text call `geocoder`.
    ///
    /// # Errors
    ///
    /// * [`QueryError::IncompletePlusCode`] if a full code cannot be decoded
    /// * [`QueryError::Geocode`] if the geocoder fails
    /// * [`QueryError::PlusCode`] if a local code cannot be recovered
    pub fn resolve<G: Geocoder + ?Sized>(&self, geocoder: &G) -> Result<Coordinate, QueryError> {
        match self {
            Self::FullCode(query) => query.resolve(),
            Self::LocalCode(query) => query.resolve(geocoder),
            Self::LatLong(query) => Ok(query.coordinate),
            Self::FreeText(query) => Ok(geocoder.geocode(&query.text)?),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullCode(query) => f.write_str(&query.code),
            Self::LocalCode(query) => write!(f, "{} {}", query.code, query.locality),
            Self::LatLong(query) => write!(f, "{}", query.coordinate),
            Self::FreeText(query) => f.write_str(&query.text),
        }
    }
}
