//! Query classification.
//!
//! Recognised shapes, in the order they are tried:
//!
//! - Plus Codes: `6PH58R3M+F8`
//! - local codes: `8RQQ+4Q Singapore`, `St Lucia, Queensland, Australia G227+XF`
//! - termux-location JSON (only when asked for)
//! - coordinates: `1.3521,103.8198`, `1.3521, 103.8198`, `1.3521 103.8198`
//! - anything else is free text

use surplus_models::Coordinate;

use crate::{FreeText, FullCode, LatLong, LocalCode, Query, QueryError};

/// Classifier switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Read the query as `termux-location` JSON output.
    pub using_termux_location: bool,
}

fn is_empty_query(query: &str) -> bool {
    query.trim().is_empty()
}

/// Scans `query` for a Plus Code.
///
/// The first valid token wins. A full code classifies the whole query as
/// [`Query::FullCode`] regardless of any other text; a short code has its
/// text removed from the query and the remainder becomes the locality.
///
/// # Errors
///
/// * [`QueryError::PlusCodeNotFound`] if no token is a Plus Code
/// * [`QueryError::IncompletePlusCode`] if the code is short and nothing is
///   left to use as locality
pub fn match_plus_code(query: &str) -> Result<Query, QueryError> {
    let found = query
        .split_whitespace()
        .map(|word| word.trim_matches(',').trim())
        .map(|word| (word, surplus_pluscode::validate(word)))
        .find(|(_, validation)| validation.is_valid);

    let Some((code, validation)) = found else {
        return Err(QueryError::PlusCodeNotFound);
    };

    if validation.is_full {
        log::debug!("match_plus_code: full code {code}");
        return Ok(Query::FullCode(FullCode {
            code: code.to_string(),
        }));
    }

    let locality = query.replace(code, "");
    let locality = locality.trim().trim_matches(',').trim();

    if locality.is_empty() {
        return Err(QueryError::IncompletePlusCode {
            message: "Plus Code is not full-length (e.g., 6PH58QMF+FX)".to_string(),
        });
    }

    log::debug!("match_plus_code: code={code:?}, locality={locality:?}");

    Ok(Query::LocalCode(LocalCode {
        code: code.to_string(),
        locality: locality.to_string(),
    }))
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim_matches(',').trim().parse().ok()
}

fn parse_termux_location(query: &str) -> Result<Query, QueryError> {
    let unparseable = || QueryError::LatlongParse {
        message: "could not parse termux-location json".to_string(),
    };

    let value: serde_json::Value = serde_json::from_str(query).map_err(|_| unparseable())?;
    let object = value.as_object().ok_or_else(unparseable)?;

    let latitude = object.get("latitude").and_then(serde_json::Value::as_f64);
    let longitude = object.get("longitude").and_then(serde_json::Value::as_f64);

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Query::LatLong(LatLong {
            coordinate: Coordinate::new(latitude, longitude),
        })),
        _ => Err(QueryError::LatlongParse {
            message: "could not get 'latitude' or 'longitude' keys from termux-location json"
                .to_string(),
        }),
    }
}

fn match_numeric_pair(query: &str, tokens: &[&str]) -> Query {
    let pair = match tokens {
        [single] => single
            .split_once(',')
            .filter(|(_, longitude)| !longitude.contains(','))
            .and_then(|(latitude, longitude)| Some((parse_float(latitude)?, parse_float(longitude)?))),
        [latitude, longitude] => parse_float(latitude).zip(parse_float(longitude)),
        _ => None,
    };

    pair.map_or_else(
        || {
            Query::FreeText(FreeText {
                text: query.to_string(),
            })
        },
        |(latitude, longitude)| {
            Query::LatLong(LatLong {
                coordinate: Coordinate::new(latitude, longitude),
            })
        },
    )
}

/// Classifies a raw query string.
///
/// # Errors
///
/// * [`QueryError::EmptyQuery`] if the query is empty or whitespace
/// * [`QueryError::IncompletePlusCode`] if a short Plus Code has no locality
/// * [`QueryError::LatlongParse`] if termux-location JSON cannot be read
pub fn parse_query(query: &str, options: &ParseOptions) -> Result<Query, QueryError> {
    log::debug!("parse_query: query={query:?}");

    if is_empty_query(query) {
        return Err(QueryError::EmptyQuery);
    }

    match match_plus_code(query) {
        Err(QueryError::PlusCodeNotFound) => {}
        result => return result,
    }

    if options.using_termux_location {
        return parse_termux_location(query);
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    log::debug!("parse_query: tokens={tokens:?}");

    Ok(match_numeric_pair(query, &tokens))
}

/// Classifies a query given as pre-split tokens (e.g. command-line words).
///
/// The tokens are joined with single spaces and classified as a string.
///
/// # Errors
///
/// See [`parse_query`].
pub fn parse_query_tokens<S: AsRef<str>>(
    tokens: &[S],
    options: &ParseOptions,
) -> Result<Query, QueryError> {
    let query = tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");

    parse_query(&query, options)
}
