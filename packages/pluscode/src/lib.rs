#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Open Location Code (Plus Code) primitives.
//!
//! Covers the four operations surplus needs from the codec:
//!
//! - [`validate`] (plus [`is_valid`], [`is_short`], [`is_full`])
//! - [`encode`] a coordinate into a full code
//! - [`decode`] a full code into its [`CodeArea`]
//! - [`recover_nearest`] the full code for a short code near a reference
//!
//! Codes are accepted in either case; everything produced is upper case.

use thiserror::Error;

/// Separator between the area code and the local code.
pub const SEPARATOR: char = '+';

/// Index of [`SEPARATOR`] in a full code.
pub const SEPARATOR_POSITION: usize = 8;

/// Padding character used by codes shorter than [`SEPARATOR_POSITION`].
pub const PADDING: char = '0';

/// Digits used by the encoding, in value order.
pub const CODE_ALPHABET: &str = "23456789CFGHJMPQRVWX";

/// Digit count of a standard full code (`7FG49QCJ+2V`).
pub const CODE_LENGTH_DEFAULT: usize = 10;

const ENCODING_BASE: i64 = 20;
const LATITUDE_MAX: i64 = 90;
const LONGITUDE_MAX: i64 = 180;
const MAX_DIGIT_COUNT: usize = 15;
const PAIR_CODE_LENGTH: usize = 10;
const GRID_CODE_LENGTH: usize = MAX_DIGIT_COUNT - PAIR_CODE_LENGTH;
const GRID_COLUMNS: i64 = 4;
const GRID_ROWS: i64 = 5;
const PAIR_FIRST_PLACE_VALUE: i64 = 160_000;
const PAIR_PRECISION: i64 = 8_000;
const GRID_LAT_FIRST_PLACE_VALUE: i64 = 625;
const GRID_LNG_FIRST_PLACE_VALUE: i64 = 256;
const FINAL_LAT_PRECISION: i64 = 25_000_000;
const FINAL_LNG_PRECISION: i64 = 8_192_000;

/// Errors raised by the Plus Code primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlusCodeError {
    /// The string is not a Plus Code at all.
    #[error("'{code}' is not a valid Plus Code")]
    InvalidCode {
        /// The offending input.
        code: String,
    },

    /// The code is valid but lacks its area-code prefix.
    #[error("'{code}' is not a full Plus Code")]
    NotFullCode {
        /// The offending input.
        code: String,
    },

    /// The code was expected to be a short code.
    #[error("'{code}' is not a short Plus Code")]
    NotShortCode {
        /// The offending input.
        code: String,
    },

    /// Requested code length cannot be produced.
    #[error("invalid Plus Code length {length}")]
    InvalidLength {
        /// The requested digit count.
        length: usize,
    },

    /// Latitude or longitude is NaN or infinite.
    #[error("cannot encode non-finite coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Latitude as given.
        latitude: f64,
        /// Longitude as given.
        longitude: f64,
    },
}

/// Result of [`validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// The token is a syntactically valid Plus Code (full or short).
    pub is_valid: bool,
    /// The token is a valid full code that can be decoded on its own.
    pub is_full: bool,
}

/// The grid cell a full code describes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeArea {
    pub latitude_lo: f64,
    pub longitude_lo: f64,
    pub latitude_hi: f64,
    pub longitude_hi: f64,
    /// Number of significant digits in the decoded code.
    pub code_length: usize,
    pub latitude_center: f64,
    pub longitude_center: f64,
}

fn digit_value(c: char) -> Option<i64> {
    CODE_ALPHABET
        .find(c.to_ascii_uppercase())
        .and_then(|i| i64::try_from(i).ok())
}

fn digit_char(value: i64) -> char {
    usize::try_from(value)
        .ok()
        .and_then(|i| CODE_ALPHABET.chars().nth(i))
        .unwrap_or(PADDING)
}

/// Validates `code` in one pass.
#[must_use]
pub fn validate(code: &str) -> Validation {
    Validation {
        is_valid: is_valid(code),
        is_full: is_full(code),
    }
}

/// Returns `true` if `code` is a valid full or short Plus Code.
#[must_use]
pub fn is_valid(code: &str) -> bool {
    if code.len() < 2 || !code.is_ascii() {
        return false;
    }

    let Some(separator) = code.find(SEPARATOR) else {
        return false;
    };
    if code.rfind(SEPARATOR) != Some(separator) {
        return false;
    }
    if separator > SEPARATOR_POSITION || separator % 2 == 1 {
        return false;
    }

    if let Some(padding) = code.find(PADDING) {
        if separator < SEPARATOR_POSITION || padding == 0 {
            return false;
        }
        let runs: Vec<&str> = code
            .split(|c| c != PADDING)
            .filter(|run| !run.is_empty())
            .collect();
        match runs.as_slice() {
            [run] if run.len() % 2 == 0 && run.len() <= SEPARATOR_POSITION - 2 => {}
            _ => return false,
        }
        if !code.ends_with(SEPARATOR) {
            return false;
        }
    }

    // A single digit after the separator is never valid.
    if code.len() - separator - 1 == 1 {
        return false;
    }

    code.chars()
        .all(|c| c == SEPARATOR || c == PADDING || digit_value(c).is_some())
}

/// Returns `true` if `code` is a valid short code (area prefix omitted).
#[must_use]
pub fn is_short(code: &str) -> bool {
    is_valid(code) && code.find(SEPARATOR).is_some_and(|i| i < SEPARATOR_POSITION)
}

/// Returns `true` if `code` is a valid full code.
#[must_use]
pub fn is_full(code: &str) -> bool {
    if !is_valid(code) || is_short(code) {
        return false;
    }

    let mut chars = code.chars();
    let first_latitude = chars.next().and_then(digit_value);
    let first_longitude = chars.next().and_then(digit_value);

    matches!(first_latitude, Some(v) if v * ENCODING_BASE < LATITUDE_MAX * 2)
        && matches!(first_longitude, Some(v) if v * ENCODING_BASE < LONGITUDE_MAX * 2)
}

fn normalize_longitude(longitude: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let max = LONGITUDE_MAX as f64;
    (longitude + max).rem_euclid(max * 2.0) - max
}

fn clip_latitude(latitude: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let max = LATITUDE_MAX as f64;
    latitude.clamp(-max, max)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn latitude_precision(code_length: usize) -> f64 {
    if code_length <= PAIR_CODE_LENGTH {
        20f64.powi(2 - (code_length / 2) as i32)
    } else {
        20f64.powi(-3) / 5f64.powi((code_length - PAIR_CODE_LENGTH) as i32)
    }
}

/// Encodes a coordinate as a full Plus Code of `code_length` digits.
///
/// Latitude is clipped to ±90 and longitude is wrapped into [-180, 180).
/// Lengths above 15 are treated as 15.
///
/// # Errors
///
/// * [`PlusCodeError::InvalidLength`] if `code_length` is below 2, or odd
///   and below 10
/// * [`PlusCodeError::InvalidCoordinate`] if either value is not finite
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn encode(latitude: f64, longitude: f64, code_length: usize) -> Result<String, PlusCodeError> {
    if code_length < 2 || (code_length < PAIR_CODE_LENGTH && code_length % 2 == 1) {
        return Err(PlusCodeError::InvalidLength {
            length: code_length,
        });
    }
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(PlusCodeError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }

    let code_length = code_length.min(MAX_DIGIT_COUNT);
    let mut latitude = clip_latitude(latitude);
    let longitude = normalize_longitude(longitude);

    // The north pole belongs to the cell below it.
    if (latitude - LATITUDE_MAX as f64).abs() < f64::EPSILON {
        latitude -= latitude_precision(code_length);
    }

    let scale = |value: f64, offset: i64, precision: i64| -> i64 {
        (((value + offset as f64) * precision as f64 * 1e6).round() / 1e6).floor() as i64
    };
    let mut lat_value = scale(latitude, LATITUDE_MAX, FINAL_LAT_PRECISION);
    let mut lng_value = scale(longitude, LONGITUDE_MAX, FINAL_LNG_PRECISION);

    let mut digits: Vec<char> = Vec::with_capacity(MAX_DIGIT_COUNT);

    if code_length > PAIR_CODE_LENGTH {
        for _ in 0..GRID_CODE_LENGTH {
            let row = lat_value % GRID_ROWS;
            let column = lng_value % GRID_COLUMNS;
            digits.push(digit_char(row * GRID_COLUMNS + column));
            lat_value /= GRID_ROWS;
            lng_value /= GRID_COLUMNS;
        }
    } else {
        lat_value /= GRID_ROWS.pow(GRID_CODE_LENGTH as u32);
        lng_value /= GRID_COLUMNS.pow(GRID_CODE_LENGTH as u32);
    }

    for _ in 0..PAIR_CODE_LENGTH / 2 {
        digits.push(digit_char(lng_value % ENCODING_BASE));
        digits.push(digit_char(lat_value % ENCODING_BASE));
        lat_value /= ENCODING_BASE;
        lng_value /= ENCODING_BASE;
    }
    digits.reverse();

    let mut code: String = digits.iter().take(code_length).collect();
    if code_length >= SEPARATOR_POSITION {
        code.insert(SEPARATOR_POSITION, SEPARATOR);
    } else {
        code.extend(std::iter::repeat_n(PADDING, SEPARATOR_POSITION - code_length));
        code.push(SEPARATOR);
    }

    Ok(code)
}

/// Decodes a full Plus Code into the grid cell it describes.
///
/// # Errors
///
/// * [`PlusCodeError::NotFullCode`] if `code` is not a valid full code
///   (short codes included)
#[allow(clippy::cast_precision_loss)]
pub fn decode(code: &str) -> Result<CodeArea, PlusCodeError> {
    if !is_full(code) {
        return Err(PlusCodeError::NotFullCode {
            code: code.to_string(),
        });
    }

    let digits: Vec<i64> = code
        .chars()
        .filter(|c| *c != SEPARATOR && *c != PADDING)
        .filter_map(digit_value)
        .collect();

    let mut normal_lat = -LATITUDE_MAX * PAIR_PRECISION;
    let mut normal_lng = -LONGITUDE_MAX * PAIR_PRECISION;
    let mut grid_lat = 0;
    let mut grid_lng = 0;

    let pairs = &digits[..digits.len().min(PAIR_CODE_LENGTH)];
    let pair_count = pairs.len() / 2;
    let mut place_value = PAIR_FIRST_PLACE_VALUE;
    for (i, pair) in pairs.chunks_exact(2).enumerate() {
        normal_lat += pair[0] * place_value;
        normal_lng += pair[1] * place_value;
        if i + 1 < pair_count {
            place_value /= ENCODING_BASE;
        }
    }

    let mut lat_precision = place_value as f64 / PAIR_PRECISION as f64;
    let mut lng_precision = place_value as f64 / PAIR_PRECISION as f64;

    if digits.len() > PAIR_CODE_LENGTH {
        let grid = &digits[PAIR_CODE_LENGTH..digits.len().min(MAX_DIGIT_COUNT)];
        let mut row_value = GRID_LAT_FIRST_PLACE_VALUE;
        let mut column_value = GRID_LNG_FIRST_PLACE_VALUE;
        for (i, digit) in grid.iter().enumerate() {
            grid_lat += (digit / GRID_COLUMNS) * row_value;
            grid_lng += (digit % GRID_COLUMNS) * column_value;
            if i + 1 < grid.len() {
                row_value /= GRID_ROWS;
                column_value /= GRID_COLUMNS;
            }
        }
        lat_precision = row_value as f64 / FINAL_LAT_PRECISION as f64;
        lng_precision = column_value as f64 / FINAL_LNG_PRECISION as f64;
    }

    let latitude_lo =
        normal_lat as f64 / PAIR_PRECISION as f64 + grid_lat as f64 / FINAL_LAT_PRECISION as f64;
    let longitude_lo =
        normal_lng as f64 / PAIR_PRECISION as f64 + grid_lng as f64 / FINAL_LNG_PRECISION as f64;

    Ok(CodeArea {
        latitude_lo,
        longitude_lo,
        latitude_hi: latitude_lo + lat_precision,
        longitude_hi: longitude_lo + lng_precision,
        code_length: digits.len().min(MAX_DIGIT_COUNT),
        latitude_center: (latitude_lo + lat_precision / 2.0).min(LATITUDE_MAX as f64),
        longitude_center: (longitude_lo + lng_precision / 2.0).min(LONGITUDE_MAX as f64),
    })
}

/// Recovers the full code nearest to a reference point for `short_code`.
///
/// A full code is returned upper-cased and otherwise unchanged.
///
/// # Errors
///
/// * [`PlusCodeError::NotShortCode`] if `short_code` is neither a short
///   nor a full code
/// * [`PlusCodeError::InvalidCoordinate`] if the reference is not finite
#[allow(clippy::cast_precision_loss)]
pub fn recover_nearest(
    short_code: &str,
    reference_latitude: f64,
    reference_longitude: f64,
) -> Result<String, PlusCodeError> {
    if !is_short(short_code) {
        if is_full(short_code) {
            return Ok(short_code.to_ascii_uppercase());
        }
        return Err(PlusCodeError::NotShortCode {
            code: short_code.to_string(),
        });
    }
    if !reference_latitude.is_finite() || !reference_longitude.is_finite() {
        return Err(PlusCodeError::InvalidCoordinate {
            latitude: reference_latitude,
            longitude: reference_longitude,
        });
    }

    let reference_latitude = clip_latitude(reference_latitude);
    let reference_longitude = normalize_longitude(reference_longitude);

    let short_code = short_code.to_ascii_uppercase();
    let padding_length = short_code
        .find(SEPARATOR)
        .map_or(0, |i| SEPARATOR_POSITION - i);
    let resolution = 20f64.powf(2.0 - padding_length as f64 / 2.0);
    let half_resolution = resolution / 2.0;

    let reference_code = encode(reference_latitude, reference_longitude, CODE_LENGTH_DEFAULT)?;
    let area = decode(&format!("{}{short_code}", &reference_code[..padding_length]))?;

    let mut latitude = area.latitude_center;
    let mut longitude = area.longitude_center;
    let latitude_max = LATITUDE_MAX as f64;

    if reference_latitude + half_resolution < latitude && latitude - resolution >= -latitude_max {
        latitude -= resolution;
    } else if reference_latitude - half_resolution > latitude
        && latitude + resolution <= latitude_max
    {
        latitude += resolution;
    }

    if reference_longitude + half_resolution < longitude {
        longitude -= resolution;
    } else if reference_longitude - half_resolution > longitude {
        longitude += resolution;
    }

    encode(latitude, longitude, area.code_length)
}
