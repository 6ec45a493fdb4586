#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address-to-text generation.
//!
//! Turns reverse-geocoded [`AddressAttributes`] into either multi-line
//! shareable text or the single locality line used when shortening a Plus
//! Code. Which attribute lands on which line is driven by the region key
//! tables in [`regions`], selected by the attributes' ISO 3166-2 code.
//!
//! Line plan (default region):
//!
//! 0. points of interest
//! 1. building
//! 2. highway
//! 3. house number, house name, road
//! 4. neighbourhood through village (duplicate-suppressed)
//! 5. postcode
//! 6. region through continent

pub mod regions;

use surplus_models::AddressAttributes;

pub use regions::{DEFAULT_REGION, LINE_COUNT, Line, RegionTable, region_table};

const REGION_CODE_KEY_PREFIX: &str = "iso3166";

/// Separator of the locality line.
pub const LOCALITY_SEPARATOR: &str = ", ";

/// Returns the upper-case country prefix of the attributes' ISO 3166-2 code.
///
/// The last key starting with `iso3166` (any case) is used.
#[must_use]
pub fn region_code(attributes: &AddressAttributes) -> Option<String> {
    attributes
        .iter()
        .rev()
        .find(|(key, _)| key.to_ascii_lowercase().starts_with(REGION_CODE_KEY_PREFIX))
        .and_then(|(_, value)| value.split('-').next())
        .map(str::to_ascii_uppercase)
        .filter(|code| !code.is_empty())
}

/// Selects the region table for `attributes`.
#[must_use]
pub fn region_table_for(attributes: &AddressAttributes) -> RegionTable<'static> {
    let code = region_code(attributes);
    log::debug!("region_table_for: region code {code:?}");

    region_table(code.as_deref().unwrap_or(DEFAULT_REGION))
}

fn values<'a>(
    attributes: &'a AddressAttributes,
    keys: &'a [String],
) -> impl Iterator<Item = &'a str> {
    keys.iter()
        .map(|key| attributes.get(key).map_or("", String::as_str))
}

fn unique<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// What a duplicate-suppressing line must not repeat.
///
/// A value is dropped if it equals one of the line-6 values, or if it is a
/// substring of any name. The substring check is a heuristic: a short
/// district name inside an unrelated longer name is dropped as well.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter<'a> {
    region_values: Vec<&'a str>,
    names: Vec<&'a str>,
}

impl<'a> DuplicateFilter<'a> {
    /// Collects the line-6 values and names of `attributes` under `table`.
    #[must_use]
    pub fn new(attributes: &'a AddressAttributes, table: &RegionTable<'a>) -> Self {
        Self {
            region_values: values(attributes, table.lines[LINE_COUNT - 1].keys).collect(),
            names: unique(values(attributes, table.names))
                .into_iter()
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Returns `true` if `value` may be rendered.
    #[must_use]
    pub fn keeps(&self, value: &str) -> bool {
        !self.region_values.contains(&value)
            && !self.names.iter().any(|name| name.contains(value))
    }
}

/// Renders one line: values of `line.keys`, first occurrence only, empties
/// dropped, joined by `line.separator`.
///
/// `filter` is only consulted when `line.suppress_duplicates` is set.
/// Returns an empty string if nothing survives.
#[must_use]
pub fn generate_line(
    attributes: &AddressAttributes,
    line: &Line<'_>,
    filter: &DuplicateFilter<'_>,
) -> String {
    let mut kept = Vec::new();

    for value in unique(values(attributes, line.keys)) {
        if value.is_empty() {
            continue;
        }
        if line.suppress_duplicates && !filter.keeps(value) {
            log::debug!("generate_line: filtered {value:?}");
            continue;
        }
        log::debug!("generate_line: kept {value:?}");
        kept.push(value);
    }

    kept.join(line.separator)
}

impl RegionTable<'_> {
    /// Renders full shareable text under this table.
    ///
    /// Identical rendered lines collapse to their first occurrence.
    #[must_use]
    pub fn shareable_text(&self, attributes: &AddressAttributes) -> String {
        let filter = DuplicateFilter::new(attributes, self);
        log::debug!("shareable_text: seen names {:?}", filter.names);

        let lines: Vec<String> = self
            .lines
            .iter()
            .map(|line| generate_line(attributes, line, &filter))
            .filter(|line| !line.is_empty())
            .collect();

        let mut text = String::new();
        for line in unique(lines.iter().map(String::as_str)) {
            text.push_str(line);
            text.push('\n');
        }

        text.trim_end().to_string()
    }

    /// Renders the locality line under this table.
    #[must_use]
    pub fn locality_text(&self, attributes: &AddressAttributes) -> String {
        let line = Line {
            keys: self.locality,
            separator: LOCALITY_SEPARATOR,
            suppress_duplicates: false,
        };

        generate_line(attributes, &line, &DuplicateFilter::default())
            .trim()
            .to_string()
    }
}

/// Renders shareable text using the region table the attributes select.
#[must_use]
pub fn shareable_text(attributes: &AddressAttributes) -> String {
    region_table_for(attributes).shareable_text(attributes)
}

/// Renders the locality line using the region table the attributes select.
#[must_use]
pub fn locality_text(attributes: &AddressAttributes) -> String {
    region_table_for(attributes).locality_text(attributes)
}
