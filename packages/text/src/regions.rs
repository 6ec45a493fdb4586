//! Compile-time registry of region key tables.
//!
//! Each region is defined in a TOML file under `regions/`. The `default`
//! region must spell out every line; the others are sparse overrides keyed
//! by the upper-case country prefix of an ISO 3166-2 code (`"SG"`, `"IT"`,
//! ...). Lookups compose the two per field, so an override can change a
//! single line's key list and inherit everything else.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;

/// Number of output lines in shareable text.
pub const LINE_COUNT: usize = 7;

/// Code of the fallback region.
pub const DEFAULT_REGION: &str = "default";

/// One line of a region file. Omitted fields fall back to the default region.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineSpec {
    /// Address keys to read, in output order.
    pub keys: Option<Vec<String>>,
    /// Text placed between values.
    pub separator: Option<String>,
    /// Drop values repeated on line 6 or contained in a name.
    pub suppress_duplicates: Option<bool>,
}

/// A region file as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    /// `"default"` or an upper-case country code.
    pub code: String,
    pub line_0: Option<LineSpec>,
    pub line_1: Option<LineSpec>,
    pub line_2: Option<LineSpec>,
    pub line_3: Option<LineSpec>,
    pub line_4: Option<LineSpec>,
    pub line_5: Option<LineSpec>,
    pub line_6: Option<LineSpec>,
    /// Keys whose values count as names for duplicate suppression.
    pub names: Option<Vec<String>>,
    /// Keys rendered as the locality of a shortened Plus Code.
    pub locality: Option<Vec<String>>,
}

impl RegionSpec {
    /// Returns line `index` if this file defines it.
    #[must_use]
    pub const fn line(&self, index: usize) -> Option<&LineSpec> {
        match index {
            0 => self.line_0.as_ref(),
            1 => self.line_1.as_ref(),
            2 => self.line_2.as_ref(),
            3 => self.line_3.as_ref(),
            4 => self.line_4.as_ref(),
            5 => self.line_5.as_ref(),
            6 => self.line_6.as_ref(),
            _ => None,
        }
    }
}

/// A fully resolved output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub keys: &'a [String],
    pub separator: &'a str,
    pub suppress_duplicates: bool,
}

/// A region's complete key arrangement, borrowed from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable<'a> {
    /// Code of the override in use, or [`DEFAULT_REGION`].
    pub code: &'a str,
    pub lines: [Line<'a>; LINE_COUNT],
    pub names: &'a [String],
    pub locality: &'a [String],
}

impl RegionTable<'_> {
    /// Returns `true` if a region override is in use.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.code != DEFAULT_REGION
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const REGION_TOMLS: &[(&str, &str)] = &[
    ("default", include_str!("../regions/default.toml")),
    ("sg", include_str!("../regions/sg.toml")),
    ("it", include_str!("../regions/it.toml")),
    ("my", include_str!("../regions/my.toml")),
];

#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 4;

/// Returns every region file as written.
///
/// # Panics
///
/// Panics if any TOML file is malformed (this is a compile-time guarantee
/// since the files are embedded).
#[must_use]
pub fn all_regions() -> Vec<RegionSpec> {
    REGION_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse region '{name}': {e}"))
        })
        .collect()
}

struct Registry {
    default: RegionSpec,
    default_names: Vec<String>,
    overrides: BTreeMap<String, RegionSpec>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(load_registry);

fn load_registry() -> Registry {
    let mut default = None;
    let mut overrides = BTreeMap::new();

    for region in all_regions() {
        if region.code == DEFAULT_REGION {
            assert!(default.is_none(), "Duplicate default region");
            default = Some(region);
        } else {
            let code = region.code.to_ascii_uppercase();
            assert!(
                !overrides.contains_key(&code),
                "Duplicate region code: {code}"
            );
            overrides.insert(code, region);
        }
    }

    let Some(default) = default else {
        panic!("Missing '{DEFAULT_REGION}' region");
    };

    for index in 0..LINE_COUNT {
        let line = default.line(index);
        assert!(
            line.is_some_and(|l| {
                l.keys.is_some() && l.separator.is_some() && l.suppress_duplicates.is_some()
            }),
            "Default region does not fully define line {index}"
        );
    }
    assert!(
        default.locality.is_some(),
        "Default region does not define locality keys"
    );

    let default_names = default.names.clone().unwrap_or_else(|| {
        (0..3)
            .filter_map(|index| default.line(index).and_then(|l| l.keys.clone()))
            .flatten()
            .chain(["house_name".to_string(), "road".to_string()])
            .collect()
    });

    Registry {
        default,
        default_names,
        overrides,
    }
}

impl Registry {
    fn table(&self, code: &str) -> RegionTable<'_> {
        let special = self.overrides.get(&code.to_ascii_uppercase());

        RegionTable {
            code: special.map_or(DEFAULT_REGION, |r| r.code.as_str()),
            lines: std::array::from_fn(|index| self.line(special, index)),
            names: special
                .and_then(|r| r.names.as_deref())
                .unwrap_or(self.default_names.as_slice()),
            locality: special
                .and_then(|r| r.locality.as_deref())
                .or(self.default.locality.as_deref())
                .unwrap_or_default(),
        }
    }

    fn line<'a>(&'a self, special: Option<&'a RegionSpec>, index: usize) -> Line<'a> {
        let special = special.and_then(|r| r.line(index));
        let default = self.default.line(index);

        Line {
            keys: special
                .and_then(|l| l.keys.as_deref())
                .or_else(|| default.and_then(|l| l.keys.as_deref()))
                .unwrap_or_default(),
            separator: special
                .and_then(|l| l.separator.as_deref())
                .or_else(|| default.and_then(|l| l.separator.as_deref()))
                .unwrap_or(", "),
            suppress_duplicates: special
                .and_then(|l| l.suppress_duplicates)
                .or_else(|| default.and_then(|l| l.suppress_duplicates))
                .unwrap_or(false),
        }
    }
}

/// Returns the key arrangement for `code`, falling back to the default
/// region per field.
///
/// # Panics
///
/// Panics on first use if the embedded region files are malformed or the
/// default region is incomplete.
#[must_use]
pub fn region_table(code: &str) -> RegionTable<'static> {
    let table = REGISTRY.table(code);

    if table.is_special() {
        log::debug!("region table: using special key arrangements for '{}'", table.code);
    } else {
        log::debug!("region table: using default key arrangements for '{code}'");
    }

    table
}
