//! Cached tile sources for the bundled demo locations.

use std::fmt;

/// A demo location with pre-fetched tiles under the cache root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugLocation {
    Table,
    Eiger,
    River,
    Akagi,
    /// No location matched; sources point at a directory that does not exist.
    Invalid,
}

/// Title substrings checked in order. Later matches override earlier ones.
const TITLE_MATCHERS: [(&str, DebugLocation); 4] = [
    ("Table", DebugLocation::Table),
    ("Eiger", DebugLocation::Eiger),
    ("River", DebugLocation::River),
    ("Akagi", DebugLocation::Akagi),
];

impl DebugLocation {
    /// Match a location title. Case-sensitive; the last matching name wins.
    pub fn from_title(title: &str) -> Self {
        TITLE_MATCHERS
            .iter()
            .filter(|(needle, _)| title.contains(needle))
            .map(|&(_, location)| location)
            .last()
            .unwrap_or(Self::Invalid)
    }

    /// Directory name under the cache root.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Eiger => "eiger",
            Self::River => "river",
            Self::Akagi => "akagi",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for DebugLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tile source paths for one location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugEndpoints {
    pub location: DebugLocation,
    pub vector: String,
    pub rgb: String,
    pub satellite: String,
}

impl DebugEndpoints {
    pub fn for_title(cache_root: &str, title: &str) -> Self {
        Self::for_location(cache_root, DebugLocation::from_title(title))
    }

    pub fn for_location(cache_root: &str, location: DebugLocation) -> Self {
        let base = format!("{}/{location}", cache_root.trim_end_matches('/'));
        Self {
            location,
            vector: format!("{base}/custom-terrain-vector"),
            rgb: format!("{base}/custom-terrain-rgb"),
            satellite: format!("{base}/custom-satellite"),
        }
    }
}
