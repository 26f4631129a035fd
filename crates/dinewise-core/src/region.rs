//! Region codes for the pre-seeded metro areas.
//!
//! A query whose location is one of these codes is answered from the local
//! cache; any other location goes to the live directory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// `location_code` stored on cache rows that came from a free-form search
/// and are not bound to any region.
pub const UNBOUND_LOCATION_CODE: &str = "SEARCH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "MAN")]
    Manhattan,
    #[serde(rename = "BK")]
    Brooklyn,
    #[serde(rename = "QN")]
    Queens,
    #[serde(rename = "BX")]
    Bronx,
    #[serde(rename = "SI")]
    StatenIsland,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Manhattan,
        Region::Brooklyn,
        Region::Queens,
        Region::Bronx,
        Region::StatenIsland,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Region::Manhattan => "MAN",
            Region::Brooklyn => "BK",
            Region::Queens => "QN",
            Region::Bronx => "BX",
            Region::StatenIsland => "SI",
        }
    }

    /// Free-text location sent upstream when seeding this region.
    #[must_use]
    pub fn seed_location(self) -> &'static str {
        match self {
            Region::Manhattan => "Manhattan, NY",
            Region::Brooklyn => "Brooklyn, NY",
            Region::Queens => "Queens, NY",
            Region::Bronx => "Bronx, NY",
            Region::StatenIsland => "Staten Island, NY",
        }
    }

    /// Classifies a raw location string.
    ///
    /// Matches only when the whole (trimmed) string is a region code,
    /// compared case-insensitively. `"Brooklyn, NY"` is not a region.
    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|region| region.code().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| CoreError::UnknownRegion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_is_case_insensitive_and_trims() {
        assert_eq!(Region::from_code("man"), Some(Region::Manhattan));
        assert_eq!(Region::from_code(" Bk "), Some(Region::Brooklyn));
        assert_eq!(Region::from_code("SI"), Some(Region::StatenIsland));
    }

    #[test]
    fn from_code_rejects_free_text_locations() {
        assert_eq!(Region::from_code("Brooklyn, NY"), None);
        assert_eq!(Region::from_code("Manhattan"), None);
        assert_eq!(Region::from_code(""), None);
        assert_eq!(Region::from_code("SEARCH"), None);
    }

    #[test]
    fn every_region_round_trips_through_its_code() {
        for region in Region::ALL {
            assert_eq!(region.code().parse::<Region>().ok(), Some(region));
        }
    }

    #[test]
    fn serializes_as_code() {
        let json = serde_json::to_string(&Region::Queens).expect("serialize");
        assert_eq!(json, "\"QN\"");
    }

    #[test]
    fn seed_locations_name_the_borough() {
        assert_eq!(Region::Bronx.seed_location(), "Bronx, NY");
        assert_eq!(Region::StatenIsland.seed_location(), "Staten Island, NY");
    }
}
