use std::fmt;

use serde::{Deserialize, Serialize};

/// Price tier as displayed to users (`$` through `$$$$`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceTier {
    #[serde(rename = "$")]
    One,
    #[serde(rename = "$$")]
    Two,
    #[serde(rename = "$$$")]
    Three,
    #[serde(rename = "$$$$")]
    Four,
}

impl PriceTier {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            PriceTier::One => "$",
            PriceTier::Two => "$$",
            PriceTier::Three => "$$$",
            PriceTier::Four => "$$$$",
        }
    }

    /// Numeric code the directory API expects in its `price` parameter.
    #[must_use]
    pub fn upstream_code(self) -> &'static str {
        match self {
            PriceTier::One => "1",
            PriceTier::Two => "2",
            PriceTier::Three => "3",
            PriceTier::Four => "4",
        }
    }

    #[must_use]
    pub fn from_symbol(raw: &str) -> Option<Self> {
        match raw.trim() {
            "$" => Some(PriceTier::One),
            "$$" => Some(PriceTier::Two),
            "$$$" => Some(PriceTier::Three),
            "$$$$" => Some(PriceTier::Four),
            _ => None,
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parses a comma-separated list of price symbols such as `"$,$$"`.
///
/// Unknown entries are dropped; order of first appearance is kept and
/// duplicates are removed.
#[must_use]
pub fn parse_price_list(raw: &str) -> Vec<PriceTier> {
    let mut tiers = Vec::new();
    for tier in raw.split(',').filter_map(PriceTier::from_symbol) {
        if !tiers.contains(&tier) {
            tiers.push(tier);
        }
    }
    tiers
}
