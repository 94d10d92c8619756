//! Tradable instrument reference data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market an instrument is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// Main board
    #[default]
    Kospi,
    /// Growth board
    Kosdaq,
    /// Third market
    Konex,
    /// Anything the reference data does not classify
    Other,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Konex => "KONEX",
            Market::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KOSPI" | "STK" | "J" => Ok(Market::Kospi),
            "KOSDAQ" | "KSQ" | "Q" => Ok(Market::Kosdaq),
            "KONEX" | "KNX" => Ok(Market::Konex),
            "OTHER" | "" => Ok(Market::Other),
            _ => Err(format!("Invalid market: {}", s)),
        }
    }
}

/// A tradable security identified by its short code.
///
/// Identity is owned by external reference data; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Short alphanumeric code, e.g. "005930"
    pub code: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Listing market
    #[serde(default)]
    pub market: Market,
}

impl Instrument {
    /// Create a new instrument.
    pub fn new(code: impl Into<String>, name: impl Into<String>, market: Market) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            market,
        }
    }
}
