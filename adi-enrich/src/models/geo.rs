//! Coordinates and Census geographic identifiers

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// NHGIS GISJOIN for a block group: G + state(2) + 0 + county(3) + 0 + tract(6) + block group(1)
static GISJOIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^G([0-9]{2})0([0-9]{3})0([0-9]{7})$").expect("GISJOIN pattern is valid")
});

/// WGS84 latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid geographic identifier '{value}': {reason}")]
pub struct InvalidGeoIdentifier {
    pub value: String,
    pub reason: &'static str,
}

impl InvalidGeoIdentifier {
    fn new(value: &str, reason: &'static str) -> Self {
        Self {
            value: value.to_string(),
            reason,
        }
    }
}

/// 12-digit block-group FIPS code (state + county + tract + block group)
///
/// Always exactly 12 ASCII digits; the only constructors validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GeoIdentifier(String);

impl GeoIdentifier {
    pub const LEN: usize = 12;

    /// Parse an exact 12-digit identifier
    pub fn parse(value: &str) -> Result<Self, InvalidGeoIdentifier> {
        let value = value.trim();
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidGeoIdentifier::new(value, "non-digit characters"));
        }
        if value.len() != Self::LEN {
            return Err(InvalidGeoIdentifier::new(value, "expected 12 digits"));
        }
        Ok(Self(value.to_string()))
    }

    /// Normalize a block FIPS as returned by the FCC block API
    ///
    /// 15 digits: truncated to the block group. 14 digits: the state's
    /// leading zero was dropped, so it is restored before truncating.
    pub fn from_block_fips(value: &str) -> Result<Self, InvalidGeoIdentifier> {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidGeoIdentifier::new(value, "non-digit characters"));
        }
        match value.len() {
            12 => Ok(Self(value.to_string())),
            14 => Ok(Self(format!("0{}", &value[..11]))),
            15 => Ok(Self(value[..12].to_string())),
            _ => Err(InvalidGeoIdentifier::new(
                value,
                "expected a 12-, 14- or 15-digit FIPS code",
            )),
        }
    }

    /// Convert an NHGIS GISJOIN code to a FIPS identifier
    pub fn from_gisjoin(value: &str) -> Result<Self, InvalidGeoIdentifier> {
        let value = value.trim();
        let caps = GISJOIN
            .captures(value)
            .ok_or_else(|| InvalidGeoIdentifier::new(value, "not a block-group GISJOIN"))?;
        Ok(Self(format!("{}{}{}", &caps[1], &caps[2], &caps[3])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn state(&self) -> &str {
        &self.0[..2]
    }

    pub fn county(&self) -> &str {
        &self.0[2..5]
    }

    pub fn tract(&self) -> &str {
        &self.0[5..11]
    }

    pub fn block_group(&self) -> &str {
        &self.0[11..]
    }
}

impl fmt::Display for GeoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GeoIdentifier {
    type Err = InvalidGeoIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for GeoIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
