//! Postal address as read from the address file

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static PO_BOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bP\.?\s*O\.?\s*BOX").expect("PO box pattern is valid")
});

/// Military post office designators (https://www.usps.com/ship/apo-fpo-dpo.htm)
const MILITARY_POST_OFFICES: [&str; 3] = ["APO", "FPO", "DPO"];
const MILITARY_STATES: [&str; 3] = ["AA", "AE", "AP"];

/// One row of the address file
///
/// Fields are kept exactly as given; rows are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    #[serde(default)]
    pub apt_num: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Why an address is not sent to the geocoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    MissingField(&'static str),
    PoBox,
    MilitaryMail,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::MissingField(field) => write!(f, "missing {}", field),
            Ineligibility::PoBox => write!(f, "PO box address"),
            Ineligibility::MilitaryMail => write!(f, "military mail address"),
        }
    }
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        apt_num: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            apt_num: apt_num.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
        }
    }

    /// Single-line address sent to the geocoder
    ///
    /// Empty fields are omitted so no doubled separators appear.
    pub fn full_address(&self) -> String {
        [&self.street, &self.apt_num, &self.city, &self.state, &self.zip]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check whether a street-level geocode is possible for this address
    ///
    /// Street, city and state are required. PO boxes and military mail have
    /// no street location, so geocoding them would only spend quota.
    pub fn eligibility(&self) -> Result<(), Ineligibility> {
        for (name, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(Ineligibility::MissingField(name));
            }
        }

        if self.is_military_mail() {
            return Err(Ineligibility::MilitaryMail);
        }

        if PO_BOX.is_match(&self.street) {
            return Err(Ineligibility::PoBox);
        }

        Ok(())
    }

    fn is_military_mail(&self) -> bool {
        let state = self.state.trim().to_ascii_uppercase();
        if MILITARY_STATES.contains(&state.as_str()) {
            return true;
        }

        let city = self.city.to_ascii_uppercase();
        if words(&city).any(|w| MILITARY_POST_OFFICES.contains(&w)) {
            return true;
        }

        let street = self.street.to_ascii_uppercase();
        let psc = words(&street).any(|w| w == "PSC");
        psc
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_address())
    }
}
