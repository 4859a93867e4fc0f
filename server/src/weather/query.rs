//! Inbound query validation.
//!
//! Raw query-string pairs become a [`QueryParameters`] value or a
//! [`ValidationErrors`] map naming every offending field.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::ValidationErrors;
use crate::utils::{parse_finite, validate_latitude, validate_longitude};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_NUMBER: &str = "A valid number is required.";

/// A closed set of accepted values for one query parameter.
pub trait Choice: Copy + FromStr + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse_choice(raw: &str) -> Result<Self, String> {
        raw.parse::<Self>().map_err(|_| {
            let allowed: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
            format!("Invalid choice: {}. Must be one of {}.", raw, allowed.join(", "))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Standard,
    #[default]
    Metric,
    Imperial,
}

impl FromStr for Units {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(()),
        }
    }
}

impl Choice for Units {
    const ALL: &'static [Self] = &[Units::Standard, Units::Metric, Units::Imperial];

    fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
}

impl FromStr for Language {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "en" => Ok(Language::English),
            "de" => Ok(Language::German),
            "it" => Ok(Language::Italian),
            _ => Err(()),
        }
    }
}

impl Choice for Language {
    const ALL: &'static [Self] = &[Language::English, Language::German, Language::Italian];

    fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
            Language::Italian => "it",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated weather query.
///
/// `q` and the coordinate pair may both be present; both are forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameters {
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub units: Units,
    pub lang: Language,
}

impl QueryParameters {
    /// Validate raw query-string pairs.
    ///
    /// `location` and `language` are accepted as aliases of `q` and `lang`.
    /// Unrecognized names are ignored.
    pub fn from_raw(raw: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let lookup = |names: &[&str]| names.iter().find_map(|name| raw.get(*name));

        let q = match lookup(&["q", "location"]) {
            Some(value) if value.trim().is_empty() => {
                errors.add("q", BLANK);
                None
            }
            Some(value) => Some(value.trim().to_string()),
            None => None,
        };

        let lat = parse_coordinate(raw.get("lat"), "lat", validate_latitude, &mut errors);
        let lon = parse_coordinate(raw.get("lon"), "lon", validate_longitude, &mut errors);

        match (raw.contains_key("lat"), raw.contains_key("lon")) {
            (true, false) => errors.add("lon", REQUIRED),
            (false, true) => errors.add("lat", REQUIRED),
            (false, false) if q.is_none() && !errors.fields().any(|f| f == "q") => {
                errors.add("q", REQUIRED)
            }
            _ => {}
        }

        let units = parse_choice_field::<Units>(lookup(&["units"]), "units", &mut errors);
        let lang = parse_choice_field::<Language>(lookup(&["lang", "language"]), "lang", &mut errors);

        errors.into_result(QueryParameters {
            q,
            lat,
            lon,
            units,
            lang,
        })
    }

    pub fn for_location(location: &str) -> Self {
        QueryParameters {
            q: Some(location.to_string()),
            lat: None,
            lon: None,
            units: Units::default(),
            lang: Language::default(),
        }
    }

    /// Canonical name/value pairs, sorted by name.
    ///
    /// These are both the cache-key input and the upstream query.
    pub fn canonical_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        if let Some(q) = &self.q {
            params.insert("q", q.clone());
        }
        if let Some(lat) = self.lat {
            params.insert("lat", format_coordinate(lat));
        }
        if let Some(lon) = self.lon {
            params.insert("lon", format_coordinate(lon));
        }
        params.insert("units", self.units.as_str().to_string());
        params.insert("lang", self.lang.as_str().to_string());
        params
    }
}

fn parse_coordinate(
    raw: Option<&String>,
    field: &str,
    check: fn(f64) -> Result<(), String>,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    let raw = raw?;
    let Some(value) = parse_finite(raw) else {
        errors.add(field, NOT_A_NUMBER);
        return None;
    };
    match check(value) {
        Ok(()) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

fn parse_choice_field<T: Choice + Default>(
    raw: Option<&String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> T {
    match raw {
        None => T::default(),
        Some(value) => T::parse_choice(value).unwrap_or_else(|message| {
            errors.add(field, message);
            T::default()
        }),
    }
}

/// Shortest round-trip form, so `33.40` and `33.4` share a key.
fn format_coordinate(value: f64) -> String {
    // adding 0.0 folds -0.0 into 0.0
    format!("{}", value + 0.0)
}
