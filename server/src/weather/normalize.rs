//! Upstream payload normalization.
//!
//! Extraction never fails: a missing path is just `None`. Type checking of the
//! extracted values happens afterwards in [`NormalizedWeather::validate`].

use serde_json::Value;

use super::types::{CardinalDirection, WeatherRecord};
use crate::error::ValidationErrors;

const INVALID_NUMBER: &str = "A valid number is required.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_STRING: &str = "Not a valid string.";

/// Values lifted from the provider payload, not yet type checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedWeather {
    pub city_name: Option<Value>,
    pub temperature: Option<Value>,
    pub min_temperature: Option<Value>,
    pub max_temperature: Option<Value>,
    pub humidity: Option<Value>,
    pub pressure: Option<Value>,
    pub wind_speed: Option<Value>,
    pub wind_degree: Option<Value>,
    pub description: Option<Value>,
}

pub fn normalize_weather(payload: &Value) -> NormalizedWeather {
    let at = |pointer: &str| payload.pointer(pointer).filter(|v| !v.is_null()).cloned();

    NormalizedWeather {
        city_name: at("/name"),
        temperature: at("/main/temp"),
        min_temperature: at("/main/temp_min"),
        max_temperature: at("/main/temp_max"),
        humidity: at("/main/humidity"),
        pressure: at("/main/pressure"),
        wind_speed: at("/wind/speed"),
        wind_degree: at("/wind/deg"),
        description: at("/weather/0/description"),
    }
}

/// Eight-point name for a wind bearing; `None` and `0` both mean no data.
pub fn get_cardinal_direction(degree: Option<f64>) -> Option<&'static str> {
    CardinalDirection::from_degrees(degree).map(|d| d.as_str())
}

impl NormalizedWeather {
    /// Check every extracted value against the output schema.
    pub fn validate(self) -> Result<WeatherRecord, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let wind_degree = as_float("direction", self.wind_degree, &mut errors);

        let record = WeatherRecord {
            city_name: as_string("city_name", self.city_name, &mut errors),
            temperature: as_float("temperature", self.temperature, &mut errors),
            min_temperature: as_float("min_temperature", self.min_temperature, &mut errors),
            max_temperature: as_float("max_temperature", self.max_temperature, &mut errors),
            humidity: as_integer("humidity", self.humidity, &mut errors),
            pressure: as_integer("pressure", self.pressure, &mut errors),
            wind_speed: as_float("wind_speed", self.wind_speed, &mut errors),
            direction: CardinalDirection::from_degrees(wind_degree),
            description: as_string("description", self.description, &mut errors),
        };

        errors.into_result(record)
    }
}

fn as_float(field: &str, value: Option<Value>, errors: &mut ValidationErrors) -> Option<f64> {
    let value = value?;
    let number = value.as_f64();
    if number.is_none() {
        errors.add(field, INVALID_NUMBER);
    }
    number
}

fn as_integer(field: &str, value: Option<Value>, errors: &mut ValidationErrors) -> Option<i64> {
    let value = value?;
    let integer = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });
    if integer.is_none() {
        errors.add(field, INVALID_INTEGER);
    }
    integer
}

fn as_string(field: &str, value: Option<Value>, errors: &mut ValidationErrors) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        _ => {
            errors.add(field, INVALID_STRING);
            None
        }
    }
}
