use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Eight-point compass bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CardinalDirection {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CardinalDirection {
    /// Clockwise from north, one entry per 45 degrees.
    pub const CLOCKWISE: [CardinalDirection; 8] = [
        CardinalDirection::North,
        CardinalDirection::Northeast,
        CardinalDirection::East,
        CardinalDirection::Southeast,
        CardinalDirection::South,
        CardinalDirection::Southwest,
        CardinalDirection::West,
        CardinalDirection::Northwest,
    ];

    /// A bearing of exactly 0 is treated as "no data", like a missing one.
    pub fn from_degrees(degrees: Option<f64>) -> Option<Self> {
        let degrees = degrees.filter(|d| d.is_finite() && *d != 0.0)?;
        // ties go to even: 22.5 is North, 67.5 is East
        let index = (degrees / 45.0).round_ties_even() as i64;
        Some(Self::CLOCKWISE[index.rem_euclid(8) as usize])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardinalDirection::North => "North",
            CardinalDirection::Northeast => "Northeast",
            CardinalDirection::East => "East",
            CardinalDirection::Southeast => "Southeast",
            CardinalDirection::South => "South",
            CardinalDirection::Southwest => "Southwest",
            CardinalDirection::West => "West",
            CardinalDirection::Northwest => "Northwest",
        }
    }
}

/// Normalized current weather, the body of every 200 response and the cached value.
///
/// Missing values serialize as `null` so the schema never changes shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherRecord {
    /// Name of the city.
    pub city_name: Option<String>,
    /// Current temperature in the requested units.
    pub temperature: Option<f64>,
    /// Minimum temperature currently observed.
    pub min_temperature: Option<f64>,
    /// Maximum temperature currently observed.
    pub max_temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<i64>,
    /// Atmospheric pressure in hPa.
    pub pressure: Option<i64>,
    /// Wind speed in the requested units.
    pub wind_speed: Option<f64>,
    /// Wind direction as a cardinal name.
    pub direction: Option<CardinalDirection>,
    /// Weather condition description in the requested language.
    pub description: Option<String>,
}
