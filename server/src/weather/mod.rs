pub mod normalize;
pub mod openweather;
pub mod query;
pub mod types;

pub use normalize::{get_cardinal_direction, normalize_weather};
pub use openweather::{OpenWeatherClient, OpenWeatherError};
pub use query::{Language, QueryParameters, Units};
pub use types::{CardinalDirection, WeatherRecord};
