//! Simple weather sources.

use chrono::{DateTime, Utc};

use pilot_core::{GeoPoint, WeatherPoint, WeatherSource};

/// No weather data: standard atmosphere and no wind.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalmAtmosphere;

impl WeatherSource for CalmAtmosphere {
    fn closest_point(&self, _position: &GeoPoint, _time: DateTime<Utc>) -> Option<WeatherPoint> {
        None
    }
}

/// The same sample everywhere, at any time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWeather(pub WeatherPoint);

impl WeatherSource for UniformWeather {
    fn closest_point(&self, _position: &GeoPoint, _time: DateTime<Utc>) -> Option<WeatherPoint> {
        Some(self.0)
    }
}
