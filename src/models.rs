use std::fmt;
use time::OffsetDateTime;

/// Weather forecast symbol shown by the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    Rainy,
    Cloudy,
    Sunny,
    Unknown,
}

impl Forecast {
    /// Map the low nibble of the forecast byte
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0 => Forecast::Rainy,
            1 => Forecast::Cloudy,
            2 => Forecast::Sunny,
            _ => Forecast::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Forecast::Rainy => "rainy",
            Forecast::Cloudy => "cloudy",
            Forecast::Sunny => "sunny",
            Forecast::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pressure tendency arrow shown by the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tendency {
    Steady,
    Rising,
    Falling,
    Unknown,
}

impl Tendency {
    /// Map the low nibble of the tendency byte
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0 => Tendency::Steady,
            1 => Tendency::Rising,
            2 => Tendency::Falling,
            _ => Tendency::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tendency::Steady => "steady",
            Tendency::Rising => "rising",
            Tendency::Falling => "falling",
            Tendency::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Tendency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete poll of the weather station.
///
/// `None` means the station reported no value for that field.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub timestamp: OffsetDateTime,
    pub temperature_in: Option<f64>,  // °C
    pub temperature_out: Option<f64>, // °C
    pub rel_humidity_in: Option<u8>,  // %
    pub rel_humidity_out: Option<u8>, // %
    pub windchill: Option<f64>,       // °C
    pub dewpoint: Option<f64>,        // °C
    pub wind_speed: Option<f64>,      // km/h
    pub wind_direction: Option<f64>,  // degrees
    pub rel_pressure: Option<f64>,    // hPa
    pub rain_last_1h: Option<f64>,    // mm
    pub rain_last_24h: Option<f64>,   // mm
    pub forecast: Option<Forecast>,
    pub tendency: Option<Tendency>,
}
