/// Utility functions for formatting and reporting readings
use log::info;
use time::{format_description, OffsetDateTime};

use crate::models::WeatherSnapshot;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Convert a time::Duration to seconds as u64
///
/// Negative durations count as zero.
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}

/// Format an optional reading with the given precision and unit
///
/// Missing values are shown as "n/a" so they can't be mistaken for zero.
pub fn format_reading<T: std::fmt::Display>(
    value: Option<T>,
    precision: usize,
    unit: &str,
) -> String {
    match value {
        Some(v) => format!("{:.*}{}", precision, v, unit),
        None => "n/a".to_string(),
    }
}

/// Log a readable summary of one snapshot
pub fn log_snapshot_summary(snapshot: &WeatherSnapshot) {
    info!("Weather at {}:", format_datetime(&snapshot.timestamp));
    info!(
        "  Temperature in/out: {} / {}",
        format_reading(snapshot.temperature_in, 2, "°C"),
        format_reading(snapshot.temperature_out, 2, "°C")
    );
    info!(
        "  Humidity in/out: {} / {}",
        format_reading(snapshot.rel_humidity_in, 0, "%"),
        format_reading(snapshot.rel_humidity_out, 0, "%")
    );
    info!(
        "  Windchill: {}, dewpoint: {}",
        format_reading(snapshot.windchill, 2, "°C"),
        format_reading(snapshot.dewpoint, 2, "°C")
    );
    info!(
        "  Wind: {} from {}",
        format_reading(snapshot.wind_speed, 1, " km/h"),
        format_reading(snapshot.wind_direction, 1, "°")
    );
    info!(
        "  Relative pressure: {}",
        format_reading(snapshot.rel_pressure, 1, " hPa")
    );
    info!(
        "  Rain 1h/24h: {} / {}",
        format_reading(snapshot.rain_last_1h, 2, " mm"),
        format_reading(snapshot.rain_last_24h, 2, " mm")
    );
    info!(
        "  Forecast: {}, tendency: {}",
        format_reading(snapshot.forecast, 0, ""),
        format_reading(snapshot.tendency, 0, "")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Forecast;

    #[test]
    fn formats_timestamp() {
        let dt = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(3661);
        assert_eq!(format_datetime(&dt), "01.01.1970 - 01:01:01");
    }

    #[test]
    fn negative_duration_is_zero_seconds() {
        assert_eq!(duration_to_seconds(time::Duration::seconds(-5)), 0);
        assert_eq!(duration_to_seconds(time::Duration::milliseconds(2500)), 2);
    }

    #[test]
    fn formats_readings() {
        assert_eq!(format_reading(Some(21.456), 2, "°C"), "21.46°C");
        assert_eq!(format_reading(Some(45u8), 0, "%"), "45%");
        assert_eq!(format_reading(None::<f64>, 1, " hPa"), "n/a");
        assert_eq!(format_reading(Some(Forecast::Sunny), 0, ""), "sunny");
    }
}
