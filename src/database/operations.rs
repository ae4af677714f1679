/// Database operations for storing weather station readings
use crate::database::connection::execute_with_retry;
use crate::models::WeatherSnapshot;

/// Store one weather snapshot in the weather_data table
///
/// Fields the station reported no value for are stored as NULL. Forecast and
/// tendency are stored as their lowercase names.
///
/// # Arguments
/// * `device` - Serial device the snapshot was read from
/// * `snapshot` - Snapshot to store
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// Result indicating success or failure
pub async fn store_weather_data(
    device: &str,
    snapshot: &WeatherSnapshot,
    database_url: &str,
) -> Result<(), String> {
    // Clone data for move into async closure
    let device = device.to_string();
    let snapshot = snapshot.clone();

    execute_with_retry(database_url, move |client| {
        let device = device.clone();
        let snapshot = snapshot.clone();
        async move {
            let humidity_in = snapshot.rel_humidity_in.map(i16::from);
            let humidity_out = snapshot.rel_humidity_out.map(i16::from);
            let forecast = snapshot.forecast.map(|f| f.as_str());
            let tendency = snapshot.tendency.map(|t| t.as_str());

            client.execute(
                "INSERT INTO weather_data(device, time, temperature_in, temperature_out, humidity_in, humidity_out,
                                          windchill, dewpoint, wind_speed, wind_direction, rel_pressure,
                                          rain_1h, rain_24h, forecast, tendency)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
                &[
                    &device,
                    &snapshot.timestamp,
                    &snapshot.temperature_in,
                    &snapshot.temperature_out,
                    &humidity_in,
                    &humidity_out,
                    &snapshot.windchill,
                    &snapshot.dewpoint,
                    &snapshot.wind_speed,
                    &snapshot.wind_direction,
                    &snapshot.rel_pressure,
                    &snapshot.rain_last_1h,
                    &snapshot.rain_last_24h,
                    &forecast,
                    &tendency,
                ],
            ).await
        }
    }).await
}
