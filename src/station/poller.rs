/// Full weather station poll: one snapshot per call
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;

use crate::config::StationConfig;
use crate::models::WeatherSnapshot;
use crate::station::channel::{ByteChannel, SerialChannel};
use crate::station::decode::{self, Field};
use crate::station::error::ProtocolError;
use crate::station::protocol::{ProtocolTiming, RetryPolicy, StationSession};

/// Polls the station over a channel supplied by the caller.
///
/// Each `poll` runs strictly sequentially on the calling thread and blocks
/// until the snapshot is complete or a retry budget is exhausted.
#[derive(Debug, Clone)]
pub struct StationPoller {
    timing: ProtocolTiming,
    retries: RetryPolicy,
    strict_acks: bool,
    shutdown: Option<Arc<AtomicBool>>,
}

impl StationPoller {
    pub fn new(timing: ProtocolTiming, retries: RetryPolicy) -> Self {
        StationPoller {
            timing,
            retries,
            strict_acks: false,
            shutdown: None,
        }
    }

    pub fn from_config(config: &StationConfig) -> Self {
        StationPoller::new(config.protocol_timing(), config.retry_policy())
            .with_strict_acks(config.strict_acks)
    }

    pub fn with_strict_acks(mut self, strict: bool) -> Self {
        self.strict_acks = strict;
        self
    }

    /// Stop a running poll before the next field once `flag` is set.
    ///
    /// A field read that is already in progress still runs to completion.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Read every field and assemble a snapshot.
    ///
    /// Fields the station has no value for are `None`. Any protocol error
    /// stops the poll and is returned as is.
    pub fn poll<C: ByteChannel>(&self, channel: &mut C) -> Result<WeatherSnapshot, ProtocolError> {
        let mut session = StationSession::new(channel, self.timing.clone(), self.retries)
            .with_strict_acks(self.strict_acks);

        let timestamp = OffsetDateTime::now_utc();

        // Fields are read in this order
        Ok(WeatherSnapshot {
            timestamp,
            temperature_in: self.read_field(&mut session, &decode::TEMPERATURE_IN)?,
            temperature_out: self.read_field(&mut session, &decode::TEMPERATURE_OUT)?,
            rel_humidity_in: self.read_field(&mut session, &decode::HUMIDITY_IN)?,
            rel_humidity_out: self.read_field(&mut session, &decode::HUMIDITY_OUT)?,
            windchill: self.read_field(&mut session, &decode::WINDCHILL)?,
            dewpoint: self.read_field(&mut session, &decode::DEWPOINT)?,
            wind_speed: self.read_field(&mut session, &decode::WIND_SPEED)?,
            wind_direction: self.read_field(&mut session, &decode::WIND_DIRECTION)?,
            rel_pressure: self.read_field(&mut session, &decode::REL_PRESSURE)?,
            rain_last_24h: self.read_field(&mut session, &decode::RAIN_24H)?,
            rain_last_1h: self.read_field(&mut session, &decode::RAIN_1H)?,
            forecast: self.read_field(&mut session, &decode::FORECAST)?,
            tendency: self.read_field(&mut session, &decode::TENDENCY)?,
        })
    }

    fn read_field<C, T, const N: usize>(
        &self,
        session: &mut StationSession<C>,
        field: &Field<N, T>,
    ) -> Result<Option<T>, ProtocolError>
    where
        C: ByteChannel,
    {
        if self
            .shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            info!("Shutdown requested, skipping {} and remaining fields", field.name);
            return Err(ProtocolError::Interrupted);
        }

        debug!("Reading {} at 0x{:04X}", field.name, field.address);
        let raw = session.read_memory::<N>(field.address)?;
        Ok(raw.map(field.decode))
    }
}

/// Open the serial device, poll once and close the device again.
///
/// The port is released on every path, including protocol errors.
pub fn poll_serial(device: &str, poller: &StationPoller) -> Result<WeatherSnapshot, ProtocolError> {
    debug!("Collecting data from weather station at '{}'", device);

    let mut channel = match SerialChannel::open(device) {
        Ok(channel) => channel,
        Err(e) => {
            error!("Failed to open serial device '{}': {}", device, e);
            return Err(e.into());
        }
    };

    let result = poller.poll(&mut channel);
    drop(channel);

    match &result {
        Ok(_) => debug!("Finished collecting data from weather station at '{}'", device),
        Err(e) => error!("Error collecting data from '{}': {}", device, e),
    }

    result
}
