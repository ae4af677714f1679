/// Station memory map and BCD decoding of raw field bytes
///
/// Multi-digit values are packed BCD with the least significant byte first:
/// each byte holds two decimal digits, high nibble before low nibble.
use crate::models::{Forecast, Tendency};

// Temperatures are stored with a +30 °C bias
const TEMPERATURE_OFFSET: f64 = 30.0;
const WIND_SECTOR_DEGREES: f64 = 22.5;
const MPS_TO_KMH: f64 = 3.6;

/// A value at a fixed location in station memory
pub struct Field<const N: usize, T> {
    pub name: &'static str,
    pub address: u16,
    pub decode: fn([u8; N]) -> T,
}

pub const TEMPERATURE_IN: Field<2, f64> = Field {
    name: "indoor temperature",
    address: 0x0346,
    decode: temperature,
};

pub const TEMPERATURE_OUT: Field<2, f64> = Field {
    name: "outdoor temperature",
    address: 0x0373,
    decode: temperature,
};

pub const WINDCHILL: Field<2, f64> = Field {
    name: "windchill",
    address: 0x03A0,
    decode: temperature,
};

pub const DEWPOINT: Field<2, f64> = Field {
    name: "dewpoint",
    address: 0x03CE,
    decode: temperature,
};

pub const HUMIDITY_IN: Field<1, u8> = Field {
    name: "indoor humidity",
    address: 0x03FB,
    decode: humidity,
};

pub const HUMIDITY_OUT: Field<1, u8> = Field {
    name: "outdoor humidity",
    address: 0x0419,
    decode: humidity,
};

pub const WIND_SPEED: Field<2, f64> = Field {
    name: "wind speed",
    address: 0x0529,
    decode: wind_speed,
};

pub const WIND_DIRECTION: Field<1, f64> = Field {
    name: "wind direction",
    address: 0x052C,
    decode: wind_direction,
};

pub const REL_PRESSURE: Field<3, f64> = Field {
    name: "relative pressure",
    address: 0x05E2,
    decode: pressure,
};

pub const RAIN_24H: Field<3, f64> = Field {
    name: "rain 24h",
    address: 0x0497,
    decode: rain,
};

pub const RAIN_1H: Field<3, f64> = Field {
    name: "rain 1h",
    address: 0x04B4,
    decode: rain,
};

pub const FORECAST: Field<1, Forecast> = Field {
    name: "forecast",
    address: 0x026B,
    decode: forecast,
};

pub const TENDENCY: Field<1, Tendency> = Field {
    name: "tendency",
    address: 0x026C,
    decode: tendency,
};

fn high(byte: u8) -> f64 {
    f64::from(byte >> 4)
}

fn low(byte: u8) -> f64 {
    f64::from(byte & 0x0F)
}

/// Four BCD digits `TU.tu` in bytes `[tu, TU]`, minus the 30 °C bias
pub fn temperature(raw: [u8; 2]) -> f64 {
    let [b0, b1] = raw;
    high(b1) * 10.0 + low(b1) + high(b0) / 10.0 + low(b0) / 100.0 - TEMPERATURE_OFFSET
}

/// Two BCD digits, integer percent
pub fn humidity(raw: [u8; 1]) -> u8 {
    let [b0] = raw;
    (b0 >> 4) * 10 + (b0 & 0x0F)
}

/// 12-bit binary value in 0.1 m/s, converted to km/h
pub fn wind_speed(raw: [u8; 2]) -> f64 {
    let [b0, b1] = raw;
    let decims = (u16::from(b1 & 0x0F) << 8) | u16::from(b0);
    f64::from(decims) / 10.0 * MPS_TO_KMH
}

/// Compass sector 0..=15 in the low nibble
pub fn wind_direction(raw: [u8; 1]) -> f64 {
    low(raw[0]) * WIND_SECTOR_DEGREES
}

/// Five BCD digits `TTTU.t` hPa; only the low nibble of the top byte is used
pub fn pressure(raw: [u8; 3]) -> f64 {
    let [b0, b1, b2] = raw;
    low(b2) * 1000.0 + high(b1) * 100.0 + low(b1) * 10.0 + high(b0) + low(b0) / 10.0
}

/// Six BCD digits `TTTU.tu` mm
pub fn rain(raw: [u8; 3]) -> f64 {
    let [b0, b1, b2] = raw;
    high(b2) * 1000.0
        + low(b2) * 100.0
        + high(b1) * 10.0
        + low(b1)
        + high(b0) / 10.0
        + low(b0) / 100.0
}

pub fn forecast(raw: [u8; 1]) -> Forecast {
    Forecast::from_nibble(raw[0])
}

pub fn tendency(raw: [u8; 1]) -> Tendency {
    Tendency::from_nibble(raw[0])
}
