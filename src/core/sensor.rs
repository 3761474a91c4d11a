//! MJ_HT_V1 payload decoding
//! The sensor pushes human readable text inside its notification frame,
//! e.g. `T=21.5 H=45.0\0`. Temperature and humidity live at fixed offsets.

use std::ops::Range;

use thiserror::Error;

/// Byte window holding the temperature digits
pub const TEMPERATURE_WINDOW: Range<usize> = 2..6;

/// Byte window holding the humidity digits
pub const HUMIDITY_WINDOW: Range<usize> = 9..13;

/// Shortest payload that covers both windows
pub const MIN_PAYLOAD_LEN: usize = 13;

/// Error returned when a notification payload can't be decoded
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("payload too short: {len} bytes, expected at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("invalid {field} value: {raw:?}")]
    InvalidNumber { field: &'static str, raw: String },
}

/// Name of an exported metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    Temperature,
    Humidity,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded value, tagged with the peripheral it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMeasurement {
    /// Identity of the peripheral (MAC address where the platform exposes one)
    pub device_id: String,
    /// Which quantity this is
    pub metric: MetricName,
    /// The value in °C or %RH
    pub value: f64,
}

/// Temperature and humidity decoded from one notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Temperature (in °C)
    pub temperature: f64,
    /// Relative humidity (in %)
    pub humidity: f64,
}

impl SensorReading {
    /// Splits the reading into measurements, temperature first.
    pub fn into_measurements(self, device_id: &str) -> [SensorMeasurement; 2] {
        [
            SensorMeasurement {
                device_id: device_id.to_string(),
                metric: MetricName::Temperature,
                value: self.temperature,
            },
            SensorMeasurement {
                device_id: device_id.to_string(),
                metric: MetricName::Humidity,
                value: self.humidity,
            },
        ]
    }
}

/// Decodes a raw notification payload.
pub fn decode(raw: &[u8]) -> Result<SensorReading, DecodeError> {
    if raw.len() < MIN_PAYLOAD_LEN {
        return Err(DecodeError::TooShort {
            len: raw.len(),
            min: MIN_PAYLOAD_LEN,
        });
    }

    let temperature = parse_window(raw, TEMPERATURE_WINDOW, "temperature")?;
    let humidity = parse_window(raw, HUMIDITY_WINDOW, "humidity")?;

    Ok(SensorReading {
        temperature,
        humidity,
    })
}

fn parse_window(raw: &[u8], window: Range<usize>, field: &'static str) -> Result<f64, DecodeError> {
    let bytes = raw.get(window).ok_or(DecodeError::TooShort {
        len: raw.len(),
        min: MIN_PAYLOAD_LEN,
    })?;
    let invalid = || DecodeError::InvalidNumber {
        field,
        raw: String::from_utf8_lossy(bytes).into_owned(),
    };

    let text = std::str::from_utf8(bytes).map_err(|_| invalid())?;
    let value: f64 = text.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_sensor_frame() {
        let reading = decode(b"T=21.5 H=45.0\0").unwrap();
        assert_eq!(
            reading,
            SensorReading {
                temperature: 21.5,
                humidity: 45.0
            }
        );
    }

    #[test]
    fn ignores_bytes_outside_windows() {
        let mut payload = *b"xx21.5yyy45.0";
        payload[0] = 0xff;
        payload[6] = 0x00;
        let reading = decode(&payload).unwrap();
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 45.0);
    }

    #[test]
    fn rejects_every_short_payload() {
        let full = b"T=21.5 H=45.0";
        for len in 0..MIN_PAYLOAD_LEN {
            assert_eq!(
                decode(&full[..len]),
                Err(DecodeError::TooShort {
                    len,
                    min: MIN_PAYLOAD_LEN
                })
            );
        }
    }

    #[test]
    fn rejects_non_numeric_windows() {
        assert_eq!(
            decode(b"T=ab.c H=45.0"),
            Err(DecodeError::InvalidNumber {
                field: "temperature",
                raw: "ab.c".to_string()
            })
        );
        assert!(matches!(
            decode(b"T=21.5 H=4?.0"),
            Err(DecodeError::InvalidNumber { field: "humidity", .. })
        ));
        assert!(decode(b"T=21.5 H=4 .0").is_err());

        let mut not_utf8 = *b"T=21.5 H=45.0";
        not_utf8[2] = 0xff;
        not_utf8[3] = 0xfe;
        assert!(decode(&not_utf8).is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(decode(b"T=+inf H=45.0").is_err());
        assert!(decode(b"T=21.5 H=-inf").is_err());
    }

    #[test]
    fn splits_reading_into_measurements() {
        let [temperature, humidity] = SensorReading {
            temperature: 21.5,
            humidity: 45.0,
        }
        .into_measurements("A4:C1:38:00:11:22");

        assert_eq!(temperature.metric, MetricName::Temperature);
        assert_eq!(temperature.value, 21.5);
        assert_eq!(humidity.metric, MetricName::Humidity);
        assert_eq!(humidity.value, 45.0);
        assert_eq!(humidity.device_id, "A4:C1:38:00:11:22");
        assert_eq!(MetricName::Humidity.to_string(), "humidity");
    }
}
