//! Flower Power Protocol
//!
//! GATT layout and value conversions for the Parrot Flower Power plant
//! sensor.

use crate::domain::error::BridgeError;
use crate::domain::models::SensorKind;
use tracing::trace;
use uuid::Uuid;

/// Live measurement service, also used as the scan filter
pub const LIVE_SERVICE_UUID: Uuid = Uuid::from_u128(0x39e1fa00_84a8_11e2_afba_0002a5d5c51b);

/// Sunlight characteristic (raw light sensor counts)
pub const SUNLIGHT_UUID: Uuid = Uuid::from_u128(0x39e1fa01_84a8_11e2_afba_0002a5d5c51b);

/// Air temperature characteristic
pub const TEMPERATURE_UUID: Uuid = Uuid::from_u128(0x39e1fa04_84a8_11e2_afba_0002a5d5c51b);

/// Soil moisture characteristic
pub const SOIL_MOISTURE_UUID: Uuid = Uuid::from_u128(0x39e1fa05_84a8_11e2_afba_0002a5d5c51b);

/// Device Information service Serial Number String (0x2A25)
pub const SERIAL_NUMBER_UUID: Uuid = Uuid::from_u128(0x00002a25_0000_1000_8000_00805f9b34fb);

/// Characteristic holding the measurement for `kind`
pub fn characteristic_for(kind: SensorKind) -> Uuid {
    match kind {
        SensorKind::Temperature => TEMPERATURE_UUID,
        SensorKind::Light => SUNLIGHT_UUID,
        SensorKind::Moisture => SOIL_MOISTURE_UUID,
    }
}

/// Convert a raw characteristic payload to the physical value for `kind`
pub fn decode(kind: SensorKind, bytes: &[u8]) -> Result<f64, BridgeError> {
    let raw = parse_raw(bytes)?;
    trace!("Raw {} value: {}", kind, raw);

    Ok(match kind {
        SensorKind::Temperature => temperature_from_raw(raw),
        SensorKind::Light => sunlight_from_raw(raw),
        SensorKind::Moisture => soil_moisture_from_raw(raw),
    })
}

/// Measurements are little-endian u16 sensor counts
pub fn parse_raw(bytes: &[u8]) -> Result<u16, BridgeError> {
    match bytes {
        [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi])),
        _ => Err(BridgeError::Payload(format!(
            "expected at least 2 bytes, got {}",
            bytes.len()
        ))),
    }
}

/// Degrees Celsius, clamped to the sensor's rated range [-10, 55]
pub fn temperature_from_raw(raw: u16) -> f64 {
    let r = f64::from(raw);
    let celsius = 0.00000003044 * r.powi(3) - 0.00008038 * r.powi(2) + r * 0.1149 - 30.45;
    celsius.clamp(-10.0, 55.0)
}

/// Photosynthetically active radiation in mol/m²/day
pub fn sunlight_from_raw(raw: u16) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    0.0864 * (192773.17 * f64::from(raw).powf(-1.0606619))
}

/// Volumetric water content in percent, clamped to [0, 60]
pub fn soil_moisture_from_raw(raw: u16) -> f64 {
    let r = f64::from(raw);
    let moisture = 11.4293
        + (0.0000000010698 * r.powi(4) - 0.00000152538 * r.powi(3) + 0.000866976 * r.powi(2)
            - 0.169422 * r);
    let percent =
        100.0 * (0.0000045 * moisture.powi(3) - 0.00055 * moisture.powi(2) + 0.0292 * moisture
            - 0.053);
    percent.clamp(0.0, 60.0)
}

/// Fail unless service discovery found the live measurement service
pub fn require_live_service(services: &[Uuid]) -> Result<(), BridgeError> {
    if services.contains(&LIVE_SERVICE_UUID) {
        Ok(())
    } else {
        Err(BridgeError::ServiceNotFound {
            uuid: LIVE_SERVICE_UUID,
        })
    }
}

/// Serial number string, without the trailing NUL padding some firmware sends
pub fn parse_serial_number(bytes: &[u8]) -> Result<String, BridgeError> {
    let serial = std::str::from_utf8(bytes)
        .map_err(|e| BridgeError::Payload(format!("serial number is not UTF-8: {}", e)))?;
    Ok(serial.trim_end_matches('\0').trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_service_uuid() {
        assert_eq!(
            LIVE_SERVICE_UUID.to_string(),
            "39e1fa00-84a8-11e2-afba-0002a5d5c51b"
        );
        assert_eq!(
            characteristic_for(SensorKind::Moisture).to_string(),
            "39e1fa05-84a8-11e2-afba-0002a5d5c51b"
        );
    }

    #[test]
    fn test_temperature() {
        assert!(close(temperature_from_raw(600), 16.12824));
        assert!(close(temperature_from_raw(700), 21.03472));
        assert_eq!(temperature_from_raw(0), -10.0);
        assert_eq!(temperature_from_raw(2000), 55.0);
    }

    #[test]
    fn test_sunlight() {
        assert_eq!(sunlight_from_raw(0), 0.0);
        assert!(close(sunlight_from_raw(100), 125.961125));
        assert!(close(sunlight_from_raw(1000), 10.954048));
    }

    #[test]
    fn test_soil_moisture() {
        assert!(close(soil_moisture_from_raw(400), 22.846666));
        assert!(close(soil_moisture_from_raw(500), 34.258494));
        assert_eq!(soil_moisture_from_raw(200), 0.0);
        assert_eq!(soil_moisture_from_raw(800), 60.0);
    }

    #[test]
    fn test_decode_little_endian() {
        // 700 = 0x02BC
        let value = decode(SensorKind::Temperature, &[0xBC, 0x02]).unwrap();
        assert!(close(value, 21.03472));
        assert!(decode(SensorKind::Light, &[0x01]).is_err());
    }

    #[test]
    fn test_require_live_service() {
        let battery = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
        assert!(require_live_service(&[battery, LIVE_SERVICE_UUID]).is_ok());
        assert!(matches!(
            require_live_service(&[battery]),
            Err(BridgeError::ServiceNotFound { uuid }) if uuid == LIVE_SERVICE_UUID
        ));
        assert!(require_live_service(&[]).is_err());
    }

    #[test]
    fn test_serial_number() {
        assert_eq!(parse_serial_number(b"PI040AB\0\0").unwrap(), "PI040AB");
        assert!(parse_serial_number(&[0xff, 0xfe]).is_err());
    }
}
