//! Common types for the ADS129x driver

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ads129x::state::AcquisitionState;

/// Errors that can occur in the ADS129x driver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// SPI communication error
    #[error("SPI error: {0}")]
    SpiError(String),
    /// GPIO error
    #[error("GPIO error: {0}")]
    GpioError(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Operation not accepted in the current acquisition state
    #[error("{operation} is not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: AcquisitionState,
    },
    /// Register address outside the device's register map
    #[error("Invalid register address: 0x{0:02X}")]
    InvalidRegister(u8),
    /// Attempted write to a read-only register
    #[error("Register 0x{0:02X} is read-only")]
    ReadOnlyRegister(u8),
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::ConfigurationError(err.to_string())
    }
}

#[cfg(feature = "pi-hardware")]
impl From<rppal::spi::Error> for DriverError {
    fn from(err: rppal::spi::Error) -> Self {
        DriverError::SpiError(err.to_string())
    }
}

#[cfg(feature = "pi-hardware")]
impl From<rppal::gpio::Error> for DriverError {
    fn from(err: rppal::gpio::Error) -> Self {
        DriverError::GpioError(err.to_string())
    }
}

/// Chip variant reported by the ID register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceId {
    Ads1294,
    Ads1296,
    Ads1298,
    Ads1294R,
    Ads1296R,
    Ads1298R,
    /// The ID byte did not match any known variant.
    Unrecognized(u8),
}

impl DeviceId {
    /// Decode the raw value of the ID register.
    pub fn from_id_byte(id: u8) -> Self {
        use crate::ads129x::registers::*;
        match id {
            ID_ADS1294 => DeviceId::Ads1294,
            ID_ADS1296 => DeviceId::Ads1296,
            ID_ADS1298 => DeviceId::Ads1298,
            ID_ADS1294R => DeviceId::Ads1294R,
            ID_ADS1296R => DeviceId::Ads1296R,
            ID_ADS1298R => DeviceId::Ads1298R,
            other => DeviceId::Unrecognized(other),
        }
    }

    /// Number of input channels, `None` for an unrecognized id.
    pub fn channel_count(&self) -> Option<usize> {
        match self {
            DeviceId::Ads1294 | DeviceId::Ads1294R => Some(4),
            DeviceId::Ads1296 | DeviceId::Ads1296R => Some(6),
            DeviceId::Ads1298 | DeviceId::Ads1298R => Some(8),
            DeviceId::Unrecognized(_) => None,
        }
    }

    /// R variants carry the respiration impedance block.
    pub fn has_respiration(&self) -> bool {
        matches!(
            self,
            DeviceId::Ads1294R | DeviceId::Ads1296R | DeviceId::Ads1298R
        )
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, DeviceId::Unrecognized(_))
    }
}

/// PGA gain setting of a channel (CHnSET bits 6:4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gain {
    X6,
    X1,
    X2,
    X3,
    X4,
    X8,
    X12,
}

impl Gain {
    /// 3-bit register code.
    pub fn code(self) -> u8 {
        match self {
            Gain::X6 => 0x0,
            Gain::X1 => 0x1,
            Gain::X2 => 0x2,
            Gain::X3 => 0x3,
            Gain::X4 => 0x4,
            Gain::X8 => 0x5,
            Gain::X12 => 0x6,
        }
    }

    /// Numeric amplification factor.
    pub fn factor(self) -> f32 {
        match self {
            Gain::X6 => 6.0,
            Gain::X1 => 1.0,
            Gain::X2 => 2.0,
            Gain::X3 => 3.0,
            Gain::X4 => 4.0,
            Gain::X8 => 8.0,
            Gain::X12 => 12.0,
        }
    }
}

/// Input multiplexer setting of a channel (CHnSET bits 2:0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mux {
    /// Normal electrode input
    Normal,
    /// Input shorted, for offset or noise measurements
    Shorted,
    /// Used together with RLD_MEAS for right-leg-drive measurements
    RldMeasure,
    /// MVDD for supply measurement
    Mvdd,
    /// Temperature sensor
    Temperature,
    /// Test signal
    Test,
    /// RLD_DRP (positive electrode is the driver)
    RldDrp,
    /// RLD_DRN (negative electrode is the driver)
    RldDrn,
}

impl Mux {
    pub fn code(self) -> u8 {
        match self {
            Mux::Normal => 0x0,
            Mux::Shorted => 0x1,
            Mux::RldMeasure => 0x2,
            Mux::Mvdd => 0x3,
            Mux::Temperature => 0x4,
            Mux::Test => 0x5,
            Mux::RldDrp => 0x6,
            Mux::RldDrn => 0x7,
        }
    }
}

/// Output data rate (CONFIG1 bits 2:0), named after the low-power mode rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Sps16,
    Sps32,
    Sps64,
    Sps128,
    Sps256,
    Sps512,
    Sps1024,
}

impl SampleRate {
    pub fn code(self) -> u8 {
        match self {
            SampleRate::Sps16 => 0x0,
            SampleRate::Sps32 => 0x1,
            SampleRate::Sps64 => 0x2,
            SampleRate::Sps128 => 0x3,
            SampleRate::Sps256 => 0x4,
            SampleRate::Sps512 => 0x5,
            SampleRate::Sps1024 => 0x6,
        }
    }

    pub fn hz(self) -> u32 {
        16 << self.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_decodes_known_variants() {
        assert_eq!(DeviceId::from_id_byte(0x92), DeviceId::Ads1298);
        assert_eq!(DeviceId::from_id_byte(0xD0), DeviceId::Ads1294R);
        assert_eq!(DeviceId::from_id_byte(0x92).channel_count(), Some(8));
        assert_eq!(DeviceId::from_id_byte(0x91).channel_count(), Some(6));
        assert!(DeviceId::from_id_byte(0xD2).has_respiration());
        assert!(!DeviceId::from_id_byte(0x90).has_respiration());
    }

    #[test]
    fn device_id_unknown_byte_is_not_fatal() {
        let id = DeviceId::from_id_byte(0x3E);
        assert_eq!(id, DeviceId::Unrecognized(0x3E));
        assert!(!id.is_recognized());
        assert_eq!(id.channel_count(), None);
    }

    #[test]
    fn sample_rate_codes_map_to_hz() {
        assert_eq!(SampleRate::Sps16.hz(), 16);
        assert_eq!(SampleRate::Sps512.hz(), 512);
        assert_eq!(SampleRate::Sps1024.code(), 0x6);
    }

    #[test]
    fn gain_codes_follow_register_table() {
        assert_eq!(Gain::X6.code(), 0x0);
        assert_eq!(Gain::X12.code(), 0x6);
        assert_eq!(Gain::X8.factor(), 8.0);
    }
}
