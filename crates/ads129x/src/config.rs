use std::collections::HashSet;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::hal::BusSettings;
use crate::types::{DriverError, Gain, Mux, SampleRate};

/// How data-ready events reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataReadyMode {
    /// Check the DRDY level on every retrieval attempt. Use when several
    /// devices share the bus.
    Polled,
    /// Read frames from a DRDY falling-edge handler.
    Interrupt,
}

/// Settings for one input channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel number, 1-8
    pub channel: u8,
    #[serde(default)]
    pub power_down: bool,
    #[serde(default = "default_gain")]
    pub gain: Gain,
    #[serde(default = "default_mux")]
    pub mux: Mux,
}

fn default_gain() -> Gain { Gain::X6 }
fn default_mux() -> Mux { Mux::Normal }

/// Configuration for one ADS129x and its bus wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// SPI bus the chip is attached to
    #[serde(default = "default_spi_bus")]
    pub spi_bus: u8,
    /// SPI clock rate in Hz
    #[serde(default = "default_clock_speed")]
    pub clock_speed_hz: u32,
    /// GPIO driving chip select
    #[serde(default = "default_cs_pin")]
    pub cs_pin: u8,
    /// GPIO connected to DRDY
    #[serde(default = "default_drdy_pin")]
    pub drdy_pin: u8,
    #[serde(default = "default_data_ready")]
    pub data_ready: DataReadyMode,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: SampleRate,
    /// Reference voltage for voltage conversion
    #[serde(default = "default_vref")]
    pub vref: f32,
    /// Enabled channels. Channels not listed are powered down.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

fn default_spi_bus() -> u8 { 0 }
fn default_clock_speed() -> u32 { 4_000_000 }
fn default_cs_pin() -> u8 { 8 }
fn default_drdy_pin() -> u8 { 25 }
fn default_data_ready() -> DataReadyMode { DataReadyMode::Interrupt }
fn default_sample_rate() -> SampleRate { SampleRate::Sps512 }
fn default_vref() -> f32 { 2.4 }
fn default_channels() -> Vec<ChannelConfig> {
    (1..=8)
        .map(|channel| ChannelConfig {
            channel,
            power_down: false,
            gain: default_gain(),
            mux: default_mux(),
        })
        .collect()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            spi_bus: default_spi_bus(),
            clock_speed_hz: default_clock_speed(),
            cs_pin: default_cs_pin(),
            drdy_pin: default_drdy_pin(),
            data_ready: default_data_ready(),
            sample_rate: default_sample_rate(),
            vref: default_vref(),
            channels: default_channels(),
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.clock_speed_hz == 0 {
            return Err(DriverError::ConfigurationError(
                "SPI clock speed must be greater than 0".to_string(),
            ));
        }
        if self.vref <= 0.0 {
            return Err(DriverError::ConfigurationError(format!(
                "Invalid vref: {}",
                self.vref
            )));
        }

        let mut unique_channels = HashSet::new();
        for ch in &self.channels {
            if !(1..=8).contains(&ch.channel) {
                return Err(DriverError::ConfigurationError(format!(
                    "Invalid channel: {}. Channels are numbered 1-8",
                    ch.channel
                )));
            }
            if !unique_channels.insert(ch.channel) {
                return Err(DriverError::ConfigurationError(format!(
                    "Duplicate channel detected: {}",
                    ch.channel
                )));
            }
        }
        Ok(())
    }

    pub fn channel(&self, channel: u8) -> Option<&ChannelConfig> {
        self.channels.iter().find(|ch| ch.channel == channel)
    }

    /// Gain of every channel in order, X6 (the reset default) for unlisted ones.
    pub fn channel_gains(&self) -> [Gain; 8] {
        let mut gains = [Gain::X6; 8];
        for ch in &self.channels {
            let index = (ch.channel as usize).checked_sub(1);
            if let Some(slot) = index.and_then(|i| gains.get_mut(i)) {
                *slot = ch.gain;
            }
        }
        gains
    }

    pub fn bus_settings(&self) -> BusSettings {
        BusSettings::ads129x(self.clock_speed_hz)
    }
}

/// Load a device configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DeviceConfig, DriverError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DriverError::ConfigurationError(format!(
            "Could not read configuration file at '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config: DeviceConfig = serde_json::from_str(&contents)?;
    config.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DeviceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channels.len(), 8);
        assert_eq!(config.bus_settings(), BusSettings::default());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: DeviceConfig = serde_json::from_str(
            r#"{
                "data_ready": "polled",
                "sample_rate": "Sps256",
                "channels": [{ "channel": 3, "gain": "X12" }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.data_ready, DataReadyMode::Polled);
        assert_eq!(config.sample_rate, SampleRate::Sps256);
        assert_eq!(config.drdy_pin, 25);
        let ch = config.channel(3).unwrap();
        assert_eq!(ch.gain, Gain::X12);
        assert_eq!(ch.mux, Mux::Normal);
        assert!(!ch.power_down);
        assert!(config.channel(1).is_none());
        assert_eq!(config.channel_gains()[2], Gain::X12);
        assert_eq!(config.channel_gains()[0], Gain::X6);
    }

    #[test]
    fn rejects_bad_channels() {
        let mut config = DeviceConfig::default();
        config.channels.push(ChannelConfig {
            channel: 1,
            power_down: false,
            gain: Gain::X1,
            mux: Mux::Normal,
        });
        assert!(matches!(
            config.validate(),
            Err(DriverError::ConfigurationError(_))
        ));

        config.channels = vec![ChannelConfig {
            channel: 9,
            power_down: false,
            gain: Gain::X1,
            mux: Mux::Normal,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_vref() {
        let config = DeviceConfig {
            vref: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let result = load_config("/nonexistent/ads129x.json");
        assert!(matches!(result, Err(DriverError::ConfigurationError(_))));
    }
}
