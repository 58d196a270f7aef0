//! Builder pattern implementation for the ADS129x driver.

use super::driver::{Ads129xDriver, InterruptAds129x, PolledAds129x};
use super::handoff::{InterruptHandoff, PolledHandoff};
use crate::hal::{ChipSelectPin, InterruptPin};
use crate::spi_bus::{BusDevice, SpiBus};
use crate::types::DriverError;

/// Builder for creating an Ads129xDriver with a fluent interface.
pub struct Ads129xDriverBuilder {
    bus: Option<SpiBus>,
    chip_select: Option<Box<dyn FnOnce(&SpiBus) -> BusDevice>>,
    drdy: Option<Box<dyn InterruptPin>>,
}

impl Ads129xDriverBuilder {
    /// Create a new Ads129xDriverBuilder with default values.
    pub fn new() -> Self {
        Self {
            bus: None,
            chip_select: None,
            drdy: None,
        }
    }

    /// Set the shared SPI bus.
    pub fn bus(mut self, bus: SpiBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Set the chip-select line of this device.
    pub fn chip_select<C: ChipSelectPin>(mut self, chip_select: C) -> Self {
        self.chip_select = Some(Box::new(move |bus: &SpiBus| bus.device(chip_select)));
        self
    }

    /// Set the DRDY line of this device.
    pub fn data_ready_pin<P: InterruptPin>(mut self, drdy: P) -> Self {
        self.drdy = Some(Box::new(drdy));
        self
    }

    /// Build a driver that polls the DRDY level.
    pub fn build_polled(self) -> Result<PolledAds129x, DriverError> {
        let (device, drdy) = self.into_parts()?;
        Ok(Ads129xDriver::new(device, PolledHandoff::new(drdy)))
    }

    /// Build a driver that handles DRDY falling edges.
    pub fn build_interrupt(self) -> Result<InterruptAds129x, DriverError> {
        let (device, drdy) = self.into_parts()?;
        Ok(Ads129xDriver::new(device, InterruptHandoff::new(drdy)))
    }

    fn into_parts(self) -> Result<(BusDevice, Box<dyn InterruptPin>), DriverError> {
        let bus = self
            .bus
            .ok_or_else(|| DriverError::ConfigurationError("Missing SPI bus".to_string()))?;
        let attach = self
            .chip_select
            .ok_or_else(|| DriverError::ConfigurationError("Missing chip select pin".to_string()))?;
        let drdy = self
            .drdy
            .ok_or_else(|| DriverError::ConfigurationError("Missing DRDY pin".to_string()))?;
        Ok((attach(&bus), drdy))
    }
}

impl Default for Ads129xDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
