//! Raspberry Pi backend for the HAL traits, using rppal.

use std::io;

use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::config::DeviceConfig;
use crate::hal::{
    BitOrder, BusSettings, ChipSelectPin, Edge, InterruptCallback, InterruptPin, SpiMode, SpiPort,
};
use crate::spi_bus::SpiBus;
use crate::types::DriverError;

fn to_io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

fn spi_mode(mode: SpiMode) -> Mode {
    match mode {
        SpiMode::Mode0 => Mode::Mode0,
        SpiMode::Mode1 => Mode::Mode1,
        SpiMode::Mode2 => Mode::Mode2,
        SpiMode::Mode3 => Mode::Mode3,
    }
}

fn spi_bus(index: u8) -> Result<Bus, DriverError> {
    match index {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        3 => Ok(Bus::Spi3),
        4 => Ok(Bus::Spi4),
        5 => Ok(Bus::Spi5),
        6 => Ok(Bus::Spi6),
        _ => Err(DriverError::ConfigurationError(format!(
            "Invalid SPI bus: {}",
            index
        ))),
    }
}

/// SPI port on top of rppal. Chip select is driven by [`RppalChipSelect`].
pub struct RppalSpi {
    spi: Spi,
    applied: BusSettings,
}

impl RppalSpi {
    /// Open `bus_index` with `settings`.
    ///
    /// A dummy `SlaveSelect::Ss0` is used because chip select is driven
    /// manually. The hardware CE0 pin must not be wired to the chip.
    pub fn open(bus_index: u8, settings: &BusSettings) -> Result<Self, DriverError> {
        if settings.bit_order == BitOrder::LsbFirst {
            return Err(DriverError::ConfigurationError(
                "LSB-first transfers are not supported by the SPI controller".to_string(),
            ));
        }
        let spi = Spi::new(
            spi_bus(bus_index)?,
            SlaveSelect::Ss0,
            settings.clock_speed_hz,
            spi_mode(settings.mode),
        )?;
        Ok(Self {
            spi,
            applied: *settings,
        })
    }
}

impl SpiPort for RppalSpi {
    fn begin_transaction(&mut self, settings: &BusSettings) -> Result<(), io::Error> {
        if *settings == self.applied {
            return Ok(());
        }
        if settings.bit_order == BitOrder::LsbFirst {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "LSB-first transfers are not supported",
            ));
        }
        self.spi
            .set_clock_speed(settings.clock_speed_hz)
            .map_err(to_io_error)?;
        self.spi.set_mode(spi_mode(settings.mode)).map_err(to_io_error)?;
        self.applied = *settings;
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, io::Error> {
        let mut read = [0u8; 1];
        self.spi.transfer(&mut read, &[out]).map_err(to_io_error)?;
        Ok(read[0])
    }

    fn transfer(&mut self, read_buffer: &mut [u8], write_buffer: &[u8]) -> Result<(), io::Error> {
        self.spi
            .transfer(read_buffer, write_buffer)
            .map(|_| ())
            .map_err(to_io_error)
    }
}

/// Active-low chip select on a GPIO output.
pub struct RppalChipSelect(OutputPin);

impl ChipSelectPin for RppalChipSelect {
    fn assert(&mut self) {
        self.0.set_low();
    }

    fn deassert(&mut self) {
        self.0.set_high();
    }
}

/// DRDY input with rppal's interrupt thread behind `set_async_interrupt`.
pub struct RppalDrdyPin(InputPin);

impl InterruptPin for RppalDrdyPin {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }

    fn set_async_interrupt(&mut self, edge: Edge, mut callback: InterruptCallback)
        -> Result<(), io::Error> {
        let trigger = match edge {
            Edge::Falling => Trigger::FallingEdge,
            Edge::Rising => Trigger::RisingEdge,
            Edge::Both => Trigger::Both,
        };
        self.0
            .set_async_interrupt(trigger, None, move |_event| callback())
            .map_err(to_io_error)
    }

    fn clear_async_interrupt(&mut self) -> Result<(), io::Error> {
        self.0.clear_async_interrupt().map_err(to_io_error)
    }
}

/// Open the SPI bus and the GPIO lines named in `config`.
pub fn open(config: &DeviceConfig) -> Result<(SpiBus, RppalChipSelect, RppalDrdyPin), DriverError> {
    let settings = config.bus_settings();
    debug!(
        "Opening SPI{} at {} Hz, CS GPIO {}, DRDY GPIO {}",
        config.spi_bus, settings.clock_speed_hz, config.cs_pin, config.drdy_pin
    );

    let spi = RppalSpi::open(config.spi_bus, &settings)?;
    let gpio = Gpio::new()?;
    let cs = gpio.get(config.cs_pin)?.into_output_high();
    let drdy = gpio.get(config.drdy_pin)?.into_input_pullup();

    info!("Hardware SPI and GPIO initialized");
    Ok((
        SpiBus::new(spi, settings),
        RppalChipSelect(cs),
        RppalDrdyPin(drdy),
    ))
}
